//! HTTP acquisition layer: open-access lookup and direct document fetches.
//!
//! Nothing here needs a browser.

pub mod http_client;
pub mod unpaywall;
