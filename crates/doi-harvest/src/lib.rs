// Copyright 2026 doi-harvest Contributors
// SPDX-License-Identifier: Apache-2.0

//! doi-harvest library: tiered PDF retrieval for DOIs.
//!
//! Each identifier walks an ordered list of strategies: the open-access
//! lookup service, a headless browser that clicks download affordances on
//! the landing page, document URLs observed in the page's network traffic,
//! and finally a full-page screenshot kept as evidence.

pub mod acquisition;
pub mod cli;
pub mod config;
pub mod error;
pub mod progress;
pub mod renderer;
pub mod report;
pub mod retrieval;
