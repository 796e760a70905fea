//! Identifier retrieval: parsing, the tiered retriever, and the batch driver.

pub mod affordance;
pub mod artifact;
pub mod batch;
pub mod identifier;
pub mod retriever;

pub use artifact::ArtifactStore;
pub use batch::{run_batch, BatchSummary};
pub use identifier::{parse_identifier_list, Identifier};
pub use retriever::{RetrievalConfig, RetrievalStatus, Retriever};
