//! Fieldguide Core - Domain types shared by the ingestion and retrieval crates.

mod error;
mod types;

pub use error::{Error, Result};
pub use types::*;
