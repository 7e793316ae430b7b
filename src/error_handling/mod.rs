//! Error types and failure categorization.

mod types;

pub use types::{CheckFailure, InitializationError, StoreError};
