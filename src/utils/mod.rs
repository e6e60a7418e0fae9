//! Utility functions and types shared across cryptopulse.

pub mod error;
mod fs;
mod logging;
pub mod types;

pub use error::{Error, FetchError, WeightError};
pub use fs::*;
pub use logging::{init_logging, init_test_logging};
pub use types::*;
