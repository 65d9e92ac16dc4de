//! Shared types for the CV advisor workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
