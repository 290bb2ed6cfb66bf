//! Prelude for commonly used types and traits in term-reconcile.

pub use crate::error::{ErrorClass, ErrorContext, Result, TermError};
pub use crate::logging::LogConfig;
