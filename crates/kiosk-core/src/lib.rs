//! # Kiosk Core
//!
//! Core types and traits for the Kiosk service.
//!
//! This crate provides the foundational abstractions used across the Kiosk
//! workspace:
//! - Common error types
//! - Session and form records
//! - Calculator operations
//! - The completion backend trait

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod calc;
pub mod completion;
pub mod error;
pub mod types;

pub use calc::Operation;
pub use completion::CompletionBackend;
pub use error::{Error, Result};
pub use types::{FormSubmission, Session, SessionId};
