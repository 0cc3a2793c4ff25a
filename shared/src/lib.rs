//! Shared types and models for the forecast tracker
//!
//! This crate holds the forecast payload, the persisted entity shapes, and the
//! pure validation and transformation rules between them.

pub mod models;
pub mod transform;
pub mod types;
pub mod validation;

pub use models::*;
pub use transform::*;
pub use types::*;
pub use validation::*;
