//! HTTP handlers

pub mod forecast;
pub mod health;
pub mod location;

pub use forecast::*;
pub use health::*;
pub use location::*;
