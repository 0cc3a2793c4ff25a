//! Domain models for the forecast tracker

mod forecast;
mod location;
mod records;

pub use forecast::*;
pub use location::*;
pub use records::*;
