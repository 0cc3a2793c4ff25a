//! Business logic services for the forecast tracker

pub mod coordinator;
pub mod forecast;
pub mod location;
pub mod worker;

pub use coordinator::{AggregateError, Coordinator};
pub use forecast::ForecastService;
pub use location::LocationService;
pub use worker::FetchWorker;
