//! Load generation for the ingest endpoint.
//!
//! A fixed pool of workers keeps up to `concurrency` requests in flight until a
//! deadline, then drains. Every completed request lands in a [`StatsCollector`].

pub mod client;
pub mod config;
pub mod driver;
pub mod report;
pub mod request;
pub mod stats;

pub use client::*;
pub use config::*;
pub use driver::*;
pub use report::*;
pub use request::*;
pub use stats::*;
