mod error;
mod ingest_request;
mod ingest_service;

pub use error::*;
pub use ingest_request::*;
pub use ingest_service::*;
