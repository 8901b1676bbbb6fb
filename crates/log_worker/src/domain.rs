mod batch_worker;
mod failure_policy;
mod log_processing_service;
mod text_transformer;

pub use batch_worker::*;
pub use failure_policy::*;
pub use log_processing_service::*;
pub use text_transformer::*;
