mod log_record_repository;

pub use log_record_repository::*;
