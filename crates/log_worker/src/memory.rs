mod in_memory_log_record_repository;

pub use in_memory_log_record_repository::*;
