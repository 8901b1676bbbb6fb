mod log_envelope_processor;

pub use log_envelope_processor::*;
