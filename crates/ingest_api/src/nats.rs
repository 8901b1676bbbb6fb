mod log_envelope_producer;

pub use log_envelope_producer::*;
