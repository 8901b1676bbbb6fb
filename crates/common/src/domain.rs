mod envelope;
mod log_record;
mod result;

pub use envelope::*;
pub use log_record::*;
pub use result::*;
