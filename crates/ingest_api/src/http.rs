mod error;
mod router;
mod server;

pub use error::*;
pub use router::*;
pub use server::*;
