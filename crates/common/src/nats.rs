mod client;
mod consumer;
mod message;
mod subject;
mod trace_context;
mod traits;

pub use client::*;
pub use consumer::*;
pub use message::*;
pub use subject::*;
pub use trace_context::*;
pub use traits::*;
