pub mod clickhouse;
pub mod domain;
pub mod log_worker;
pub mod memory;
pub mod nats;

pub use clickhouse::*;
pub use domain::*;
pub use log_worker::*;
pub use memory::*;
pub use nats::*;
