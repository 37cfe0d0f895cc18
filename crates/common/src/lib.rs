pub mod nats;
pub mod telemetry;

pub use nats::*;
pub use telemetry::*;
