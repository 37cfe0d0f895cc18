pub mod domain;
pub mod ga_worker;
pub mod http;
pub mod nats;

pub use domain::*;
pub use ga_worker::*;
pub use http::*;
pub use nats::*;
