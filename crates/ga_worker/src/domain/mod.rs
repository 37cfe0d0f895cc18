mod custom_data;
mod dispatch_service;
mod error;
mod events;
mod hit;

pub use custom_data::*;
pub use dispatch_service::*;
pub use error::*;
pub use events::*;
pub use hit::*;
