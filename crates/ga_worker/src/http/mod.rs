mod authorization;
mod google_analytics;

pub use authorization::*;
pub use google_analytics::*;
