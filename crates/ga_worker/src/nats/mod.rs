mod device_change_processor;
mod device_event_processor;
mod device_report_processor;

pub use device_change_processor::*;
pub use device_event_processor::*;
pub use device_report_processor::*;
