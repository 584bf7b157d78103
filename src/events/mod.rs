pub mod status_bus;
pub mod types;

pub use status_bus::StatusBus;
pub use types::{StatusEvent, StatusPayload, SuspendReason};
