pub mod types;
pub mod error;
pub mod events;
pub mod data;
pub mod sync;
pub mod settings;
pub mod render;
pub mod dashboard;
pub mod config;
pub mod utils;

pub use types::*;
pub use error::{Result, SyncError};
pub use dashboard::Dashboard;
