pub mod editor;
pub mod names;

pub use editor::SettingsEditor;
pub use names::{resolve_names, ChannelNames};
