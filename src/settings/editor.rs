/// Edit buffer behind the settings mode
use std::collections::HashSet;

use tracing::info;

use super::names::ChannelNames;
use crate::error::{Result, SyncError};
use crate::sync::ScalerSource;

pub struct SettingsEditor {
    current: ChannelNames,
    draft: Vec<String>,
}

impl SettingsEditor {
    pub fn new(current: ChannelNames) -> Self {
        let draft = current.as_slice().to_vec();
        SettingsEditor { current, draft }
    }

    pub fn draft(&self) -> &[String] {
        &self.draft
    }

    pub fn is_dirty(&self) -> bool {
        self.draft.as_slice() != self.current.as_slice()
    }

    /// Edit one channel name in the draft
    pub fn set(&mut self, channel: usize, name: impl Into<String>) -> Result<()> {
        let slot = self.draft.get_mut(channel).ok_or_else(|| {
            SyncError::Validation(format!("Channel {} does not exist", channel))
        })?;
        *slot = name.into();
        Ok(())
    }

    /// Discard edits, back to the names last loaded or saved
    pub fn reset(&mut self) {
        self.draft = self.current.as_slice().to_vec();
    }

    /// Replace the draft with the index defaults
    pub fn defaults(&mut self) {
        self.draft = ChannelNames::defaults(self.draft.len()).into_vec();
    }

    /// Validate the draft and store it on the server
    pub async fn save<S: ScalerSource + ?Sized>(&mut self, source: &S) -> Result<&ChannelNames> {
        let names: Vec<String> = self.draft.iter().map(|n| n.trim().to_string()).collect();

        if let Some(idx) = names.iter().position(String::is_empty) {
            return Err(SyncError::Validation(format!("Name of channel {} is empty", idx)));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = names.iter().find(|n| !seen.insert(n.as_str())) {
            return Err(SyncError::Validation(format!("Duplicate channel name '{}'", dup)));
        }

        source.set_channel_names(names.clone()).await?;

        info!("Saved {} channel names", names.len());
        self.current = ChannelNames::from_server(names, self.draft.len());
        self.reset();
        Ok(&self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::testing::ScriptedSource;

    #[test]
    fn test_reset_and_defaults() {
        let mut editor = SettingsEditor::new(ChannelNames::from_server(vec!["a".into(), "b".into()], 2));
        editor.set(0, "x").unwrap();
        assert!(editor.is_dirty());

        editor.reset();
        assert_eq!(editor.draft(), &["a", "b"]);

        editor.defaults();
        assert_eq!(editor.draft(), &["0", "1"]);
        assert!(editor.set(2, "nope").is_err());
    }

    #[tokio::test]
    async fn test_save_sends_trimmed_names() {
        let source = ScriptedSource::new(2);
        let mut editor = SettingsEditor::new(ChannelNames::defaults(2));
        editor.set(0, " beam ").unwrap();
        editor.set(1, "veto").unwrap();

        let saved = editor.save(&source).await.unwrap();
        assert_eq!(saved.as_slice(), &["beam", "veto"]);
        assert_eq!(source.saved_names(), vec![vec!["beam".to_string(), "veto".to_string()]]);
        assert!(!editor.is_dirty());
    }

    #[tokio::test]
    async fn test_save_rejects_empty_and_duplicate_names() {
        let source = ScriptedSource::new(2);
        let mut editor = SettingsEditor::new(ChannelNames::defaults(2));

        editor.set(1, "  ").unwrap();
        assert!(matches!(editor.save(&source).await, Err(SyncError::Validation(_))));

        editor.set(1, "0").unwrap();
        assert!(matches!(editor.save(&source).await, Err(SyncError::Validation(_))));

        assert!(source.saved_names().is_empty());
    }
}
