use std::sync::Mutex;

use anyhow::Result;

use crate::infra::{
    contracts::{ClipboardWriter, ExternalOpener, PreferencesStore, TokenStore},
    error::AppError,
};

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn with_token(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(token.to_owned())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>, AppError> {
        Ok(self.token.lock().ok().and_then(|token| token.clone()))
    }

    fn save(&self, token: &str) -> Result<(), AppError> {
        if let Ok(mut slot) = self.token.lock() {
            *slot = Some(token.to_owned());
        }
        Ok(())
    }

    fn clear(&self) -> Result<bool, AppError> {
        Ok(self
            .token
            .lock()
            .map(|mut slot| slot.take().is_some())
            .unwrap_or(false))
    }
}

#[derive(Debug, Default)]
pub struct MemoryPreferencesStore {
    default_model: Mutex<Option<String>>,
}

impl MemoryPreferencesStore {
    pub fn default_model(&self) -> Option<String> {
        self.default_model.lock().ok().and_then(|model| model.clone())
    }
}

impl PreferencesStore for MemoryPreferencesStore {
    fn save_default_model(&self, model_id: &str) -> Result<(), AppError> {
        if let Ok(mut slot) = self.default_model.lock() {
            *slot = Some(model_id.to_owned());
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingOpener {
    opened: Mutex<Vec<String>>,
}

impl RecordingOpener {
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().map(|opened| opened.clone()).unwrap_or_default()
    }
}

impl ExternalOpener for RecordingOpener {
    fn open(&self, target: &str) -> Result<()> {
        if let Ok(mut opened) = self.opened.lock() {
            opened.push(target.to_owned());
        }
        Ok(())
    }
}

/// Records copied text instead of touching the system clipboard.
#[derive(Debug, Default)]
pub struct RecordingClipboard {
    copied: Mutex<Vec<String>>,
}

impl RecordingClipboard {
    pub fn copied(&self) -> Vec<String> {
        self.copied.lock().map(|copied| copied.clone()).unwrap_or_default()
    }
}

impl ClipboardWriter for RecordingClipboard {
    fn copy_text(&self, text: &str) -> Result<()> {
        if let Ok(mut copied) = self.copied.lock() {
            copied.push(text.to_owned());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_token_store_round_trip() {
        let store = MemoryTokenStore::default();

        store.save("t").expect("save");
        assert_eq!(store.load().expect("load").as_deref(), Some("t"));
        assert!(store.clear().expect("clear"));
        assert_eq!(store.load().expect("load"), None);
    }
}
