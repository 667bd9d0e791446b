use anyhow::Result;

use crate::infra::error::AppError;

pub trait TokenStore {
    fn load(&self) -> Result<Option<String>, AppError>;
    fn save(&self, token: &str) -> Result<(), AppError>;
    /// Returns whether a token was removed.
    fn clear(&self) -> Result<bool, AppError>;
}

pub trait PreferencesStore {
    fn save_default_model(&self, model_id: &str) -> Result<(), AppError>;
}

pub trait ExternalOpener {
    fn open(&self, target: &str) -> Result<()>;
}

pub trait ClipboardWriter {
    fn copy_text(&self, text: &str) -> Result<()>;
}

/// Opens URLs in the system browser.
#[derive(Debug, Clone, Default)]
pub struct SystemOpener;

impl ExternalOpener for SystemOpener {
    fn open(&self, target: &str) -> Result<()> {
        open::that_detached(target)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SystemClipboard;

impl ClipboardWriter for SystemClipboard {
    fn copy_text(&self, text: &str) -> Result<()> {
        let mut clipboard = arboard::Clipboard::new()?;
        clipboard.set_text(text.to_owned())?;
        Ok(())
    }
}
