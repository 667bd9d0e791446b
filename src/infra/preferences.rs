//! Writes user preferences back into the config file without losing formatting.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use toml_edit::DocumentMut;

use crate::infra::{contracts::PreferencesStore, error::AppError};

#[derive(Debug, Clone)]
pub struct FilePreferencesStore {
    path: PathBuf,
}

impl FilePreferencesStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_error(&self, details: impl Into<String>) -> AppError {
        AppError::PreferencesWrite {
            path: self.path.clone(),
            details: details.into(),
        }
    }
}

impl PreferencesStore for FilePreferencesStore {
    fn save_default_model(&self, model_id: &str) -> Result<(), AppError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(source) if source.kind() == ErrorKind::NotFound => String::new(),
            Err(source) => return Err(self.write_error(source.to_string())),
        };

        let mut document = raw
            .parse::<DocumentMut>()
            .map_err(|error| self.write_error(error.to_string()))?;

        let preferences = document
            .entry("preferences")
            .or_insert(toml_edit::table())
            .as_table_mut()
            .ok_or_else(|| self.write_error("[preferences] is not a table"))?;
        preferences["default_model"] = toml_edit::value(model_id);

        fs::write(&self.path, document.to_string())
            .map_err(|source| self.write_error(source.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::config::load;

    #[test]
    fn creates_file_with_preferences_table() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let store = FilePreferencesStore::new(dir.path().join("config.toml"));

        store
            .save_default_model("llama-3.3-70b")
            .expect("preference should be saved");

        let config = load(Some(store.path())).expect("config should load");
        assert_eq!(
            config.preferences.default_model.as_deref(),
            Some("llama-3.3-70b")
        );
    }

    #[test]
    fn keeps_comments_and_other_sections() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "# my server\n[server]\nbase_url = \"https://chat.example.com\"\n\n[preferences]\ndefault_model = \"old\"\n",
        )
        .expect("fixture should be written");
        let store = FilePreferencesStore::new(path.clone());

        store.save_default_model("new").expect("preference should be saved");

        let written = fs::read_to_string(&path).expect("config should be readable");
        assert!(written.contains("# my server"));
        assert!(written.contains("base_url = \"https://chat.example.com\""));
        assert!(written.contains("default_model = \"new\""));
        assert!(!written.contains("\"old\""));
    }

    #[test]
    fn rejects_non_table_preferences() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("config.toml");
        fs::write(&path, "preferences = 3\n").expect("fixture should be written");

        let error = FilePreferencesStore::new(path)
            .save_default_model("m")
            .expect_err("save must fail");

        assert!(matches!(error, AppError::PreferencesWrite { .. }));
    }
}
