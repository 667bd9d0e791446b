use crate::{
    domain::model::{Model, ModelCatalog},
    infra::contracts::PreferencesStore,
};

use super::contracts::{SourceError, UseCaseError};

const DEFAULT_MODEL_SAVE_FAILED: &str = "PREFERENCES_DEFAULT_MODEL_SAVE_FAILED";

pub trait ModelSource {
    fn list_models(&self) -> Result<Vec<Model>, SourceError>;
}

pub fn list_models(source: &dyn ModelSource) -> Result<Vec<Model>, UseCaseError> {
    Ok(source.list_models()?)
}

/// Loads the catalog. The configured default wins over the web client's
/// choice, and the first listed model is the fallback.
pub fn refresh_catalog(
    source: &dyn ModelSource,
    catalog: &mut ModelCatalog,
    configured_default: Option<&str>,
    settings_default: Option<&str>,
) -> Result<(), UseCaseError> {
    let models = list_models(source)?;
    let preferred = configured_default
        .filter(|id| models.iter().any(|model| model.id == *id))
        .or(settings_default);

    catalog.set_models(models, preferred);
    Ok(())
}

/// Moves the selection to the next model and remembers it as the default.
/// Returns the newly selected model id.
pub fn cycle_model(
    catalog: &mut ModelCatalog,
    preferences: &dyn PreferencesStore,
) -> Option<String> {
    let selected = catalog.cycle_next()?.id.clone();

    if let Err(error) = preferences.save_default_model(&selected) {
        tracing::warn!(
            code = DEFAULT_MODEL_SAVE_FAILED,
            error = %error,
            "failed to persist default model"
        );
    }

    Some(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{infra::stubs::MemoryPreferencesStore, usecases::stubs::StubBackend};

    fn model(id: &str) -> Model {
        Model {
            id: id.to_owned(),
            name: id.to_owned(),
            owned_by: None,
            description: None,
            confidential: true,
        }
    }

    #[test]
    fn configured_default_wins_when_listed() {
        let backend = StubBackend::default();
        backend.set_models(vec![model("a"), model("b"), model("c")]);
        let mut catalog = ModelCatalog::default();

        refresh_catalog(&backend, &mut catalog, Some("c"), Some("b")).expect("refresh");

        assert_eq!(catalog.selected().map(|m| m.id.as_str()), Some("c"));
    }

    #[test]
    fn unknown_configured_default_falls_back_to_settings_then_first() {
        let backend = StubBackend::default();
        backend.set_models(vec![model("a"), model("b")]);
        let mut catalog = ModelCatalog::default();

        refresh_catalog(&backend, &mut catalog, Some("gone"), Some("b")).expect("refresh");
        assert_eq!(catalog.selected().map(|m| m.id.as_str()), Some("b"));

        let mut fresh = ModelCatalog::default();
        refresh_catalog(&backend, &mut fresh, None, None).expect("refresh");
        assert_eq!(fresh.selected().map(|m| m.id.as_str()), Some("a"));
    }

    #[test]
    fn cycling_persists_new_default() {
        let mut catalog = ModelCatalog::default();
        catalog.set_models(vec![model("a"), model("b")], None);
        let preferences = MemoryPreferencesStore::default();

        let selected = cycle_model(&mut catalog, &preferences);

        assert_eq!(selected.as_deref(), Some("b"));
        assert_eq!(preferences.default_model().as_deref(), Some("b"));
    }

    #[test]
    fn maps_source_failure() {
        let backend = StubBackend::default();
        backend.fail("list_models", SourceError::Unauthorized);

        assert_eq!(list_models(&backend), Err(UseCaseError::Unauthorized));
    }
}
