/// A model offered by the chat service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    pub id: String,
    pub name: String,
    pub owned_by: Option<String>,
    pub description: Option<String>,
    /// Served from a trusted execution environment that publishes attestation reports.
    pub confidential: bool,
}

/// Available models plus the one new messages are sent to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModelCatalog {
    models: Vec<Model>,
    selected_index: Option<usize>,
}

impl ModelCatalog {
    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn selected(&self) -> Option<&Model> {
        self.selected_index.and_then(|index| self.models.get(index))
    }

    /// Replaces the model list, keeping the current selection by id when possible,
    /// then `preferred`, then the first model.
    pub fn set_models(&mut self, models: Vec<Model>, preferred: Option<&str>) {
        let previous = self.selected().map(|model| model.id.clone());
        self.models = models;

        let position = |id: &str| self.models.iter().position(|model| model.id == id);
        self.selected_index = previous
            .as_deref()
            .and_then(position)
            .or_else(|| preferred.and_then(position))
            .or(if self.models.is_empty() { None } else { Some(0) });
    }

    /// Selects the model with `id`. Returns false when it is not listed.
    pub fn select(&mut self, id: &str) -> bool {
        match self.models.iter().position(|model| model.id == id) {
            Some(index) => {
                self.selected_index = Some(index);
                true
            }
            None => false,
        }
    }

    /// Moves the selection to the next model, wrapping around.
    pub fn cycle_next(&mut self) -> Option<&Model> {
        if self.models.is_empty() {
            return None;
        }

        let next = self
            .selected_index
            .map(|index| (index + 1) % self.models.len())
            .unwrap_or(0);
        self.selected_index = Some(next);
        self.selected()
    }
}
