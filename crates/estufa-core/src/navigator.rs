//! List → entity → process navigation.
//!
//! Two slots, not an open-ended stack: a process can only be selected while
//! an entity is.

use crate::model::{Entity, Process};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    List,
    Entity { entity_id: String },
    Process { entity_id: String, process_id: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Navigator {
    entity: Option<String>,
    process: Option<String>,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select an entity. Any selected process is cleared.
    pub fn open_entity(&mut self, id: impl Into<String>) {
        self.entity = Some(id.into());
        self.process = None;
    }

    /// Select a process of the current entity. Ignored on the list view.
    pub fn open_process(&mut self, id: impl Into<String>) {
        if self.entity.is_some() {
            self.process = Some(id.into());
        }
    }

    /// Pop one level. Returns `false` when already on the list.
    pub fn back(&mut self) -> bool {
        if self.process.take().is_some() {
            return true;
        }
        self.entity.take().is_some()
    }

    pub fn view(&self) -> View {
        match (&self.entity, &self.process) {
            (Some(e), Some(p)) => View::Process {
                entity_id: e.clone(),
                process_id: p.clone(),
            },
            (Some(e), None) => View::Entity {
                entity_id: e.clone(),
            },
            _ => View::List,
        }
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    pub fn process_id(&self) -> Option<&str> {
        self.process.as_deref()
    }

    /// Look the selection up in a snapshot.
    pub fn resolve<'a>(&self, entities: &'a [Entity]) -> (Option<&'a Entity>, Option<&'a Process>) {
        let entity = self
            .entity
            .as_deref()
            .and_then(|id| entities.iter().find(|e| e.id == id));
        let process = match (entity, self.process.as_deref()) {
            (Some(e), Some(pid)) => e.process(pid),
            _ => None,
        };
        (entity, process)
    }

    /// Drop selections that no longer exist after a refresh. Returns `true`
    /// if the view changed.
    pub fn retain(&mut self, entities: &[Entity]) -> bool {
        let before = self.view();
        match self.resolve(entities) {
            (None, _) => {
                self.entity = None;
                self.process = None;
            }
            (Some(_), None) => self.process = None,
            (Some(_), Some(_)) => {}
        }
        self.view() != before
    }
}
