use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::form::SummaryForm;

/// Live form instances, keyed by id. A form lives from `POST /forms` until
/// `DELETE /forms/:id`.
#[derive(Clone, Default)]
pub struct FormRegistry {
    forms: Arc<RwLock<HashMap<Uuid, Arc<SummaryForm>>>>,
}

impl FormRegistry {
    pub fn insert(&self, form: Arc<SummaryForm>) {
        self.forms.write().insert(form.id(), form);
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<SummaryForm>> {
        self.forms.read().get(id).cloned()
    }

    pub fn remove(&self, id: &Uuid) -> Option<Arc<SummaryForm>> {
        self.forms.write().remove(id)
    }

    pub fn len(&self) -> usize {
        self.forms.read().len()
    }
}
