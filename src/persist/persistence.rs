use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::form::field_classifier::{FieldFacts, should_exclude, should_exclude_element};
use crate::form::form_model::{FieldKind, FieldMap, FieldValue, FormElement};
use crate::storage::entry::StoredEntry;
use crate::storage::store::FormStore;

/// Current values of a form, minus everything the field classifier rejects.
pub fn extract(form: &FormElement) -> FieldMap {
    let mut fields = FieldMap::new();
    let mut processed_groups: HashSet<String> = HashSet::new();

    for (position, el) in form.eligible_fields() {
        let facts = FieldFacts::of(el, position);
        if should_exclude(&facts) {
            debug!(field = %facts.name, "field excluded from extraction");
            continue;
        }
        let name = facts.name;

        match el.kind() {
            FieldKind::Radio => {
                if !processed_groups.insert(name.clone()) {
                    continue;
                }
                let checked = form
                    .eligible_fields()
                    .find(|(p, f)| {
                        f.kind() == FieldKind::Radio
                            && f.checked
                            && f.resolved_name(*p) == name
                            && !should_exclude_element(f, *p)
                    })
                    .map(|(_, f)| f.value.clone());
                if let Some(value) = checked {
                    fields.insert(name, FieldValue::Text(value));
                }
            }
            FieldKind::Checkbox => {
                if el.checked {
                    let value = if el.value.is_empty() {
                        FieldValue::Flag(true)
                    } else {
                        FieldValue::Text(el.value.clone())
                    };
                    fields.insert(name, value);
                }
            }
            _ => {
                if !el.value.trim().is_empty() {
                    fields.insert(name, FieldValue::Text(el.value.clone()));
                }
            }
        }
    }

    fields
}

/// Re-run the field classifier over stored pairs.
pub fn clean_fields(fields: &FieldMap) -> FieldMap {
    fields
        .iter()
        .filter(|(name, value)| !should_exclude(&FieldFacts::stored(name, value)))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { field_count: usize },
    /// Nothing worth remembering.
    Skipped,
}

pub struct PersistenceCoordinator<S: FormStore> {
    store: S,
}

impl<S: FormStore> PersistenceCoordinator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn save(&mut self, form: &FormElement, key: &str, url: &str) -> Result<SaveOutcome> {
        let fields = extract(form);
        if fields.is_empty() {
            debug!(key, "nothing to save");
            return Ok(SaveOutcome::Skipped);
        }

        let field_count = fields.len();
        self.store.save(key, &StoredEntry::new(url, fields))?;
        info!(key, field_count, "form saved");
        Ok(SaveOutcome::Saved { field_count })
    }

    /// Fetch an entry, stripping any field that is now considered a security
    /// field. A stripped entry replaces the stored one.
    pub fn load(&mut self, key: &str) -> Result<Option<StoredEntry>> {
        let Some(entry) = self.store.get(key)? else {
            return Ok(None);
        };

        let cleaned = clean_fields(&entry.fields);
        if cleaned.len() == entry.fields.len() {
            return Ok(Some(entry));
        }

        let stripped = entry.fields.len() - cleaned.len();
        let healed = StoredEntry {
            fields: cleaned,
            ..entry
        };

        match self.store.save(key, &healed) {
            Ok(()) => warn!(key, stripped, "removed security fields from stored entry"),
            Err(e) => warn!(key, stripped, error = %e, "could not rewrite cleaned entry"),
        }

        Ok(Some(healed))
    }
}
