use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::form::field_classifier::should_exclude_element;
use crate::form::form_classifier::is_authentication_form;
use crate::form::form_model::{FieldKind, FieldMap, FieldValue, FormElement, PageLocation};
use crate::persist::persistence::PersistenceCoordinator;
use crate::storage::store::FormStore;

/// Literal stored for a checkbox that should come back checked.
pub const TRUE_TOKEN: &str = "true";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Input,
    Change,
}

/// A synthetic event dispatched on a field after its value was restored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldNotification {
    pub form_index: usize,
    pub field: String,
    pub event: NotificationKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RestoreOutcome {
    Restored { applied: usize },
    SkippedAuthentication,
    NoData,
    ReadFailed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    pub form_index: usize,
    pub key: String,
    #[serde(flatten)]
    pub outcome: RestoreOutcome,
}

/// Applies stored values back onto the forms of a freshly loaded page.
pub struct RestoreCoordinator;

impl RestoreCoordinator {
    /// Restore every eligible form. A failing form never stops the others.
    pub fn restore_all<S: FormStore>(
        persistence: &mut PersistenceCoordinator<S>,
        location: &PageLocation,
        forms: &mut [FormElement],
    ) -> (Vec<RestoreReport>, Vec<FieldNotification>) {
        let mut reports = Vec::with_capacity(forms.len());
        let mut notifications = Vec::new();

        for (form_index, form) in forms.iter_mut().enumerate() {
            let key = location.record(form_index).storage_key();
            let (outcome, mut applied) = Self::restore_form(persistence, &key, form_index, form);
            notifications.append(&mut applied);
            reports.push(RestoreReport {
                form_index,
                key,
                outcome,
            });
        }

        (reports, notifications)
    }

    pub fn restore_form<S: FormStore>(
        persistence: &mut PersistenceCoordinator<S>,
        key: &str,
        form_index: usize,
        form: &mut FormElement,
    ) -> (RestoreOutcome, Vec<FieldNotification>) {
        if is_authentication_form(form) {
            debug!(key, "authentication form, not restoring");
            return (RestoreOutcome::SkippedAuthentication, vec![]);
        }

        let entry = match persistence.load(key) {
            Ok(Some(entry)) => entry,
            Ok(None) => return (RestoreOutcome::NoData, vec![]),
            Err(e) => {
                warn!(key, error = %e, "could not read stored entry");
                return (
                    RestoreOutcome::ReadFailed {
                        error: e.to_string(),
                    },
                    vec![],
                );
            }
        };

        let notifications = apply(form, form_index, &entry.fields);
        let applied = notifications.len() / 2;
        info!(key, applied, "form restored");
        (RestoreOutcome::Restored { applied }, notifications)
    }
}

/// Write `fields` onto the matching inputs of `form`.
///
/// Inputs missing from the map, file inputs and security fields are left
/// as they are.
pub fn apply(form: &mut FormElement, form_index: usize, fields: &FieldMap) -> Vec<FieldNotification> {
    let mut notifications = Vec::new();
    let mut processed_groups: HashSet<String> = HashSet::new();

    for position in 0..form.fields.len() {
        let el = &form.fields[position];
        let kind = el.kind();
        if kind == FieldKind::File || should_exclude_element(el, position) {
            continue;
        }

        let name = el.resolved_name(position);
        let Some(value) = fields.get(&name) else {
            continue;
        };

        match kind {
            FieldKind::Radio => {
                if !processed_groups.insert(name.clone()) {
                    continue;
                }
                if apply_radio_group(form, &name, &value.as_text()) {
                    notify(&mut notifications, form_index, &name);
                }
            }
            FieldKind::Checkbox => {
                let el = &mut form.fields[position];
                el.checked = match value {
                    FieldValue::Flag(checked) => *checked,
                    FieldValue::Text(text) => *text == el.value || text == TRUE_TOKEN,
                };
                notify(&mut notifications, form_index, &name);
            }
            _ => {
                form.fields[position].value = value.as_text();
                notify(&mut notifications, form_index, &name);
            }
        }
    }

    notifications
}

/// Uncheck every member of the group, then check the one carrying `value`.
/// Excluded members are left as they are.
fn apply_radio_group(form: &mut FormElement, name: &str, value: &str) -> bool {
    let mut matched = false;
    for (position, el) in form.fields.iter_mut().enumerate() {
        if el.kind() != FieldKind::Radio
            || el.resolved_name(position) != name
            || should_exclude_element(el, position)
        {
            continue;
        }
        el.checked = !matched && el.value == value;
        matched |= el.checked;
    }
    matched
}

fn notify(notifications: &mut Vec<FieldNotification>, form_index: usize, field: &str) {
    for event in [NotificationKind::Input, NotificationKind::Change] {
        notifications.push(FieldNotification {
            form_index,
            field: field.to_string(),
            event,
        });
    }
}
