use std::time::Instant;

use serde::Serialize;
use tracing::{error, info};

use crate::error::{RecallError, Result};
use crate::form::form_classifier::is_authentication_form;
use crate::form::form_model::{FormElement, PageLocation, PageSnapshot};
use crate::persist::persistence::{PersistenceCoordinator, SaveOutcome};
use crate::persist::restore::{FieldNotification, RestoreCoordinator, RestoreReport};
use crate::storage::store::FormStore;
use crate::trace::logger::TraceLogger;
use crate::tracker::prompt::{PromptSignal, PromptWidget};
use crate::tracker::tracker::ChangeTracker;
use crate::tracker::tracker_model::TrackerTimings;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BatchSave {
    Saved { field_count: usize },
    Skipped,
    SkippedAuthentication,
    Failed { error: String },
}

/// Owns everything mutable about one page load: the tracked forms, the
/// save-prompt state machine and the store.
pub struct PageController<S: FormStore, P: PromptWidget> {
    location: PageLocation,
    forms: Vec<FormElement>,
    tracker: ChangeTracker<P>,
    persistence: PersistenceCoordinator<S>,
}

impl<S: FormStore, P: PromptWidget> PageController<S, P> {
    pub fn new(page: PageSnapshot, store: S, prompt: P) -> Result<Self> {
        Self::with_timings(page, store, prompt, TrackerTimings::default())
    }

    pub fn with_timings(
        page: PageSnapshot,
        store: S,
        prompt: P,
        timings: TrackerTimings,
    ) -> Result<Self> {
        let location = page.location()?;
        Ok(Self {
            location,
            forms: page.forms,
            tracker: ChangeTracker::with_timings(prompt, timings),
            persistence: PersistenceCoordinator::new(store),
        })
    }

    pub fn with_tracer(mut self, tracer: TraceLogger) -> Self {
        self.tracker = self.tracker.with_tracer(tracer);
        self
    }

    pub fn location(&self) -> &PageLocation {
        &self.location
    }

    pub fn forms(&self) -> &[FormElement] {
        &self.forms
    }

    pub fn tracker(&self) -> &ChangeTracker<P> {
        &self.tracker
    }

    pub fn store(&self) -> &S {
        self.persistence.store()
    }

    pub fn into_parts(self) -> (Vec<FormElement>, ChangeTracker<P>, S) {
        (self.forms, self.tracker, self.persistence.into_store())
    }

    pub fn storage_key(&self, form_index: usize) -> String {
        self.location.record(form_index).storage_key()
    }

    /// Host-side access for reflecting typed values into the snapshot.
    pub fn form_mut(&mut self, form_index: usize) -> Result<&mut FormElement> {
        self.forms
            .get_mut(form_index)
            .ok_or(RecallError::UnknownForm(form_index))
    }

    /// DOM mutation brought new forms; the whole set is replaced.
    pub fn on_forms_changed(&mut self, forms: Vec<FormElement>) {
        info!(previous = self.forms.len(), current = forms.len(), "form set replaced");
        self.forms = forms;
    }

    pub fn on_input(&mut self, form_index: usize, now: Instant) -> Result<()> {
        self.check_index(form_index)?;
        self.tracker.on_input(form_index, now);
        Ok(())
    }

    pub fn on_submit(&mut self, form_index: usize, now: Instant) -> Result<()> {
        self.check_index(form_index)?;
        let forms = &self.forms;
        let gate = |i: usize| forms.get(i).is_some_and(|f| !is_authentication_form(f));
        self.tracker.on_submit(form_index, now, &gate);
        Ok(())
    }

    pub fn poll(&mut self, now: Instant) {
        let forms = &self.forms;
        let gate = |i: usize| forms.get(i).is_some_and(|f| !is_authentication_form(f));
        self.tracker.poll(now, &gate);
    }

    /// Handle a widget signal; a save request writes the offered form.
    ///
    /// A failed write is reported to the prompt before the error is returned.
    pub fn on_signal(&mut self, signal: PromptSignal, now: Instant) -> Result<Option<SaveOutcome>> {
        let Some(form_index) = self.tracker.on_signal(signal) else {
            return Ok(None);
        };

        match self.save_form(form_index) {
            Ok(outcome) => {
                self.tracker.on_save_result(true, now);
                Ok(Some(outcome))
            }
            Err(e) => {
                error!(form_index, error = %e, "save failed");
                self.tracker.on_save_result(false, now);
                Err(e)
            }
        }
    }

    fn save_form(&mut self, form_index: usize) -> Result<SaveOutcome> {
        let key = self.storage_key(form_index);
        let form = self
            .forms
            .get(form_index)
            .ok_or(RecallError::UnknownForm(form_index))?;

        if is_authentication_form(form) {
            return Ok(SaveOutcome::Skipped);
        }
        self.persistence.save(form, &key, &self.location.url)
    }

    /// Save every eligible form right away, independent of the prompt.
    pub fn save_all(&mut self) -> Vec<(usize, BatchSave)> {
        (0..self.forms.len())
            .map(|form_index| {
                let result = if is_authentication_form(&self.forms[form_index]) {
                    BatchSave::SkippedAuthentication
                } else {
                    match self.save_form(form_index) {
                        Ok(SaveOutcome::Saved { field_count }) => BatchSave::Saved { field_count },
                        Ok(SaveOutcome::Skipped) => BatchSave::Skipped,
                        Err(e) => BatchSave::Failed {
                            error: e.to_string(),
                        },
                    }
                };
                (form_index, result)
            })
            .collect()
    }

    pub fn restore(&mut self) -> (Vec<RestoreReport>, Vec<FieldNotification>) {
        RestoreCoordinator::restore_all(&mut self.persistence, &self.location, &mut self.forms)
    }

    fn check_index(&self, form_index: usize) -> Result<()> {
        if form_index < self.forms.len() {
            Ok(())
        } else {
            Err(RecallError::UnknownForm(form_index))
        }
    }
}
