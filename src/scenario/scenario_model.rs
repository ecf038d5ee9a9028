use serde::{Deserialize, Serialize};

use crate::form::form_model::{FormElement, PageSnapshot};
use crate::persist::persistence::SaveOutcome;
use crate::trace::logger::TraceTally;
use crate::tracker::prompt::PromptCall;
use crate::tracker::tracker_model::SaveOffer;

/// A scripted page session: a page plus the user events played against it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scenario {
    pub name: String,

    pub page: PageSnapshot,

    pub steps: Vec<ScenarioStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScenarioStep {
    /// Type into (or toggle) a field, then fire its input event
    Input {
        form: usize,
        field: String,
        #[serde(default)]
        value: Option<String>,
        #[serde(default)]
        checked: Option<bool>,
    },

    Submit {
        form: usize,
    },

    /// Let time pass; due timers fire
    Wait {
        duration_ms: u64,
    },

    /// Click the prompt's save button
    Save,

    Dismiss,

    Close,

    /// Dynamic content replaced the page's form set
    FormsChanged {
        forms: Vec<FormElement>,
    },

    /// Run the restore pass over the current forms
    Restore,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepSave {
    pub step_index: usize,
    pub form_index: Option<usize>,
    pub saved_fields: Option<usize>,
    pub error: Option<String>,
}

impl StepSave {
    pub fn from_outcome(step_index: usize, form_index: Option<usize>, outcome: &SaveOutcome) -> Self {
        let saved_fields = match outcome {
            SaveOutcome::Saved { field_count } => Some(*field_count),
            SaveOutcome::Skipped => Some(0),
        };
        Self {
            step_index,
            form_index,
            saved_fields,
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioResult {
    pub scenario_name: String,

    pub steps_run: usize,

    /// `Debug` rendering of the tracker state after the last step
    pub final_state: String,

    pub offer: SaveOffer,

    pub trace: TraceTally,

    pub prompt_calls: Vec<PromptCall>,

    pub saves: Vec<StepSave>,

    pub restored_fields: usize,

    /// Error that stopped the run early
    pub error: Option<String>,
}
