use serde::Serialize;

/// The visual save suggestion. Rendering and button wiring live on the host
/// side; the tracker only drives it through these calls.
pub trait PromptWidget {
    fn show(&mut self, form_index: usize);
    fn show_saving(&mut self) {}
    fn show_success(&mut self);
    fn show_error(&mut self);
    /// Back to the retry-ready control after an error.
    fn reset(&mut self);
    fn hide(&mut self);
    /// Whether a prompt instance currently exists in the document.
    fn is_visible(&self) -> bool;
}

/// Signals the widget sends back to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "signal", rename_all = "kebab-case")]
pub enum PromptSignal {
    SaveForm {
        #[serde(rename = "formIndex")]
        form_index: usize,
    },
    Dismiss,
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptCall {
    Show(usize),
    Saving,
    Success,
    Error,
    Reset,
    Hide,
}

/// In-memory widget that records every call; used by the scenario replay
/// and by tests.
#[derive(Debug, Default)]
pub struct RecordingPrompt {
    pub visible: Option<usize>,
    pub calls: Vec<PromptCall>,
    /// Highest number of simultaneous prompt instances ever observed.
    pub max_instances: usize,
}

impl RecordingPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, PromptCall::Show(_)))
            .count()
    }
}

impl PromptWidget for RecordingPrompt {
    fn show(&mut self, form_index: usize) {
        let instances = if self.visible.is_some() { 2 } else { 1 };
        self.max_instances = self.max_instances.max(instances);
        self.visible = Some(form_index);
        self.calls.push(PromptCall::Show(form_index));
    }

    fn show_saving(&mut self) {
        self.calls.push(PromptCall::Saving);
    }

    fn show_success(&mut self) {
        self.calls.push(PromptCall::Success);
    }

    fn show_error(&mut self) {
        self.calls.push(PromptCall::Error);
    }

    fn reset(&mut self) {
        self.calls.push(PromptCall::Reset);
    }

    fn hide(&mut self) {
        self.visible = None;
        self.calls.push(PromptCall::Hide);
    }

    fn is_visible(&self) -> bool {
        self.visible.is_some()
    }
}
