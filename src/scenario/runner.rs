use std::time::{Duration, Instant};

use crate::error::{RecallError, Result};
use crate::form::form_model::{FieldKind, FormElement};
use crate::page::controller::PageController;
use crate::persist::restore::RestoreOutcome;
use crate::scenario::scenario_model::{Scenario, ScenarioResult, ScenarioStep, StepSave};
use crate::storage::store::FormStore;
use crate::trace::logger::TraceLogger;
use crate::tracker::prompt::{PromptSignal, RecordingPrompt};
use crate::tracker::tracker_model::TrackerTimings;

/// Plays a [`Scenario`] against a [`PageController`] on a virtual clock.
pub struct ScenarioRunner;

impl ScenarioRunner {
    /// Run every step; the store is handed back so callers can inspect it.
    pub fn run<S: FormStore>(
        scenario: &Scenario,
        store: S,
        timings: TrackerTimings,
        tracer: TraceLogger,
    ) -> Result<(ScenarioResult, S)> {
        let mut controller =
            PageController::with_timings(scenario.page.clone(), store, RecordingPrompt::new(), timings)?
                .with_tracer(tracer);

        let mut now = Instant::now();
        let mut saves = Vec::new();
        let mut restored_fields = 0;
        let mut steps_run = 0;
        let mut error = None;

        for (i, step) in scenario.steps.iter().enumerate() {
            steps_run = i + 1;
            match Self::execute_step(step, i, &mut controller, &mut now, &mut saves) {
                Ok(restored) => restored_fields += restored,
                Err(e) => {
                    error = Some(format!("Step {} failed: {}", i, e));
                    break;
                }
            }
        }

        let (_, tracker, store) = controller.into_parts();
        let result = ScenarioResult {
            scenario_name: scenario.name.clone(),
            steps_run,
            final_state: format!("{:?}", tracker.state),
            offer: tracker.offer(),
            trace: tracker.tracer().tally(),
            prompt_calls: tracker.into_prompt().calls,
            saves,
            restored_fields,
            error,
        };
        Ok((result, store))
    }

    /// Returns the number of fields restored by the step.
    fn execute_step<S: FormStore>(
        step: &ScenarioStep,
        step_index: usize,
        controller: &mut PageController<S, RecordingPrompt>,
        now: &mut Instant,
        saves: &mut Vec<StepSave>,
    ) -> Result<usize> {
        match step {
            ScenarioStep::Input {
                form,
                field,
                value,
                checked,
            } => {
                set_field(controller.form_mut(*form)?, field, value.as_deref(), *checked)?;
                controller.on_input(*form, *now)?;
            }
            ScenarioStep::Submit { form } => controller.on_submit(*form, *now)?,
            ScenarioStep::Wait { duration_ms } => {
                *now += Duration::from_millis(*duration_ms);
            }
            ScenarioStep::Save => {
                let form_index = controller.tracker().prompt().visible;
                let signal = PromptSignal::SaveForm {
                    form_index: form_index.unwrap_or_default(),
                };
                match controller.on_signal(signal, *now) {
                    Ok(Some(outcome)) => {
                        saves.push(StepSave::from_outcome(step_index, form_index, &outcome))
                    }
                    Ok(None) => {}
                    Err(e) => saves.push(StepSave {
                        step_index,
                        form_index,
                        saved_fields: None,
                        error: Some(e.to_string()),
                    }),
                }
            }
            ScenarioStep::Dismiss => {
                controller.on_signal(PromptSignal::Dismiss, *now)?;
            }
            ScenarioStep::Close => {
                controller.on_signal(PromptSignal::Close, *now)?;
            }
            ScenarioStep::FormsChanged { forms } => controller.on_forms_changed(forms.clone()),
            ScenarioStep::Restore => {
                let (reports, _) = controller.restore();
                let restored = reports
                    .iter()
                    .map(|r| match r.outcome {
                        RestoreOutcome::Restored { applied } => applied,
                        _ => 0,
                    })
                    .sum();
                controller.poll(*now);
                return Ok(restored);
            }
        }

        controller.poll(*now);
        Ok(0)
    }
}

/// Reflect a user edit into the snapshot the way the browser would.
fn set_field(
    form: &mut FormElement,
    field: &str,
    value: Option<&str>,
    checked: Option<bool>,
) -> Result<()> {
    let positions: Vec<usize> = (0..form.fields.len())
        .filter(|&p| form.fields[p].resolved_name(p) == field)
        .collect();

    if positions.is_empty() {
        return Err(RecallError::UnknownField(field.to_string()));
    }

    for p in positions {
        let el = &mut form.fields[p];
        match el.kind() {
            FieldKind::Radio => el.checked = value.is_some_and(|v| v == el.value),
            FieldKind::Checkbox => el.checked = checked.unwrap_or(!el.checked),
            _ => {
                if let Some(v) = value {
                    el.value = v.to_string();
                }
            }
        }
    }
    Ok(())
}
