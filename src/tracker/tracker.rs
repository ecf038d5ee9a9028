use std::time::Instant;

use tracing::debug;

use crate::{
    tracker::{
        prompt::{PromptSignal, PromptWidget},
        scheduler::{Due, Scheduler},
        tracker_model::{
            CloseReason, OfferGate, OfferPhase, PromptTimer, SaveOffer, TimerClass, TrackerState,
            TrackerTimings,
        },
    },
    trace::{logger::TraceLogger, trace::TraceEvent},
};

/// Save-prompt state machine for one page load.
///
/// The tracker never touches storage. A save click hands the form index
/// back to the caller, which reports the outcome with
/// [`ChangeTracker::on_save_result`].
pub struct ChangeTracker<P: PromptWidget> {
    pub state: TrackerState,
    pub step: u64,
    timings: TrackerTimings,
    scheduler: Scheduler,
    prompt: P,
    tracer: TraceLogger,
}

impl<P: PromptWidget> ChangeTracker<P> {
    pub fn new(prompt: P) -> Self {
        Self::with_timings(prompt, TrackerTimings::default())
    }

    pub fn with_timings(prompt: P, timings: TrackerTimings) -> Self {
        Self {
            state: TrackerState::Idle,
            step: 0,
            timings,
            scheduler: Scheduler::new(),
            prompt,
            tracer: TraceLogger::disabled(),
        }
    }

    pub fn with_tracer(mut self, tracer: TraceLogger) -> Self {
        self.tracer = tracer;
        self
    }

    pub fn prompt(&self) -> &P {
        &self.prompt
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn timings(&self) -> &TrackerTimings {
        &self.timings
    }

    pub fn tracer(&self) -> &TraceLogger {
        &self.tracer
    }

    pub fn offer(&self) -> SaveOffer {
        self.state.offer()
    }

    pub fn into_prompt(self) -> P {
        self.prompt
    }

    fn trace(&mut self, event: &str) -> TraceEvent {
        let trace = TraceEvent::now(self.step, &self.state, event);
        self.step += 1;
        trace
    }

    // =====================================================================
    // Page events
    // =====================================================================

    /// An input or change event on a tracked field.
    pub fn on_input(&mut self, form_index: usize, now: Instant) {
        let trace = self.trace("input").with_form(form_index);

        match self.state {
            TrackerState::Offered { .. } => {
                self.tracer
                    .log(&trace.with_decision("ignored").with_suppression("prompt_visible"));
            }
            TrackerState::Idle | TrackerState::Dirty { .. } => {
                self.state = TrackerState::Dirty { form_index };
                self.scheduler
                    .schedule_debounce(now, self.timings.debounce(), form_index);
                debug!(form_index, "debounce restarted");
                self.tracer.log(&trace.with_decision("debounce_restarted"));
            }
        }
    }

    pub fn on_submit(&mut self, form_index: usize, now: Instant, gate: &impl OfferGate) {
        let trace = self.trace("submit").with_form(form_index);

        match self.state {
            TrackerState::Dirty { .. } => {
                self.scheduler.cancel(TimerClass::Debounce);
                self.try_offer(form_index, now, gate, trace);
            }
            TrackerState::Idle | TrackerState::Offered { .. } => {
                self.tracer.log(&trace.with_decision("noop"));
            }
        }
    }

    /// Fire every task that is due at `now`, in deadline order.
    pub fn poll(&mut self, now: Instant, gate: &impl OfferGate) {
        while let Some(due) = self.scheduler.take_due(now) {
            match due {
                Due::Debounce { form_index } => self.on_debounce(form_index, now, gate),
                Due::Prompt(timer) => self.on_prompt_timer(timer, now),
            }
        }
    }

    fn on_debounce(&mut self, form_index: usize, now: Instant, gate: &impl OfferGate) {
        let trace = self.trace("debounce_fired").with_form(form_index);

        if matches!(self.state, TrackerState::Dirty { .. }) {
            self.try_offer(form_index, now, gate, trace);
        } else {
            self.tracer.log(&trace.with_decision("stale"));
        }
    }

    fn try_offer(&mut self, form_index: usize, now: Instant, gate: &impl OfferGate, trace: TraceEvent) {
        if !gate.is_eligible(form_index) {
            debug!(form_index, "offer suppressed for authentication form");
            self.tracer.log(
                &trace
                    .with_decision("stay_dirty")
                    .with_suppression("authentication_form"),
            );
            return;
        }

        if self.prompt.is_visible() {
            self.tracer
                .log(&trace.with_decision("dropped").with_suppression("prompt_exists"));
            return;
        }

        self.prompt.show(form_index);
        self.state = TrackerState::Offered {
            form_index,
            phase: OfferPhase::Ready,
        };
        self.scheduler.schedule_prompt(
            now,
            self.timings.prompt(PromptTimer::AutoHide),
            PromptTimer::AutoHide,
        );
        debug!(form_index, "save offered");
        self.tracer.log(&trace.with_decision("offered"));
    }

    fn on_prompt_timer(&mut self, timer: PromptTimer, now: Instant) {
        let trace = self.trace(match timer {
            PromptTimer::AutoHide => "auto_hide",
            PromptTimer::SuccessFeedback => "success_elapsed",
            PromptTimer::ErrorReset => "error_elapsed",
        });

        match (timer, self.state) {
            (PromptTimer::AutoHide, TrackerState::Offered { .. })
            | (PromptTimer::SuccessFeedback, TrackerState::Offered { .. }) => {
                self.resolve();
                self.tracer.log(&trace.with_decision("resolved"));
            }
            (
                PromptTimer::ErrorReset,
                TrackerState::Offered {
                    form_index,
                    phase: OfferPhase::Failed,
                },
            ) => {
                self.prompt.reset();
                self.state = TrackerState::Offered {
                    form_index,
                    phase: OfferPhase::Ready,
                };
                self.scheduler.schedule_prompt(
                    now,
                    self.timings.prompt(PromptTimer::AutoHide),
                    PromptTimer::AutoHide,
                );
                self.tracer.log(&trace.with_decision("retry_ready"));
            }
            _ => self.tracer.log(&trace.with_decision("stale")),
        }
    }

    // =====================================================================
    // Prompt signals
    // =====================================================================

    /// Route a widget signal. Returns the form to save for `save-form`.
    pub fn on_signal(&mut self, signal: PromptSignal) -> Option<usize> {
        match signal {
            PromptSignal::SaveForm { .. } => self.on_save_requested(),
            PromptSignal::Dismiss => {
                self.on_close(CloseReason::Dismissed);
                None
            }
            PromptSignal::Close => {
                self.on_close(CloseReason::Closed);
                None
            }
        }
    }

    /// The save button was clicked. Returns the form index to persist.
    pub fn on_save_requested(&mut self) -> Option<usize> {
        let trace = self.trace("save_clicked");

        match self.state {
            TrackerState::Offered { form_index, phase }
                if matches!(phase, OfferPhase::Ready | OfferPhase::Failed) =>
            {
                self.scheduler.cancel(TimerClass::Prompt);
                self.prompt.show_saving();
                self.state = TrackerState::Offered {
                    form_index,
                    phase: OfferPhase::Saving,
                };
                self.tracer.log(&trace.with_form(form_index).with_decision("saving"));
                Some(form_index)
            }
            _ => {
                self.tracer.log(&trace.with_decision("ignored"));
                None
            }
        }
    }

    /// Outcome of the store write started by [`Self::on_save_requested`].
    pub fn on_save_result(&mut self, saved: bool, now: Instant) {
        let trace = self.trace(if saved { "save_succeeded" } else { "save_failed" });

        match self.state {
            TrackerState::Offered {
                form_index,
                phase: OfferPhase::Saving,
            } => {
                let (phase, timer) = if saved {
                    self.prompt.show_success();
                    (OfferPhase::Succeeded, PromptTimer::SuccessFeedback)
                } else {
                    self.prompt.show_error();
                    (OfferPhase::Failed, PromptTimer::ErrorReset)
                };
                self.state = TrackerState::Offered { form_index, phase };
                self.scheduler
                    .schedule_prompt(now, self.timings.prompt(timer), timer);
                self.tracer.log(&trace.with_form(form_index).with_decision(format!("{:?}", phase)));
            }
            // A late write result after the prompt closed has no UI effect.
            _ => self.tracer.log(&trace.with_decision("no_ui_effect")),
        }
    }

    pub fn on_close(&mut self, reason: CloseReason) {
        let trace = self.trace(match reason {
            CloseReason::Dismissed => "dismiss",
            CloseReason::Closed => "close",
        });

        if matches!(self.state, TrackerState::Offered { .. }) {
            self.resolve();
            self.tracer.log(&trace.with_decision("resolved"));
        } else {
            self.tracer.log(&trace.with_decision("noop"));
        }
    }

    /// Clear the prompt and every timer; unsaved edits are forgotten too.
    fn resolve(&mut self) {
        self.scheduler.cancel_all();
        if self.prompt.is_visible() {
            self.prompt.hide();
        }
        self.state = TrackerState::Idle;
    }
}
