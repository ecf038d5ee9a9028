use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEBOUNCE_MS: u64 = 2_000;
pub const AUTO_HIDE_MS: u64 = 10_000;
pub const SUCCESS_FEEDBACK_MS: u64 = 1_000;
pub const ERROR_FEEDBACK_MS: u64 = 2_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Idle,
    /// Unsaved edits, no visible prompt.
    Dirty { form_index: usize },
    /// Prompt visible.
    Offered { form_index: usize, phase: OfferPhase },
}

impl TrackerState {
    pub fn offer(&self) -> SaveOffer {
        match self {
            TrackerState::Idle => SaveOffer::None,
            TrackerState::Dirty { .. } => SaveOffer::Pending,
            TrackerState::Offered { .. } => SaveOffer::Shown,
        }
    }
}

/// Where the visible prompt is in its save round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferPhase {
    Ready,
    Saving,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveOffer {
    Pending,
    Shown,
    None,
}

/// The two timer classes; at most one task of each is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerClass {
    Debounce,
    Prompt,
}

/// What the prompt timer does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptTimer {
    AutoHide,
    SuccessFeedback,
    ErrorReset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerTimings {
    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,
    #[serde(default = "default_auto_hide")]
    pub auto_hide_ms: u64,
    #[serde(default = "default_success")]
    pub success_ms: u64,
    #[serde(default = "default_error")]
    pub error_ms: u64,
}

impl Default for TrackerTimings {
    fn default() -> Self {
        Self {
            debounce_ms: DEBOUNCE_MS,
            auto_hide_ms: AUTO_HIDE_MS,
            success_ms: SUCCESS_FEEDBACK_MS,
            error_ms: ERROR_FEEDBACK_MS,
        }
    }
}

impl TrackerTimings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn prompt(&self, timer: PromptTimer) -> Duration {
        Duration::from_millis(match timer {
            PromptTimer::AutoHide => self.auto_hide_ms,
            PromptTimer::SuccessFeedback => self.success_ms,
            PromptTimer::ErrorReset => self.error_ms,
        })
    }
}

fn default_debounce() -> u64 { DEBOUNCE_MS }
fn default_auto_hide() -> u64 { AUTO_HIDE_MS }
fn default_success() -> u64 { SUCCESS_FEEDBACK_MS }
fn default_error() -> u64 { ERROR_FEEDBACK_MS }

/// How a visible prompt was closed by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Dismissed,
    Closed,
}

/// Decides whether a form may be offered for saving.
pub trait OfferGate {
    fn is_eligible(&self, form_index: usize) -> bool;
}

impl<F: Fn(usize) -> bool> OfferGate for F {
    fn is_eligible(&self, form_index: usize) -> bool {
        self(form_index)
    }
}
