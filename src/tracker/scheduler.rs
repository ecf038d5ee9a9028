use std::time::{Duration, Instant};

use crate::tracker::tracker_model::{PromptTimer, TimerClass};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTask<T> {
    pub deadline: Instant,
    pub payload: T,
}

/// Cancellable delayed tasks, one slot per timer class.
///
/// Scheduling into an occupied slot replaces the previous task, so a stale
/// callback can never fire against a prompt that no longer exists.
#[derive(Debug, Default)]
pub struct Scheduler {
    debounce: Option<ScheduledTask<usize>>,
    prompt: Option<ScheduledTask<PromptTimer>>,
}

/// A task whose deadline has passed, ready to be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Due {
    Debounce { form_index: usize },
    Prompt(PromptTimer),
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule_debounce(&mut self, now: Instant, delay: Duration, form_index: usize) {
        self.debounce = Some(ScheduledTask {
            deadline: now + delay,
            payload: form_index,
        });
    }

    pub fn schedule_prompt(&mut self, now: Instant, delay: Duration, timer: PromptTimer) {
        self.prompt = Some(ScheduledTask {
            deadline: now + delay,
            payload: timer,
        });
    }

    pub fn cancel(&mut self, class: TimerClass) {
        match class {
            TimerClass::Debounce => self.debounce = None,
            TimerClass::Prompt => self.prompt = None,
        }
    }

    pub fn cancel_all(&mut self) {
        self.debounce = None;
        self.prompt = None;
    }

    pub fn is_scheduled(&self, class: TimerClass) -> bool {
        match class {
            TimerClass::Debounce => self.debounce.is_some(),
            TimerClass::Prompt => self.prompt.is_some(),
        }
    }

    pub fn deadline(&self, class: TimerClass) -> Option<Instant> {
        match class {
            TimerClass::Debounce => self.debounce.map(|t| t.deadline),
            TimerClass::Prompt => self.prompt.map(|t| t.deadline),
        }
    }

    pub fn prompt_timer(&self) -> Option<PromptTimer> {
        self.prompt.map(|t| t.payload)
    }

    /// Earliest deadline of any outstanding task.
    pub fn next_deadline(&self) -> Option<Instant> {
        [
            self.deadline(TimerClass::Debounce),
            self.deadline(TimerClass::Prompt),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Remove and return the earliest task that is due at `now`.
    pub fn take_due(&mut self, now: Instant) -> Option<Due> {
        let debounce_due = self.debounce.filter(|t| t.deadline <= now);
        let prompt_due = self.prompt.filter(|t| t.deadline <= now);

        match (debounce_due, prompt_due) {
            (Some(d), Some(p)) if p.deadline < d.deadline => {
                self.prompt = None;
                Some(Due::Prompt(p.payload))
            }
            (Some(d), _) => {
                self.debounce = None;
                Some(Due::Debounce {
                    form_index: d.payload,
                })
            }
            (None, Some(p)) => {
                self.prompt = None;
                Some(Due::Prompt(p.payload))
            }
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rescheduling_replaces_the_previous_task() {
        let start = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.schedule_debounce(start, Duration::from_millis(2000), 0);
        scheduler.schedule_debounce(start + Duration::from_millis(500), Duration::from_millis(2000), 1);

        assert_eq!(scheduler.take_due(start + Duration::from_millis(2100)), None);
        assert_eq!(
            scheduler.take_due(start + Duration::from_millis(2500)),
            Some(Due::Debounce { form_index: 1 })
        );
        assert_eq!(scheduler.take_due(start + Duration::from_millis(9000)), None);
    }

    #[test]
    fn earliest_due_task_comes_first() {
        let start = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.schedule_debounce(start, Duration::from_millis(300), 2);
        scheduler.schedule_prompt(start, Duration::from_millis(100), PromptTimer::AutoHide);

        let later = start + Duration::from_millis(400);
        assert_eq!(scheduler.take_due(later), Some(Due::Prompt(PromptTimer::AutoHide)));
        assert_eq!(scheduler.take_due(later), Some(Due::Debounce { form_index: 2 }));
        assert_eq!(scheduler.next_deadline(), None);
    }
}
