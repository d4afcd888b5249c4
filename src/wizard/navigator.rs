use serde::Serialize;
use tracing::debug;

use crate::models::PropertyDraft;
use crate::store::DraftStore;
use crate::wizard::validation::is_step_valid;
use crate::wizard::WizardStep;

/// Display state of a step relative to the active one.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Current,
    Completed,
    Invalid,
    Upcoming,
}

/// Progress indicator position; paired steps report the same ordinal.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Progress {
    pub ordinal: usize,
    pub total: usize,
}

/// Guarded transition: backwards or in place always, forward only to the
/// immediate next step and only when `from` is valid.
pub fn can_transition(from: WizardStep, to: WizardStep, draft: &PropertyDraft) -> bool {
    if to.index() <= from.index() {
        return true;
    }
    to.index() == from.index() + 1 && is_step_valid(from, draft)
}

pub fn step_status(step: WizardStep, current: WizardStep, draft: &PropertyDraft) -> StepStatus {
    use std::cmp::Ordering;

    match step.index().cmp(&current.index()) {
        Ordering::Equal => StepStatus::Current,
        Ordering::Less if is_step_valid(step, draft) => StepStatus::Completed,
        Ordering::Less => StepStatus::Invalid,
        Ordering::Greater => StepStatus::Upcoming,
    }
}

pub fn progress(current: WizardStep) -> Progress {
    Progress {
        ordinal: current.display_ordinal(),
        total: WizardStep::display_total(),
    }
}

/// Jumps to `target` when [`can_transition`] allows it. Returns whether the
/// active step changed.
pub fn set_current_step(store: &mut DraftStore, target: WizardStep) -> bool {
    let current = store.current_step();
    if !can_transition(current, target, store.draft()) {
        debug!(from = ?current, to = ?target, "Step transition rejected");
        return false;
    }
    store.set_current_step(target)
}

/// Advances one step; no-op on the last step or while the current step is invalid.
pub fn go_to_next_step(store: &mut DraftStore) -> bool {
    match store.current_step().next() {
        Some(next) => set_current_step(store, next),
        None => false,
    }
}

/// Moves back one step; no-op on the first step.
pub fn go_to_previous_step(store: &mut DraftStore) -> bool {
    match store.current_step().previous() {
        Some(previous) => set_current_step(store, previous),
        None => false,
    }
}
