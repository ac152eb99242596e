//! Per-field last-call-wins guard.
//!
//! Every field validation takes a [`Ticket`] before it starts evaluating.
//! When the evaluation finishes, its result is only written to the error
//! store if the ticket is still current: no newer validation of the same
//! field was issued, and the field was not cleared or reset in between.

use std::collections::HashMap;
use std::sync::Mutex;

/// A claim on the right to write a field's validation outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    prop: String,
    seq: u64,
    epoch: u64,
}

impl Ticket {
    /// Returns the field this ticket was issued for.
    pub fn prop(&self) -> &str {
        &self.prop
    }
}

#[derive(Debug, Default)]
struct GuardState {
    seqs: HashMap<String, u64>,
    epoch: u64,
}

/// Issues and checks per-field [`Ticket`]s.
///
/// A disabled guard considers every ticket current, which restores plain
/// last-write-wins behavior.
#[derive(Debug)]
pub struct SequenceGuard {
    enabled: bool,
    state: Mutex<GuardState>,
}

impl Default for SequenceGuard {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SequenceGuard {
    /// Creates a guard.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            state: Mutex::new(GuardState::default()),
        }
    }

    /// Returns `true` if stale results are discarded.
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Issues a ticket for `prop`, superseding every earlier ticket for it.
    pub fn issue(&self, prop: &str) -> Ticket {
        let mut state = self.lock();
        let seq = state.seqs.entry(prop.to_string()).or_insert(0);
        *seq += 1;
        Ticket {
            prop: prop.to_string(),
            seq: *seq,
            epoch: state.epoch,
        }
    }

    /// Invalidates every outstanding ticket for `prop`.
    pub fn invalidate(&self, prop: &str) {
        let mut state = self.lock();
        *state.seqs.entry(prop.to_string()).or_insert(0) += 1;
    }

    /// Invalidates every outstanding ticket for every field.
    pub fn invalidate_all(&self) {
        self.lock().epoch += 1;
    }

    /// Returns `true` if `ticket` is still the latest for its field.
    pub fn is_current(&self, ticket: &Ticket) -> bool {
        if !self.enabled {
            return true;
        }
        let state = self.lock();
        state.epoch == ticket.epoch && state.seqs.get(&ticket.prop) == Some(&ticket.seq)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GuardState> {
        self.state.lock().expect("sequence guard lock poisoned")
    }
}
