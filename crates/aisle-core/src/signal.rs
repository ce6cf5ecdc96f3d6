//! # Edge Trigger
//!
//! The `Modes` channel holds a level, not an event: the hardware writes `1`
//! and the value stays `1` until something else is written. Every
//! subscription callback re-delivers it. [`EdgeTrigger`] turns that level
//! into at most one dispatch per distinct value.
//!
//! ```text
//! channel:   0   1   1   1   2   2   0   2   3   3
//! dispatch:  -   A   -   -   R   -   -   R   X   -
//!                ▲ first 1   ▲ change    ▲ idle re-arms, so 2 fires again
//! ```
//!
//! Idle (`0` or empty) is the switch at rest. Pressing the same button twice
//! shows up as `1, 0, 1` and adds twice; a stuck `1` adds once.

use crate::types::ModeSignal;

/// What the listener should do with a raw channel value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeDecision {
    /// A new command; run it.
    Dispatch(ModeSignal),
    /// Same value as the last one dispatched.
    Repeat,
    /// Empty / zero: the hardware is idle. Re-arms the trigger.
    Idle,
    /// A new value outside 1..=4.
    Unknown(i64),
}

/// Remembers the last value it let through.
#[derive(Debug, Clone, Default)]
pub struct EdgeTrigger {
    last: Option<i64>,
}

impl EdgeTrigger {
    pub fn new() -> Self {
        EdgeTrigger { last: None }
    }

    /// Classifies `value` and records it as the last seen edge.
    ///
    /// The marker moves before the caller acts on the decision, so a value
    /// that was dispatched is never dispatched again even if its handler
    /// fails.
    pub fn observe(&mut self, value: Option<i64>) -> EdgeDecision {
        let value = match value {
            None | Some(0) => {
                self.last = None;
                return EdgeDecision::Idle;
            }
            Some(v) => v,
        };
        if self.last == Some(value) {
            return EdgeDecision::Repeat;
        }
        self.last = Some(value);
        match ModeSignal::from_value(value) {
            Some(signal) => EdgeDecision::Dispatch(signal),
            None => EdgeDecision::Unknown(value),
        }
    }

    /// Adopts `value` as already handled without dispatching it.
    ///
    /// Used at startup so a command left on the channel by a previous run
    /// isn't replayed.
    pub fn prime(&mut self, value: Option<i64>) {
        self.last = value.filter(|v| *v != 0);
    }

    pub fn last(&self) -> Option<i64> {
        self.last
    }
}
