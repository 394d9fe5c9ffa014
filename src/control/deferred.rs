//! Deferred pump starts.
//!
//! A pump is never started in the same cycle its valve opens: the start is
//! parked here with a deadline and asserted by the first control cycle at
//! or after that deadline.  Any full stop cancels every pending start, so a
//! pump can no longer come on after the mode that requested it has ended.

use std::time::Duration;

use heapless::Vec;

/// Pumps with a soft-start delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pump {
    Fill,
    Discharge,
}

impl Pump {
    pub const ALL: [Pump; 2] = [Pump::Fill, Pump::Discharge];

    fn slot(self) -> usize {
        match self {
            Self::Fill => 0,
            Self::Discharge => 1,
        }
    }
}

/// One cancellable timer per pump.
#[derive(Debug, Clone)]
pub struct DeferredStarts {
    delay: Duration,
    deadlines: [Option<Duration>; 2],
}

impl DeferredStarts {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadlines: [None; 2],
        }
    }

    /// Arm the start timer for `pump` at `now + delay`.
    ///
    /// Returns `false` (and keeps the original deadline) if a start is
    /// already pending.
    pub fn schedule(&mut self, pump: Pump, now: Duration) -> bool {
        let slot = &mut self.deadlines[pump.slot()];
        if slot.is_some() {
            return false;
        }
        *slot = Some(now + self.delay);
        true
    }

    pub fn is_pending(&self, pump: Pump) -> bool {
        self.deadlines[pump.slot()].is_some()
    }

    /// Drop every pending start.
    pub fn cancel_all(&mut self) {
        self.deadlines = [None; 2];
    }

    /// Remove and return the pumps whose deadline has passed.
    pub fn take_due(&mut self, now: Duration) -> Vec<Pump, 2> {
        Pump::ALL
            .into_iter()
            .filter(|pump| {
                let slot = &mut self.deadlines[pump.slot()];
                slot.take_if(|deadline| now >= *deadline).is_some()
            })
            .collect()
    }

    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }
}
