//! Cooperative software-timer pool.
//!
//! A small fixed table of logical timers advanced by a single periodic tick
//! source. Periods are stored pre-multiplied by [`TICKS_PER_UNIT`] so
//! elapsed-tick comparisons use one uniform unit. The scan in
//! [`TimerPool::tick`] is O(N), which is fine for a pool this small; this is
//! deliberately not a heap-based timer wheel.
//!
//! `create`/`start`/`stop`/`reset`/`destroy` may be called from task context
//! while `tick` runs from the periodic interrupt, so mutating calls must be
//! bracketed by the caller's critical section (see
//! [`SharedLink`](crate::link::SharedLink)). `tick` itself runs to
//! completion and must not be re-entered from a callback.

/// Hardware ticks that make up one logical period unit.
pub const TICKS_PER_UNIT: u32 = 10;
/// Number of timer slots in the pool.
pub const TIMER_POOL_SIZE: usize = 5;

/// Timer life cycle.
///
/// `Unused → Stopped → Running`, with `Running → Completed` reserved for
/// one-shot expiry. `stop` returns `Running`/`Completed` to `Stopped`;
/// `destroy` returns any state to `Unused`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Unused,
    Stopped,
    Running,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Periodic,
    OneShot,
}

/// Handle to an allocated timer slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerId(u8);

/// Expiry callback.
///
/// Runs in tick context. Receives the pool itself so it may start, stop,
/// reset or destroy this or other timers, plus the opaque user word given to
/// [`TimerPool::create`] and the shared context threaded through `tick`.
pub type TimerCallback<C> = fn(&mut TimerPool<C>, TimerId, usize, &mut C);

struct TimerSlot<C> {
    elapsed: u32,
    period: u32,
    state: TimerState,
    kind: TimerKind,
    callback: Option<TimerCallback<C>>,
    user: usize,
}

impl<C> TimerSlot<C> {
    fn idle() -> Self {
        TimerSlot {
            elapsed: 0,
            period: 0,
            state: TimerState::Unused,
            kind: TimerKind::Periodic,
            callback: None,
            user: 0,
        }
    }
}

/// Fixed pool of software timers, allocated by linear scan.
pub struct TimerPool<C> {
    slots: [TimerSlot<C>; TIMER_POOL_SIZE],
}

impl<C> TimerPool<C> {
    pub fn new() -> Self {
        TimerPool {
            slots: core::array::from_fn(|_| TimerSlot::idle()),
        }
    }

    /// Allocates a timer in the `Stopped` state.
    ///
    /// `period` is in logical units and must be non-zero; it is stored
    /// pre-multiplied by [`TICKS_PER_UNIT`].
    pub fn create(
        &mut self,
        period: u32,
        kind: TimerKind,
        callback: TimerCallback<C>,
        user: usize,
    ) -> Option<TimerId> {
        if period == 0 {
            return None;
        }
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.state == TimerState::Unused {
                slot.state = TimerState::Stopped;
                slot.kind = kind;
                slot.period = period * TICKS_PER_UNIT;
                slot.elapsed = 0;
                slot.callback = Some(callback);
                slot.user = user;
                return Some(TimerId(i as u8));
            }
        }
        None
    }

    pub fn start(&mut self, id: TimerId) {
        if let Some(slot) = self.slots.get_mut(id.0 as usize) {
            if matches!(slot.state, TimerState::Stopped | TimerState::Completed) {
                slot.state = TimerState::Running;
            }
        }
    }

    pub fn stop(&mut self, id: TimerId) {
        if let Some(slot) = self.slots.get_mut(id.0 as usize) {
            if matches!(slot.state, TimerState::Running | TimerState::Completed) {
                slot.state = TimerState::Stopped;
            }
        }
    }

    /// Reloads the period and restarts the elapsed count.
    ///
    /// Honored only while `Running` or `Completed`; the state itself is not
    /// changed.
    pub fn reset(&mut self, id: TimerId, period: u32) {
        if period == 0 {
            return;
        }
        if let Some(slot) = self.slots.get_mut(id.0 as usize) {
            if matches!(slot.state, TimerState::Running | TimerState::Completed) {
                slot.period = period * TICKS_PER_UNIT;
                slot.elapsed = 0;
            }
        }
    }

    /// Returns the slot to the pool regardless of its current state.
    pub fn destroy(&mut self, id: TimerId) {
        if let Some(slot) = self.slots.get_mut(id.0 as usize) {
            slot.state = TimerState::Unused;
            slot.callback = None;
        }
    }

    pub fn state(&self, id: TimerId) -> TimerState {
        self.slots
            .get(id.0 as usize)
            .map(|s| s.state)
            .unwrap_or(TimerState::Unused)
    }

    /// Advances every running timer by one hardware tick.
    ///
    /// Must be invoked once per base tick from a single source. Expired
    /// one-shots transition to `Completed` before their callback runs, so a
    /// callback observing its own timer sees the final state.
    pub fn tick(&mut self, cx: &mut C) {
        for i in 0..TIMER_POOL_SIZE {
            if self.slots[i].state != TimerState::Running {
                continue;
            }
            self.slots[i].elapsed += 1;
            if self.slots[i].elapsed < self.slots[i].period {
                continue;
            }
            self.slots[i].elapsed = 0;
            if self.slots[i].kind == TimerKind::OneShot {
                self.slots[i].state = TimerState::Completed;
            }
            let user = self.slots[i].user;
            if let Some(callback) = self.slots[i].callback {
                callback(self, TimerId(i as u8), user, cx);
            }
        }
    }
}
