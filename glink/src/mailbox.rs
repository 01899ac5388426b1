//! Cross-context message queue.
//!
//! A mailbox is a fixed-capacity byte queue used to hand work from interrupt
//! context (or another task) to a cooperative task. Mailboxes come from a
//! small pool and carry a wake callback which is invoked on every successful
//! send, and again after a read that leaves messages behind, so a consumer
//! that handles one message per wake keeps draining.
//!
//! The queue is single-producer/single-consumer by caller discipline: there
//! is no internal atomicity beyond what the surrounding critical section
//! provides.

/// Capacity of one mailbox, in messages.
pub const MAILBOX_DEPTH: usize = 16;
/// Number of mailboxes in the pool.
pub const MAILBOX_POOL_SIZE: usize = 5;

/// Wake callback attached to a mailbox.
///
/// `wake` may run in interrupt context; implementations must restrict
/// themselves to work that is safe there, typically setting a flag that the
/// cooperative scheduler checks.
pub trait TaskWake: Sync {
    fn wake(&self);
}

/// Handle to an allocated mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MailboxId(u8);

/// Error from [`MailboxPool::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    /// The handle does not name an allocated mailbox.
    BadHandle,
    /// The mailbox is full; the message was dropped.
    Full,
}

#[derive(Clone, Copy)]
struct Mailbox {
    msgs: [u8; MAILBOX_DEPTH],
    put_at: u8,
    get_at: u8,
    used: u8,
    allocated: bool,
    wake: Option<&'static dyn TaskWake>,
}

impl Mailbox {
    const IDLE: Mailbox = Mailbox {
        msgs: [0u8; MAILBOX_DEPTH],
        put_at: 0,
        get_at: 0,
        used: 0,
        allocated: false,
        wake: None,
    };

    fn wake_task(&self) {
        if let Some(wake) = self.wake {
            wake.wake();
        }
    }
}

/// Fixed pool of mailboxes, allocated by linear scan.
pub struct MailboxPool {
    slots: [Mailbox; MAILBOX_POOL_SIZE],
}

impl MailboxPool {
    pub const fn new() -> Self {
        MailboxPool {
            slots: [Mailbox::IDLE; MAILBOX_POOL_SIZE],
        }
    }

    /// Allocates a mailbox, returning `None` when the pool is exhausted.
    pub fn create(&mut self, wake: &'static dyn TaskWake) -> Option<MailboxId> {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if !slot.allocated {
                slot.put_at = 0;
                slot.get_at = 0;
                slot.used = 0;
                slot.allocated = true;
                slot.wake = Some(wake);
                return Some(MailboxId(i as u8));
            }
        }
        None
    }

    /// Returns a mailbox to the pool. Queued messages are discarded.
    pub fn free(&mut self, id: MailboxId) {
        if let Some(slot) = self.slots.get_mut(id.0 as usize) {
            slot.allocated = false;
            slot.wake = None;
        }
    }

    /// Enqueues one message and wakes the consumer.
    ///
    /// The wake callback runs on every successful send, even from interrupt
    /// context. A full mailbox drops the message and does not wake; callers
    /// must tolerate loss under sustained overflow (the task loop recovers
    /// dropped completion events by sweeping, see
    /// [`GheadLink::run_task`](crate::link::GheadLink::run_task)).
    pub fn send(&mut self, id: MailboxId, msg: u8) -> Result<(), SendError> {
        let slot = self
            .slots
            .get_mut(id.0 as usize)
            .filter(|s| s.allocated)
            .ok_or(SendError::BadHandle)?;
        if slot.used as usize >= MAILBOX_DEPTH {
            return Err(SendError::Full);
        }
        slot.msgs[slot.put_at as usize] = msg;
        slot.put_at = (slot.put_at + 1) % MAILBOX_DEPTH as u8;
        slot.used += 1;
        slot.wake_task();
        Ok(())
    }

    /// Dequeues one message, re-waking the consumer if more remain.
    pub fn read(&mut self, id: MailboxId) -> Option<u8> {
        let slot = self.slots.get_mut(id.0 as usize).filter(|s| s.allocated)?;
        if slot.used == 0 {
            return None;
        }
        let msg = slot.msgs[slot.get_at as usize];
        slot.get_at = (slot.get_at + 1) % MAILBOX_DEPTH as u8;
        slot.used -= 1;
        if slot.used > 0 {
            slot.wake_task();
        }
        Some(msg)
    }
}
