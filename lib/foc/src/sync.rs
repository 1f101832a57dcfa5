//! Double buffered mailbox for handing small `Copy` values between interrupt priorities.
//!
//! A writer fills the slot readers are not looking at and then publishes it by bumping the
//! sequence number, so a high priority reader never waits on a preempted writer. A reader
//! that was itself preempted by a writer notices the sequence change and reads again.

use core::{
    cell::UnsafeCell,
    ptr,
    sync::atomic::{fence, AtomicBool, AtomicUsize, Ordering},
};
use crate::transforms::DQVoltages;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxError {
    /// another context is in the middle of a write
    Busy,
}

pub struct Mailbox<T: Copy> {
    sequence: AtomicUsize,
    writing: AtomicBool,
    slots: [UnsafeCell<T>; 2],
}

impl<T: Copy> Mailbox<T> {
    pub const fn new(initial: T) -> Self {
        Mailbox {
            sequence: AtomicUsize::new(0),
            writing: AtomicBool::new(false),
            slots: [UnsafeCell::new(initial), UnsafeCell::new(initial)],
        }
    }

    pub fn write(&self, value: T) -> Result<(), MailboxError> {
        if self.writing.swap(true, Ordering::Acquire) {
            return Err(MailboxError::Busy);
        }

        let next = self.sequence.load(Ordering::Relaxed).wrapping_add(1);
        // Safety: only the holder of `writing` touches the unpublished slot, and readers only
        // look at the published one.
        unsafe { ptr::write_volatile(self.slots[next & 1].get(), value) };
        self.sequence.store(next, Ordering::Release);

        self.writing.store(false, Ordering::Release);
        Ok(())
    }

    pub fn read(&self) -> T {
        loop {
            let seq = self.sequence.load(Ordering::Acquire);
            // Safety: the published slot is only rewritten two sequence numbers later, which
            // the check below catches.
            let value = unsafe { ptr::read_volatile(self.slots[seq & 1].get()) };
            fence(Ordering::Acquire);
            if seq == self.sequence.load(Ordering::Relaxed) {
                return value;
            }
        }
    }

    /// Number of completed writes, wrapping.
    pub fn sequence(&self) -> usize {
        self.sequence.load(Ordering::Acquire)
    }
}

unsafe impl<T: Copy + Send> Send for Mailbox<T> {}
unsafe impl<T: Copy + Send> Sync for Mailbox<T> {}

/// Sink for torque requests coming out of a control mode.
pub trait TorqueCommand {
    fn set_dq(&self, d: f32, q: f32) -> Result<(), MailboxError>;
}

impl TorqueCommand for Mailbox<DQVoltages> {
    fn set_dq(&self, d: f32, q: f32) -> Result<(), MailboxError> {
        self.write(DQVoltages { d, q })
    }
}
