//! Per-pin exclusive lock table.
//!
//! The table decides, for every inbound message, whether the pin is written
//! and whether a REPLY goes back. It owns no I/O, so the lock service applies
//! the returned [`LockOutcome`].
//!
//! # Transitions
//!
//! | type | pin state | write | lock | reply |
//! |------|-----------|-------|------|-------|
//! | WRITE | any | yes | unchanged | yes |
//! | EXCLUSIVE_WRITE | free | yes | acquired by sender | yes |
//! | EXCLUSIVE_WRITE | held, opposite value | yes | released | yes |
//! | EXCLUSIVE_WRITE | held, other value | no | unchanged | no |
//! | REPLY | any | no | unchanged | yes |
//!
//! Release does not compare device ids: whoever sends the opposite value
//! frees the pin.

use std::collections::HashMap;

use tollgate_core::{Pin, PinValue};
use tollgate_protocol::{Message, MessageType};

/// Holder of a locked pin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinLock {
    pub device_id: String,
    pub value: PinValue,
}

/// What the lock service must do in response to one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockOutcome {
    /// Pin write to perform, if any
    pub write: Option<(Pin, PinValue)>,

    /// Reply to send on the originating connection, if any
    pub reply: Option<Message>,
}

impl LockOutcome {
    fn write_and_reply(message: &Message) -> Self {
        Self {
            write: Some((message.pin(), message.value())),
            reply: Some(message.reply()),
        }
    }

    fn ignored() -> Self {
        Self {
            write: None,
            reply: None,
        }
    }

    /// True when the message had no effect and gets no reply.
    pub fn is_ignored(&self) -> bool {
        self.write.is_none() && self.reply.is_none()
    }
}

/// Pin lock table of one lock service.
#[derive(Debug, Default)]
pub struct PinLockTable {
    locks: HashMap<Pin, PinLock>,
}

impl PinLockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one message to the table.
    ///
    /// # Example
    ///
    /// ```
    /// use tollgate_network::PinLockTable;
    /// use tollgate_protocol::Message;
    ///
    /// let mut table = PinLockTable::new();
    ///
    /// let acquire: Message = "dev1:4:18:1".parse().unwrap();
    /// assert!(table.apply(&acquire).reply.is_some());
    ///
    /// let repeat: Message = "dev2:4:18:1".parse().unwrap();
    /// assert!(table.apply(&repeat).is_ignored());
    ///
    /// let release: Message = "dev3:4:18:0".parse().unwrap();
    /// assert!(table.apply(&release).reply.is_some());
    /// assert!(table.is_empty());
    /// ```
    pub fn apply(&mut self, message: &Message) -> LockOutcome {
        match message.message_type() {
            MessageType::Write => LockOutcome::write_and_reply(message),
            MessageType::Reply => LockOutcome {
                write: None,
                reply: Some(message.reply()),
            },
            MessageType::ExclusiveWrite => self.apply_exclusive(message),
        }
    }

    fn apply_exclusive(&mut self, message: &Message) -> LockOutcome {
        let pin = message.pin();
        let value = message.value();

        match self.locks.get(&pin) {
            None => {
                self.locks.insert(
                    pin,
                    PinLock {
                        device_id: message.device_id().to_string(),
                        value,
                    },
                );
                LockOutcome::write_and_reply(message)
            }
            Some(lock) if lock.value.is_opposite_of(value) => {
                self.locks.remove(&pin);
                LockOutcome::write_and_reply(message)
            }
            Some(_) => LockOutcome::ignored(),
        }
    }

    /// Current holder of `pin`.
    pub fn holder(&self, pin: Pin) -> Option<&PinLock> {
        self.locks.get(&pin)
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
