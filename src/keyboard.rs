//! Keystroke delivery over a HID keyboard emulation link.
//!
//! The BLE HID link acknowledges nothing and drops reports under radio
//! contention. [`KeystrokeChannel`] reduces the loss with explicit press and
//! release per character, doubled pacing, and release-all barriers, and it
//! stops typing as soon as the host goes away. Delivery remains best effort:
//! nothing is retried and a connection check can be stale by the time the
//! next report goes out.

use log::{debug, info, warn};

use crate::clock::Clock;
use crate::config::TypingTiming;
use crate::types::ScannerError;

/// Key code of the Return key in the HID keyboard backend
pub const KEY_RETURN: u8 = 0xB0;

/// Keyboard emulation backend paired with the host.
///
/// Whole-string helpers of the underlying stack are not exposed;
/// everything goes through the paced per-key path.
pub trait HidKeyboard {
    /// Error type for keyboard operations
    type Error: std::fmt::Debug;

    /// Whether a host is currently connected
    fn is_connected(&self) -> bool;

    /// Send a key-down report
    fn press(&mut self, key: u8) -> Result<(), Self::Error>;

    /// Send a key-up report
    fn release(&mut self, key: u8) -> Result<(), Self::Error>;

    /// Send an empty report, releasing every key
    fn release_all(&mut self) -> Result<(), Self::Error>;
}

/// Result of a typing attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeOutcome {
    /// Every key was sent
    Completed,
    /// The host disconnected; `sent` keys went out before the abort
    Aborted { sent: usize },
}

impl TypeOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TypeOutcome::Completed)
    }
}

/// Change of the host connection seen by [`KeystrokeChannel::poll_link`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    Unchanged,
    Connected,
    Disconnected,
}

pub struct KeystrokeChannel<K: HidKeyboard, C: Clock> {
    keyboard: K,
    clock: C,
    timing: TypingTiming,
    was_connected: bool,
    ready_at_ms: Option<u64>,
}

impl<K: HidKeyboard, C: Clock> KeystrokeChannel<K, C> {
    pub fn new(keyboard: K, clock: C, timing: TypingTiming) -> Self {
        Self {
            keyboard,
            clock,
            timing,
            was_connected: false,
            ready_at_ms: None,
        }
    }

    pub fn keyboard(&self) -> &K {
        &self.keyboard
    }

    pub fn keyboard_mut(&mut self) -> &mut K {
        &mut self.keyboard
    }

    pub fn timing(&self) -> &TypingTiming {
        &self.timing
    }

    /// Track connect and disconnect edges.
    ///
    /// A fresh connection opens a stabilization window during which
    /// [`is_ready`](Self::is_ready) stays false; both edges force a
    /// release-all so no key is left held on the host. A failed release is
    /// logged and the edge is still reported.
    pub fn poll_link(&mut self, now_ms: u64) -> LinkEvent {
        let connected = self.keyboard.is_connected();

        let event = match (self.was_connected, connected) {
            (false, true) => {
                info!("Host connected, link usable in {} ms", self.timing.link_stabilization_ms);
                self.was_connected = true;
                self.ready_at_ms = Some(now_ms + self.timing.link_stabilization_ms);
                LinkEvent::Connected
            }
            (true, false) => {
                info!("Host disconnected");
                self.was_connected = false;
                self.ready_at_ms = None;
                LinkEvent::Disconnected
            }
            _ => return LinkEvent::Unchanged,
        };

        if let Err(e) = self.release_all() {
            warn!("Release-all on {:?} failed: {}", event, e);
        }
        event
    }

    /// Connected and past the stabilization window
    pub fn is_ready(&self, now_ms: u64) -> bool {
        self.was_connected
            && self.keyboard.is_connected()
            && self.ready_at_ms.is_some_and(|at| now_ms >= at)
    }

    /// Type `bytes` one key at a time.
    ///
    /// Each key is pressed, held for `char_delay_ms`, released, and followed
    /// by another `char_delay_ms`. The connection is checked before every
    /// key; on loss the rest is dropped after a release-all.
    pub fn type_reliably(&mut self, bytes: &[u8], char_delay_ms: u64) -> Result<TypeOutcome, ScannerError> {
        self.barrier()?;

        for (sent, &key) in bytes.iter().enumerate() {
            if !self.keyboard.is_connected() {
                warn!("Connection lost during typing after {} of {} keys", sent, bytes.len());
                self.release_all()?;
                return Ok(TypeOutcome::Aborted { sent });
            }

            self.press(key)?;
            self.clock.delay_ms(char_delay_ms);
            self.release(key)?;
            self.clock.delay_ms(char_delay_ms);
        }

        self.barrier()?;
        debug!("Typed {} keys", bytes.len());
        Ok(TypeOutcome::Completed)
    }

    /// Send a single Return keystroke, with settle time on both sides
    pub fn press_enter(&mut self) -> Result<TypeOutcome, ScannerError> {
        if !self.keyboard.is_connected() {
            return Ok(TypeOutcome::Aborted { sent: 0 });
        }

        self.clock.delay_ms(self.timing.barrier_settle_ms);
        self.press(KEY_RETURN)?;
        self.clock.delay_ms(self.timing.enter_hold_ms);
        self.release(KEY_RETURN)?;
        self.clock.delay_ms(self.timing.enter_hold_ms);
        self.release_all()?;
        self.clock.delay_ms(self.timing.enter_settle_ms);
        Ok(TypeOutcome::Completed)
    }

    /// Type `bytes` then Return with the configured pacing
    pub fn send_line(&mut self, bytes: &[u8]) -> Result<TypeOutcome, ScannerError> {
        match self.type_reliably(bytes, self.timing.char_delay_ms)? {
            TypeOutcome::Completed => self.press_enter().map(|outcome| match outcome {
                TypeOutcome::Completed => TypeOutcome::Completed,
                TypeOutcome::Aborted { .. } => TypeOutcome::Aborted { sent: bytes.len() },
            }),
            aborted => Ok(aborted),
        }
    }

    fn barrier(&mut self) -> Result<(), ScannerError> {
        self.release_all()?;
        self.clock.delay_ms(self.timing.barrier_settle_ms);
        Ok(())
    }

    fn press(&mut self, key: u8) -> Result<(), ScannerError> {
        let result = self.keyboard.press(key);
        self.unstick_on_error(result)
    }

    fn release(&mut self, key: u8) -> Result<(), ScannerError> {
        let result = self.keyboard.release(key);
        self.unstick_on_error(result)
    }

    fn release_all(&mut self) -> Result<(), ScannerError> {
        self.keyboard
            .release_all()
            .map_err(|e| ScannerError::Keyboard(format!("{:?}", e)))
    }

    /// A failed key report may leave a key held; try one release-all before
    /// passing the error on.
    fn unstick_on_error(&mut self, result: Result<(), K::Error>) -> Result<(), ScannerError> {
        result.map_err(|e| {
            if let Err(release_err) = self.keyboard.release_all() {
                warn!("Release-all after keyboard error failed: {:?}", release_err);
            }
            ScannerError::Keyboard(format!("{:?}", e))
        })
    }
}
