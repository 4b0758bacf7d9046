//! Scanner configuration
//!
//! All durations are in milliseconds. The defaults are the values the reader
//! module and the BLE keyboard link were tuned with.

use crate::types::ScannerError;

/// Timing of the reader protocol state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverTiming {
    /// Wait after arming the search before reading the reader's reply
    pub search_settle_ms: u64,
    /// Re-arm the search when no card was accepted within this window
    pub search_refresh_ms: u64,
    /// Give up on a card whose payload has not arrived within this window
    pub payload_timeout_ms: u64,
    /// Same card is ignored until this long after its last delivery
    pub debounce_cooldown_ms: u64,
    /// Minimum pause between finishing a delivery and re-arming the search
    pub post_delivery_ms: u64,
}

impl Default for DriverTiming {
    fn default() -> Self {
        Self {
            search_settle_ms: 20,
            search_refresh_ms: 800,
            payload_timeout_ms: 300,
            debounce_cooldown_ms: 200,
            post_delivery_ms: 50,
        }
    }
}

/// Pacing of keystrokes over the HID link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypingTiming {
    /// Applied twice per character: after press and after release.
    /// Raise to 20-30 when characters go missing at range.
    pub char_delay_ms: u64,
    /// Settle time after each release-all barrier
    pub barrier_settle_ms: u64,
    /// Time the terminator key is held down, and the gap after its release
    pub enter_hold_ms: u64,
    /// Settle time after the terminator
    pub enter_settle_ms: u64,
    /// Radio link is not trusted for this long after the host connects
    pub link_stabilization_ms: u64,
}

impl Default for TypingTiming {
    fn default() -> Self {
        Self {
            char_delay_ms: 15,
            barrier_settle_ms: 50,
            enter_hold_ms: 50,
            enter_settle_ms: 100,
            link_stabilization_ms: 3000,
        }
    }
}

/// Frequency and length of the confirmation tone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToneConfig {
    pub frequency_hz: u32,
    pub duration_ms: u32,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 2000,
            duration_ms: 100,
        }
    }
}

/// Typed once per connection by [`OperatingMode::broadcast`]
pub const DEFAULT_GREETING: &str = "Hello from the scanner keyboard!";

/// What triggers a keyboard delivery
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OperatingMode {
    /// Type the serial of every card presented to the reader
    #[default]
    CardTriggered,
    /// Ignore the reader and type a fixed message at a fixed interval,
    /// optionally preceded by a greeting once the host connects
    IntervalBroadcast {
        message: String,
        interval_ms: u64,
        greeting: Option<String>,
    },
}

impl OperatingMode {
    /// Broadcast mode with the keep-alive defaults: greet each new
    /// connection, then repeat `message` every 10 s
    pub fn broadcast(message: impl Into<String>) -> Self {
        OperatingMode::IntervalBroadcast {
            message: message.into(),
            interval_ms: 10_000,
            greeting: Some(DEFAULT_GREETING.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerConfig {
    pub mode: OperatingMode,
    /// Pause between scheduler ticks
    pub tick_interval_ms: u64,
    /// Driver is reset when one state lasts longer than this
    pub watchdog_ms: u64,
    pub driver: DriverTiming,
    pub typing: TypingTiming,
    /// Beep once at startup and for each card read while the host is ready
    pub beep_on_scan: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            mode: OperatingMode::default(),
            tick_interval_ms: 10,
            watchdog_ms: 2000,
            driver: DriverTiming::default(),
            typing: TypingTiming::default(),
            beep_on_scan: true,
        }
    }
}

impl ScannerConfig {
    pub fn validate(&self) -> Result<(), ScannerError> {
        if self.tick_interval_ms == 0 {
            return Err(ScannerError::InvalidParameter(
                "Tick interval must be at least 1 ms".into(),
            ));
        }

        if self.typing.char_delay_ms == 0 {
            return Err(ScannerError::InvalidParameter(
                "Character delay must be at least 1 ms".into(),
            ));
        }

        let longest_wait = self
            .driver
            .search_refresh_ms
            .max(self.driver.payload_timeout_ms)
            .max(self.driver.post_delivery_ms);
        if self.watchdog_ms <= longest_wait {
            return Err(ScannerError::InvalidParameter(format!(
                "Watchdog ({} ms) must exceed the longest protocol wait ({} ms)",
                self.watchdog_ms, longest_wait
            )));
        }

        if let OperatingMode::IntervalBroadcast { interval_ms: 0, .. } = self.mode {
            return Err(ScannerError::InvalidParameter(
                "Broadcast interval must be at least 1 ms".into(),
            ));
        }

        Ok(())
    }
}
