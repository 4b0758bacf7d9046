//! Top-level scan loop.
//!
//! [`ScanScheduler`] owns every piece of mutable state: the reader driver,
//! the keystroke channel, the debounce record and the broadcast timer. Each
//! [`tick`](ScanScheduler::tick) advances them once; no failure stops the
//! loop, faults are logged and the reader is re-armed.

use log::{debug, info, warn};

use crate::beeper::Beeper;
use crate::clock::Clock;
use crate::config::{OperatingMode, ScannerConfig};
use crate::driver::{ProtocolState, ReaderDriver};
use crate::keyboard::{HidKeyboard, KeystrokeChannel, LinkEvent, TypeOutcome};
use crate::transport::ReaderTransport;
use crate::types::{CardRead, DebounceRecord, ScannerError};

pub struct ScanScheduler<T: ReaderTransport, K: HidKeyboard, C: Clock + Clone> {
    driver: ReaderDriver<T>,
    output: KeystrokeChannel<K, C>,
    clock: C,
    config: ScannerConfig,
    debounce: DebounceRecord,
    beeper: Option<Box<dyn Beeper>>,
    last_broadcast_ms: u64,
    greeting_pending: bool,
    deliveries: usize,
}

impl<T: ReaderTransport, K: HidKeyboard, C: Clock + Clone> ScanScheduler<T, K, C> {
    pub fn new(transport: T, keyboard: K, clock: C, config: ScannerConfig) -> Result<Self, ScannerError> {
        config.validate()?;
        let output = KeystrokeChannel::new(keyboard, clock.clone(), config.typing);

        Ok(Self {
            driver: ReaderDriver::new(transport),
            output,
            clock,
            config,
            debounce: DebounceRecord::new(),
            beeper: None,
            last_broadcast_ms: 0,
            greeting_pending: false,
            deliveries: 0,
        })
    }

    /// Attach a confirmation tone, played at startup and for each card read
    /// while the host link is ready
    pub fn with_beeper(mut self, beeper: impl Beeper + 'static) -> Self {
        self.beeper = Some(Box::new(beeper));
        self
    }

    pub fn state(&self) -> ProtocolState {
        self.driver.state()
    }

    /// Number of identifiers or broadcasts fully typed so far
    pub fn deliveries(&self) -> usize {
        self.deliveries
    }

    pub fn debounce(&self) -> &DebounceRecord {
        &self.debounce
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub fn driver(&self) -> &ReaderDriver<T> {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut ReaderDriver<T> {
        &mut self.driver
    }

    pub fn output(&self) -> &KeystrokeChannel<K, C> {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut KeystrokeChannel<K, C> {
        &mut self.output
    }

    /// Boot confirmation
    pub fn start(&mut self) {
        info!("Scanner started in {:?} mode", self.config.mode);
        self.beep();
    }

    /// Run the loop forever at the configured tick interval
    pub fn run(&mut self) -> ! {
        self.start();
        loop {
            self.tick();
            self.clock.delay_ms(self.config.tick_interval_ms);
        }
    }

    /// Perform one pass of the loop
    pub fn tick(&mut self) {
        let now = self.clock.now_ms();

        match self.output.poll_link(now) {
            LinkEvent::Connected => {
                self.greeting_pending = true;
                self.last_broadcast_ms = now;
            }
            LinkEvent::Disconnected => self.greeting_pending = false,
            LinkEvent::Unchanged => {}
        }

        if matches!(self.config.mode, OperatingMode::CardTriggered) {
            self.scan_tick(now);
        } else {
            self.broadcast_tick(now);
        }
    }

    fn scan_tick(&mut self, now: u64) {
        if self.driver.state_age(now) > self.config.watchdog_ms {
            warn!(
                "Reader stuck in {} for {} ms, resetting",
                self.driver.state(),
                self.driver.state_age(now)
            );
            self.driver.reset();
        }

        match self.driver.step(now, &self.debounce, &self.config.driver) {
            Ok(Some(card)) => {
                self.deliver(card);
                self.driver.delivery_finished(self.clock.now_ms());
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Reader fault in {}: {}", self.driver.state(), e);
                self.driver.reset();
            }
        }
    }

    fn deliver(&mut self, card: CardRead) {
        let now = self.clock.now_ms();
        if !self.output.is_ready(now) {
            debug!("Host link not ready, dropping card {}", card.uid);
            return;
        }

        self.beep();

        if card.identifier.is_empty() {
            debug!("Card {} has no printable data, sending terminator only", card.uid);
        }

        match self.output.send_line(card.identifier.as_bytes()) {
            Ok(TypeOutcome::Completed) => {
                self.debounce.record_delivery(card.uid, self.clock.now_ms());
                self.deliveries += 1;
                info!("Delivered {:?} from card {}", card.identifier.as_str(), card.uid);
            }
            Ok(TypeOutcome::Aborted { sent }) => {
                warn!("Delivery of card {} aborted after {} keys", card.uid, sent);
            }
            Err(e) => warn!("Delivery of card {} failed: {}", card.uid, e),
        }
    }

    fn broadcast_tick(&mut self, now: u64) {
        let OperatingMode::IntervalBroadcast {
            message,
            interval_ms,
            greeting,
        } = &self.config.mode
        else {
            return;
        };

        if !self.output.is_ready(now) {
            return;
        }

        if self.greeting_pending {
            self.greeting_pending = false;
            if let Some(greeting) = greeting.clone() {
                info!("Sending greeting");
                self.send_text(greeting.as_bytes());
                self.last_broadcast_ms = self.clock.now_ms();
                return;
            }
        }

        if now.saturating_sub(self.last_broadcast_ms) >= *interval_ms {
            let message = message.clone();
            info!("Sending broadcast");
            self.send_text(message.as_bytes());
            self.last_broadcast_ms = now;
        }
    }

    fn send_text(&mut self, text: &[u8]) {
        match self.output.send_line(text) {
            Ok(TypeOutcome::Completed) => self.deliveries += 1,
            Ok(TypeOutcome::Aborted { sent }) => warn!("Broadcast aborted after {} keys", sent),
            Err(e) => warn!("Broadcast failed: {}", e),
        }
    }

    fn beep(&mut self) {
        if !self.config.beep_on_scan {
            return;
        }
        if let Some(beeper) = self.beeper.as_mut() {
            beeper.beep();
        }
    }
}
