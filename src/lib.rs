//! Proximity card scanner that types card serials into a paired host through
//! a HID keyboard emulation link.
//!
//! The reader module is polled by a non-blocking state machine; the
//! printable part of each card's data block is typed with paced, guarded
//! keystrokes followed by Return.
//!
//! # Features
//!
//! - `uart-esp32` - UART transport for ESP32 using esp-idf-svc
//! - `serial` - Serial port transport for desktop using serialport crate
//!
//! # Example
//!
//! ```ignore
//! use nfc_hid_scanner::{ScanScheduler, ScannerConfig, SerialTransport, SystemClock};
//!
//! let transport = SerialTransport::new("/dev/ttyUSB0", 115200)?;
//! let keyboard = MyBleKeyboard::new("NFC_SCANNER");
//! let mut scanner = ScanScheduler::new(transport, keyboard, SystemClock::new(), ScannerConfig::default())?;
//!
//! scanner.run();
//! ```

mod beeper;
mod clock;
pub mod codec;
mod config;
mod driver;
mod keyboard;
pub mod sanitizer;
mod scheduler;
mod transport;
mod types;

#[cfg(feature = "uart-esp32")]
mod uart;

#[cfg(feature = "serial")]
mod serial;

// Re-exports
pub use beeper::{Beeper, ToneBeeper};
pub use clock::{Clock, SystemClock};
pub use config::{
    DriverTiming, OperatingMode, ScannerConfig, ToneConfig, TypingTiming, DEFAULT_GREETING,
};
pub use driver::{ProtocolState, ReaderDriver};
pub use keyboard::{HidKeyboard, KeystrokeChannel, LinkEvent, TypeOutcome, KEY_RETURN};
pub use scheduler::ScanScheduler;
pub use transport::ReaderTransport;
pub use types::{
    CardRead, CardUid, DebounceRecord, RawPayload, SanitizedIdentifier, ScannerError, PAYLOAD_LEN,
    UID_LEN,
};

#[cfg(feature = "uart-esp32")]
pub use uart::UartTransport;

#[cfg(feature = "serial")]
pub use serial::SerialTransport;
