//! Audible scan and boot confirmation

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::warn;

use crate::config::ToneConfig;

/// Fire-and-forget confirmation tone
pub trait Beeper {
    fn beep(&mut self);
}

/// Piezo driven from two GPIOs toggled in antiphase, which doubles the
/// voltage swing across the element compared to a single pin.
pub struct ToneBeeper<A, B, D> {
    pin_a: A,
    pin_b: B,
    delay: D,
    tone: ToneConfig,
}

impl<A: OutputPin, B: OutputPin, D: DelayNs> ToneBeeper<A, B, D> {
    pub fn new(pin_a: A, pin_b: B, delay: D, tone: ToneConfig) -> Self {
        Self {
            pin_a,
            pin_b,
            delay,
            tone,
        }
    }

    fn half_period_us(&self) -> u32 {
        500_000 / self.tone.frequency_hz.max(1)
    }

    fn cycles(&self) -> u32 {
        (self.tone.frequency_hz as u64 * self.tone.duration_ms as u64 / 1000) as u32
    }

    fn play(&mut self) -> Result<(), String> {
        let half_period = self.half_period_us();
        for _ in 0..self.cycles() {
            self.pin_a.set_high().map_err(|e| format!("{:?}", e))?;
            self.pin_b.set_low().map_err(|e| format!("{:?}", e))?;
            self.delay.delay_us(half_period);
            self.pin_a.set_low().map_err(|e| format!("{:?}", e))?;
            self.pin_b.set_high().map_err(|e| format!("{:?}", e))?;
            self.delay.delay_us(half_period);
        }
        // Leave the element unbiased
        self.pin_a.set_low().map_err(|e| format!("{:?}", e))?;
        self.pin_b.set_low().map_err(|e| format!("{:?}", e))?;
        Ok(())
    }
}

impl<A: OutputPin, B: OutputPin, D: DelayNs> Beeper for ToneBeeper<A, B, D> {
    fn beep(&mut self) {
        if let Err(e) = self.play() {
            warn!("Beep failed: {}", e);
        }
    }
}
