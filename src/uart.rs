//! UART transport for ESP32 using esp-idf-svc

use crate::transport::ReaderTransport;
use esp_idf_svc::hal::delay::{TickType, NON_BLOCK};
use esp_idf_svc::hal::gpio::{self, InputPin, OutputPin};
use esp_idf_svc::hal::peripheral::Peripheral;
use esp_idf_svc::hal::uart::{self, UartDriver};
use std::time::Duration;

/// Reader link on one of the ESP32 hardware UARTs, fixed 8-N-1 framing.
pub struct UartTransport<'a> {
    uart: UartDriver<'a>,
}

impl<'a> UartTransport<'a> {
    pub fn new(
        uart: impl Peripheral<P = impl uart::Uart> + 'a,
        tx: impl Peripheral<P = impl OutputPin> + 'a,
        rx: impl Peripheral<P = impl InputPin> + 'a,
        baud_rate: u32,
    ) -> Result<Self, esp_idf_svc::sys::EspError> {
        let config = uart::config::Config::default()
            .baudrate(baud_rate.into())
            .data_bits(uart::config::DataBits::DataBits8)
            .parity_none()
            .stop_bits(uart::config::StopBits::STOP1);
        let uart = UartDriver::new(
            uart,
            tx,
            rx,
            Option::<gpio::Gpio0>::None,
            Option::<gpio::Gpio0>::None,
            &config,
        )?;

        // Reader modules emit a boot banner; let it arrive before flushing.
        std::thread::sleep(Duration::from_millis(500));
        uart.clear_rx()?;

        Ok(Self { uart })
    }
}

impl ReaderTransport for UartTransport<'_> {
    type Error = esp_idf_svc::sys::EspError;

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        self.uart.write(data)
    }

    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, Self::Error> {
        let ticks = if timeout_ms == 0 {
            NON_BLOCK
        } else {
            TickType::new_millis(timeout_ms as u64).ticks()
        };
        self.uart.read(buf, ticks)
    }

    fn clear_input(&mut self) -> Result<(), Self::Error> {
        self.uart.clear_rx()
    }

    fn bytes_available(&mut self) -> Result<usize, Self::Error> {
        self.uart.remaining_read()
    }
}
