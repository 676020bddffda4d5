use std::io::Write;

use embassy_time::Duration;
use log::{debug, info, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

use telenode_common::at::uart::Line;
use telenode_common::config::DIGITAL_INPUTS;
use telenode_common::error::Error;
use telenode_common::hw::{AdcChannel, NodeHw};
use telenode_common::ring_buffer::Push;
use telenode_common::scheduler::Shared;

/// Longest time a write to the modem may take.
const WRITE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(1);
/// Time the modem needs after its wake-up line is raised.
const MODEM_WAKE_DELAY: std::time::Duration = std::time::Duration::from_millis(100);

/// Levels the bench reports instead of real analog and digital inputs.
#[derive(Clone, Copy, Debug, Default)]
pub struct Inputs {
    /// Raw samples of the battery, device and reference channels.
    pub adc: [u16; 3],
    /// Bit `i` drives digital input `i`.
    pub digital: u8,
    pub button_held: bool,
}

/// Node peripherals on a PC: the modem sits behind a serial port and stdout is the debug line.
pub struct SerialNodeHw {
    modem: WriteHalf<SerialStream>,
    inputs: Inputs,
    shared: &'static Shared,
    led: bool,
}

impl SerialNodeHw {
    /// Opens the modem port, returning the peripherals and the receiving half of the port.
    pub fn open(
        port: &str,
        baud_rate: u32,
        inputs: Inputs,
        shared: &'static Shared,
    ) -> crate::Result<(Self, ReadHalf<SerialStream>)> {
        let serial = tokio_serial::new(port, baud_rate)
            .open_native_async()
            .map_err(|_| crate::error::Error::ConnectionError)?;
        let (rx, tx) = tokio::io::split(serial);
        let hw = Self {
            modem: tx,
            inputs,
            shared,
            led: false,
        };
        Ok((hw, rx))
    }
}

impl NodeHw for SerialNodeHw {
    async fn transmit(&mut self, line: Line, bytes: &[u8]) -> telenode_common::Result<()> {
        match line {
            Line::Modem => {
                let write = async {
                    self.modem.write_all(bytes).await?;
                    self.modem.flush().await
                };
                tokio::time::timeout(WRITE_TIMEOUT, write)
                    .await
                    .map_err(|_| Error::TimeoutError)?
                    .map_err(|_| Error::UartWriteError)
            }
            Line::Debug => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(bytes).map_err(|_| Error::UartWriteError)?;
                stdout.flush().map_err(|_| Error::UartWriteError)
            }
        }
    }

    async fn wake_modem(&mut self) {
        tokio::time::sleep(MODEM_WAKE_DELAY).await;
    }

    fn adc_sample(&self, channel: AdcChannel) -> u16 {
        self.inputs.adc[channel as usize]
    }

    fn digital_input(&self, channel: usize) -> bool {
        channel < DIGITAL_INPUTS && self.inputs.digital & (1 << channel) != 0
    }

    fn user_button_held(&self) -> bool {
        self.inputs.button_held
    }

    fn toggle_status_led(&mut self) {
        self.led = !self.led;
        debug!("LED {}", if self.led { "on" } else { "off" });
    }

    /// Sleeps, then behaves like a freshly reset board and starts a conversion.
    async fn enter_low_power_sleep(&mut self, wake_after: Duration) {
        info!("Sleeping for {} s", wake_after.as_secs());
        tokio::time::sleep(std::time::Duration::from_micros(wake_after.as_micros())).await;
        self.shared.on_conversion_done();
    }
}

/// Feeds the modem receive interrupt with everything arriving on `rx`, until the port closes.
pub async fn forward_modem_rx(
    mut rx: ReadHalf<SerialStream>,
    shared: &'static Shared,
) -> crate::Result<()> {
    let mut buf = [0u8; 64];
    loop {
        let len = rx.read(&mut buf).await.map_err(|_| crate::error::Error::IoError)?;
        if len == 0 {
            return Err(crate::error::Error::ConnectionError);
        }
        for byte in &buf[..len] {
            if shared.on_modem_byte(*byte) == Push::Dropped {
                warn!("Modem buffer full, dropping input");
            }
        }
    }
}
