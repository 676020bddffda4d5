extern crate std;

use std::string::String;
use std::vec::Vec;

use embassy_time::Duration;

use crate::at::uart::Line;
use crate::config::DIGITAL_INPUTS;
use crate::error::Error;
use crate::hw::{AdcChannel, NodeHw};

/// Peripherals simulated in memory, recording everything the node does with them.
#[derive(Default)]
pub struct FakeHw {
    transmissions: Vec<(Line, String)>,
    adc: [u16; 3],
    inputs: [bool; DIGITAL_INPUTS],
    button_held: bool,
    fail_transmit: bool,
    led_toggles: usize,
    modem_wakes: usize,
    sleeps: Vec<Duration>,
}

impl FakeHw {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_adc(mut self, battery: u16, device: u16, reference: u16) -> Self {
        self.adc = [battery, device, reference];
        self
    }

    pub fn set_adc(&mut self, battery: u16, device: u16, reference: u16) {
        self.adc = [battery, device, reference];
    }

    pub fn set_inputs(&mut self, inputs: [bool; DIGITAL_INPUTS]) {
        self.inputs = inputs;
    }

    pub fn with_inputs(mut self, inputs: [bool; DIGITAL_INPUTS]) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_button_held(mut self, held: bool) -> Self {
        self.button_held = held;
        self
    }

    pub fn set_button_held(&mut self, held: bool) {
        self.button_held = held;
    }

    /// Makes every following transmission fail.
    pub fn set_fail_transmit(&mut self, fail: bool) {
        self.fail_transmit = fail;
    }

    /// Everything sent on `line` so far, in order.
    pub fn sent(&self, line: Line) -> Vec<&str> {
        self.transmissions
            .iter()
            .filter(|(l, _)| *l == line)
            .map(|(_, text)| text.as_str())
            .collect()
    }

    /// Returns and forgets everything sent on the modem line.
    pub fn take_modem_lines(&mut self) -> Vec<String> {
        let (modem, rest): (Vec<_>, Vec<_>) =
            self.transmissions.drain(..).partition(|(l, _)| *l == Line::Modem);
        self.transmissions = rest;
        modem.into_iter().map(|(_, text)| text).collect()
    }

    pub fn led_toggles(&self) -> usize {
        self.led_toggles
    }

    pub fn modem_wakes(&self) -> usize {
        self.modem_wakes
    }

    pub fn sleeps(&self) -> &[Duration] {
        &self.sleeps
    }
}

impl NodeHw for FakeHw {
    async fn transmit(&mut self, line: Line, bytes: &[u8]) -> crate::Result<()> {
        if self.fail_transmit {
            return Err(Error::UartWriteError);
        }
        self.transmissions.push((line, String::from_utf8_lossy(bytes).into_owned()));
        Ok(())
    }

    async fn wake_modem(&mut self) {
        self.modem_wakes += 1;
    }

    fn adc_sample(&self, channel: AdcChannel) -> u16 {
        self.adc[channel as usize]
    }

    fn digital_input(&self, channel: usize) -> bool {
        self.inputs.get(channel).copied().unwrap_or_default()
    }

    fn user_button_held(&self) -> bool {
        self.button_held
    }

    fn toggle_status_led(&mut self) {
        self.led_toggles += 1;
    }

    async fn enter_low_power_sleep(&mut self, wake_after: Duration) {
        self.sleeps.push(wake_after);
    }
}
