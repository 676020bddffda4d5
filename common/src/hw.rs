use core::future::Future;

use embassy_time::Duration;

use crate::at::uart::Line;

/// ADC channels sampled by the conversion pipeline, in conversion order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcChannel {
    /// Battery divider, sampled but not used by the voltage formulas.
    Battery = 0,
    /// The externally powered device.
    Device = 1,
    /// Internal 1.2 V reference.
    Reference = 2,
}

/// Peripherals the node drives from the main loop.
///
/// Interrupt sources are not part of this trait: the board calls the interrupt hooks of
/// [`crate::scheduler::Shared`] and [`crate::scheduler::TickScheduler`] directly.
pub trait NodeHw {
    /// Transmits `bytes` on `line`, returning once they are sent or the transfer timed out.
    fn transmit(&mut self, line: Line, bytes: &[u8]) -> impl Future<Output = crate::Result<()>>;

    /// Raises the wake-up line of the modem and waits until it accepts commands.
    fn wake_modem(&mut self) -> impl Future<Output = ()>;

    /// Latest raw 12-bit sample of `channel`.
    fn adc_sample(&self, channel: AdcChannel) -> u16;

    /// Level of digital input `channel`, `0..DIGITAL_INPUTS`.
    fn digital_input(&self, channel: usize) -> bool;

    /// Whether the user button is held down.
    fn user_button_held(&self) -> bool;

    fn toggle_status_led(&mut self);

    /// Stops execution until the wake-up timer or another wake source fires.
    fn enter_low_power_sleep(&mut self, wake_after: Duration) -> impl Future<Output = ()>;
}
