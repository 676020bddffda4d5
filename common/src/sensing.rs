use crate::config::DIGITAL_INPUTS;
use crate::hw::{AdcChannel, NodeHw};
use crate::store::SensingRecord;

/// Full scale of the 12-bit ADC.
const ADC_FULL_SCALE: u32 = 4096;
/// Nominal voltage of the internal reference.
const REFERENCE_VOLTS: f32 = 1.2;

/// Supply voltage derived from the internal reference sample.
pub fn battery_voltage(raw_reference: u16) -> f32 {
    REFERENCE_VOLTS * ADC_FULL_SCALE as f32 / f32::from(raw_reference)
}

/// Device voltage, scaled by the reference sample in integer arithmetic.
pub fn device_voltage(raw_device: u16, raw_reference: u16) -> f32 {
    (u32::from(raw_device) * u32::from(raw_reference) / ADC_FULL_SCALE) as f32
}

/// Packs the digital inputs into a bitmask, input `i` into bit `i`.
pub fn digital_inputs(hw: &impl NodeHw) -> u8 {
    (0..DIGITAL_INPUTS)
        .filter(|channel| hw.digital_input(*channel))
        .fold(0, |mask, channel| mask | (1 << channel))
}

/// Builds a record out of the latest samples.
pub fn measure(hw: &impl NodeHw) -> SensingRecord {
    let raw_reference = hw.adc_sample(AdcChannel::Reference);
    SensingRecord {
        device_voltage: device_voltage(hw.adc_sample(AdcChannel::Device), raw_reference),
        battery_voltage: battery_voltage(raw_reference),
        digital_inputs: digital_inputs(hw),
    }
}
