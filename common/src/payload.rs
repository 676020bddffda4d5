//! Body of the HTTP POST, a form-encoded line the remote endpoint parses byte by byte.
//!
//! Fields are separated by `\&`, a literal backslash followed by an ampersand, which the modem
//! turns back into a plain ampersand.

use core::fmt::Write;

use heapless::String;

use crate::config::SENSING_SLOTS;
use crate::error::Error;
use crate::store::{SensingRecord, SessionCounters};

pub const PAYLOAD_SIZE: usize = 400;
const SEPARATOR: &str = "\\&";

pub type Payload = String<PAYLOAD_SIZE>;

/// Serializes the session counters and a batch of records.
pub fn format_payload(
    counters: &SessionCounters,
    records: &[SensingRecord; SENSING_SLOTS],
) -> crate::Result<Payload> {
    let mut payload = Payload::new();
    write_fields(&mut payload, counters, records).map_err(|_| Error::BufferTooSmallError)?;
    Ok(payload)
}

fn write_fields(
    out: &mut impl Write,
    counters: &SessionCounters,
    records: &[SensingRecord; SENSING_SLOTS],
) -> core::fmt::Result {
    write!(out, "send={}{SEPARATOR}Fail={}", counters.sending, counters.send_fail)?;
    for (i, record) in records.iter().enumerate() {
        write!(out, "{SEPARATOR}V{}={:.2}", i + 1, record.device_voltage)?;
    }
    for (i, record) in records.iter().enumerate() {
        write!(out, "{SEPARATOR}B{}={:.2}", i + 1, record.battery_voltage)?;
    }
    for (i, record) in records.iter().enumerate() {
        write!(out, "{SEPARATOR}D{}=0x{:x}", i + 1, record.digital_inputs)?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_payload_golden() {
        let counters = SessionCounters {
            sending: 12,
            sensing: 0,
            send_fail: 3,
        };
        let mut records = [SensingRecord::default(); SENSING_SLOTS];
        for (i, record) in records.iter_mut().enumerate() {
            record.device_voltage = 12.0 + i as f32 * 0.25;
            record.battery_voltage = 3.5 - i as f32 * 0.1;
            record.digital_inputs = (i * 3) as u8;
        }
        records[5].digital_inputs = 0xf;

        let payload = format_payload(&counters, &records).unwrap();
        assert_eq!(
            payload.as_str(),
            "send=12\\&Fail=3\
             \\&V1=12.00\\&V2=12.25\\&V3=12.50\\&V4=12.75\\&V5=13.00\\&V6=13.25\
             \\&B1=3.50\\&B2=3.40\\&B3=3.30\\&B4=3.20\\&B5=3.10\\&B6=3.00\
             \\&D1=0x0\\&D2=0x3\\&D3=0x6\\&D4=0x9\\&D5=0xc\\&D6=0xf"
        );
    }

    #[test]
    fn test_empty_batch() {
        let payload =
            format_payload(&SessionCounters::default(), &[SensingRecord::default(); 6]).unwrap();
        assert_eq!(
            payload.as_str(),
            "send=0\\&Fail=0\
             \\&V1=0.00\\&V2=0.00\\&V3=0.00\\&V4=0.00\\&V5=0.00\\&V6=0.00\
             \\&B1=0.00\\&B2=0.00\\&B3=0.00\\&B4=0.00\\&B5=0.00\\&B6=0.00\
             \\&D1=0x0\\&D2=0x0\\&D3=0x0\\&D4=0x0\\&D5=0x0\\&D6=0x0"
        );
    }

    #[test]
    fn test_oversized_values() {
        let records = [SensingRecord {
            device_voltage: f32::MAX,
            battery_voltage: f32::MAX,
            digital_inputs: 0xff,
        }; SENSING_SLOTS];
        assert_eq!(
            format_payload(&SessionCounters::default(), &records),
            Err(Error::BufferTooSmallError)
        );
    }
}
