//! Sensing records and session counters kept in the backup register file.
//!
//! The registers survive standby and warm resets, so samples accumulate across sleep cycles
//! until a batch is uploaded. Register layout:
//!
//! | index  | content                                   |
//! |--------|-------------------------------------------|
//! | 0..6   | device voltage, `f32` bit pattern         |
//! | 10..16 | battery voltage, `f32` bit pattern        |
//! | 20..26 | digital input bitmask                     |
//! | 30     | sending count                             |
//! | 31     | send fail count (high 16 bits), sensing count (low 16 bits) |

use crate::config::SENSING_SLOTS;
use crate::error::Error;

const DEVICE_VOLTAGE_BASE: u8 = 0;
const BATTERY_VOLTAGE_BASE: u8 = 10;
const DIGITAL_INPUTS_BASE: u8 = 20;
const SENDING_COUNT: u8 = 30;
const PACKED_COUNTS: u8 = 31;

/// Number of registers the store addresses.
pub const BACKUP_REGISTER_COUNT: usize = 32;

/// Register file retained in the deepest sleep mode.
pub trait BackupRegisters {
    fn read(&self, index: u8) -> u32;
    fn write(&mut self, index: u8, value: u32);
}

/// Register file kept in RAM, for host builds and tests.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RamBackupRegisters {
    registers: [u32; BACKUP_REGISTER_COUNT],
}

impl RamBackupRegisters {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BackupRegisters for RamBackupRegisters {
    fn read(&self, index: u8) -> u32 {
        self.registers.get(usize::from(index)).copied().unwrap_or_default()
    }

    fn write(&mut self, index: u8, value: u32) {
        if let Some(register) = self.registers.get_mut(usize::from(index)) {
            *register = value;
        }
    }
}

/// One sensing cycle worth of measurements.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SensingRecord {
    pub device_voltage: f32,
    pub battery_voltage: f32,
    /// Bit `i` is set when digital input `i` was high.
    pub digital_inputs: u8,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SessionCounters {
    /// Completed uploads.
    pub sending: u32,
    /// Records written since the last upload started, `0..SENSING_SLOTS`.
    pub sensing: u16,
    /// Abandoned uploads.
    pub send_fail: u16,
}

pub struct SlotStore<B: BackupRegisters> {
    registers: B,
}

impl<B: BackupRegisters> SlotStore<B> {
    pub fn new(registers: B) -> Self {
        Self { registers }
    }

    pub fn registers(&self) -> &B {
        &self.registers
    }

    pub fn load_counters(&self) -> SessionCounters {
        let packed = self.registers.read(PACKED_COUNTS);
        SessionCounters {
            sending: self.registers.read(SENDING_COUNT),
            sensing: (packed & 0xffff) as u16,
            send_fail: (packed >> 16) as u16,
        }
    }

    pub fn store_sending_count(&mut self, count: u32) {
        self.registers.write(SENDING_COUNT, count);
    }

    /// Stores the sensing count, keeping the send fail count packed in the same register.
    pub fn store_sensing_count(&mut self, count: u16) {
        let packed = self.registers.read(PACKED_COUNTS);
        self.registers.write(PACKED_COUNTS, (packed & 0xffff_0000) | u32::from(count));
    }

    /// Stores the send fail count, keeping the sensing count packed in the same register.
    pub fn store_send_fail_count(&mut self, count: u16) {
        let packed = self.registers.read(PACKED_COUNTS);
        self.registers.write(PACKED_COUNTS, (u32::from(count) << 16) | (packed & 0xffff));
    }

    pub fn write_record(&mut self, slot: u8, record: &SensingRecord) -> crate::Result<()> {
        Self::check_slot(slot)?;
        self.registers.write(DEVICE_VOLTAGE_BASE + slot, record.device_voltage.to_bits());
        self.registers.write(BATTERY_VOLTAGE_BASE + slot, record.battery_voltage.to_bits());
        self.registers.write(DIGITAL_INPUTS_BASE + slot, u32::from(record.digital_inputs));
        Ok(())
    }

    /// Reads the record in `slot` and zeroes it, so every record is consumed once.
    pub fn take_record(&mut self, slot: u8) -> crate::Result<SensingRecord> {
        Self::check_slot(slot)?;
        let record = SensingRecord {
            device_voltage: f32::from_bits(self.registers.read(DEVICE_VOLTAGE_BASE + slot)),
            battery_voltage: f32::from_bits(self.registers.read(BATTERY_VOLTAGE_BASE + slot)),
            digital_inputs: self.registers.read(DIGITAL_INPUTS_BASE + slot) as u8,
        };
        for base in [DEVICE_VOLTAGE_BASE, BATTERY_VOLTAGE_BASE, DIGITAL_INPUTS_BASE] {
            self.registers.write(base + slot, 0);
        }
        Ok(record)
    }

    /// Takes every slot, in slot order.
    pub fn take_all(&mut self) -> [SensingRecord; SENSING_SLOTS] {
        let mut records = [SensingRecord::default(); SENSING_SLOTS];
        for (slot, record) in records.iter_mut().enumerate() {
            // Slots below SENSING_SLOTS are always in range.
            if let Ok(taken) = self.take_record(slot as u8) {
                *record = taken;
            }
        }
        records
    }

    fn check_slot(slot: u8) -> crate::Result<()> {
        if usize::from(slot) < SENSING_SLOTS {
            Ok(())
        } else {
            Err(Error::SlotOutOfRange(slot))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn record(slot: u8) -> SensingRecord {
        SensingRecord {
            device_voltage: 3.0 + f32::from(slot),
            battery_voltage: 1.5 * f32::from(slot),
            digital_inputs: slot & 0xf,
        }
    }

    #[test]
    fn test_read_and_clear() {
        let mut store = SlotStore::new(RamBackupRegisters::new());
        for slot in 0..SENSING_SLOTS as u8 {
            store.write_record(slot, &record(slot)).unwrap();
        }
        for slot in 0..SENSING_SLOTS as u8 {
            assert_eq!(store.take_record(slot).unwrap(), record(slot));
            assert_eq!(store.take_record(slot).unwrap(), SensingRecord::default());
        }
    }

    #[test]
    fn test_register_layout() {
        let mut store = SlotStore::new(RamBackupRegisters::new());
        let rec = SensingRecord {
            device_voltage: 3.3,
            battery_voltage: 2.5,
            digital_inputs: 0b1010,
        };
        store.write_record(2, &rec).unwrap();
        assert_eq!(store.registers().read(2), 3.3f32.to_bits());
        assert_eq!(store.registers().read(12), 2.5f32.to_bits());
        assert_eq!(store.registers().read(22), 0b1010);
    }

    #[test]
    fn test_slot_out_of_range() {
        let mut store = SlotStore::new(RamBackupRegisters::new());
        assert_eq!(
            store.write_record(6, &record(0)),
            Err(Error::SlotOutOfRange(6))
        );
        assert_eq!(store.take_record(10), Err(Error::SlotOutOfRange(10)));
    }

    #[test]
    fn test_packed_counters_are_isolated() {
        let mut store = SlotStore::new(RamBackupRegisters::new());
        store.store_send_fail_count(7);
        store.store_sensing_count(5);
        store.store_sending_count(1234);
        assert_eq!(
            store.load_counters(),
            SessionCounters {
                sending: 1234,
                sensing: 5,
                send_fail: 7,
            }
        );

        store.store_sensing_count(0);
        assert_eq!(store.load_counters().send_fail, 7);
        store.store_send_fail_count(0xffff);
        assert_eq!(store.load_counters().sensing, 0);
        assert_eq!(store.registers().read(31), 0xffff_0000);
    }

    #[test]
    fn test_take_all() {
        let mut store = SlotStore::new(RamBackupRegisters::new());
        store.write_record(0, &record(0)).unwrap();
        store.write_record(5, &record(5)).unwrap();
        let records = store.take_all();
        assert_eq!(records[0], record(0));
        assert_eq!(records[3], SensingRecord::default());
        assert_eq!(records[5], record(5));
        assert_eq!(store.take_all(), [SensingRecord::default(); SENSING_SLOTS]);
    }
}
