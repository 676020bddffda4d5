use core::fmt::Display;
use core::sync::atomic::{AtomicU8, Ordering};

use crate::error::Error;

/// Operating mode of the node.
///
/// `Standby`, `PowerUp`, `Running`, `PowerDown`, `CheckUsim` and `Sending` are reserved: they
/// keep their discriminants for compatibility but no transition enters them.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OperatingMode {
    /// Wakes the modem and starts the upload sequence.
    #[default]
    Booting = 0,
    Standby = 1,
    PowerUp = 2,
    Running = 3,
    PowerDown = 4,
    /// Sleeps until the next sensing cycle.
    PowerOff = 5,
    /// Samples the sensors into the next slot.
    Sensing = 6,
    CheckUsim = 7,
    Sending = 8,
    /// Records a completed upload.
    AckChecking = 9,
    /// Waits for an ack or a timeout of the last command.
    Waiting = 10,
    CheckingIp = 11,
    CheckingNetwork = 12,
    HttpPost = 13,
    HttpHead = 14,
    HttpData = 15,
    HttpSend = 16,
    /// Records an abandoned upload.
    Timeout = 17,
}

impl OperatingMode {
    pub fn is_reserved(&self) -> bool {
        matches!(
            self,
            OperatingMode::Standby
                | OperatingMode::PowerUp
                | OperatingMode::Running
                | OperatingMode::PowerDown
                | OperatingMode::CheckUsim
                | OperatingMode::Sending
        )
    }

    fn name(&self) -> &'static str {
        match self {
            OperatingMode::Booting => "Booting",
            OperatingMode::Standby => "Standby",
            OperatingMode::PowerUp => "PowerUp",
            OperatingMode::Running => "Running",
            OperatingMode::PowerDown => "PowerDown",
            OperatingMode::PowerOff => "PowerOff",
            OperatingMode::Sensing => "Sensing",
            OperatingMode::CheckUsim => "CheckUsim",
            OperatingMode::Sending => "Sending",
            OperatingMode::AckChecking => "AckChecking",
            OperatingMode::Waiting => "Waiting",
            OperatingMode::CheckingIp => "CheckingIp",
            OperatingMode::CheckingNetwork => "CheckingNetwork",
            OperatingMode::HttpPost => "HttpPost",
            OperatingMode::HttpHead => "HttpHead",
            OperatingMode::HttpData => "HttpData",
            OperatingMode::HttpSend => "HttpSend",
            OperatingMode::Timeout => "Timeout",
        }
    }
}

impl Display for OperatingMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for OperatingMode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => OperatingMode::Booting,
            1 => OperatingMode::Standby,
            2 => OperatingMode::PowerUp,
            3 => OperatingMode::Running,
            4 => OperatingMode::PowerDown,
            5 => OperatingMode::PowerOff,
            6 => OperatingMode::Sensing,
            7 => OperatingMode::CheckUsim,
            8 => OperatingMode::Sending,
            9 => OperatingMode::AckChecking,
            10 => OperatingMode::Waiting,
            11 => OperatingMode::CheckingIp,
            12 => OperatingMode::CheckingNetwork,
            13 => OperatingMode::HttpPost,
            14 => OperatingMode::HttpHead,
            15 => OperatingMode::HttpData,
            16 => OperatingMode::HttpSend,
            17 => OperatingMode::Timeout,
            _ => return Err(Error::InvalidMode(value)),
        })
    }
}

/// The current operating mode, readable from interrupt context.
///
/// Stores are single atomic writes, the last writer wins.
pub struct ModeCell(AtomicU8);

impl Default for ModeCell {
    fn default() -> Self {
        Self::new(OperatingMode::Booting)
    }
}

impl ModeCell {
    pub const fn new(mode: OperatingMode) -> Self {
        Self(AtomicU8::new(mode as u8))
    }

    pub fn load(&self) -> OperatingMode {
        // Only `store` writes the cell, so the value is always a valid discriminant.
        OperatingMode::try_from(self.0.load(Ordering::Acquire)).unwrap_or_default()
    }

    pub fn store(&self, mode: OperatingMode) {
        self.0.store(mode as u8, Ordering::Release);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_discriminants_round_trip() {
        for value in 0..=17u8 {
            let mode = OperatingMode::try_from(value).unwrap();
            assert_eq!(mode as u8, value);
        }
        assert_eq!(OperatingMode::try_from(18), Err(Error::InvalidMode(18)));
    }

    #[test]
    fn test_reserved() {
        let reserved = (0..=17u8)
            .filter_map(|value| OperatingMode::try_from(value).ok())
            .filter(OperatingMode::is_reserved)
            .count();
        assert_eq!(reserved, 6);
        assert!(!OperatingMode::Waiting.is_reserved());
    }

    #[test]
    fn test_mode_cell() {
        let cell = ModeCell::new(OperatingMode::Waiting);
        assert_eq!(cell.load(), OperatingMode::Waiting);
        cell.store(OperatingMode::Sensing);
        assert_eq!(cell.load(), OperatingMode::Sensing);
    }
}
