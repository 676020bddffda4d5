use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    #[error("Buffer too small")]
    BufferTooSmallError,
    #[error("Formatting error")]
    FormatError,
    #[error("Sensing slot {0} out of range")]
    SlotOutOfRange(u8),
    #[error("UART write error")]
    UartWriteError,
    #[error("Timeout error")]
    TimeoutError,
    #[error("Invalid operating mode {0}")]
    InvalidMode(u8),
}

impl From<core::fmt::Error> for Error {
    fn from(_: core::fmt::Error) -> Self {
        Error::FormatError
    }
}
