#![no_std]

pub mod at;
pub mod config;
pub mod error;
#[cfg(any(test, feature = "std"))]
pub mod fake;
pub mod hw;
pub mod mode;
pub mod node;
pub mod payload;
pub mod ring_buffer;
pub mod scheduler;
pub mod sensing;
pub mod store;

pub type Result<T> = core::result::Result<T, error::Error>;

/// Everything guarded by this mutex is also touched from interrupt handlers, so it has to be a
/// critical section on every target.
pub type RawMutex = embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
