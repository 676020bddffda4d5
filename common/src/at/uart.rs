use core::cell::RefCell;
use core::sync::atomic::{AtomicU8, Ordering};

use embassy_sync::blocking_mutex::Mutex;
use heapless::Vec;

use crate::RawMutex;
use crate::ring_buffer::{Push, RingBuffer};

/// Silence, in scheduler ticks, after which a modem response is considered complete.
pub const QUIET_PERIOD_TICKS: u8 = 10;

/// Serial lines of the node.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Line {
    /// The LTE modem.
    Modem,
    /// The debug console, its input is forwarded to the modem.
    Debug,
}

/// Receive side of a serial line.
///
/// The receive interrupt is the only producer and the main loop the only consumer.
pub struct RxLine<const N: usize> {
    ring: Mutex<RawMutex, RefCell<RingBuffer<N>>>,
}

impl<const N: usize> Default for RxLine<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RxLine<N> {
    pub const fn new() -> Self {
        Self {
            ring: Mutex::new(RefCell::new(RingBuffer::new())),
        }
    }

    /// Stores a byte received in interrupt context.
    pub fn on_receive(&self, byte: u8) -> Push {
        self.ring.lock(|ring| ring.borrow_mut().push(byte))
    }

    pub fn pop(&self) -> Option<u8> {
        self.ring.lock(|ring| ring.borrow_mut().pop())
    }

    /// Takes the whole buffered message out of the line.
    pub fn drain(&self) -> Vec<u8, N> {
        self.ring.lock(|ring| ring.borrow_mut().drain())
    }

    pub fn reset(&self) {
        self.ring.lock(|ring| ring.borrow_mut().reset())
    }

    pub fn len(&self) -> usize {
        self.ring.lock(|ring| ring.borrow().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Declares a modem message complete after a period of silence on the line.
///
/// Every received byte reloads a countdown, every tick decrements it, and the tick at which
/// the countdown reads exactly 1 completes the message. Responses sent in bursts with gaps longer
/// than the quiet period are split into several messages.
pub struct QuietPeriodFramer {
    countdown: AtomicU8,
}

impl Default for QuietPeriodFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl QuietPeriodFramer {
    pub const fn new() -> Self {
        Self {
            countdown: AtomicU8::new(0),
        }
    }

    /// Called from the receive interrupt for every modem byte.
    pub fn byte_received(&self) {
        self.countdown.store(QUIET_PERIOD_TICKS, Ordering::Release);
    }

    /// Called from the tick interrupt, returns true exactly once per message.
    ///
    /// Uses plain load and store, targets without atomic read-modify-write are supported. A
    /// reload racing with the decrement is overwritten and the message completes early.
    pub fn tick(&self) -> bool {
        let countdown = self.countdown.load(Ordering::Acquire);
        if countdown != 0 {
            self.countdown.store(countdown - 1, Ordering::Release);
        }
        countdown == 1
    }

    pub fn countdown(&self) -> u8 {
        self.countdown.load(Ordering::Acquire)
    }
}
