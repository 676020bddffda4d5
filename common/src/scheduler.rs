//! State shared between the interrupt handlers and the main loop, and the 1 ms tick that
//! derives timing events from a hardware timer.

use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::signal::Signal;

use crate::RawMutex;
use crate::at::uart::{QuietPeriodFramer, RxLine};
use crate::config::{MODEM_BUFFER_SIZE, NodeConfig};
use crate::mode::{ModeCell, OperatingMode};
use crate::ring_buffer::Push;

/// A single-slot mailbox, set by an interrupt and taken by the main loop.
pub type Mailbox = Signal<RawMutex, ()>;

/// Everything interrupt handlers write and the main loop reads.
///
/// Each field has a single writer context, handlers only ever touch the slice they own.
pub struct Shared<const N: usize = MODEM_BUFFER_SIZE> {
    pub mode: ModeCell,
    pub modem_rx: RxLine<N>,
    pub debug_rx: RxLine<N>,
    pub framer: QuietPeriodFramer,
    /// Set when the modem line went quiet after a response.
    pub message_complete: Mailbox,
    pub second_elapsed: Mailbox,
    /// Set when `Waiting` lasted longer than the state timeout.
    pub state_timeout: Mailbox,
    /// Set once per finished ADC conversion batch.
    pub conversion_done: Mailbox,
    /// Keeps the node awake while set, cleared by the tick after the override window.
    pub sleep_override: AtomicBool,
}

impl<const N: usize> Default for Shared<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Shared<N> {
    pub const fn new() -> Self {
        Self {
            mode: ModeCell::new(OperatingMode::Booting),
            modem_rx: RxLine::new(),
            debug_rx: RxLine::new(),
            framer: QuietPeriodFramer::new(),
            message_complete: Signal::new(),
            second_elapsed: Signal::new(),
            state_timeout: Signal::new(),
            conversion_done: Signal::new(),
            sleep_override: AtomicBool::new(false),
        }
    }

    /// Modem receive interrupt.
    pub fn on_modem_byte(&self, byte: u8) -> Push {
        let push = self.modem_rx.on_receive(byte);
        self.framer.byte_received();
        push
    }

    /// Debug console receive interrupt.
    pub fn on_debug_byte(&self, byte: u8) -> Push {
        self.debug_rx.on_receive(byte)
    }

    /// Sensor conversion complete interrupt.
    pub fn on_conversion_done(&self) {
        self.conversion_done.signal(());
    }

    pub fn sleep_overridden(&self) -> bool {
        self.sleep_override.load(Ordering::Acquire)
    }
}

/// Counters of the periodic tick interrupt.
///
/// Owned by the tick handler, which calls [`TickScheduler::on_tick`] once per millisecond.
pub struct TickScheduler {
    second_ticks: u32,
    mode_ticks: u32,
    second_period: u32,
    state_timeout: u32,
    sleep_override: u32,
}

impl TickScheduler {
    pub fn new(config: &NodeConfig) -> Self {
        Self {
            second_ticks: 0,
            mode_ticks: 0,
            second_period: config.second_ticks,
            state_timeout: config.state_timeout_ticks,
            sleep_override: config.sleep_override_ticks,
        }
    }

    pub fn on_tick<const N: usize>(&mut self, shared: &Shared<N>) {
        self.second_ticks += 1;
        if self.second_ticks > self.second_period {
            shared.second_elapsed.signal(());
            self.second_ticks = 0;
        }

        if shared.framer.tick() {
            shared.message_complete.signal(());
        }

        // One counter serves both modes, any other mode restarts it.
        match shared.mode.load() {
            OperatingMode::Waiting => {
                self.mode_ticks += 1;
                if self.mode_ticks > self.state_timeout {
                    shared.state_timeout.signal(());
                    self.mode_ticks = 0;
                }
            }
            OperatingMode::PowerOff => {
                self.mode_ticks += 1;
                if self.mode_ticks > self.sleep_override {
                    shared.sleep_override.store(false, Ordering::Release);
                    self.mode_ticks = 0;
                }
            }
            _ => self.mode_ticks = 0,
        }
    }
}
