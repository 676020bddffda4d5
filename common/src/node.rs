//! The operating-mode state machine driving sensing, the HTTP upload and sleep.
//!
//! Every step of the upload sends one command, remembers which mode to resend from and which
//! mode comes next, and parks in `Waiting` until the classifier acks the response or the tick
//! scheduler signals a timeout.

use core::sync::atomic::Ordering;

#[cfg(feature = "defmt")]
use defmt::{debug, error, info, warn};
#[cfg(not(feature = "defmt"))]
use log::{debug, error, info, warn};

use crate::at::command::{AtCommand, http_data};
use crate::at::response::{ResponseKind, classify};
use crate::at::uart::Line;
use crate::config::{NodeConfig, SENSING_SLOTS};
use crate::hw::NodeHw;
use crate::mode::OperatingMode;
use crate::payload::format_payload;
use crate::scheduler::Shared;
use crate::sensing::measure;
use crate::store::{BackupRegisters, SessionCounters, SlotStore};

pub struct Node<'a, H: NodeHw, B: BackupRegisters, const N: usize> {
    hw: H,
    store: SlotStore<B>,
    shared: &'a Shared<N>,
    config: NodeConfig,
    next_on_success: OperatingMode,
    fallback_on_timeout: OperatingMode,
    ack: bool,
    retries: u8,
    counters: SessionCounters,
    last_response: Option<ResponseKind>,
}

impl<'a, H: NodeHw, B: BackupRegisters, const N: usize> Node<'a, H, B, N> {
    pub fn new(hw: H, registers: B, shared: &'a Shared<N>, config: NodeConfig) -> Self {
        Self {
            hw,
            store: SlotStore::new(registers),
            shared,
            config,
            next_on_success: OperatingMode::Booting,
            fallback_on_timeout: OperatingMode::Booting,
            ack: false,
            retries: 0,
            counters: SessionCounters::default(),
            last_response: None,
        }
    }

    /// Boot sequence, run at reset and after every wake-up.
    ///
    /// Clears what a reset would clear, loads the counters, latches the sleep override when the user button is held and parks in
    /// `Waiting` with `Booting` on both exits: unless a conversion arrives first, the state
    /// timeout starts an upload.
    pub fn start(&mut self) {
        self.ack = false;
        self.last_response = None;
        self.shared.state_timeout.reset();
        self.shared.message_complete.reset();
        self.shared.modem_rx.reset();

        self.counters = self.store.load_counters();
        info!(
            "sensingCount: {}, sendingCount: {}, sendFailCount: {}",
            self.counters.sensing, self.counters.sending, self.counters.send_fail
        );

        if self.hw.user_button_held() {
            info!("User button held, sleep disabled for a while");
            self.shared.sleep_override.store(true, Ordering::Release);
        }

        self.retries = 0;
        self.next_on_success = OperatingMode::Booting;
        self.fallback_on_timeout = OperatingMode::Booting;
        self.shared.mode.store(OperatingMode::Waiting);
    }

    pub fn mode(&self) -> OperatingMode {
        self.shared.mode.load()
    }

    pub fn counters(&self) -> SessionCounters {
        self.counters
    }

    pub fn ack_pending(&self) -> bool {
        self.ack
    }

    pub fn retries(&self) -> u8 {
        self.retries
    }

    pub fn next_on_success(&self) -> OperatingMode {
        self.next_on_success
    }

    pub fn fallback_on_timeout(&self) -> OperatingMode {
        self.fallback_on_timeout
    }

    /// Kind of the last classified modem response.
    pub fn last_response(&self) -> Option<ResponseKind> {
        self.last_response
    }

    pub fn hw(&self) -> &H {
        &self.hw
    }

    pub fn hw_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    pub fn store(&self) -> &SlotStore<B> {
        &self.store
    }

    /// One iteration of the main loop.
    ///
    /// Handles the pending interrupt events and then runs the current mode once.
    pub async fn poll(&mut self) {
        if self.shared.second_elapsed.try_take().is_some() {
            self.hw.toggle_status_led();
        }

        if self.shared.message_complete.try_take().is_some() {
            self.handle_response();
        }

        if let Some(byte) = self.shared.debug_rx.pop() {
            let _ = self
                .hw
                .transmit(Line::Modem, &[byte])
                .await
                .inspect_err(|err| error!("Cannot forward debug input: {}", err));
        }

        // A conversion may preempt any mode, an upload in progress included.
        if self.shared.conversion_done.try_take().is_some() {
            self.set_mode(OperatingMode::Sensing);
        }

        if let Err(err) = self.step().await {
            error!("Error in mode {}: {}", self.mode(), err);
        }
    }

    fn handle_response(&mut self) {
        let message = self.shared.modem_rx.drain();
        match core::str::from_utf8(&message) {
            Ok(text) => debug!("Modem: {}", text.trim()),
            Err(_) => debug!("Modem: {} bytes of binary data", message.len()),
        }
        let classification = classify(&message);
        match classification.kind {
            Some(kind) => {
                debug!("Matched {}", kind);
                self.last_response = Some(kind);
                if let Some(ack) = classification.verdict {
                    self.ack = ack;
                }
            }
            None => warn!("Unrecognized modem response, {} bytes", message.len()),
        }
    }

    async fn step(&mut self) -> crate::Result<()> {
        match self.mode() {
            OperatingMode::Booting => {
                self.hw.wake_modem().await;
                self.send(AtCommand::EchoOff).await;
                self.send(AtCommand::SimReady).await;
                self.await_ack(OperatingMode::Booting, OperatingMode::CheckingNetwork);
            }
            OperatingMode::CheckingNetwork => {
                self.send(AtCommand::NetworkRegistration).await;
                self.await_ack(OperatingMode::CheckingNetwork, OperatingMode::CheckingIp);
            }
            OperatingMode::CheckingIp => {
                self.send(AtCommand::IpAddress).await;
                self.await_ack(OperatingMode::CheckingIp, OperatingMode::HttpPost);
            }
            OperatingMode::HttpPost => {
                self.send(AtCommand::HttpOpen).await;
                self.await_ack(OperatingMode::HttpPost, OperatingMode::HttpHead);
            }
            OperatingMode::HttpHead => {
                self.send(AtCommand::HttpHeader).await;
                self.await_ack(OperatingMode::HttpHead, OperatingMode::HttpData);
            }
            OperatingMode::HttpData => {
                let result = self.send_data().await;
                // A failed transmission is recovered by the timeout like a lost response.
                self.await_ack(OperatingMode::HttpData, OperatingMode::HttpSend);
                result?;
            }
            OperatingMode::HttpSend => {
                self.send(AtCommand::HttpSend).await;
                self.await_ack(OperatingMode::HttpSend, OperatingMode::AckChecking);
            }
            OperatingMode::AckChecking => {
                self.counters.sending = self.counters.sending.wrapping_add(1);
                self.store.store_sending_count(self.counters.sending);
                info!("Upload {} sent", self.counters.sending);
                // The request completion notice still has to arrive.
                self.fallback_on_timeout = OperatingMode::HttpSend;
                self.next_on_success = OperatingMode::PowerOff;
                self.set_mode(OperatingMode::Waiting);
            }
            OperatingMode::Sensing => self.sense()?,
            OperatingMode::PowerOff => {
                if !self.shared.sleep_overridden() {
                    info!("Power off for {} s", self.config.wake_interval.as_secs());
                    self.hw.enter_low_power_sleep(self.config.wake_interval).await;
                    self.start();
                }
            }
            OperatingMode::Timeout => {
                self.counters.send_fail = self.counters.send_fail.wrapping_add(1);
                self.store.store_send_fail_count(self.counters.send_fail);
                warn!("Upload abandoned, {} failures so far", self.counters.send_fail);
                self.retries = 0;
                self.set_mode(OperatingMode::PowerOff);
            }
            OperatingMode::Waiting => self.wait(),
            OperatingMode::Standby
            | OperatingMode::PowerUp
            | OperatingMode::Running
            | OperatingMode::PowerDown
            | OperatingMode::CheckUsim
            | OperatingMode::Sending => {}
        }
        Ok(())
    }

    fn wait(&mut self) {
        if self.ack {
            self.ack = false;
            self.set_mode(self.next_on_success);
        }

        if self.shared.state_timeout.try_take().is_some() {
            self.retries += 1;
            if self.retries >= self.config.retry_limit {
                warn!("No response after {} tries", self.retries);
                self.set_mode(OperatingMode::Timeout);
            } else {
                debug!("Timeout, resending from {}", self.fallback_on_timeout);
                self.set_mode(self.fallback_on_timeout);
                self.fallback_on_timeout = OperatingMode::Waiting;
            }
        }
    }

    fn sense(&mut self) -> crate::Result<()> {
        let record = measure(&self.hw);
        let slot = u8::try_from(self.counters.sensing).unwrap_or(u8::MAX);
        debug!(
            "Sensing slot {}: device {} V, battery {} V, inputs {:x}",
            slot, record.device_voltage, record.battery_voltage, record.digital_inputs
        );
        let written = self.store.write_record(slot, &record);

        self.counters.sensing = self.counters.sensing.saturating_add(1);
        if usize::from(self.counters.sensing) >= SENSING_SLOTS {
            self.counters.sensing = 0;
            // Retries are a budget per upload attempt.
            self.retries = 0;
            self.set_mode(OperatingMode::Booting);
        } else {
            self.set_mode(OperatingMode::PowerOff);
        }
        self.store.store_sensing_count(self.counters.sensing);
        written
    }

    async fn send_data(&mut self) -> crate::Result<()> {
        let records = self.store.take_all();
        let payload = format_payload(&self.counters, &records)?;
        debug!("Payload: {}", payload.as_str());
        let line = http_data(&payload)?;
        self.transmit(line.as_bytes()).await
    }

    async fn send(&mut self, command: AtCommand) {
        let result = match command.line(&self.config) {
            Ok(line) => self.transmit(line.as_bytes()).await,
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            error!("Cannot send {:?}: {}", command, err);
        }
    }

    async fn transmit(&mut self, bytes: &[u8]) -> crate::Result<()> {
        self.hw.transmit(Line::Modem, bytes).await
    }

    /// Parks in `Waiting` after the command of `current` went out.
    fn await_ack(&mut self, current: OperatingMode, next: OperatingMode) {
        self.fallback_on_timeout = current;
        self.next_on_success = next;
        self.set_mode(OperatingMode::Waiting);
    }

    fn set_mode(&mut self, mode: OperatingMode) {
        let previous = self.shared.mode.load();
        if previous != mode {
            debug!("{} -> {}", previous, mode);
        }
        self.shared.mode.store(mode);
    }
}
