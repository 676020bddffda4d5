use embassy_futures::block_on;
use telenode_common::{
    at::uart::Line,
    config::{NodeConfig, SENSING_SLOTS},
    fake::FakeHw,
    mode::OperatingMode,
    node::Node,
    scheduler::{Shared, TickScheduler},
    store::{BackupRegisters, RamBackupRegisters},
};

const BUFFER: usize = 64;

fn run(scheduler: &mut TickScheduler, shared: &Shared<BUFFER>, ticks: u32) {
    for _ in 0..ticks {
        scheduler.on_tick(shared);
    }
}

#[test]
fn test_sensing_cycle_starts_upload() {
    let _ = env_logger::builder().is_test(true).try_init();
    let shared = Shared::<BUFFER>::new();
    let mut node = Node::new(
        FakeHw::new(),
        RamBackupRegisters::new(),
        &shared,
        NodeConfig::default(),
    );
    node.start();

    for cycle in 1..SENSING_SLOTS as u16 {
        node.hw_mut().set_adc(0, 1000 + cycle, 4096);
        node.hw_mut().set_inputs([cycle % 2 == 1, false, true, false]);
        shared.on_conversion_done();
        block_on(node.poll());
        assert_eq!(node.mode(), OperatingMode::PowerOff);
        assert_eq!(node.counters().sensing, cycle);

        // Sleeps and boots again, the count survives in the registers.
        block_on(node.poll());
        assert_eq!(node.hw().sleeps().len(), usize::from(cycle));
        assert_eq!(node.mode(), OperatingMode::Waiting);
        assert_eq!(node.counters().sensing, cycle);
    }

    node.hw_mut().set_adc(0, 2000, 4096);
    shared.on_conversion_done();
    block_on(node.poll());
    assert_eq!(node.mode(), OperatingMode::Booting);
    assert_eq!(node.counters().sensing, 0);
    assert_eq!(node.store().load_counters().sensing, 0);

    let registers = node.store().registers();
    assert_eq!(f32::from_bits(registers.read(0)), 1001.0);
    assert_eq!(f32::from_bits(registers.read(4)), 1005.0);
    assert_eq!(f32::from_bits(registers.read(5)), 2000.0);
    assert_eq!(f32::from_bits(registers.read(12)), 1.2);
    assert_eq!(registers.read(20), 0b101);
    assert_eq!(registers.read(21), 0b100);

    block_on(node.poll());
    assert_eq!(node.hw().sent(Line::Modem), ["ATE0\r\n", "AT*CPIN?\r\n"]);
}

#[test]
fn test_no_conversion_boots_into_upload() {
    let config = NodeConfig::default();
    let shared = Shared::<BUFFER>::new();
    let mut scheduler = TickScheduler::new(&config);
    let mut node = Node::new(FakeHw::new(), RamBackupRegisters::new(), &shared, config);
    node.start();

    run(&mut scheduler, &shared, 2048);
    block_on(node.poll());
    assert_eq!(node.mode(), OperatingMode::Waiting);

    run(&mut scheduler, &shared, 1);
    block_on(node.poll());
    assert_eq!(node.mode(), OperatingMode::Booting);
    assert_eq!(node.hw().led_toggles(), 1);
}

#[test]
fn test_quiet_period_frames_response() {
    let config = NodeConfig::default();
    let shared = Shared::<BUFFER>::new();
    let mut scheduler = TickScheduler::new(&config);
    let mut node = Node::new(FakeHw::new(), RamBackupRegisters::new(), &shared, config);
    shared.mode.store(OperatingMode::CheckingNetwork);
    block_on(node.poll());

    // Gaps shorter than the quiet period keep the message together.
    for chunk in ["\r\n+CEREG", ": 0,1\r\n", "\r\nOK\r\n"] {
        for byte in chunk.bytes() {
            shared.on_modem_byte(byte);
        }
        run(&mut scheduler, &shared, 5);
        block_on(node.poll());
        assert_eq!(node.mode(), OperatingMode::Waiting);
    }

    run(&mut scheduler, &shared, 4);
    block_on(node.poll());
    assert_eq!(node.mode(), OperatingMode::Waiting);

    run(&mut scheduler, &shared, 1);
    block_on(node.poll());
    assert_eq!(node.mode(), OperatingMode::CheckingIp);
    assert!(shared.modem_rx.is_empty());
}

#[test]
fn test_split_response_is_lost() {
    let config = NodeConfig::default();
    let shared = Shared::<BUFFER>::new();
    let mut scheduler = TickScheduler::new(&config);
    let mut node = Node::new(FakeHw::new(), RamBackupRegisters::new(), &shared, config);
    shared.mode.store(OperatingMode::Booting);
    block_on(node.poll());

    for chunk in ["\r\n+CP", "IN: READY\r\n"] {
        for byte in chunk.bytes() {
            shared.on_modem_byte(byte);
        }
        run(&mut scheduler, &shared, 20);
        block_on(node.poll());
    }
    assert_eq!(node.mode(), OperatingMode::Waiting);
    assert!(!node.ack_pending());
}

#[test]
fn test_state_timeout_escalates() {
    let config = NodeConfig::default();
    let shared = Shared::<BUFFER>::new();
    let mut scheduler = TickScheduler::new(&config);
    let mut node = Node::new(FakeHw::new(), RamBackupRegisters::new(), &shared, config);
    shared.mode.store(OperatingMode::HttpHead);

    block_on(node.poll());
    run(&mut scheduler, &shared, 2049);
    block_on(node.poll());
    assert_eq!(node.mode(), OperatingMode::HttpHead);

    // Resending restarts the timeout.
    run(&mut scheduler, &shared, 1);
    block_on(node.poll());
    run(&mut scheduler, &shared, 2048);
    block_on(node.poll());
    assert_eq!(node.mode(), OperatingMode::Waiting);

    run(&mut scheduler, &shared, 1);
    block_on(node.poll());
    assert_eq!(node.mode(), OperatingMode::Timeout);
    block_on(node.poll());
    assert_eq!(node.mode(), OperatingMode::PowerOff);
    assert_eq!(node.counters().send_fail, 1);
    assert_eq!(node.hw().sent(Line::Modem).len(), 2);
}

#[test]
fn test_sleep_override_expires() {
    let config = NodeConfig::default();
    let shared = Shared::<BUFFER>::new();
    let mut scheduler = TickScheduler::new(&config);
    let mut node = Node::new(
        FakeHw::new().with_button_held(true),
        RamBackupRegisters::new(),
        &shared,
        config,
    );
    node.start();
    node.hw_mut().set_button_held(false);
    shared.mode.store(OperatingMode::PowerOff);

    run(&mut scheduler, &shared, 20_000);
    block_on(node.poll());
    assert!(node.hw().sleeps().is_empty());
    assert!(shared.sleep_overridden());

    run(&mut scheduler, &shared, 1);
    block_on(node.poll());
    assert_eq!(node.hw().sleeps().len(), 1);
    assert_eq!(node.mode(), OperatingMode::Waiting);
    assert!(!shared.sleep_overridden());
}

#[test]
fn test_debug_bridge() {
    let shared = Shared::<BUFFER>::new();
    let mut node = Node::new(
        FakeHw::new(),
        RamBackupRegisters::new(),
        &shared,
        NodeConfig::default(),
    );
    node.start();
    for byte in b"AT\r\n" {
        shared.on_debug_byte(*byte);
    }

    for _ in 0..6 {
        block_on(node.poll());
    }
    assert_eq!(node.hw().sent(Line::Modem).concat(), "AT\r\n");
    assert!(shared.debug_rx.is_empty());
    assert_eq!(node.mode(), OperatingMode::Waiting);
}

#[test]
fn test_wake_discards_late_response() {
    let shared = Shared::<BUFFER>::new();
    let mut node = Node::new(
        FakeHw::new(),
        RamBackupRegisters::new(),
        &shared,
        NodeConfig::default(),
    );
    shared.mode.store(OperatingMode::PowerOff);

    // The completion notice of the last upload arrives while the node powers off.
    for byte in "\r\n*WHTTPR:200,COMPLETED\r\n".bytes() {
        shared.on_modem_byte(byte);
    }
    shared.message_complete.signal(());
    shared.state_timeout.signal(());
    block_on(node.poll());
    assert_eq!(node.hw().sleeps().len(), 1);
    assert!(!node.ack_pending());
    assert_eq!(node.last_response(), None);

    for byte in b"\r\n+CPIN: READY\r\n" {
        shared.on_modem_byte(*byte);
    }
    node.start();
    assert!(shared.modem_rx.is_empty());

    block_on(node.poll());
    assert_eq!(node.mode(), OperatingMode::Waiting);
    assert_eq!(node.retries(), 0);
}
