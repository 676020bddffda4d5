use clap::Parser;
use log::{error, info};
use tokio::io::AsyncReadExt;

use embassy_time::Duration;
use telenode_bench::hw::{Inputs, SerialNodeHw, forward_modem_rx};
use telenode_common::config::NodeConfig;
use telenode_common::node::Node;
use telenode_common::scheduler::{Shared, TickScheduler};
use telenode_common::store::RamBackupRegisters;

static SHARED: Shared = Shared::new();

#[derive(Parser, Debug)]
struct Args {
    /// Serial port of the modem, e.g. /dev/ttyUSB0.
    #[arg(short, long)]
    port: String,
    #[arg(short, long, default_value_t = 115_200)]
    baud_rate: u32,
    #[arg(long, default_value_t = 2048)]
    battery_adc: u16,
    #[arg(long, default_value_t = 2048)]
    device_adc: u16,
    #[arg(long, default_value_t = 1490)]
    reference_adc: u16,
    /// Bitmask of the digital inputs.
    #[arg(long, default_value_t = 0)]
    inputs: u8,
    /// Pretend the user button is held at boot.
    #[arg(long)]
    hold_button: bool,
    /// Seconds between wake-ups.
    #[arg(short, long, default_value_t = 600)]
    wake_secs: u64,
    #[arg(long, default_value_t = 2)]
    retry_limit: u8,
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    env_logger::builder()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .format_timestamp_millis()
        .init();

    let config = NodeConfig {
        wake_interval: Duration::from_secs(args.wake_secs),
        retry_limit: args.retry_limit,
        ..Default::default()
    };
    let inputs = Inputs {
        adc: [args.battery_adc, args.device_adc, args.reference_adc],
        digital: args.inputs,
        button_held: args.hold_button,
    };
    let (hw, modem_rx) = match SerialNodeHw::open(&args.port, args.baud_rate, inputs, &SHARED) {
        Ok(opened) => opened,
        Err(err) => {
            error!("Cannot open {}: {err}", args.port);
            return;
        }
    };

    let mut scheduler = TickScheduler::new(&config);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_millis(1));
        loop {
            interval.tick().await;
            scheduler.on_tick(&SHARED);
        }
    });

    tokio::spawn(async move {
        if let Err(err) = forward_modem_rx(modem_rx, &SHARED).await {
            error!("Modem port lost: {err}");
        }
    });

    tokio::spawn(async move {
        let mut stdin = tokio::io::stdin();
        let mut buf = [0u8; 64];
        while let Ok(len) = stdin.read(&mut buf).await {
            if len == 0 {
                break;
            }
            for byte in &buf[..len] {
                SHARED.on_debug_byte(*byte);
            }
        }
    });

    let mut node = Node::new(hw, RamBackupRegisters::new(), &SHARED, config);
    node.start();
    // Every boot starts with a conversion.
    SHARED.on_conversion_done();
    info!("Node started, modem on {}", args.port);
    loop {
        node.poll().await;
        tokio::time::sleep(std::time::Duration::from_millis(1)).await;
    }
}
