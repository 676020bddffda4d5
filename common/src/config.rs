use embassy_time::Duration;

/// Capacity of each serial receive ring buffer, in bytes.
pub const MODEM_BUFFER_SIZE: usize = 600;
/// Number of sensing records accumulated before an upload is started.
pub const SENSING_SLOTS: usize = 6;
/// Number of digital input channels sampled into the record bitmask.
pub const DIGITAL_INPUTS: usize = 4;

/// Tunable timing and protocol constants of the node.
///
/// All `*_ticks` values count ticks of the 1 ms periodic interrupt.
#[derive(Clone, Debug)]
pub struct NodeConfig {
    /// How long the node sleeps between sensing cycles.
    pub wake_interval: Duration,
    /// A `Waiting` mode times out once this many ticks have passed without an ack.
    pub state_timeout_ticks: u32,
    /// Number of timeouts after which the upload is abandoned.
    pub retry_limit: u8,
    /// How long a button held at boot keeps the node from sleeping.
    pub sleep_override_ticks: u32,
    /// Period of the 1-second heartbeat event.
    pub second_ticks: u32,
    /// Host and path the HTTP POST is sent to, without scheme.
    pub http_endpoint: &'static str,
    /// Value of the `Content-Type` header of the POST.
    pub content_type: &'static str,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            wake_interval: Duration::from_secs(600),
            state_timeout_ticks: 2 << 10,
            retry_limit: 2,
            sleep_override_ticks: 20_000,
            second_ticks: 1000,
            http_endpoint: "dbos.co.kr/smlf_api_v_2_1/test/set",
            content_type: "application/x-www-form-urlencoded",
        }
    }
}
