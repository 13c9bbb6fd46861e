use std::time::Duration;

/// Default bound on a buffered response payload.
pub const DEFAULT_MAX_RESPONSE: usize = 64 * 1024;

/// Granularity of host-download write chunks. Image blocks must stay
/// aligned to the device's flash write unit.
pub const ROMBOOT_DOWNLOAD_UNIT: usize = 16;

/// Tunable parameters of the message engine.
///
/// Chunk sizes bound a single bus transaction; zero disables chunking
/// entirely. All timing values default to what the device family
/// specifies.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Largest single bus read, in bytes. Zero means unbounded.
    pub rd_chunk_size: usize,
    /// Largest single bus write, in bytes. Zero means unbounded. The
    /// effective value shrinks to what the device's identification
    /// advertises.
    pub wr_chunk_size: usize,
    /// Write chunk bound while streaming a host-download image block.
    pub hdl_wr_chunk_size: usize,
    /// How long a command waits for its paired response.
    pub response_timeout: Duration,
    /// Backoff before retrying a failed or out-of-sync first chunk.
    pub read_retry_backoff: Duration,
    /// Settle time after each chunk of a split command write.
    pub write_chunk_delay: Duration,
    /// Settle time granted to a firmware mode switch.
    pub mode_switch_delay: Duration,
    /// Poll period while the application reports BOOTING or UPDATING.
    pub app_status_poll_period: Duration,
    /// Bound on the BOOTING/UPDATING poll loop.
    pub app_status_poll_timeout: Duration,
    /// Delayed poll scheduled after a reset command.
    pub reset_delay: Duration,
    /// Bound on a buffered response payload; larger responses fail the
    /// command.
    pub max_response_size: usize,
    /// Reads are driven by polling instead of an attention line; the
    /// reader-context guard is waived.
    pub polling: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rd_chunk_size: 0,
            wr_chunk_size: 0,
            hdl_wr_chunk_size: 0,
            response_timeout: Duration::from_millis(3000),
            read_retry_backoff: Duration::from_millis(5),
            write_chunk_delay: Duration::from_micros(500),
            mode_switch_delay: Duration::from_millis(100),
            app_status_poll_period: Duration::from_millis(100),
            app_status_poll_timeout: Duration::from_millis(1000),
            reset_delay: Duration::from_millis(50),
            max_response_size: DEFAULT_MAX_RESPONSE,
            polling: false,
        }
    }
}

impl EngineConfig {
    /// Set the read and write chunk sizes.
    pub fn with_chunk_sizes(mut self, rd: usize, wr: usize) -> Self {
        self.rd_chunk_size = rd;
        self.wr_chunk_size = wr;
        self
    }

    /// Set the response timeout.
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Drive reads by polling instead of an attention line.
    pub fn with_polling(mut self, polling: bool) -> Self {
        self.polling = polling;
        self
    }
}
