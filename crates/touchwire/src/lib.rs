//! Chunked command-response protocol engine for touch controllers.
//!
//! touchwire speaks the framed message protocol of TCM-style touch
//! controllers over a chunk-constrained byte bus: commands go out with a
//! continuation prefix, responses and asynchronous reports come back as
//! marker-framed messages reassembled across continued reads.
//!
//! # Crate Structure
//!
//! - [`bus`] — Bus transaction seam and chunk arithmetic
//! - [`message`] — Wire framing, protocol codes, info structures
//! - [`engine`] — Message engine: command driver, read path, report
//!   routing (behind `engine` feature)
//! - [`sim`] — In-process simulated controller (behind `sim` feature)

/// Re-export bus types.
pub mod bus {
    pub use touchwire_bus::*;
}

/// Re-export message types.
pub mod message {
    pub use touchwire_message::*;
}

/// Re-export engine types (requires `engine` feature).
#[cfg(feature = "engine")]
pub mod engine {
    pub use touchwire_core::*;
}

/// Re-export simulator types (requires `sim` feature).
#[cfg(feature = "sim")]
pub mod sim {
    pub use touchwire_sim::*;
}
