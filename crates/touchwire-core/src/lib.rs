//! Command-response message engine for chunk-constrained touch
//! controller buses.
//!
//! The engine owns a [`touchwire_bus::Bus`] and runs the full protocol
//! dance over it: commands go out chunked with continuation prefixes,
//! framed messages come back and are reassembled, then routed either to
//! the thread blocked on its command response or to the registered
//! report consumers. A predictive read length keeps the common case at
//! one bus transaction per message.

pub mod buffer;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod helper;
pub mod ops;
pub mod reader;
pub mod writer;

pub use buffer::MessageBuffer;
pub use config::{EngineConfig, DEFAULT_MAX_RESPONSE, ROMBOOT_DOWNLOAD_UNIT};
pub use dispatch::{PollScheduler, Report, ReportConsumer};
pub use engine::{CommandStatus, Engine, EngineBuilder};
pub use error::{CoreError, Result};
pub use helper::{HelperSlot, HelperTask};
pub use ops::TargetMode;
pub use reader::MIN_READ_LENGTH;
pub use writer::CommandResponse;
