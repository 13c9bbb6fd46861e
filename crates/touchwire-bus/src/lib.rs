//! Bus transaction seam for chunk-constrained touch-controller transports.
//!
//! A touch controller hangs off a byte-oriented bus (SPI or I2C) that moves
//! data in whole transactions: the host asks for exactly `n` bytes and the
//! device shifts out exactly `n` bytes, meaningful or not. This crate defines
//! the [`Bus`] trait the rest of touchwire drives, the transaction error
//! type, and the chunk-count arithmetic shared by the read and write paths.
//!
//! This is the lowest layer of touchwire. Everything else builds on top of
//! the [`Bus`] trait provided here.

pub mod bus;
pub mod chunk;
pub mod error;

pub use bus::Bus;
pub use chunk::chunk_count;
pub use error::{BusError, Result};
