//! In-process touch controller simulator.
//!
//! [`sim_pair`] hands out a [`SimBus`] to give the engine and a
//! [`SimHandle`] the test keeps: the handle raises attention, injects
//! reports, corrupts transactions, and inspects what the device
//! received. The simulated device answers the command set with the
//! framing a real controller uses, including continued-read chunking of
//! large messages.

pub mod bus;
mod device;
pub mod profile;

pub use bus::{sim_pair, SimBus, SimHandle};
pub use profile::DeviceProfile;
