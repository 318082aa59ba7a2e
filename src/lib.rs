//! Si7021 Sensor Driver
//!
//! This crate polls a Si7021 (and compatible HTU21D-style) temperature and
//! humidity sensor over I2C, built on top of the [`embedded-hal`] traits, and
//! publishes smoothed readings in %RH, °C and °F.
//!
//! # Features
//! - Register codec and smoothing filter usable in `no_std` environments
//! - Acquisition engine with an explicit connect/reset lifecycle
//! - Background poller ticking on wall-clock aligned boundaries (20 Hz by
//!   default), optionally measuring only once per second
//! - Optional exponential smoothing of each channel
//!
//! # Cargo Features
//! - `std` (default): engine, poller and sinks; logging through [`log`]
//! - `linux`: [`LinuxBus`] opening `/dev/i2c-N` via `linux-embedded-hal`
//! - `defmt`: Implements `defmt::Format` for the `no_std` types
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "linux")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use si7021_sensor::{Config, Engine, LinuxBus, Poller, SharedReading, ThreadDelay};
//!
//! let latest = SharedReading::new();
//! let engine = Engine::new(LinuxBus::new(1), ThreadDelay, Config::default())?
//!     .with_sink(latest.clone());
//! let poller = Poller::spawn(engine)?;
//!
//! std::thread::sleep(std::time::Duration::from_secs(1));
//! if let Some(reading) = latest.latest() {
//!     println!("{:.1} %RH {:.2} °C", reading.humidity, reading.temperature_c);
//! }
//! poller.stop();
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "linux"))]
//! # fn main() {}
//! ```
//!
//! [`embedded-hal`]: https://docs.rs/embedded-hal

#![cfg_attr(not(any(test, feature = "std")), no_std)]

pub mod bus;
pub mod config;
pub mod error;
pub mod filter;
pub mod si7021;

#[cfg(feature = "std")]
pub mod engine;
#[cfg(feature = "std")]
pub mod poller;
#[cfg(feature = "std")]
pub mod schedule;
#[cfg(feature = "std")]
pub mod sink;

#[cfg(feature = "linux")]
pub use bus::LinuxBus;
pub use bus::{BusProvider, BusUnavailable, OwnedBus};
pub use config::{Config, MeasurementMode, Smoothing};
pub use error::{ConfigError, ConnectError, PollError, ProtocolError};
pub use filter::{Channel, FilterState};
pub use si7021::SensorAddress;

#[cfg(feature = "std")]
pub use engine::{ConnectionState, Engine, FaultReason};
#[cfg(feature = "std")]
pub use poller::{Poller, ThreadDelay};
#[cfg(feature = "std")]
pub use schedule::{Tick, Ticker};
#[cfg(feature = "std")]
pub use sink::{Reading, SharedReading, Sink};
