//! Acquisition and release of the I2C bus handle.

use embedded_hal::i2c::{I2c, SevenBitAddress};

/// Source of an I2C bus handle.
///
/// The engine acquires the bus when it connects and hands it back when it
/// disconnects.
pub trait BusProvider {
    /// The bus handle.
    type Bus: I2c<SevenBitAddress>;
    /// Error returned when the handle cannot be acquired.
    type Error: core::fmt::Debug;

    /// Acquires the bus handle.
    fn acquire(&mut self) -> Result<Self::Bus, Self::Error>;

    /// Returns a handle obtained from [`acquire`](Self::acquire).
    fn release(&mut self, bus: Self::Bus);
}

/// The bus is already held by someone else.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BusUnavailable;

/// Provider wrapping an I2C peripheral that is already open.
pub struct OwnedBus<I2C> {
    bus: Option<I2C>,
}

impl<I2C> OwnedBus<I2C> {
    /// Wraps `bus`, which is handed out on the first acquire.
    pub fn new(bus: I2C) -> Self {
        Self { bus: Some(bus) }
    }

    /// Gives the peripheral back, or `None` while it is acquired.
    pub fn into_inner(self) -> Option<I2C> {
        self.bus
    }
}

impl<I2C: I2c<SevenBitAddress>> BusProvider for OwnedBus<I2C> {
    type Bus = I2C;
    type Error = BusUnavailable;

    fn acquire(&mut self) -> Result<I2C, BusUnavailable> {
        self.bus.take().ok_or(BusUnavailable)
    }

    fn release(&mut self, bus: I2C) {
        self.bus = Some(bus);
    }
}

/// Provider opening `/dev/i2c-<port>` through the Linux i2c-dev interface.
#[cfg(feature = "linux")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinuxBus {
    port: u8,
}

#[cfg(feature = "linux")]
impl LinuxBus {
    /// Provider for adapter number `port`.
    pub fn new(port: u8) -> Self {
        Self { port }
    }

    /// Device node of the adapter.
    pub fn path(&self) -> std::string::String {
        std::format!("/dev/i2c-{}", self.port)
    }
}

#[cfg(feature = "linux")]
impl BusProvider for LinuxBus {
    type Bus = linux_embedded_hal::I2cdev;
    type Error = linux_embedded_hal::i2cdev::linux::LinuxI2CError;

    fn acquire(&mut self) -> Result<Self::Bus, Self::Error> {
        linux_embedded_hal::I2cdev::new(self.path())
    }

    fn release(&mut self, bus: Self::Bus) {
        // Closing the file descriptor releases the adapter.
        drop(bus);
    }
}
