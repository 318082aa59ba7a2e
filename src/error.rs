use core::fmt;

/// A response from the sensor had the wrong number of bytes.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProtocolError {
    /// Bytes the command is defined to return.
    pub expected: usize,
    /// Bytes actually received.
    pub received: usize,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "malformed response: expected {} bytes, received {}",
            self.expected, self.received
        )
    }
}

/// Errors from bringing the sensor online.
///
/// `A` is the bus provider's acquisition error, `E` the I2C bus error.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq, Eq)]
pub enum ConnectError<A, E> {
    /// The bus handle could not be acquired.
    Acquire(A),
    /// The soft-reset command was not acknowledged.
    Reset(E),
}

impl<A: fmt::Debug, E: fmt::Debug> fmt::Display for ConnectError<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Acquire(e) => write!(f, "bus acquisition failed: {e:?}"),
            Self::Reset(e) => write!(f, "sensor reset failed: {e:?}"),
        }
    }
}

/// Errors from a single poll cycle. None of these are fatal to the connection.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq, Eq)]
pub enum PollError<E> {
    /// Polling was attempted while the engine was not connected.
    NotConnected,
    /// Error from the I2C bus.
    Bus(E),
    /// The sensor returned a response of the wrong shape.
    Protocol(ProtocolError),
}

impl<E> From<E> for PollError<E> {
    fn from(value: E) -> Self {
        Self::Bus(value)
    }
}

impl<E: fmt::Debug> fmt::Display for PollError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => f.write_str("sensor is not connected"),
            Self::Bus(e) => write!(f, "bus error: {e:?}"),
            Self::Protocol(e) => write!(f, "{e}"),
        }
    }
}

/// Rejected construction parameters.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ConfigError {
    /// Smoothing coefficient outside `[0, 1)`.
    InvalidAlpha(f64),
    /// Poll rate of zero, or too fast to give a whole-millisecond period.
    InvalidRate(u32),
    /// Gated measurement slot does not exist at the configured rate.
    InvalidSlot {
        /// Requested slot.
        slot: u32,
        /// Ticks per second.
        rate_hz: u32,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAlpha(a) => write!(f, "smoothing coefficient {a} is outside [0, 1)"),
            Self::InvalidRate(r) => write!(f, "poll rate {r} Hz is not supported"),
            Self::InvalidSlot { slot, rate_hz } => {
                write!(f, "slot {slot} does not exist at {rate_hz} Hz")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ProtocolError {}

#[cfg(feature = "std")]
impl<A: fmt::Debug, E: fmt::Debug> std::error::Error for ConnectError<A, E> {}

#[cfg(feature = "std")]
impl<E: fmt::Debug> std::error::Error for PollError<E> {}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}
