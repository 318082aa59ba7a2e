//! Si7021 command set and result decoding.
//!
//! The sensor is driven with single-byte commands. A humidity conversion is
//! started with [`MEASURE_HUMIDITY`], and after a settling delay the result is
//! read back as three bytes (MSB, LSB, checksum). The temperature measured as
//! part of that conversion is then fetched with a write-then-read of
//! [`READ_TEMPERATURE`], returning two bytes.

use crate::error::ProtocolError;

/// Fixed I2C address of the Si7021.
pub const DEFAULT_ADDRESS: u8 = 0x40;

/// Soft reset.
pub const RESET: u8 = 0xFE;

/// Measure relative humidity, no-hold master mode.
pub const MEASURE_HUMIDITY: u8 = 0xF5;

/// Read the temperature value from the previous humidity measurement.
pub const READ_TEMPERATURE: u8 = 0xE0;

/// Length of a humidity result: MSB, LSB and an (unused) checksum.
pub const HUMIDITY_RESPONSE_LEN: usize = 3;

/// Length of a temperature result: MSB, LSB.
pub const TEMPERATURE_RESPONSE_LEN: usize = 2;

/// 7-bit I2C address of a sensor.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SensorAddress(u8);

impl SensorAddress {
    /// Returns `None` if `addr` does not fit in 7 bits.
    pub const fn new(addr: u8) -> Option<Self> {
        if addr <= 0x7F { Some(Self(addr)) } else { None }
    }

    /// The raw address byte.
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl Default for SensorAddress {
    fn default() -> Self {
        Self(DEFAULT_ADDRESS)
    }
}

/// Soft-resets the sensor. No response follows.
pub fn reset_command() -> [u8; 1] {
    [RESET]
}

/// Starts a humidity conversion. The result is not readable until the
/// settling delay has passed.
pub fn measure_humidity_command() -> [u8; 1] {
    [MEASURE_HUMIDITY]
}

/// Fetches the temperature taken during the most recent humidity
/// conversion. Without a prior humidity measurement the result is stale.
pub fn read_temperature_command() -> [u8; 1] {
    [READ_TEMPERATURE]
}

/// Converts a raw humidity word to %RH.
///
/// The result is not clamped; values slightly outside `0..=100` are within
/// the sensor's tolerance near the extremes.
pub fn decode_humidity(hi: u8, lo: u8) -> f64 {
    let raw = u16::from_be_bytes([hi, lo]);
    125.0 * f64::from(raw) / 65536.0 - 6.0
}

/// Converts a raw temperature word to degrees Celsius.
pub fn decode_temperature(hi: u8, lo: u8) -> f64 {
    let raw = u16::from_be_bytes([hi, lo]);
    175.72 * f64::from(raw) / 65536.0 - 46.85
}

/// Converts degrees Celsius to degrees Fahrenheit.
pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    c * 9.0 / 5.0 + 32.0
}

/// Decodes a complete humidity response. The checksum byte is ignored.
///
/// # Errors
///
/// Returns a [`ProtocolError`] if `response` is not exactly
/// [`HUMIDITY_RESPONSE_LEN`] bytes long.
pub fn parse_humidity(response: &[u8]) -> Result<f64, ProtocolError> {
    match *response {
        [hi, lo, _checksum] => Ok(decode_humidity(hi, lo)),
        _ => Err(ProtocolError {
            expected: HUMIDITY_RESPONSE_LEN,
            received: response.len(),
        }),
    }
}

/// Decodes a complete temperature response to degrees Celsius.
///
/// # Errors
///
/// Returns a [`ProtocolError`] if `response` is not exactly
/// [`TEMPERATURE_RESPONSE_LEN`] bytes long.
pub fn parse_temperature(response: &[u8]) -> Result<f64, ProtocolError> {
    match *response {
        [hi, lo] => Ok(decode_temperature(hi, lo)),
        _ => Err(ProtocolError {
            expected: TEMPERATURE_RESPONSE_LEN,
            received: response.len(),
        }),
    }
}
