use core::time::Duration;

use crate::error::ConfigError;
use crate::filter::DEFAULT_ALPHA;
use crate::si7021::SensorAddress;

/// Default poll rate in ticks per second.
pub const DEFAULT_RATE_HZ: u32 = 20;

/// Default wait between issuing a command and reading its result. The part
/// needs about 20 ms; the rest is margin.
pub const DEFAULT_SETTLING: Duration = Duration::from_millis(100);

/// Whether raw samples are smoothed before publication.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Smoothing {
    /// Publish raw samples.
    Disabled,
    /// Exponential moving average with the given coefficient in `[0, 1)`.
    Exponential(f64),
}

impl Smoothing {
    /// Coefficient handed to the filter. `Disabled` is a coefficient of zero.
    pub fn alpha(self) -> f64 {
        match self {
            Self::Disabled => 0.0,
            Self::Exponential(alpha) => alpha,
        }
    }
}

impl Default for Smoothing {
    fn default() -> Self {
        Self::Exponential(DEFAULT_ALPHA)
    }
}

/// Which ticks perform a measurement.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MeasurementMode {
    /// Measure on every tick.
    ///
    /// A cycle blocks for the settling delay, so when the delay is longer
    /// than the period the boundaries it overlaps are folded away and the
    /// effective rate drops. With the defaults (100 ms settling, 50 ms
    /// period) each cycle spans three boundaries: roughly 6-7 readings/s.
    #[default]
    EveryTick,
    /// Measure once per second, on the tick occupying `slot` within the
    /// second. All other ticks are idle.
    Gated {
        /// Tick index within the second, `0..rate_hz`.
        slot: u32,
    },
}

/// Construction parameters of an [`Engine`](crate::Engine).
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    /// Bus address of the sensor.
    pub address: SensorAddress,
    /// Filtering applied to both channels.
    pub smoothing: Smoothing,
    /// Ticks per second. Must divide 1000.
    pub rate_hz: u32,
    /// Which ticks take a measurement.
    pub mode: MeasurementMode,
    /// Wait after the reset and humidity commands.
    pub settling: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: SensorAddress::default(),
            smoothing: Smoothing::default(),
            rate_hz: DEFAULT_RATE_HZ,
            mode: MeasurementMode::default(),
            settling: DEFAULT_SETTLING,
        }
    }
}

impl Config {
    /// Sets the sensor address.
    pub fn with_address(mut self, address: SensorAddress) -> Self {
        self.address = address;
        self
    }

    /// Sets the smoothing applied to both channels.
    pub fn with_smoothing(mut self, smoothing: Smoothing) -> Self {
        self.smoothing = smoothing;
        self
    }

    /// Sets the tick rate.
    pub fn with_rate_hz(mut self, rate_hz: u32) -> Self {
        self.rate_hz = rate_hz;
        self
    }

    /// Sets the measurement mode.
    pub fn with_mode(mut self, mode: MeasurementMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the settling delay.
    pub fn with_settling(mut self, settling: Duration) -> Self {
        self.settling = settling;
        self
    }

    /// Length of one tick.
    pub fn period(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.rate_hz.max(1)))
    }

    /// Whether one measurement cycle outlasts a tick, so that measuring on
    /// every tick cannot keep up with `rate_hz`.
    pub fn overruns_period(&self) -> bool {
        self.settling >= self.period()
    }

    /// Checks the parameters for consistency.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let alpha = self.smoothing.alpha();
        if !(0.0..1.0).contains(&alpha) {
            return Err(ConfigError::InvalidAlpha(alpha));
        }
        if self.rate_hz == 0 || 1000 % self.rate_hz != 0 {
            return Err(ConfigError::InvalidRate(self.rate_hz));
        }
        if let MeasurementMode::Gated { slot } = self.mode {
            if slot >= self.rate_hz {
                return Err(ConfigError::InvalidSlot {
                    slot,
                    rate_hz: self.rate_hz,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.address.get(), 0x40);
        assert_eq!(config.smoothing, Smoothing::Exponential(0.983));
        assert_eq!(config.rate_hz, 20);
        assert_eq!(config.mode, MeasurementMode::EveryTick);
        assert_eq!(config.settling, Duration::from_millis(100));
        assert_eq!(config.period(), Duration::from_millis(50));
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_default_cycle_overruns_period() {
        assert!(Config::default().overruns_period());
        let config = Config::default().with_settling(Duration::from_millis(20));
        assert!(!config.overruns_period());
        let config = config.with_rate_hz(100);
        assert!(config.overruns_period());
    }

    #[test]
    fn test_disabled_smoothing_is_zero_alpha() {
        assert_eq!(Smoothing::Disabled.alpha(), 0.0);
        let config = Config::default().with_smoothing(Smoothing::Disabled);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_rejects_bad_alpha() {
        for alpha in [1.0, 1.5, -0.1, f64::NAN] {
            let config = Config::default().with_smoothing(Smoothing::Exponential(alpha));
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidAlpha(_))
            ));
        }
    }

    #[test]
    fn test_rejects_bad_rate() {
        assert_eq!(
            Config::default().with_rate_hz(0).validate(),
            Err(ConfigError::InvalidRate(0))
        );
        assert_eq!(
            Config::default().with_rate_hz(3).validate(),
            Err(ConfigError::InvalidRate(3))
        );
        assert_eq!(Config::default().with_rate_hz(10).validate(), Ok(()));
    }

    #[test]
    fn test_gated_slot_must_exist() {
        let config = Config::default().with_mode(MeasurementMode::Gated { slot: 19 });
        assert_eq!(config.validate(), Ok(()));

        let config = config.with_mode(MeasurementMode::Gated { slot: 20 });
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidSlot {
                slot: 20,
                rate_hz: 20
            })
        );
    }
}
