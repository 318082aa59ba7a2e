//! First-order IIR low-pass applied to each measurement channel.

/// Default smoothing coefficient. Heavily weighted toward history.
pub const DEFAULT_ALPHA: f64 = 0.983;

/// Measurement channel a sample belongs to.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    /// Relative humidity, %RH.
    Humidity,
    /// Temperature, °C.
    Temperature,
}

/// Running averages of both channels.
///
/// An average of `None` is unseeded: the next sample on that channel is
/// passed through unchanged and becomes the average.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterState {
    /// Running humidity average, %RH.
    pub humidity_avg: Option<f64>,
    /// Running temperature average, °C.
    pub temp_avg: Option<f64>,
    /// Weight given to the previous average.
    pub alpha: f64,
}

impl FilterState {
    /// Creates an unseeded filter.
    ///
    /// An `alpha` of `0.0` disables smoothing.
    pub const fn new(alpha: f64) -> Self {
        Self {
            humidity_avg: None,
            temp_avg: None,
            alpha,
        }
    }

    /// Current average of `channel`, if seeded.
    pub fn average(&self, channel: Channel) -> Option<f64> {
        match channel {
            Channel::Humidity => self.humidity_avg,
            Channel::Temperature => self.temp_avg,
        }
    }

    /// Feeds `raw` into the filter for `channel`.
    ///
    /// Returns the new state and the smoothed value. Only the average of
    /// `channel` is read or written.
    #[must_use]
    pub fn update(self, channel: Channel, raw: f64) -> (Self, f64) {
        let smoothed = match self.average(channel) {
            None => raw,
            Some(prev) => (1.0 - self.alpha) * raw + self.alpha * prev,
        };

        let mut next = self;
        match channel {
            Channel::Humidity => next.humidity_avg = Some(smoothed),
            Channel::Temperature => next.temp_avg = Some(smoothed),
        }
        (next, smoothed)
    }

    /// Forgets both averages, keeping `alpha`.
    pub fn reset(&mut self) {
        *self = Self::new(self.alpha);
    }
}

impl Default for FilterState {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHA)
    }
}
