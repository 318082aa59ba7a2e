//! Destinations for published readings.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

/// One smoothed measurement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reading {
    /// Relative humidity in percent.
    pub humidity: f64,
    /// Temperature in degrees Celsius.
    pub temperature_c: f64,
    /// Temperature in degrees Fahrenheit.
    pub temperature_f: f64,
    /// When the temperature read completed.
    pub timestamp: Instant,
}

/// Receives every reading the engine publishes.
///
/// Called from the polling thread. Implementations that hand readings to
/// another thread must do their own synchronisation.
pub trait Sink {
    /// Delivers one reading. Must not block for long; the next tick waits.
    fn publish(&mut self, reading: &Reading);
}

impl<F: FnMut(&Reading)> Sink for F {
    fn publish(&mut self, reading: &Reading) {
        self(reading)
    }
}

/// Latest-value snapshot that can be read from any thread.
#[derive(Clone, Debug, Default)]
pub struct SharedReading {
    inner: Arc<Mutex<Option<Reading>>>,
}

impl SharedReading {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently published reading, if any.
    pub fn latest(&self) -> Option<Reading> {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Sink for SharedReading {
    fn publish(&mut self, reading: &Reading) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = Some(*reading);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;

    fn reading(humidity: f64) -> Reading {
        Reading {
            humidity,
            temperature_c: 20.0,
            temperature_f: 68.0,
            timestamp: Instant::now(),
        }
    }

    #[test]
    fn test_closure_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = |r: &Reading| seen.push(r.humidity);
            sink.publish(&reading(1.0));
            sink.publish(&reading(2.0));
        }
        assert_eq!(seen, [1.0, 2.0]);
    }

    #[test]
    fn test_channel_handoff() {
        let (tx, rx) = mpsc::channel();
        let mut sink = move |r: &Reading| {
            let _ = tx.send(*r);
        };
        sink.publish(&reading(33.0));
        assert_eq!(rx.recv().unwrap().humidity, 33.0);

        drop(rx);
        sink.publish(&reading(34.0));
    }

    #[test]
    fn test_shared_reading_across_threads() {
        let shared = SharedReading::new();
        assert_eq!(shared.latest(), None);

        let mut writer = shared.clone();
        let r = reading(45.0);
        thread::spawn(move || writer.publish(&r)).join().unwrap();

        assert_eq!(shared.latest(), Some(r));
    }
}
