//! Connection lifecycle and the per-tick measurement cycle.

use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorType, I2c};
use log::{debug, info, trace, warn};

use crate::bus::BusProvider;
use crate::config::Config;
use crate::error::{ConfigError, ConnectError, PollError};
use crate::filter::{Channel, FilterState};
use crate::si7021::{self, HUMIDITY_RESPONSE_LEN, TEMPERATURE_RESPONSE_LEN};
use crate::sink::{Reading, Sink};

/// Error type of the I2C bus handed out by `P`.
pub type BusError<P> = <<P as BusProvider>::Bus as ErrorType>::Error;

/// Why the last connection attempt failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaultReason {
    /// The bus handle could not be acquired.
    Acquire,
    /// The sensor did not accept the reset command.
    Reset,
}

/// Lifecycle state of an [`Engine`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// No bus held. The initial state, and the state after `disconnect`.
    Disconnected,
    /// A connection attempt is in progress.
    Connecting,
    /// The bus is held and the sensor has been reset.
    Connected,
    /// Left only by an explicit [`Engine::connect`].
    Faulted(FaultReason),
}

/// Drives one Si7021: owns the bus while connected, runs measurement
/// cycles, smooths the results and publishes them to a [`Sink`].
///
/// The engine is inert until a sink is attached; [`connect`](Self::connect)
/// does nothing before then.
pub struct Engine<P: BusProvider, D, S> {
    config: Config,
    provider: P,
    delay: D,
    sink: Option<S>,
    // Some exactly while Connected.
    bus: Option<P::Bus>,
    state: ConnectionState,
    filter: FilterState,
    last: Option<Reading>,
}

impl<P, D, S> Engine<P, D, S>
where
    P: BusProvider,
    D: DelayNs,
    S: Sink,
{
    /// Creates a disconnected engine with no sink attached.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `config` fails validation.
    pub fn new(provider: P, delay: D, config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            provider,
            delay,
            sink: None,
            bus: None,
            state: ConnectionState::Disconnected,
            filter: FilterState::new(config.smoothing.alpha()),
            last: None,
        })
    }

    /// Attaches the sink, making the engine ready to connect.
    pub fn with_sink(mut self, sink: S) -> Self {
        self.attach_sink(sink);
        self
    }

    /// Attaches or replaces the sink.
    pub fn attach_sink(&mut self, sink: S) {
        self.sink = Some(sink);
    }

    /// Whether the engine is fully constructed and may connect.
    pub fn is_ready(&self) -> bool {
        self.sink.is_some()
    }

    /// Parameters the engine was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Snapshot of both running averages.
    pub fn filter_state(&self) -> FilterState {
        self.filter
    }

    /// The last reading published.
    pub fn last_reading(&self) -> Option<Reading> {
        self.last
    }

    /// Forgets both running averages. The next cycle publishes raw values.
    pub fn reset_filter(&mut self) {
        self.filter.reset();
    }

    /// Acquires the bus, soft-resets the sensor and waits for it to settle.
    ///
    /// Calling this while connected, or before a sink is attached, does
    /// nothing. From `Faulted` it is a fresh attempt.
    ///
    /// # Errors
    ///
    /// On failure the engine is left `Faulted` without holding the bus.
    pub fn connect(&mut self) -> Result<(), ConnectError<P::Error, BusError<P>>> {
        if !self.is_ready() {
            debug!("connect deferred: no sink attached");
            return Ok(());
        }
        if self.state == ConnectionState::Connected {
            return Ok(());
        }

        self.state = ConnectionState::Connecting;
        let address = self.config.address.get();

        let mut bus = match self.provider.acquire() {
            Ok(bus) => bus,
            Err(e) => {
                warn!("si7021@{address:#04x}: bus acquisition failed: {e:?}");
                self.state = ConnectionState::Faulted(FaultReason::Acquire);
                return Err(ConnectError::Acquire(e));
            }
        };

        if let Err(e) = bus.write(address, &si7021::reset_command()) {
            warn!("si7021@{address:#04x}: reset failed: {e:?}");
            self.provider.release(bus);
            self.state = ConnectionState::Faulted(FaultReason::Reset);
            return Err(ConnectError::Reset(e));
        }
        self.settle();

        self.bus = Some(bus);
        self.state = ConnectionState::Connected;
        info!("si7021@{address:#04x}: connected");
        Ok(())
    }

    /// Returns the bus to the provider. Idempotent.
    pub fn disconnect(&mut self) {
        if let Some(bus) = self.bus.take() {
            self.provider.release(bus);
        }
        if self.state != ConnectionState::Disconnected {
            info!("si7021@{:#04x}: disconnected", self.config.address.get());
        }
        self.state = ConnectionState::Disconnected;
    }

    /// Runs one measurement cycle and publishes the result.
    ///
    /// Humidity is measured first; the temperature read back afterwards is
    /// the one taken during that conversion.
    ///
    /// # Errors
    ///
    /// Any bus or protocol failure aborts the cycle before anything is
    /// published, leaving the filter untouched. The connection stays up.
    pub fn poll_once(&mut self) -> Result<Reading, PollError<BusError<P>>> {
        if self.state != ConnectionState::Connected {
            return Err(PollError::NotConnected);
        }
        let Some(bus) = self.bus.as_mut() else {
            return Err(PollError::NotConnected);
        };
        let address = self.config.address.get();

        bus.write(address, &si7021::measure_humidity_command())?;
        self.delay.delay_us(micros(self.config.settling));

        let mut response = [0; HUMIDITY_RESPONSE_LEN];
        bus.read(address, &mut response)?;
        let humidity = si7021::parse_humidity(&response).map_err(PollError::Protocol)?;

        let mut response = [0; TEMPERATURE_RESPONSE_LEN];
        bus.write_read(address, &si7021::read_temperature_command(), &mut response)?;
        let timestamp = Instant::now();
        let temperature = si7021::parse_temperature(&response).map_err(PollError::Protocol)?;

        let (filter, humidity) = self.filter.update(Channel::Humidity, humidity);
        let (filter, temperature_c) = filter.update(Channel::Temperature, temperature);
        self.filter = filter;

        let reading = Reading {
            humidity,
            temperature_c,
            temperature_f: si7021::celsius_to_fahrenheit(temperature_c),
            timestamp,
        };
        if let Some(sink) = self.sink.as_mut() {
            sink.publish(&reading);
        }
        self.last = Some(reading);
        trace!(
            "si7021@{address:#04x}: {:.2} %RH {:.2} C",
            reading.humidity, reading.temperature_c
        );
        Ok(reading)
    }

    /// Disconnects and gives back the provider and delay.
    pub fn into_parts(mut self) -> (P, D) {
        self.disconnect();
        (self.provider, self.delay)
    }

    fn settle(&mut self) {
        self.delay.delay_us(micros(self.config.settling));
    }
}

fn micros(d: Duration) -> u32 {
    u32::try_from(d.as_micros()).unwrap_or(u32::MAX)
}
