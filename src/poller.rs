//! Background thread running the engine at a fixed cadence.

use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use log::{debug, error, info, warn};

use crate::bus::BusProvider;
use crate::config::MeasurementMode;
use crate::engine::{ConnectionState, Engine};
use crate::schedule::{Ticker, Wake};
use crate::sink::Sink;

/// [`DelayNs`] backed by [`thread::sleep`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadDelay;

impl DelayNs for ThreadDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(ns.into()));
    }

    fn delay_us(&mut self, us: u32) {
        thread::sleep(Duration::from_micros(us.into()));
    }

    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(ms.into()));
    }
}

enum Command {
    Reconnect,
    Stop,
}

/// Handle to the polling thread.
///
/// The thread owns the engine until [`stop`](Self::stop) hands it back.
/// Dropping the handle also stops the thread.
pub struct Poller<P: BusProvider, D, S> {
    commands: Sender<Command>,
    thread: Option<JoinHandle<Engine<P, D, S>>>,
}

impl<P, D, S> Poller<P, D, S>
where
    P: BusProvider + Send + 'static,
    P::Bus: Send,
    D: DelayNs + Send + 'static,
    S: Sink + Send + 'static,
{
    /// Starts polling on a new thread.
    ///
    /// The thread connects first. If that fails it keeps ticking without
    /// measuring until [`reconnect`](Self::reconnect) succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread could not be spawned.
    pub fn spawn(engine: Engine<P, D, S>) -> io::Result<Self> {
        let (commands, inbox) = mpsc::channel();
        let thread = thread::Builder::new()
            .name("si7021-poll".into())
            .spawn(move || run(engine, inbox))?;

        Ok(Self {
            commands,
            thread: Some(thread),
        })
    }
}

impl<P: BusProvider, D, S> Poller<P, D, S> {
    /// Asks the thread to drop the connection and connect again.
    pub fn reconnect(&self) {
        let _ = self.commands.send(Command::Reconnect);
    }

    /// Stops ticking, releases the bus and returns the engine.
    ///
    /// # Panics
    ///
    /// Resumes the polling thread's panic, if it had one.
    pub fn stop(mut self) -> Engine<P, D, S> {
        match self.join() {
            Some(Ok(engine)) => engine,
            Some(Err(payload)) => std::panic::resume_unwind(payload),
            None => unreachable!("poller joined twice"),
        }
    }

    fn join(&mut self) -> Option<thread::Result<Engine<P, D, S>>> {
        let thread = self.thread.take()?;
        let _ = self.commands.send(Command::Stop);
        Some(thread.join())
    }
}

impl<P: BusProvider, D, S> Drop for Poller<P, D, S> {
    fn drop(&mut self) {
        if let Some(Err(_)) = self.join() {
            error!("si7021 poll thread panicked");
        }
    }
}

fn run<P, D, S>(mut engine: Engine<P, D, S>, inbox: Receiver<Command>) -> Engine<P, D, S>
where
    P: BusProvider,
    D: DelayNs,
    S: Sink,
{
    let mode = engine.config().mode;
    let mut ticker = Ticker::new(engine.config().period());
    info!("si7021 polling every {:?} ({mode:?})", ticker.period());
    if mode == MeasurementMode::EveryTick && engine.config().overruns_period() {
        info!(
            "si7021 settling of {:?} exceeds the tick period; readings will arrive below {} Hz",
            engine.config().settling,
            engine.config().rate_hz
        );
    }

    // Failures are already logged by the engine.
    let _ = engine.connect();

    let mut failures = 0u32;
    loop {
        match ticker.wait(&inbox) {
            Wake::Tick(tick) => {
                if engine.state() != ConnectionState::Connected || !mode.admits(&tick) {
                    continue;
                }
                match engine.poll_once() {
                    Ok(_) if failures > 0 => {
                        info!("si7021 readings resumed after {failures} failed cycles");
                        failures = 0;
                    }
                    Ok(_) => {}
                    Err(e) if failures == 0 => {
                        warn!("si7021 poll failed: {e}");
                        failures = 1;
                    }
                    Err(e) => {
                        debug!("si7021 poll failed: {e}");
                        failures = failures.saturating_add(1);
                    }
                }
            }
            Wake::Command(Command::Reconnect) => {
                engine.disconnect();
                let _ = engine.connect();
            }
            Wake::Command(Command::Stop) | Wake::Closed => break,
        }
    }

    // Ticking has stopped; only now give up the bus.
    engine.disconnect();
    engine
}
