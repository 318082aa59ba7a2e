//! Fixed-rate tick source aligned to wall-clock period boundaries.

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::config::MeasurementMode;

/// One fired tick.
///
/// A tick that fires late stands for every boundary that passed since the
/// previous one, `seq()..=last()`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tick {
    seq: u64,
    last: u64,
    per_second: u64,
}

impl Tick {
    /// Number of whole periods between the Unix epoch and this tick's boundary.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Latest boundary covered by this tick. Equal to `seq()` unless late.
    pub fn last(&self) -> u64 {
        self.last
    }

    /// Position of this tick within its wall-clock second.
    pub fn slot_in_second(&self) -> u32 {
        (self.seq % self.per_second.max(1)) as u32
    }

    /// Whether any covered boundary occupies `slot` within its second.
    pub fn covers_slot(&self, slot: u32) -> bool {
        let per_second = self.per_second.max(1);
        let ahead = (u64::from(slot) + per_second - self.seq % per_second) % per_second;
        ahead <= self.last - self.seq
    }
}

impl MeasurementMode {
    /// Whether a measurement should be taken on `tick`.
    pub fn admits(&self, tick: &Tick) -> bool {
        match *self {
            MeasurementMode::EveryTick => true,
            MeasurementMode::Gated { slot } => tick.covers_slot(slot),
        }
    }
}

/// Outcome of [`Ticker::wait`].
#[derive(Debug, PartialEq, Eq)]
pub enum Wake<T> {
    /// The pending tick is due.
    Tick(Tick),
    /// A command arrived before the deadline. The pending tick stays armed.
    Command(T),
    /// Every sender is gone.
    Closed,
}

/// Produces ticks on multiples of `period` since the Unix epoch.
///
/// The first deadline is derived from the wall clock once; later deadlines
/// advance on the monotonic clock by exactly one period, so sleep overrun
/// does not accumulate. Boundaries that have already passed when a tick
/// fires are folded into that tick instead of firing in a burst.
#[derive(Debug)]
pub struct Ticker {
    period: Duration,
    next: Instant,
    seq: u64,
}

impl Ticker {
    /// Creates a ticker whose first tick lands on the next wall-clock
    /// multiple of `period`.
    pub fn new(period: Duration) -> Self {
        Self::aligned(period, SystemTime::now(), Instant::now())
    }

    /// Aligns to the first boundary after `wall`, where `wall` and `mono`
    /// name the same moment.
    fn aligned(period: Duration, wall: SystemTime, mono: Instant) -> Self {
        let period = period.max(Duration::from_millis(1));
        let since_epoch = wall.duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
        let period_ns = period.as_nanos();
        let seq = since_epoch / period_ns + 1;
        let until = (seq * period_ns - since_epoch) as u64;

        Self {
            period,
            next: mono + Duration::from_nanos(until),
            seq: seq as u64,
        }
    }

    /// Length of one tick.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Instant of the pending tick.
    pub fn deadline(&self) -> Instant {
        self.next
    }

    /// Blocks until the pending tick is due or a command arrives.
    pub fn wait<T>(&mut self, commands: &Receiver<T>) -> Wake<T> {
        loop {
            let now = Instant::now();
            if now >= self.next {
                return Wake::Tick(self.fire(now));
            }
            match commands.recv_timeout(self.next - now) {
                Ok(command) => return Wake::Command(command),
                Err(RecvTimeoutError::Disconnected) => return Wake::Closed,
                // recv_timeout may return marginally early; re-check the clock.
                Err(RecvTimeoutError::Timeout) => continue,
            }
        }
    }

    /// Fires the pending tick at `now` and arms the next future boundary.
    fn fire(&mut self, now: Instant) -> Tick {
        let seq = self.seq;

        self.next += self.period;
        self.seq += 1;
        if now >= self.next {
            let missed = ((now - self.next).as_nanos() / self.period.as_nanos()) as u32 + 1;
            self.next += self.period * missed;
            self.seq += u64::from(missed);
        }

        Tick {
            seq,
            last: self.seq - 1,
            per_second: (1_000_000_000 / self.period.as_nanos()) as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    const PERIOD: Duration = Duration::from_millis(50);

    fn ticker_at(wall_ms: u64) -> (Ticker, Instant) {
        let mono = Instant::now();
        let wall = UNIX_EPOCH + Duration::from_millis(wall_ms);
        (Ticker::aligned(PERIOD, wall, mono), mono)
    }

    #[test]
    fn test_aligns_to_next_boundary() {
        let (ticker, mono) = ticker_at(1_000_020);
        assert_eq!(ticker.deadline() - mono, Duration::from_millis(30));
        assert_eq!(ticker.seq, 20_001);
    }

    #[test]
    fn test_on_boundary_waits_full_period() {
        let (ticker, mono) = ticker_at(1_000_000);
        assert_eq!(ticker.deadline() - mono, PERIOD);
    }

    #[test]
    fn test_fire_advances_one_period() {
        let (mut ticker, _) = ticker_at(1_000_020);
        let first = ticker.deadline();

        let tick = ticker.fire(first + Duration::from_millis(3));
        assert_eq!(tick.seq(), 20_001);
        assert_eq!(tick.slot_in_second(), 1);
        // Lateness in firing does not shift the next deadline.
        assert_eq!(ticker.deadline(), first + PERIOD);
    }

    #[test]
    fn test_fire_skips_missed_boundaries() {
        let (mut ticker, _) = ticker_at(1_000_020);
        let first = ticker.deadline();

        let tick = ticker.fire(first + Duration::from_millis(170));
        assert_eq!(tick.seq(), 20_001);
        assert_eq!(tick.last(), 20_004);
        assert_eq!(ticker.deadline(), first + Duration::from_millis(200));
        assert_eq!(ticker.seq, 20_005);
    }

    #[test]
    fn test_late_fire_still_admits_skipped_slot() {
        let (mut ticker, _) = ticker_at(1_000_020);
        let first = ticker.deadline();
        let mode = MeasurementMode::Gated { slot: 2 };

        // Wakes after boundaries 20001 (slot 1) and 20002 (slot 2) have passed.
        let late = ticker.fire(first + Duration::from_millis(60));
        assert_eq!(late.slot_in_second(), 1);
        assert_eq!(late.last(), 20_002);
        assert!(mode.admits(&late));

        // The rest of the second is idle.
        let mut hits = 0;
        for _ in 0..17 {
            let now = ticker.deadline();
            if mode.admits(&ticker.fire(now)) {
                hits += 1;
            }
        }
        assert_eq!(hits, 0);
    }

    #[test]
    fn test_long_stall_covers_every_slot() {
        let tick = Tick {
            seq: 41,
            last: 65,
            per_second: 20,
        };
        for slot in 0..20 {
            assert!(tick.covers_slot(slot));
        }
    }

    #[test]
    fn test_covers_slot_across_second_boundary() {
        let tick = Tick {
            seq: 58,
            last: 61,
            per_second: 20,
        };
        for slot in [18, 19, 0, 1] {
            assert!(tick.covers_slot(slot));
        }
        assert!(!tick.covers_slot(2));
        assert!(!tick.covers_slot(17));
    }

    #[test]
    fn test_slot_wraps_each_second() {
        let tick = Tick {
            seq: 40,
            last: 40,
            per_second: 20,
        };
        assert_eq!(tick.slot_in_second(), 0);
        let tick = Tick {
            seq: 59,
            last: 59,
            per_second: 20,
        };
        assert_eq!(tick.slot_in_second(), 19);
    }

    #[test]
    fn test_mode_admits() {
        let tick = Tick {
            seq: 43,
            last: 43,
            per_second: 20,
        };
        assert!(MeasurementMode::EveryTick.admits(&tick));
        assert!(MeasurementMode::Gated { slot: 3 }.admits(&tick));
        assert!(!MeasurementMode::Gated { slot: 4 }.admits(&tick));
    }

    #[test]
    fn test_gated_hits_once_per_second() {
        let (mut ticker, _) = ticker_at(1_000_020);
        let mode = MeasurementMode::Gated { slot: 7 };
        let mut hits = 0;
        for _ in 0..60 {
            let now = ticker.deadline();
            if mode.admits(&ticker.fire(now)) {
                hits += 1;
            }
        }
        assert_eq!(hits, 3);
    }

    #[test]
    fn test_wait_returns_command() {
        let (tx, rx) = mpsc::channel();
        let mut ticker = Ticker::new(Duration::from_secs(10));
        tx.send(7u8).unwrap();
        assert_eq!(ticker.wait(&rx), Wake::Command(7));
    }

    #[test]
    fn test_wait_reports_closed() {
        let (tx, rx) = mpsc::channel::<()>();
        drop(tx);
        let mut ticker = Ticker::new(Duration::from_secs(10));
        assert_eq!(ticker.wait(&rx), Wake::Closed);
    }

    #[test]
    fn test_wait_ticks() {
        let (_tx, rx) = mpsc::channel::<()>();
        let mut ticker = Ticker::new(Duration::from_millis(10));
        let deadline = ticker.deadline();
        assert!(matches!(ticker.wait(&rx), Wake::Tick(_)));
        assert!(Instant::now() >= deadline);
    }
}
