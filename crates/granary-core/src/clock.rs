//! World clock and time tracking for the Granary world.
//!
//! The clock is the single source of truth for world time. It holds an
//! absolute tick counter and the wall-clock epoch at which tick zero began.
//! Day number and subphase are derived from the tick counter and never
//! stored independently: a day has two ticks, Morning then Evening.
//!
//! Tick `n` is due once `epoch + n * tick_seconds` has passed. Callers ask
//! the clock how many ticks are pending at `now` and run the tick pipeline
//! that many times.

use chrono::{DateTime, Utc};
use granary_types::Subphase;

/// Ticks in one world day.
pub const TICKS_PER_DAY: u64 = 2;

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Tick counter would overflow.
    #[error("tick counter overflow: cannot advance beyond u64::MAX")]
    TickOverflow,

    /// Invalid time configuration (e.g. zero seconds per tick).
    #[error("invalid time configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

/// World clock tracking the absolute tick and its wall-clock schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldClock {
    /// Ticks completed since the world began.
    tick: u64,

    /// Wall-clock instant tick zero began.
    epoch: DateTime<Utc>,

    /// Real-time seconds per tick.
    tick_seconds: u64,
}

impl WorldClock {
    /// Create a new clock at tick zero (day 1, Morning).
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] if `tick_seconds` is zero.
    pub fn new(epoch: DateTime<Utc>, tick_seconds: u64) -> Result<Self, ClockError> {
        Self::from_parts(0, epoch, tick_seconds)
    }

    /// Create a clock from explicit parameters (state restoration and tests).
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] if `tick_seconds` is zero.
    pub fn from_parts(
        tick: u64,
        epoch: DateTime<Utc>,
        tick_seconds: u64,
    ) -> Result<Self, ClockError> {
        if tick_seconds == 0 {
            return Err(ClockError::InvalidConfig {
                reason: "tick_seconds must be at least 1".to_owned(),
            });
        }
        Ok(Self {
            tick,
            epoch,
            tick_seconds,
        })
    }

    /// Advance the clock by one tick. Returns the new tick number.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::TickOverflow`] if the tick counter would exceed
    /// `u64::MAX`.
    pub fn advance(&mut self) -> Result<u64, ClockError> {
        self.tick = self.tick.checked_add(1).ok_or(ClockError::TickOverflow)?;
        Ok(self.tick)
    }

    /// Jump the counter forward without running the skipped ticks.
    pub const fn fast_forward(&mut self, ticks: u64) {
        self.tick = self.tick.saturating_add(ticks);
    }

    /// Return the current tick number.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Return the wall-clock instant tick zero began.
    pub const fn epoch(&self) -> DateTime<Utc> {
        self.epoch
    }

    /// Return the configured seconds per tick.
    pub const fn tick_seconds(&self) -> u64 {
        self.tick_seconds
    }

    /// Current world day, starting at 1.
    pub fn day(&self) -> u32 {
        day_of_tick(self.tick)
    }

    /// Current half of the day.
    pub const fn subphase(&self) -> Subphase {
        subphase_of_tick(self.tick)
    }

    /// Number of ticks whose start time is at or before `now`.
    pub fn due_tick(&self, now: DateTime<Utc>) -> u64 {
        let elapsed = now.signed_duration_since(self.epoch).num_seconds();
        u64::try_from(elapsed)
            .unwrap_or(0)
            .checked_div(self.tick_seconds)
            .unwrap_or(0)
    }

    /// Ticks that should have run by `now` but have not.
    pub fn pending_ticks(&self, now: DateTime<Utc>) -> u64 {
        self.due_tick(now).saturating_sub(self.tick)
    }
}

/// Day number of an absolute tick (day 1 holds ticks 0 and 1).
pub fn day_of_tick(tick: u64) -> u32 {
    let day = tick.checked_div(TICKS_PER_DAY).unwrap_or(0).saturating_add(1);
    u32::try_from(day).unwrap_or(u32::MAX)
}

/// Subphase of an absolute tick.
pub const fn subphase_of_tick(tick: u64) -> Subphase {
    if tick % TICKS_PER_DAY == 0 {
        Subphase::Morning
    } else {
        Subphase::Evening
    }
}

/// Absolute tick of a given day and subphase.
pub fn tick_of(day: u32, subphase: Subphase) -> u64 {
    let base = u64::from(day.saturating_sub(1)).saturating_mul(TICKS_PER_DAY);
    match subphase {
        Subphase::Morning => base,
        Subphase::Evening => base.saturating_add(1),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0)
            .single()
            .unwrap()
    }

    fn make_clock() -> WorldClock {
        WorldClock::new(epoch(), 60).unwrap()
    }

    #[test]
    fn clock_starts_on_day_one_morning() {
        let clock = make_clock();
        assert_eq!(clock.tick(), 0);
        assert_eq!(clock.day(), 1);
        assert_eq!(clock.subphase(), Subphase::Morning);
    }

    #[test]
    fn two_ticks_per_day() {
        let mut clock = make_clock();
        assert_eq!(clock.advance().ok(), Some(1));
        assert_eq!(clock.day(), 1);
        assert_eq!(clock.subphase(), Subphase::Evening);

        assert_eq!(clock.advance().ok(), Some(2));
        assert_eq!(clock.day(), 2);
        assert_eq!(clock.subphase(), Subphase::Morning);
    }

    #[test]
    fn tick_of_inverts_day_and_subphase() {
        for tick in 0..20 {
            assert_eq!(tick_of(day_of_tick(tick), subphase_of_tick(tick)), tick);
        }
        assert_eq!(tick_of(9, Subphase::Morning), 16);
    }

    #[test]
    fn pending_ticks_follow_wall_clock() {
        let clock = make_clock();
        assert_eq!(clock.pending_ticks(epoch()), 0);
        assert_eq!(clock.pending_ticks(epoch() + Duration::seconds(59)), 0);
        assert_eq!(clock.pending_ticks(epoch() + Duration::seconds(60)), 1);
        assert_eq!(clock.pending_ticks(epoch() + Duration::seconds(185)), 3);
    }

    #[test]
    fn pending_ticks_before_epoch_is_zero() {
        let clock = make_clock();
        assert_eq!(clock.pending_ticks(epoch() - Duration::hours(1)), 0);
    }

    #[test]
    fn pending_ticks_shrink_as_clock_advances() {
        let mut clock = make_clock();
        let now = epoch() + Duration::seconds(180);
        assert_eq!(clock.pending_ticks(now), 3);
        let _ = clock.advance();
        assert_eq!(clock.pending_ticks(now), 2);
    }

    #[test]
    fn invalid_config_zero_tick_seconds() {
        let result = WorldClock::new(epoch(), 0);
        assert!(matches!(result, Err(ClockError::InvalidConfig { .. })));
    }

    #[test]
    fn from_parts_restores_state() {
        let clock = WorldClock::from_parts(17, epoch(), 60).unwrap();
        assert_eq!(clock.tick(), 17);
        assert_eq!(clock.day(), 9);
        assert_eq!(clock.subphase(), Subphase::Evening);
    }

    #[test]
    fn overflow_is_reported() {
        let mut clock = WorldClock::from_parts(u64::MAX, epoch(), 60).unwrap();
        assert!(matches!(clock.advance(), Err(ClockError::TickOverflow)));
    }
}
