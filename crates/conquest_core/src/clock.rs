//! Match clock: remaining time, pause, visibility freeze, speed multiplier.
//!
//! The clock is the single authority on simulated time. Wall-clock deltas
//! enter through [`MatchClock::scale`]; everything downstream only sees
//! simulated seconds.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::MAX_SPEED_MULTIPLIER;
use crate::math::{fixed_serde, Fixed};

/// Countdown clock for one match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchClock {
    #[serde(with = "fixed_serde")]
    duration: Fixed,
    #[serde(with = "fixed_serde")]
    remaining: Fixed,
    #[serde(with = "fixed_serde")]
    speed: Fixed,
    paused: bool,
    visible: bool,
    pause_when_hidden: bool,
}

impl MatchClock {
    /// A running clock with `duration` simulated seconds on it.
    #[must_use]
    pub fn new(duration: Fixed, speed: f64, pause_when_hidden: bool) -> Self {
        Self {
            duration,
            remaining: duration,
            speed: speed_to_fixed(speed),
            paused: false,
            visible: true,
            pause_when_hidden,
        }
    }

    /// Simulated seconds left.
    #[must_use]
    pub const fn remaining(&self) -> Fixed {
        self.remaining
    }

    /// Total match length.
    #[must_use]
    pub const fn duration(&self) -> Fixed {
        self.duration
    }

    /// Simulated seconds since the start.
    #[must_use]
    pub fn elapsed(&self) -> Fixed {
        self.duration - self.remaining
    }

    /// Whether the countdown reached zero.
    #[must_use]
    pub fn expired(&self) -> bool {
        self.remaining <= Fixed::ZERO
    }

    /// Stop time.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Let time run again.
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Whether the clock was paused explicitly.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Restart the countdown with a new duration. Pause state is cleared.
    pub fn reset(&mut self, duration: Fixed) {
        self.duration = duration;
        self.remaining = duration;
        self.paused = false;
    }

    /// Report host visibility (e.g. a backgrounded window).
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Keep running while hidden from now on.
    pub fn disable_visibility_pause(&mut self) {
        self.pause_when_hidden = false;
    }

    /// Whether hiding the host freezes time.
    #[must_use]
    pub const fn pauses_when_hidden(&self) -> bool {
        self.pause_when_hidden
    }

    /// Change the simulated-seconds-per-wall-second multiplier.
    ///
    /// Clamped to `[0, MAX_SPEED_MULTIPLIER]`; NaN stops the clock.
    pub fn set_speed(&mut self, multiplier: f64) {
        self.speed = speed_to_fixed(multiplier);
    }

    /// Current speed multiplier.
    #[must_use]
    pub const fn speed(&self) -> Fixed {
        self.speed
    }

    /// Whether time is currently frozen.
    #[must_use]
    pub const fn is_frozen(&self) -> bool {
        self.paused || (!self.visible && self.pause_when_hidden)
    }

    /// Convert a wall-clock delta into simulated seconds.
    #[must_use]
    pub fn scale(&self, wall: Duration) -> Fixed {
        if self.is_frozen() {
            return Fixed::ZERO;
        }
        Fixed::saturating_from_num(wall.as_secs_f64()).saturating_mul(self.speed)
    }

    /// Consume `dt` simulated seconds of the countdown.
    pub fn advance(&mut self, dt: Fixed) {
        self.remaining = (self.remaining - dt).max(Fixed::ZERO);
    }
}

fn speed_to_fixed(multiplier: f64) -> Fixed {
    // f64::max drops NaN in favour of the other operand.
    Fixed::from_num(multiplier.max(0.0).min(MAX_SPEED_MULTIPLIER))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock() -> MatchClock {
        MatchClock::new(Fixed::from_num(10), 1.0, true)
    }

    #[test]
    fn test_scale_applies_speed() {
        let mut c = clock();
        assert_eq!(c.scale(Duration::from_millis(500)), Fixed::from_num(0.5));
        c.set_speed(4.0);
        assert_eq!(c.scale(Duration::from_secs(2)), Fixed::from_num(8));
    }

    #[test]
    fn test_out_of_range_speed_is_clamped() {
        let mut c = clock();
        c.set_speed(5.0e9);
        assert_eq!(c.speed(), Fixed::from_num(MAX_SPEED_MULTIPLIER));
        c.set_speed(f64::INFINITY);
        assert_eq!(c.speed(), Fixed::from_num(MAX_SPEED_MULTIPLIER));
        c.set_speed(f64::NAN);
        assert_eq!(c.speed(), Fixed::ZERO);
        c.set_speed(-3.0);
        assert_eq!(c.scale(Duration::from_secs(1)), Fixed::ZERO);
    }

    #[test]
    fn test_scale_saturates_on_huge_deltas() {
        let mut c = clock();
        c.set_speed(MAX_SPEED_MULTIPLIER);
        assert_eq!(c.scale(Duration::from_secs(u64::MAX)), Fixed::MAX);
    }

    #[test]
    fn test_pause_and_resume() {
        let mut c = clock();
        c.pause();
        assert_eq!(c.scale(Duration::from_secs(1)), Fixed::ZERO);
        c.resume();
        assert_eq!(c.scale(Duration::from_secs(1)), Fixed::from_num(1));
    }

    #[test]
    fn test_hidden_freezes_until_disabled() {
        let mut c = clock();
        c.set_visible(false);
        assert!(c.is_frozen());
        c.disable_visibility_pause();
        assert!(!c.is_frozen());
        assert_eq!(c.scale(Duration::from_secs(1)), Fixed::from_num(1));
    }

    #[test]
    fn test_advance_counts_down_and_saturates() {
        let mut c = clock();
        c.advance(Fixed::from_num(4));
        assert_eq!(c.remaining(), Fixed::from_num(6));
        assert_eq!(c.elapsed(), Fixed::from_num(4));
        c.advance(Fixed::from_num(100));
        assert_eq!(c.remaining(), Fixed::ZERO);
        assert!(c.expired());
        c.reset(Fixed::from_num(3));
        assert_eq!(c.remaining(), Fixed::from_num(3));
        assert!(!c.expired());
    }
}
