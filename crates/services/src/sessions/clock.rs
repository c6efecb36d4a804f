use crate::error::SessionError;

/// What a single tick did to the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSignal {
    /// Time advanced and the countdown is still running.
    Running { remaining: u32 },
    /// Remaining time reached zero on this tick. Emitted once per arming.
    Expired,
    /// Nothing happened: the clock is paused, stopped or already expired.
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClockState {
    Running,
    Paused,
    Stopped,
    Expired,
}

/// Countdown that forces a session to finish.
///
/// Ticks are driven from a single logical timeline, one second per tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClock {
    duration: u32,
    remaining: u32,
    state: ClockState,
}

impl SessionClock {
    /// Arm a clock for `duration_secs` seconds.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidArgument` if `duration_secs` is zero.
    pub fn start(duration_secs: u32) -> Result<Self, SessionError> {
        if duration_secs == 0 {
            return Err(SessionError::invalid("duration must be > 0 seconds"));
        }
        Ok(Self {
            duration: duration_secs,
            remaining: duration_secs,
            state: ClockState::Running,
        })
    }

    /// Rearm from a fresh duration. A previous arming can no longer expire.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidArgument` if `duration_secs` is zero; the
    /// clock is left untouched in that case.
    pub fn reset(&mut self, duration_secs: u32) -> Result<(), SessionError> {
        *self = Self::start(duration_secs)?;
        Ok(())
    }

    /// Advance by one second.
    pub fn tick(&mut self) -> ClockSignal {
        if self.state != ClockState::Running {
            return ClockSignal::Idle;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.state = ClockState::Expired;
            ClockSignal::Expired
        } else {
            ClockSignal::Running {
                remaining: self.remaining,
            }
        }
    }

    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    #[must_use]
    pub fn elapsed(&self) -> u32 {
        self.duration - self.remaining
    }

    #[must_use]
    pub fn duration(&self) -> u32 {
        self.duration
    }

    pub fn pause(&mut self) {
        if self.state == ClockState::Running {
            self.state = ClockState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == ClockState::Paused {
            self.state = ClockState::Running;
        }
    }

    /// Disarm without expiring.
    pub fn stop(&mut self) {
        if matches!(self.state, ClockState::Running | ClockState::Paused) {
            self.state = ClockState::Stopped;
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == ClockState::Running
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state == ClockState::Paused
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.state == ClockState::Expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_expiries(clock: &mut SessionClock, ticks: usize) -> usize {
        (0..ticks)
            .filter(|_| clock.tick() == ClockSignal::Expired)
            .count()
    }

    #[test]
    fn zero_duration_is_rejected() {
        assert!(matches!(
            SessionClock::start(0),
            Err(SessionError::InvalidArgument(_))
        ));
    }

    #[test]
    fn expires_exactly_once() {
        let mut clock = SessionClock::start(5).unwrap();
        for expected in (1..5).rev() {
            assert_eq!(clock.tick(), ClockSignal::Running { remaining: expected });
        }
        assert_eq!(clock.tick(), ClockSignal::Expired);
        assert_eq!(count_expiries(&mut clock, 10), 0);
        assert_eq!(clock.remaining(), 0);
        assert!(clock.is_expired());
    }

    #[test]
    fn pause_ignores_ticks_until_resumed() {
        let mut clock = SessionClock::start(3).unwrap();
        clock.tick();
        clock.pause();
        assert_eq!(clock.tick(), ClockSignal::Idle);
        assert_eq!(clock.remaining(), 2);
        clock.resume();
        assert_eq!(clock.tick(), ClockSignal::Running { remaining: 1 });
        assert_eq!(clock.elapsed(), 2);
    }

    #[test]
    fn reset_cancels_previous_expiry() {
        let mut clock = SessionClock::start(2).unwrap();
        clock.tick();
        clock.reset(3).unwrap();
        // the old arming would have expired on this tick
        assert_eq!(clock.tick(), ClockSignal::Running { remaining: 2 });
        assert_eq!(count_expiries(&mut clock, 10), 1);
    }

    #[test]
    fn reset_after_expiry_rearms() {
        let mut clock = SessionClock::start(1).unwrap();
        assert_eq!(clock.tick(), ClockSignal::Expired);
        clock.reset(1).unwrap();
        assert_eq!(clock.tick(), ClockSignal::Expired);
    }

    #[test]
    fn failed_reset_keeps_state() {
        let mut clock = SessionClock::start(4).unwrap();
        clock.tick();
        assert!(clock.reset(0).is_err());
        assert_eq!(clock.remaining(), 3);
        assert!(clock.is_running());
    }

    #[test]
    fn stop_never_fires() {
        let mut clock = SessionClock::start(1).unwrap();
        clock.stop();
        assert_eq!(count_expiries(&mut clock, 5), 0);
        assert!(!clock.is_running());
        assert_eq!(clock.remaining(), 1);
    }
}
