//! Commit timestamp source
//!
//! Commit creation reads the time through a [`Clock`] so that tests and
//! `ARBOR_AUTHOR_DATE` can pin it.

use chrono::{DateTime, Utc};
use derive_new::new;

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, new)]
pub struct FixedClock {
    instant: DateTime<Utc>,
}

impl FixedClock {
    pub fn from_timestamp(seconds: i64) -> Option<Self> {
        DateTime::from_timestamp(seconds, 0).map(Self::new)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.instant
    }
}

/// Clock pinned by `ARBOR_AUTHOR_DATE` when set and parseable, the system clock otherwise.
pub fn load_from_env() -> Box<dyn Clock> {
    let pinned = std::env::var("ARBOR_AUTHOR_DATE").ok().and_then(|date| {
        DateTime::parse_from_rfc2822(&date)
            .or_else(|_| DateTime::parse_from_str(&date, "%Y-%m-%d %H:%M:%S %z"))
            .ok()
    });

    match pinned {
        Some(instant) => Box::new(FixedClock::new(instant.with_timezone(&Utc))),
        None => {
            if std::env::var_os("ARBOR_AUTHOR_DATE").is_some() {
                tracing::warn!("ARBOR_AUTHOR_DATE is not a valid date, using the system clock");
            }
            Box::new(SystemClock)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_always_reads_the_same_instant() {
        let clock = FixedClock::from_timestamp(1_672_574_400).unwrap();
        assert_eq!(clock.now().timestamp(), 1_672_574_400);
        assert_eq!(clock.now(), clock.now());
    }
}
