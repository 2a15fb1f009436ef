use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::error::{PipelineError, Result};

pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| PipelineError::InvalidTimezone(name.to_string()))
}

/// Source of "now". Tests swap in a pinned clock.
pub trait TimeProvider: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;

    /// Current instant localized to `timezone`.
    fn now(&self, timezone: &str) -> Result<DateTime<Tz>> {
        let tz = parse_timezone(timezone)?;
        Ok(self.now_utc().with_timezone(&tz))
    }

    /// Same instant, expressed in `timezone`.
    fn convert(&self, timestamp: &DateTime<Tz>, timezone: &str) -> Result<DateTime<Tz>> {
        let tz = parse_timezone(timezone)?;
        Ok(timestamp.with_timezone(&tz))
    }
}

pub struct SystemClock;

impl TimeProvider for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
pub struct FixedClock {
    instant: DateTime<Utc>,
}

#[cfg(test)]
impl FixedClock {
    pub fn new(instant: DateTime<Utc>) -> FixedClock {
        FixedClock { instant }
    }
}

#[cfg(test)]
impl TimeProvider for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.instant
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Timelike};

    use super::*;

    fn noon() -> FixedClock {
        FixedClock::new(Utc.with_ymd_and_hms(2025, 10, 22, 12, 0, 0).unwrap())
    }

    #[test]
    fn now_is_localized_to_requested_zone() {
        let now = noon().now("Europe/Sofia").unwrap();

        // Sofia is UTC+3 in late October before the DST switch.
        assert_eq!(now.hour(), 15);
        assert_eq!(now.timezone(), chrono_tz::Europe::Sofia);
    }

    #[test]
    fn convert_keeps_the_instant() {
        let clock = noon();
        let origin = clock.now("UTC").unwrap();

        let converted = clock.convert(&origin, "Asia/Tokyo").unwrap();

        assert_eq!(converted, origin);
        assert_eq!(converted.hour(), 21);
        assert_eq!(converted.timezone(), chrono_tz::Asia::Tokyo);
    }

    #[test]
    fn unknown_zone_is_rejected() {
        let clock = noon();

        assert!(matches!(
            clock.now("Mars/Olympus_Mons"),
            Err(PipelineError::InvalidTimezone(name)) if name == "Mars/Olympus_Mons"
        ));

        let origin = clock.now("UTC").unwrap();
        assert!(matches!(
            clock.convert(&origin, "Nowhere"),
            Err(PipelineError::InvalidTimezone(_))
        ));
    }

    #[test]
    fn system_clock_tracks_wall_time() {
        let before = Utc::now();
        let now = SystemClock.now_utc();

        assert!(now >= before);
    }
}
