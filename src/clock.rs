use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};

/// Source of "now" and of the calendar date the user considers today.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
    fn today(&self) -> NaiveDate;
}

/// Wall clock in the machine's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Wall clock whose calendar date is taken in an explicit time zone.
#[derive(Debug, Clone)]
pub struct ZonedClock<Tz: TimeZone> {
    zone: Tz,
}

impl<Tz: TimeZone> ZonedClock<Tz> {
    pub fn new(zone: Tz) -> Self {
        Self { zone }
    }

    pub fn date_at(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.zone).date_naive()
    }
}

impl<Tz: TimeZone> Clock for ZonedClock<Tz> {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        self.date_at(Utc::now())
    }
}

/// A clock pinned to one instant. The calendar date is the UTC date unless overridden.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: DateTime<Utc>,
    today: NaiveDate,
}

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now,
            today: now.date_naive(),
        }
    }

    /// Noon UTC on `date`.
    pub fn on(date: NaiveDate) -> Self {
        let now = date
            .and_hms_opt(12, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or_else(Utc::now);
        Self { now, today: date }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn today(&self) -> NaiveDate {
        self.today
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }

    fn today(&self) -> NaiveDate {
        (**self).today()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_on_date_reports_that_date() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        let clock = FixedClock::on(date);
        assert_eq!(clock.today(), date);
        assert_eq!(clock.now().date_naive(), date);
    }

    #[test]
    fn zoned_clock_uses_the_zone_calendar() {
        // 2024-01-01 20:00 UTC is already 2024-01-02 in Jakarta (UTC+7).
        let instant = Utc.with_ymd_and_hms(2024, 1, 1, 20, 0, 0).single().unwrap();
        let jakarta = ZonedClock::new(chrono_tz::Asia::Jakarta);
        assert_eq!(
            jakarta.date_at(instant),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );

        let new_york = ZonedClock::new(chrono_tz::America::New_York);
        assert_eq!(
            new_york.date_at(instant),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
    }
}
