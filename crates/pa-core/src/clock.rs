use chrono::NaiveDate;

/// Injected time source for age computation. The only place the evaluation
/// pipeline reads "now" is here — every other component is a pure function
/// of its inputs.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Production clock backed by the system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Utc::now().date_naive()
    }
}

/// Test clock that always returns a fixed date, so age-dependent tests are
/// reproducible regardless of when they run.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_returns_its_configured_date() {
        let date = NaiveDate::from_ymd_opt(2026, 7, 27).unwrap();
        let clock = FixedClock(date);
        assert_eq!(clock.today(), date);
    }
}
