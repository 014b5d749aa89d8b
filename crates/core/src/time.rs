use chrono::{Days, Local, NaiveDate};

/// A simple clock abstraction for deterministic dates in services and tests.
///
/// The engine works exclusively on local calendar days. Date arithmetic on
/// instants is how off-by-one bugs across time zones happen, so the clock
/// hands out `NaiveDate` and nothing finer.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(NaiveDate),
}

impl Clock {
    /// Returns a clock that uses the current local calendar date.
    #[must_use]
    pub fn default_clock() -> Self {
        Self::Default
    }

    /// Returns a clock fixed at the given date.
    #[must_use]
    pub fn fixed(at: NaiveDate) -> Self {
        Self::Fixed(at)
    }

    /// Returns today's date according to the clock.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        match self {
            Clock::Default => Local::now().date_naive(),
            Clock::Fixed(d) => *d,
        }
    }

    /// If this is a fixed clock, advance it by the given number of days.
    ///
    /// Has no effect on `Clock::Default`.
    pub fn advance_days(&mut self, days: u64) {
        if let Clock::Fixed(d) = self {
            if let Some(next) = d.checked_add_days(Days::new(days)) {
                *d = next;
            }
        }
    }

    /// Returns true if this clock represents real time.
    #[must_use]
    pub fn is_default(&self) -> bool {
        matches!(self, Clock::Default)
    }

    /// Returns true if this clock is fixed.
    #[must_use]
    pub fn is_fixed(&self) -> bool {
        matches!(self, Clock::Fixed(_))
    }
}

/// Returns a deterministic date for tests and doc examples (2024-03-15).
///
/// # Panics
///
/// Panics if the fixed date cannot be represented.
#[must_use]
pub fn fixed_today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).expect("fixed date should be valid")
}

/// Returns a `Clock` fixed at the deterministic test date.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_today())
}
