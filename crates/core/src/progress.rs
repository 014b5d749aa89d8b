//! Pure derivations over a challenge and its progress records.
//!
//! Everything here is a function of its arguments, including the reference
//! date. Callers supply "today" at the boundary; tests supply a fixed date.

use chrono::{Duration, NaiveDate};
use std::collections::{BTreeSet, HashMap};

use crate::model::{CHALLENGE_DAYS, Challenge, DailyProgress};

//
// ─── DAY NUMBER ────────────────────────────────────────────────────────────────
//

/// 1-based day number of `as_of` within the challenge, clamped to [1, 75].
///
/// Total for any input: dates before the start clamp to 1, dates past day 75
/// clamp to 75.
#[must_use]
pub fn current_day_number(challenge: &Challenge, as_of: NaiveDate) -> u32 {
    let offset = (as_of - challenge.start_date()).num_days();
    let clamped = (offset + 1).clamp(1, i64::from(CHALLENGE_DAYS));

    // In range [1, 75] after the clamp.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    {
        clamped as u32
    }
}

//
// ─── RULE FILTERING ────────────────────────────────────────────────────────────
//

/// Indices of non-blank rules, in original list order.
///
/// This is the canonical denominator for every "N of M completed" display;
/// whitespace-only entries keep their slots but never count.
#[must_use]
pub fn active_rule_indices(challenge: &Challenge) -> Vec<usize> {
    challenge
        .rules()
        .iter()
        .enumerate()
        .filter(|(_, rule)| !rule.trim().is_empty())
        .map(|(i, _)| i)
        .collect()
}

/// True iff every active rule index is present in `completed`.
///
/// A challenge with zero active rules is never complete; an empty checklist
/// must not be vacuously perfect.
#[must_use]
pub fn is_rule_set_complete(challenge: &Challenge, completed: &BTreeSet<usize>) -> bool {
    let active = active_rule_indices(challenge);
    !active.is_empty() && active.iter().all(|i| completed.contains(i))
}

/// True iff a progress record exists and covers all active rules.
///
/// Completion is recomputed from `completed_rules`; the record's stored
/// `is_complete` flag is not consulted.
#[must_use]
pub fn is_day_complete(challenge: &Challenge, progress: Option<&DailyProgress>) -> bool {
    progress.is_some_and(|p| is_rule_set_complete(challenge, p.completed_rules()))
}

//
// ─── CLASSIFICATION ────────────────────────────────────────────────────────────
//

/// Presentation class of one calendar cell.
///
/// `Today` takes precedence over the completion-derived classes so the
/// current cell always gets the highlighted border; callers that need the
/// completion bit combine it from [`CalendarDay::is_complete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayClass {
    Future,
    Missed,
    Partial,
    Perfect,
    Today,
}

impl DayClass {
    /// Stable lowercase label for presentation layers.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DayClass::Future => "future",
            DayClass::Missed => "missed",
            DayClass::Partial => "partial",
            DayClass::Perfect => "perfect",
            DayClass::Today => "today",
        }
    }
}

/// Classify one date of the challenge.
///
/// Check order is the tie-break: future, today, perfect, partial, missed.
#[must_use]
pub fn classify_day(
    challenge: &Challenge,
    date: NaiveDate,
    progress: Option<&DailyProgress>,
    today: NaiveDate,
) -> DayClass {
    if date > today {
        return DayClass::Future;
    }
    if date == today {
        return DayClass::Today;
    }
    if is_day_complete(challenge, progress) {
        return DayClass::Perfect;
    }

    let completed_active = progress.map_or(0, |p| {
        active_rule_indices(challenge)
            .iter()
            .filter(|i| p.completed_rules().contains(i))
            .count()
    });
    if completed_active > 0 {
        DayClass::Partial
    } else {
        DayClass::Missed
    }
}

//
// ─── CALENDAR GRID ─────────────────────────────────────────────────────────────
//

/// One cell of the 75-day calendar (view model, not persisted).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarDay {
    pub day_number: u32,
    pub date: NaiveDate,
    pub classification: DayClass,
    pub is_complete: bool,
}

/// Produce the full 75-cell grid, day numbers 1..=75 in order.
///
/// Records are indexed by date; input order does not matter. Pure: repeated
/// calls with the same inputs yield identical grids.
#[must_use]
pub fn calendar_grid(
    challenge: &Challenge,
    records: &[DailyProgress],
    today: NaiveDate,
) -> Vec<CalendarDay> {
    let by_date: HashMap<NaiveDate, &DailyProgress> =
        records.iter().map(|p| (p.date(), p)).collect();

    (1..=CHALLENGE_DAYS)
        .map(|day_number| {
            let date = challenge.start_date() + Duration::days(i64::from(day_number) - 1);
            let progress = by_date.get(&date).copied();
            CalendarDay {
                day_number,
                date,
                classification: classify_day(challenge, date, progress, today),
                is_complete: is_day_complete(challenge, progress),
            }
        })
        .collect()
}

//
// ─── AGGREGATE STATS ───────────────────────────────────────────────────────────
//

/// Aggregate statistics for a challenge's header card.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChallengeStats {
    pub perfect_days: u32,
    /// Share of logged days that were perfect, as a percentage (0 with no
    /// records).
    pub success_rate: f32,
    pub days_remaining: u32,
}

/// Compute perfect-day count, success rate, and days remaining.
#[must_use]
pub fn aggregate_stats(
    challenge: &Challenge,
    records: &[DailyProgress],
    today: NaiveDate,
) -> ChallengeStats {
    let perfect = records
        .iter()
        .filter(|p| is_day_complete(challenge, Some(p)))
        .count();

    let success_rate = if records.is_empty() {
        0.0
    } else {
        // Record counts are bounded by the 75-day span; no precision concern.
        #[allow(clippy::cast_precision_loss)]
        {
            (perfect as f32 / records.len() as f32) * 100.0
        }
    };

    ChallengeStats {
        perfect_days: u32::try_from(perfect).unwrap_or(u32::MAX),
        success_rate,
        days_remaining: CHALLENGE_DAYS.saturating_sub(current_day_number(challenge, today)),
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
