use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use challenge_core::model::{Challenge, DailyProgress, ProgressDraft};
use challenge_core::progress::{active_rule_indices, is_day_complete, is_rule_set_complete};
use storage::repository::ProgressRepository;

use crate::error::EditSessionError;

//
// ─── SAVE OUTCOME ──────────────────────────────────────────────────────────────
//

/// Result of a successful save: the persisted record plus the completion
/// flags before and after.
///
/// The pair exists so a presentation layer can decide whether to fire its
/// one-time celebratory effect without any global "just completed" flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub record: DailyProgress,
    pub was_complete: bool,
    pub now_complete: bool,
}

impl SaveOutcome {
    /// True exactly when this save flipped the day from incomplete to
    /// complete.
    #[must_use]
    pub fn just_completed(&self) -> bool {
        !self.was_complete && self.now_complete
    }
}

//
// ─── DATE STATE ────────────────────────────────────────────────────────────────
//

struct DateState {
    date: NaiveDate,
    baseline: Option<DailyProgress>,
    completed: BTreeSet<usize>,
    notes: String,
    dirty: bool,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory edit workflow for one (challenge, date) pair at a time.
///
/// The session starts uninitialized; [`select_date`](Self::select_date)
/// loads (or defaults) that date's progress, rule toggles and note edits
/// mark it dirty, and [`save`](Self::save) persists a canonical record and
/// re-baselines. Switching dates silently discards unsaved edits, matching
/// the tracker's minimal UX.
///
/// Insert-vs-update is decided by the presence of the previously loaded
/// record's id, never by a separate existence check, so there is no window
/// between check and write.
///
/// Every operation takes `&mut self`: at most one load or save is ever
/// outstanding, and a late response can never be applied to a different
/// date than the one it was requested for.
pub struct DailyEditSession {
    challenge: Challenge,
    progress: Arc<dyn ProgressRepository>,
    state: Option<DateState>,
}

impl DailyEditSession {
    #[must_use]
    pub fn new(challenge: Challenge, progress: Arc<dyn ProgressRepository>) -> Self {
        Self {
            challenge,
            progress,
            state: None,
        }
    }

    #[must_use]
    pub fn challenge(&self) -> &Challenge {
        &self.challenge
    }

    /// Select a date and load its progress, defaulting to an empty checklist
    /// when none is recorded yet.
    ///
    /// Unsaved edits for the previously selected date are discarded. On a
    /// load failure the session is left uninitialized rather than holding
    /// silent partial data.
    ///
    /// # Errors
    ///
    /// Propagates storage failures from the load.
    pub async fn select_date(&mut self, date: NaiveDate) -> Result<(), EditSessionError> {
        self.state = None;

        let baseline = self
            .progress
            .get_daily_progress(self.challenge.id(), date)
            .await?;

        let (completed, notes) = match &baseline {
            Some(record) => (
                record.completed_rules().clone(),
                record.notes().unwrap_or_default().to_string(),
            ),
            None => (BTreeSet::new(), String::new()),
        };

        self.state = Some(DateState {
            date,
            baseline,
            completed,
            notes,
            dirty: false,
        });
        Ok(())
    }

    /// Flip one rule's membership in the in-memory completed set.
    ///
    /// Any index within the original rule list is accepted, inert (blank)
    /// rules included; toggling twice restores the original set.
    ///
    /// # Errors
    ///
    /// Returns `NoDateSelected` before a date is loaded and
    /// `InvalidRuleIndex` for indices past the rule list.
    pub fn toggle_rule(&mut self, index: usize) -> Result<(), EditSessionError> {
        let state = self
            .state
            .as_mut()
            .ok_or(EditSessionError::NoDateSelected)?;

        let len = self.challenge.rules().len();
        if index >= len {
            return Err(EditSessionError::InvalidRuleIndex { index, len });
        }

        if !state.completed.remove(&index) {
            state.completed.insert(index);
        }
        state.dirty = true;
        Ok(())
    }

    /// Replace the in-memory notes.
    ///
    /// # Errors
    ///
    /// Returns `NoDateSelected` before a date is loaded.
    pub fn set_notes(&mut self, text: impl Into<String>) -> Result<(), EditSessionError> {
        let state = self
            .state
            .as_mut()
            .ok_or(EditSessionError::NoDateSelected)?;
        state.notes = text.into();
        state.dirty = true;
        Ok(())
    }

    /// Persist the current edits as the canonical record for the selected
    /// date.
    ///
    /// Inserts when no record was loaded for this date, updates in place
    /// otherwise. On success the saved record becomes the new baseline and
    /// the session is clean again. On failure the in-memory edits stay
    /// untouched so the user can retry.
    ///
    /// # Errors
    ///
    /// Returns `NoDateSelected` before a date is loaded; propagates storage
    /// failures from the save.
    pub async fn save(&mut self) -> Result<SaveOutcome, EditSessionError> {
        let (draft, existing_id, was_complete) = {
            let state = self
                .state
                .as_ref()
                .ok_or(EditSessionError::NoDateSelected)?;
            (
                ProgressDraft::new(&self.challenge, state.date, &state.completed, &state.notes),
                state.baseline.as_ref().map(DailyProgress::id),
                is_day_complete(&self.challenge, state.baseline.as_ref()),
            )
        };

        let record = self.progress.save_daily_progress(&draft, existing_id).await?;
        let now_complete = is_day_complete(&self.challenge, Some(&record));

        if let Some(state) = self.state.as_mut() {
            state.completed = record.completed_rules().clone();
            state.notes = record.notes().unwrap_or_default().to_string();
            state.baseline = Some(record.clone());
            state.dirty = false;
        }

        Ok(SaveOutcome {
            record,
            was_complete,
            now_complete,
        })
    }

    //
    // ─── READ ACCESSORS ────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn selected_date(&self) -> Option<NaiveDate> {
        self.state.as_ref().map(|s| s.date)
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.state.is_some()
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.state.as_ref().is_some_and(|s| s.dirty)
    }

    /// The in-memory completed set for the selected date.
    #[must_use]
    pub fn completed_rules(&self) -> Option<&BTreeSet<usize>> {
        self.state.as_ref().map(|s| &s.completed)
    }

    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.state.as_ref().map(|s| s.notes.as_str())
    }

    /// True iff the current in-memory set covers every active rule.
    #[must_use]
    pub fn is_currently_complete(&self) -> bool {
        self.state
            .as_ref()
            .is_some_and(|s| is_rule_set_complete(&self.challenge, &s.completed))
    }

    /// Share of active rules currently checked, as a percentage.
    ///
    /// 0 with no selected date or no active rules.
    #[must_use]
    pub fn completion_percent(&self) -> f32 {
        let Some(state) = self.state.as_ref() else {
            return 0.0;
        };
        let active = active_rule_indices(&self.challenge);
        if active.is_empty() {
            return 0.0;
        }

        let checked = active
            .iter()
            .filter(|i| state.completed.contains(i))
            .count();

        // Rule counts are tiny; no precision concern.
        #[allow(clippy::cast_precision_loss)]
        {
            (checked as f32 / active.len() as f32) * 100.0
        }
    }
}

impl fmt::Debug for DailyEditSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DailyEditSession")
            .field("challenge_id", &self.challenge.id())
            .field("selected_date", &self.selected_date())
            .field("dirty", &self.is_dirty())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use challenge_core::model::{ChallengeId, ChallengeTier, ProgressId, UserId};
    use challenge_core::time::fixed_today;
    use std::sync::atomic::{AtomicBool, Ordering};
    use storage::repository::{InMemoryRepository, StorageError};

    fn build_challenge(rules: Vec<&str>) -> Challenge {
        Challenge::new(
            ChallengeId::random(),
            UserId::random(),
            ChallengeTier::Hard,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            rules.into_iter().map(String::from).collect(),
            true,
        )
    }

    fn build_session(challenge: &Challenge) -> (DailyEditSession, Arc<InMemoryRepository>) {
        let repo = Arc::new(InMemoryRepository::new());
        let progress: Arc<dyn ProgressRepository> = repo.clone();
        let session = DailyEditSession::new(challenge.clone(), progress);
        (session, repo)
    }

    /// Store wrapper whose operations fail while the flag is raised.
    struct FlakyStore {
        inner: InMemoryRepository,
        failing: AtomicBool,
    }

    impl FlakyStore {
        fn new() -> Self {
            Self {
                inner: InMemoryRepository::new(),
                failing: AtomicBool::new(false),
            }
        }

        fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        fn check(&self) -> Result<(), StorageError> {
            if self.failing.load(Ordering::SeqCst) {
                Err(StorageError::Connection("backend unavailable".into()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl ProgressRepository for FlakyStore {
        async fn get_daily_progress(
            &self,
            challenge_id: ChallengeId,
            date: NaiveDate,
        ) -> Result<Option<DailyProgress>, StorageError> {
            self.check()?;
            self.inner.get_daily_progress(challenge_id, date).await
        }

        async fn progress_history(
            &self,
            challenge_id: ChallengeId,
        ) -> Result<Vec<DailyProgress>, StorageError> {
            self.check()?;
            self.inner.progress_history(challenge_id).await
        }

        async fn save_daily_progress(
            &self,
            draft: &ProgressDraft,
            existing: Option<ProgressId>,
        ) -> Result<DailyProgress, StorageError> {
            self.check()?;
            self.inner.save_daily_progress(draft, existing).await
        }
    }

    #[tokio::test]
    async fn selecting_an_unlogged_date_initializes_empty_state() {
        let challenge = build_challenge(vec!["Workout", "Read"]);
        let (mut session, _) = build_session(&challenge);

        session.select_date(challenge.start_date()).await.unwrap();

        assert!(session.is_loaded());
        assert!(!session.is_dirty());
        assert!(session.completed_rules().unwrap().is_empty());
        assert_eq!(session.notes(), Some(""));
    }

    #[tokio::test]
    async fn selecting_a_logged_date_loads_the_record() {
        let challenge = build_challenge(vec!["Workout", "Read"]);
        let (mut session, repo) = build_session(&challenge);

        let set: BTreeSet<usize> = [0].into_iter().collect();
        let draft = ProgressDraft::new(&challenge, challenge.start_date(), &set, "went well");
        repo.save_daily_progress(&draft, None).await.unwrap();

        session.select_date(challenge.start_date()).await.unwrap();

        assert_eq!(session.completed_rules().unwrap(), &set);
        assert_eq!(session.notes(), Some("went well"));
        assert!(!session.is_dirty());
    }

    #[tokio::test]
    async fn toggling_twice_restores_the_original_set() {
        let challenge = build_challenge(vec!["Workout", "Read"]);
        let (mut session, _) = build_session(&challenge);
        session.select_date(challenge.start_date()).await.unwrap();

        session.toggle_rule(1).unwrap();
        assert!(session.completed_rules().unwrap().contains(&1));

        session.toggle_rule(1).unwrap();
        assert!(session.completed_rules().unwrap().is_empty());
    }

    #[tokio::test]
    async fn toggle_validates_bounds_and_selection() {
        let challenge = build_challenge(vec!["Workout"]);
        let (mut session, _) = build_session(&challenge);

        let err = session.toggle_rule(0).unwrap_err();
        assert!(matches!(err, EditSessionError::NoDateSelected));

        session.select_date(challenge.start_date()).await.unwrap();
        let err = session.toggle_rule(5).unwrap_err();
        assert!(matches!(
            err,
            EditSessionError::InvalidRuleIndex { index: 5, len: 1 }
        ));
    }

    #[tokio::test]
    async fn inert_rule_indices_are_accepted_but_never_complete_the_day() {
        let challenge = build_challenge(vec!["Workout", "", "Read"]);
        let (mut session, _) = build_session(&challenge);
        session.select_date(challenge.start_date()).await.unwrap();

        session.toggle_rule(1).unwrap();
        assert!(session.completed_rules().unwrap().contains(&1));
        assert!(!session.is_currently_complete());

        session.toggle_rule(0).unwrap();
        session.toggle_rule(2).unwrap();
        assert!(session.is_currently_complete());
    }

    #[tokio::test]
    async fn save_inserts_then_updates_the_same_record() {
        let challenge = build_challenge(vec!["Workout", "", "Read"]);
        let (mut session, repo) = build_session(&challenge);
        session.select_date(challenge.start_date()).await.unwrap();

        session.toggle_rule(0).unwrap();
        let first = session.save().await.unwrap();
        assert!(!first.record.is_complete());

        session.toggle_rule(2).unwrap();
        let second = session.save().await.unwrap();

        assert_eq!(second.record.id(), first.record.id());
        assert!(second.record.is_complete());
        assert_eq!(
            repo.progress_history(challenge.id()).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn save_reports_the_celebration_trigger_exactly_once() {
        let challenge = build_challenge(vec!["Workout", "Read"]);
        let (mut session, _) = build_session(&challenge);
        session.select_date(challenge.start_date()).await.unwrap();

        session.toggle_rule(0).unwrap();
        let partial = session.save().await.unwrap();
        assert!(!partial.just_completed());

        session.toggle_rule(1).unwrap();
        let completed = session.save().await.unwrap();
        assert!(completed.just_completed());

        session.set_notes("and notes").unwrap();
        let again = session.save().await.unwrap();
        assert!(again.was_complete);
        assert!(!again.just_completed());
    }

    #[tokio::test]
    async fn save_produces_canonical_record() {
        let challenge = build_challenge(vec!["Workout", "", "Read"]);
        let (mut session, _) = build_session(&challenge);
        session.select_date(challenge.start_date()).await.unwrap();

        session.toggle_rule(2).unwrap();
        session.toggle_rule(0).unwrap();
        session.set_notes("  felt strong  ").unwrap();

        let outcome = session.save().await.unwrap();
        let indices: Vec<usize> = outcome.record.completed_rules().iter().copied().collect();
        assert_eq!(indices, vec![0, 2]);
        assert_eq!(outcome.record.notes(), Some("felt strong"));
        assert!(!session.is_dirty());
    }

    #[tokio::test]
    async fn blank_notes_are_persisted_as_none() {
        let challenge = build_challenge(vec!["Workout"]);
        let (mut session, _) = build_session(&challenge);
        session.select_date(challenge.start_date()).await.unwrap();

        session.set_notes("   ").unwrap();
        let outcome = session.save().await.unwrap();
        assert_eq!(outcome.record.notes(), None);
    }

    #[tokio::test]
    async fn save_without_a_date_errors() {
        let challenge = build_challenge(vec!["Workout"]);
        let (mut session, _) = build_session(&challenge);

        let err = session.save().await.unwrap_err();
        assert!(matches!(err, EditSessionError::NoDateSelected));
    }

    #[tokio::test]
    async fn date_switch_discards_unsaved_edits() {
        let challenge = build_challenge(vec!["Workout", "Read"]);
        let (mut session, _) = build_session(&challenge);
        session.select_date(challenge.start_date()).await.unwrap();
        session.toggle_rule(0).unwrap();
        assert!(session.is_dirty());

        let next = challenge.start_date() + chrono::Duration::days(1);
        session.select_date(next).await.unwrap();
        session.select_date(challenge.start_date()).await.unwrap();

        assert!(!session.is_dirty());
        assert!(session.completed_rules().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_load_leaves_the_session_uninitialized() {
        let challenge = build_challenge(vec!["Workout"]);
        let store = Arc::new(FlakyStore::new());
        let progress: Arc<dyn ProgressRepository> = store.clone();
        let mut session = DailyEditSession::new(challenge.clone(), progress);

        store.set_failing(true);
        let err = session.select_date(challenge.start_date()).await.unwrap_err();
        assert!(matches!(err, EditSessionError::Storage(_)));
        assert!(!session.is_loaded());
        assert_eq!(session.selected_date(), None);
    }

    #[tokio::test]
    async fn failed_save_retains_edits_for_retry() {
        let challenge = build_challenge(vec!["Workout", "Read"]);
        let store = Arc::new(FlakyStore::new());
        let progress: Arc<dyn ProgressRepository> = store.clone();
        let mut session = DailyEditSession::new(challenge.clone(), progress);
        session.select_date(challenge.start_date()).await.unwrap();

        session.toggle_rule(0).unwrap();
        session.set_notes("keep me").unwrap();

        store.set_failing(true);
        let err = session.save().await.unwrap_err();
        assert!(matches!(err, EditSessionError::Storage(_)));
        assert!(session.is_dirty());
        assert!(session.completed_rules().unwrap().contains(&0));
        assert_eq!(session.notes(), Some("keep me"));

        store.set_failing(false);
        let outcome = session.save().await.unwrap();
        assert_eq!(outcome.record.notes(), Some("keep me"));
        assert!(!session.is_dirty());
    }

    #[tokio::test]
    async fn saving_a_past_date_only_touches_that_date() {
        let challenge = build_challenge(vec!["Workout"]);
        let (mut session, repo) = build_session(&challenge);

        let past = challenge.start_date() + chrono::Duration::days(3);
        session.select_date(past).await.unwrap();
        session.toggle_rule(0).unwrap();
        session.save().await.unwrap();

        let history = repo.progress_history(challenge.id()).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].date(), past);
        // Derivations for other dates are unaffected by the backfill.
        assert_eq!(
            challenge_core::progress::current_day_number(&challenge, fixed_today()),
            75
        );
    }

    #[tokio::test]
    async fn completion_percent_tracks_active_rules_only() {
        let challenge = build_challenge(vec!["Workout", "", "Read"]);
        let (mut session, _) = build_session(&challenge);
        assert!((session.completion_percent() - 0.0).abs() < f32::EPSILON);

        session.select_date(challenge.start_date()).await.unwrap();
        session.toggle_rule(0).unwrap();
        assert!((session.completion_percent() - 50.0).abs() < f32::EPSILON);

        session.toggle_rule(2).unwrap();
        assert!((session.completion_percent() - 100.0).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn zero_active_rules_percent_is_zero() {
        let challenge = build_challenge(vec!["", "  "]);
        let (mut session, _) = build_session(&challenge);
        session.select_date(challenge.start_date()).await.unwrap();
        session.toggle_rule(0).unwrap();

        assert!((session.completion_percent() - 0.0).abs() < f32::EPSILON);
        assert!(!session.is_currently_complete());
    }
}
