use std::collections::BTreeSet;

use challenge_core::model::{
    Challenge, ChallengeId, ChallengeTier, ProgressDraft, ProgressId, UserId,
};
use challenge_core::time::fixed_today;
use chrono::Duration;
use storage::repository::{ChallengeRepository, ProgressRepository, StorageError};
use storage::sqlite::SqliteRepository;

fn build_challenge(user_id: UserId) -> Challenge {
    Challenge::new(
        ChallengeId::random(),
        user_id,
        ChallengeTier::Hard,
        fixed_today(),
        vec!["Workout".into(), "".into(), "Read 10 pages".into()],
        true,
    )
}

fn draft(challenge: &Challenge, offset: i64, completed: &[usize], notes: &str) -> ProgressDraft {
    let set: BTreeSet<usize> = completed.iter().copied().collect();
    ProgressDraft::new(
        challenge,
        challenge.start_date() + Duration::days(offset),
        &set,
        notes,
    )
}

#[tokio::test]
async fn sqlite_roundtrips_challenge_and_progress() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_roundtrip?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let user = UserId::random();
    let challenge = build_challenge(user);
    repo.upsert_challenge(&challenge).await.unwrap();

    let fetched = repo
        .get_challenge(challenge.id(), user)
        .await
        .unwrap()
        .expect("challenge present");
    assert_eq!(fetched, challenge);

    let inserted = repo
        .save_daily_progress(&draft(&challenge, 0, &[2, 0], "  felt strong  "), None)
        .await
        .unwrap();
    assert!(inserted.is_complete());
    assert_eq!(inserted.notes(), Some("felt strong"));

    let reloaded = repo
        .get_daily_progress(challenge.id(), challenge.start_date())
        .await
        .unwrap()
        .expect("progress present");
    assert_eq!(reloaded, inserted);
    let indices: Vec<usize> = reloaded.completed_rules().iter().copied().collect();
    assert_eq!(indices, vec![0, 2]);
}

#[tokio::test]
async fn sqlite_updates_in_place_and_keeps_history_sorted() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_update?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let challenge = build_challenge(UserId::random());
    repo.upsert_challenge(&challenge).await.unwrap();

    let inserted = repo
        .save_daily_progress(&draft(&challenge, 2, &[0], ""), None)
        .await
        .unwrap();
    let updated = repo
        .save_daily_progress(&draft(&challenge, 2, &[0, 2], ""), Some(inserted.id()))
        .await
        .unwrap();
    assert_eq!(updated.id(), inserted.id());
    assert!(updated.is_complete());

    // Out-of-order inserts come back date-ascending.
    for offset in [5_i64, 0] {
        repo.save_daily_progress(&draft(&challenge, offset, &[], ""), None)
            .await
            .unwrap();
    }
    let history = repo.progress_history(challenge.id()).await.unwrap();
    let dates: Vec<_> = history.iter().map(|p| p.date()).collect();
    assert_eq!(
        dates,
        vec![
            challenge.start_date(),
            challenge.start_date() + Duration::days(2),
            challenge.start_date() + Duration::days(5),
        ]
    );
}

#[tokio::test]
async fn sqlite_rejects_duplicate_date_and_vanished_id() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_conflict?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let challenge = build_challenge(UserId::random());
    repo.upsert_challenge(&challenge).await.unwrap();

    repo.save_daily_progress(&draft(&challenge, 0, &[0], ""), None)
        .await
        .unwrap();
    let err = repo
        .save_daily_progress(&draft(&challenge, 0, &[2], ""), None)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    let err = repo
        .save_daily_progress(&draft(&challenge, 1, &[0], ""), Some(ProgressId::random()))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_keeps_one_active_challenge_per_user() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_active?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let user = UserId::random();
    let first = build_challenge(user);
    let second = build_challenge(user);
    repo.upsert_challenge(&first).await.unwrap();
    repo.upsert_challenge(&second).await.unwrap();

    let active = repo.active_challenge(user).await.unwrap().unwrap();
    assert_eq!(active.id(), second.id());

    let old = repo.get_challenge(first.id(), user).await.unwrap().unwrap();
    assert!(!old.is_active());

    // Other users are untouched.
    let stranger = UserId::random();
    assert!(repo.get_challenge(first.id(), stranger).await.unwrap().is_none());
}
