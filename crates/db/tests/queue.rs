//! Repository-level tests for the generation job queue: claim atomicity,
//! FIFO ordering, cancellation, and the stale-job requeue.

use chrono::Utc;
use sqlx::PgPool;

use abrahub_core::types::DbId;
use abrahub_db::models::generation_job::SubmitGenerationJob;
use abrahub_db::models::status::JobStatus;
use abrahub_db::models::user::ROLE_USER;
use abrahub_db::repositories::{GenerationJobRepo, UserRepo};

async fn create_account(pool: &PgPool, email: &str) -> DbId {
    UserRepo::create(pool, email, "not-a-real-hash", ROLE_USER)
        .await
        .expect("user creation should succeed")
        .id
}

fn submit_input(prompt: &str) -> SubmitGenerationJob {
    SubmitGenerationJob {
        prompt: prompt.to_string(),
        aspect_ratio: None,
        quality: None,
        preset_id: None,
        focal_length: None,
        aperture: None,
        camera_angle: None,
        film_look: None,
        reference_images: vec![],
        use_own_key: false,
        sequence_mode: false,
        storyboard6_mode: false,
    }
}

/// One queued job admits exactly one claim; the second claimer sees an
/// empty queue.
#[sqlx::test]
async fn claim_is_single_winner_per_job(pool: PgPool) {
    let account = create_account(&pool, "claim@example.com").await;
    let job = GenerationJobRepo::submit(&pool, account, &submit_input("solo"), None)
        .await
        .unwrap();

    let first = GenerationJobRepo::claim_next(&pool).await.unwrap();
    let second = GenerationJobRepo::claim_next(&pool).await.unwrap();

    let claimed = first.expect("the queued job must be claimable");
    assert_eq!(claimed.id, job.id);
    assert_eq!(claimed.status_id, JobStatus::Processing.id());
    assert!(claimed.started_at.is_some());
    assert!(second.is_none());
}

/// Claims drain the queue oldest-first, across accounts.
#[sqlx::test]
async fn claims_follow_submission_order(pool: PgPool) {
    let a = create_account(&pool, "a@example.com").await;
    let b = create_account(&pool, "b@example.com").await;

    let first = GenerationJobRepo::submit(&pool, a, &submit_input("first"), None)
        .await
        .unwrap();
    let second = GenerationJobRepo::submit(&pool, b, &submit_input("second"), None)
        .await
        .unwrap();
    let third = GenerationJobRepo::submit(&pool, a, &submit_input("third"), None)
        .await
        .unwrap();

    let mut order = Vec::new();
    while let Some(job) = GenerationJobRepo::claim_next(&pool).await.unwrap() {
        order.push(job.id);
    }
    assert_eq!(order, vec![first.id, second.id, third.id]);
}

/// Position is 1-indexed among queued jobs and drops to 0 once claimed.
#[sqlx::test]
async fn position_shifts_as_the_queue_drains(pool: PgPool) {
    let account = create_account(&pool, "pos@example.com").await;
    let mut ids = Vec::new();
    for i in 0..3 {
        let job =
            GenerationJobRepo::submit(&pool, account, &submit_input(&format!("job {i}")), None)
                .await
                .unwrap();
        ids.push(job.id);
    }

    for (i, id) in ids.iter().enumerate() {
        let position = GenerationJobRepo::position(&pool, *id).await.unwrap();
        assert_eq!(position, (i + 1) as i64);
    }

    GenerationJobRepo::claim_next(&pool).await.unwrap().unwrap();

    assert_eq!(GenerationJobRepo::position(&pool, ids[0]).await.unwrap(), 0);
    assert_eq!(GenerationJobRepo::position(&pool, ids[1]).await.unwrap(), 1);
    assert_eq!(GenerationJobRepo::position(&pool, ids[2]).await.unwrap(), 2);
}

/// Completion is guarded on `processing`: once the owner cancels (row
/// deleted), the processor's completion attempt reports `false`.
#[sqlx::test]
async fn complete_after_cancel_reports_nothing_updated(pool: PgPool) {
    let account = create_account(&pool, "race@example.com").await;
    let job = GenerationJobRepo::submit(&pool, account, &submit_input("raced"), None)
        .await
        .unwrap();
    GenerationJobRepo::claim_next(&pool).await.unwrap().unwrap();

    let deleted = GenerationJobRepo::cancel_delete(&pool, job.id, account)
        .await
        .unwrap();
    assert_eq!(deleted, 1);

    let completed = GenerationJobRepo::complete(&pool, job.id, 12345).await.unwrap();
    assert!(!completed);

    // Replayed cancellation removes nothing further.
    let deleted = GenerationJobRepo::cancel_delete(&pool, job.id, account)
        .await
        .unwrap();
    assert_eq!(deleted, 0);
}

/// Cancellation is owner-scoped at the SQL level.
#[sqlx::test]
async fn cancel_ignores_other_accounts_jobs(pool: PgPool) {
    let owner = create_account(&pool, "owner@example.com").await;
    let other = create_account(&pool, "other@example.com").await;
    let job = GenerationJobRepo::submit(&pool, owner, &submit_input("mine"), None)
        .await
        .unwrap();

    let deleted = GenerationJobRepo::cancel_delete(&pool, job.id, other)
        .await
        .unwrap();
    assert_eq!(deleted, 0);

    assert!(GenerationJobRepo::find_for_account(&pool, job.id, owner)
        .await
        .unwrap()
        .is_some());
}

/// A job stuck in `processing` past the cutoff goes back to `queued` with
/// its clock reset, and can be claimed again.
#[sqlx::test]
async fn stale_processing_jobs_are_requeued(pool: PgPool) {
    let account = create_account(&pool, "stale@example.com").await;
    let job = GenerationJobRepo::submit(&pool, account, &submit_input("stuck"), None)
        .await
        .unwrap();
    GenerationJobRepo::claim_next(&pool).await.unwrap().unwrap();

    // Cutoff in the future makes the just-started job count as stale.
    let requeued = GenerationJobRepo::requeue_stale(&pool, Utc::now() + chrono::Duration::seconds(5))
        .await
        .unwrap();
    assert_eq!(requeued, 1);

    let refreshed = GenerationJobRepo::find_for_account(&pool, job.id, account)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.status_id, JobStatus::Queued.id());
    assert!(refreshed.started_at.is_none());

    let reclaimed = GenerationJobRepo::claim_next(&pool).await.unwrap().unwrap();
    assert_eq!(reclaimed.id, job.id);
}

/// A fresh processing job is left alone by a past cutoff.
#[sqlx::test]
async fn requeue_leaves_recent_processing_jobs(pool: PgPool) {
    let account = create_account(&pool, "fresh@example.com").await;
    GenerationJobRepo::submit(&pool, account, &submit_input("active"), None)
        .await
        .unwrap();
    GenerationJobRepo::claim_next(&pool).await.unwrap().unwrap();

    let requeued = GenerationJobRepo::requeue_stale(&pool, Utc::now() - chrono::Duration::minutes(10))
        .await
        .unwrap();
    assert_eq!(requeued, 0);
}

/// Queue statistics count per-status and stay consistent with claims.
#[sqlx::test]
async fn queue_stats_track_statuses(pool: PgPool) {
    let account = create_account(&pool, "stats@example.com").await;
    for i in 0..2 {
        GenerationJobRepo::submit(&pool, account, &submit_input(&format!("s{i}")), None)
            .await
            .unwrap();
    }
    GenerationJobRepo::claim_next(&pool).await.unwrap().unwrap();

    let stats = GenerationJobRepo::queue_stats(&pool).await.unwrap();
    assert_eq!(stats.queued, 1);
    assert_eq!(stats.processing, 1);
    assert_eq!(stats.completed_today, 0);
    assert!(stats.avg_processing_secs.is_none());
}
