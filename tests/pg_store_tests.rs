// tests/pg_store_tests.rs
//
// Runs the attempt flow against Postgres. Needs a reachable DATABASE_URL:
//   DATABASE_URL=postgres://... cargo test --test pg_store_tests -- --ignored

mod common;

use std::sync::Arc;

use chrono::Utc;
use common::{correct_option, multiple_choice, new_quiz, published_quiz, short_answer, wrong_option};
use quiz_engine::{
    config::PendingReviewPolicy,
    error::AppError,
    models::attempt::{AttemptStatus, Selection},
    store::{ManualGrade, PgQuizStore, QuizStore},
};
use sqlx::postgres::PgPoolOptions;

async fn pg_store() -> PgQuizStore {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(8)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing. Make sure DATABASE_URL is set.");

    let store = PgQuizStore::new(pool, PendingReviewPolicy::QuestionTypes);
    store.migrate().await.expect("Failed to migrate database");
    store
}

fn student() -> String {
    format!("student-{}", uuid::Uuid::new_v4())
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn pg_attempt_flow_matches_memory_store() {
    let store = pg_store().await;
    let student = student();
    let (quiz, questions) = published_quiz(
        &store,
        new_quiz("Postgres flow"),
        vec![multiple_choice(1.0, 0), multiple_choice(2.0, 1), short_answer(3.0)],
    )
    .await;
    assert_eq!(quiz.total_points, 6.0);

    let started = store.start_attempt(quiz.id, &student, Utc::now()).await.unwrap();
    assert!(!started.resumed);
    let resumed = store.start_attempt(quiz.id, &student, Utc::now()).await.unwrap();
    assert!(resumed.resumed);
    assert_eq!(started.attempt.id, resumed.attempt.id);
    let attempt_id = started.attempt.id;

    // Overwrite: wrong first, then right
    store
        .submit_answer(attempt_id, &student, questions[0].question.id, wrong_option(&questions[0]), Utc::now())
        .await
        .unwrap();
    store
        .submit_answer(attempt_id, &student, questions[0].question.id, correct_option(&questions[0]), Utc::now())
        .await
        .unwrap();
    store
        .submit_answer(attempt_id, &student, questions[1].question.id, wrong_option(&questions[1]), Utc::now())
        .await
        .unwrap();
    let essay = store
        .submit_answer(
            attempt_id,
            &student,
            questions[2].question.id,
            Selection::FreeText("Load paths".to_string()),
            Utc::now(),
        )
        .await
        .unwrap();

    let detail = store.get_attempt(attempt_id).await.unwrap();
    assert_eq!(detail.answers.len(), 3);

    let submitted = store.submit_attempt(attempt_id, &student, Utc::now()).await.unwrap();
    assert_eq!(submitted.status, AttemptStatus::Submitted);
    assert_eq!(submitted.score, Some(1.0));
    assert_eq!(submitted.percentage, Some(16.67));

    let again = store.submit_attempt(attempt_id, &student, Utc::now()).await;
    assert!(matches!(again, Err(AppError::InvalidState(_))));

    let graded = store
        .grade_answer(
            essay.id,
            ManualGrade {
                points_earned: 3.0,
                feedback: Some("Good".to_string()),
                grader_id: "instructor-1".to_string(),
            },
            Utc::now(),
        )
        .await
        .unwrap();
    assert_eq!(graded.status, AttemptStatus::Graded);
    assert_eq!(graded.score, Some(4.0));
    assert_eq!(graded.percentage, Some(66.67));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn pg_concurrent_starts_create_one_attempt() {
    let store = Arc::new(pg_store().await);
    let student = student();
    let (quiz, _) = published_quiz(&*store, new_quiz("Postgres race"), vec![multiple_choice(1.0, 0)]).await;
    let quiz_id = quiz.id;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = Arc::clone(&store);
        let student = student.clone();
        handles.push(tokio::spawn(async move {
            store.start_attempt(quiz_id, &student, Utc::now()).await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap().attempt.id);
    }

    assert!(ids.iter().all(|id| *id == ids[0]));
    let attempts = store.list_attempts(quiz_id).await.unwrap();
    assert_eq!(attempts.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires DATABASE_URL"]
async fn pg_concurrent_grading_converges_on_full_score() {
    let store = Arc::new(pg_store().await);
    let student = student();
    let (quiz, questions) = published_quiz(
        &*store,
        new_quiz("Postgres graders"),
        vec![short_answer(2.0), short_answer(3.0)],
    )
    .await;
    let attempt_id = store.start_attempt(quiz.id, &student, Utc::now()).await.unwrap().attempt.id;

    let mut graded = Vec::new();
    for question in &questions {
        let answer = store
            .submit_answer(
                attempt_id,
                &student,
                question.question.id,
                Selection::FreeText("Essay".to_string()),
                Utc::now(),
            )
            .await
            .unwrap();
        graded.push((answer.id, question.question.points));
    }
    let submitted = store.submit_attempt(attempt_id, &student, Utc::now()).await.unwrap();
    assert_eq!(submitted.status, AttemptStatus::Submitted);

    // Each grader's recompute must see the other's committed answer.
    for _ in 0..4 {
        let mut handles = Vec::new();
        for (answer_id, points) in graded.clone() {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .grade_answer(
                        answer_id,
                        ManualGrade {
                            points_earned: points,
                            feedback: None,
                            grader_id: format!("grader-{}", answer_id),
                        },
                        Utc::now(),
                    )
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let detail = store.get_attempt(attempt_id).await.unwrap();
        assert_eq!(detail.attempt.status, AttemptStatus::Graded);
        assert_eq!(detail.attempt.score, Some(5.0));
        assert_eq!(detail.attempt.percentage, Some(100.0));
    }
}
