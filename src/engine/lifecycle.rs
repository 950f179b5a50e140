// src/engine/lifecycle.rs

use chrono::{DateTime, Utc};

use crate::{
    config::PendingReviewPolicy,
    engine::scoring,
    error::AppError,
    models::{
        attempt::{Answer, AttemptStatus, QuizAttempt},
        question::QuestionType,
        quiz::{Quiz, QuizStatus},
    },
};

pub fn ensure_live(quiz: &Quiz) -> Result<(), AppError> {
    if quiz.record_state.is_active() {
        Ok(())
    } else {
        Err(AppError::NotFound("Quiz not found".to_string()))
    }
}

/// A quiz accepts new attempts only while live, published, holding at least one
/// question and inside its window.
pub fn ensure_accepting_attempts(quiz: &Quiz, question_count: usize, now: DateTime<Utc>) -> Result<(), AppError> {
    ensure_live(quiz)?;

    if quiz.status != QuizStatus::Published {
        return Err(AppError::InvalidState(format!(
            "Quiz is {} and not open for attempts",
            quiz.status
        )));
    }

    if question_count == 0 {
        return Err(AppError::InvalidState("Quiz has no questions".to_string()));
    }

    if let Some(start) = quiz.start_time {
        if now < start {
            return Err(AppError::OutOfWindow("Quiz has not started yet".to_string()));
        }
    }

    if let Some(end) = quiz.end_time {
        if now > end {
            return Err(AppError::OutOfWindow("Quiz has already ended".to_string()));
        }
    }

    Ok(())
}

/// Decides what happens when the student already has an attempt:
/// in-progress attempts are resumed, finished ones are final.
pub fn resume_existing(existing: &QuizAttempt) -> Result<(), AppError> {
    match existing.status {
        AttemptStatus::InProgress => Ok(()),
        AttemptStatus::Submitted | AttemptStatus::Graded => {
            Err(AppError::Conflict("Quiz already submitted".to_string()))
        }
    }
}

pub fn ensure_owner(attempt: &QuizAttempt, user_id: &str) -> Result<(), AppError> {
    if attempt.student_id == user_id {
        Ok(())
    } else {
        Err(AppError::Forbidden("Attempt belongs to another student".to_string()))
    }
}

pub fn ensure_in_progress(attempt: &QuizAttempt) -> Result<(), AppError> {
    if attempt.status == AttemptStatus::InProgress {
        Ok(())
    } else {
        Err(AppError::InvalidState(format!("Attempt is {}", attempt.status)))
    }
}

/// Graders only touch answers once the student has submitted.
pub fn ensure_gradable(attempt: &QuizAttempt) -> Result<(), AppError> {
    if attempt.status == AttemptStatus::InProgress {
        Err(AppError::InvalidState("Attempt has not been submitted yet".to_string()))
    } else {
        Ok(())
    }
}

/// New aggregate and status for an attempt, written in one statement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttemptUpdate {
    pub status: AttemptStatus,
    pub score: f64,
    pub percentage: f64,
    pub submitted_at: Option<DateTime<Utc>>,
    pub graded_at: Option<DateTime<Utc>>,
}

impl AttemptUpdate {
    pub fn apply(&self, attempt: &mut QuizAttempt) {
        attempt.status = self.status;
        attempt.score = Some(self.score);
        attempt.percentage = Some(self.percentage);
        attempt.submitted_at = self.submitted_at;
        attempt.graded_at = self.graded_at;
    }
}

/// Closes an in-progress attempt.
///
/// Manual review is pending when the quiz has a SHORT_ANSWER question
/// (`QuestionTypes`) or when one of this attempt's answers has no points yet
/// (`Answers`). Pending review leaves the attempt SUBMITTED, otherwise it is GRADED.
pub fn finalize_submission(
    policy: PendingReviewPolicy,
    answers: &[Answer],
    question_types: &[QuestionType],
    total_points: f64,
    now: DateTime<Utc>,
) -> AttemptUpdate {
    let aggregate = scoring::aggregate(answers.iter().map(|a| a.points_earned), total_points);

    let pending_review = match policy {
        PendingReviewPolicy::QuestionTypes => question_types.iter().any(|t| *t == QuestionType::ShortAnswer),
        PendingReviewPolicy::Answers => !aggregate.all_graded(),
    };

    AttemptUpdate {
        status: if pending_review { AttemptStatus::Submitted } else { AttemptStatus::Graded },
        score: aggregate.score,
        percentage: aggregate.percentage,
        submitted_at: Some(now),
        graded_at: if pending_review { None } else { Some(now) },
    }
}

/// Recomputes a submitted attempt after a grader changed one of its answers.
pub fn regrade(attempt: &QuizAttempt, answers: &[Answer], total_points: f64, now: DateTime<Utc>) -> AttemptUpdate {
    let aggregate = scoring::aggregate(answers.iter().map(|a| a.points_earned), total_points);
    let all_graded = aggregate.all_graded();

    AttemptUpdate {
        status: if all_graded { AttemptStatus::Graded } else { AttemptStatus::Submitted },
        score: aggregate.score,
        percentage: aggregate.percentage,
        submitted_at: attempt.submitted_at,
        graded_at: if all_graded { Some(now) } else { None },
    }
}

/// Questions can be added or removed while the quiz is live and not closed.
pub fn ensure_questions_editable(quiz: &Quiz) -> Result<(), AppError> {
    ensure_live(quiz)?;
    if quiz.status == QuizStatus::Closed {
        return Err(AppError::InvalidState("Closed quizzes cannot be edited".to_string()));
    }
    Ok(())
}

pub fn ensure_publishable(quiz: &Quiz, question_count: usize) -> Result<(), AppError> {
    ensure_live(quiz)?;
    if quiz.status == QuizStatus::Closed {
        return Err(AppError::InvalidState("Closed quizzes cannot be published".to_string()));
    }
    if question_count == 0 {
        return Err(AppError::InvalidState("Add questions before publishing".to_string()));
    }
    Ok(())
}

pub fn ensure_deletable(quiz: &Quiz, attempt_count: usize) -> Result<(), AppError> {
    ensure_live(quiz)?;
    if attempt_count > 0 {
        return Err(AppError::Conflict("Quizzes with attempts cannot be deleted".to_string()));
    }
    Ok(())
}

/// Next question position: max + 1, starting at 1.
pub fn next_position(current_max: Option<i32>) -> i32 {
    current_max.unwrap_or(0) + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quiz::{NewQuiz, RecordState};
    use chrono::Duration;
    use uuid::Uuid;

    fn quiz(status: QuizStatus) -> Quiz {
        let mut quiz = NewQuiz {
            title: "Quiz".to_string(),
            description: None,
            creator_id: "t-1".to_string(),
            duration: 30,
            passing_score: 50.0,
            shuffle_questions: false,
            shuffle_options: false,
            show_results: true,
            allow_review: true,
            start_time: None,
            end_time: None,
        }
        .into_quiz(Uuid::new_v4(), Utc::now());
        quiz.status = status;
        quiz
    }

    fn answer(points_earned: Option<f64>) -> Answer {
        Answer {
            id: Uuid::new_v4(),
            attempt_id: Uuid::new_v4(),
            question_id: Uuid::new_v4(),
            selected_option_id: None,
            text_answer: None,
            is_correct: points_earned.map(|p| p > 0.0),
            points_earned,
            feedback: None,
            graded_by: None,
            answered_at: Utc::now(),
            graded_at: None,
        }
    }

    #[test]
    fn draft_quiz_rejects_attempts() {
        let err = ensure_accepting_attempts(&quiz(QuizStatus::Draft), 1, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[test]
    fn window_bounds_are_enforced() {
        let now = Utc::now();
        let mut q = quiz(QuizStatus::Published);
        q.start_time = Some(now + Duration::minutes(5));
        assert!(matches!(ensure_accepting_attempts(&q, 1, now), Err(AppError::OutOfWindow(_))));

        q.start_time = Some(now - Duration::hours(2));
        q.end_time = Some(now - Duration::hours(1));
        assert!(matches!(ensure_accepting_attempts(&q, 1, now), Err(AppError::OutOfWindow(_))));

        q.end_time = Some(now + Duration::hours(1));
        assert!(ensure_accepting_attempts(&q, 1, now).is_ok());
    }

    #[test]
    fn published_quiz_without_questions_rejects_attempts() {
        let q = quiz(QuizStatus::Published);
        assert!(matches!(ensure_accepting_attempts(&q, 0, Utc::now()), Err(AppError::InvalidState(_))));
        assert!(ensure_accepting_attempts(&q, 1, Utc::now()).is_ok());
    }

    #[test]
    fn deleted_quiz_is_not_found() {
        let mut q = quiz(QuizStatus::Published);
        q.record_state = RecordState::Deleted { at: Utc::now() };
        assert!(matches!(ensure_accepting_attempts(&q, 1, Utc::now()), Err(AppError::NotFound(_))));
    }

    #[test]
    fn finished_attempt_cannot_be_resumed() {
        let mut attempt = QuizAttempt::start(Uuid::new_v4(), "s-1", Utc::now());
        assert!(resume_existing(&attempt).is_ok());
        attempt.status = AttemptStatus::Graded;
        assert!(matches!(resume_existing(&attempt), Err(AppError::Conflict(_))));
    }

    #[test]
    fn short_answer_question_defers_grading_under_type_policy() {
        let now = Utc::now();
        let update = finalize_submission(
            PendingReviewPolicy::QuestionTypes,
            &[answer(Some(2.0))],
            &[QuestionType::MultipleChoice, QuestionType::ShortAnswer],
            5.0,
            now,
        );
        assert_eq!(update.status, AttemptStatus::Submitted);
        assert_eq!(update.score, 2.0);
        assert_eq!(update.submitted_at, Some(now));
        assert_eq!(update.graded_at, None);
    }

    #[test]
    fn answer_policy_ignores_unanswered_short_answer() {
        let update = finalize_submission(
            PendingReviewPolicy::Answers,
            &[answer(Some(2.0))],
            &[QuestionType::MultipleChoice, QuestionType::ShortAnswer],
            5.0,
            Utc::now(),
        );
        assert_eq!(update.status, AttemptStatus::Graded);
        assert!(update.graded_at.is_some());
    }

    #[test]
    fn regrade_completes_once_every_answer_has_points() {
        let now = Utc::now();
        let mut attempt = QuizAttempt::start(Uuid::new_v4(), "s-1", now);
        attempt.status = AttemptStatus::Submitted;
        attempt.submitted_at = Some(now);

        let partial = regrade(&attempt, &[answer(Some(2.0)), answer(None)], 5.0, now);
        assert_eq!(partial.status, AttemptStatus::Submitted);
        assert_eq!(partial.graded_at, None);

        let full = regrade(&attempt, &[answer(Some(2.0)), answer(Some(3.0))], 5.0, now);
        assert_eq!(full.status, AttemptStatus::Graded);
        assert_eq!(full.score, 5.0);
        assert_eq!(full.percentage, 100.0);
        assert_eq!(full.submitted_at, Some(now));
    }

    #[test]
    fn publishing_needs_questions_and_an_open_quiz() {
        assert!(matches!(
            ensure_publishable(&quiz(QuizStatus::Draft), 0),
            Err(AppError::InvalidState(_))
        ));
        assert!(ensure_publishable(&quiz(QuizStatus::Draft), 1).is_ok());
        assert!(ensure_publishable(&quiz(QuizStatus::Published), 1).is_ok());
        assert!(ensure_publishable(&quiz(QuizStatus::Closed), 1).is_err());
    }

    #[test]
    fn positions_start_at_one() {
        assert_eq!(next_position(None), 1);
        assert_eq!(next_position(Some(4)), 5);
    }
}
