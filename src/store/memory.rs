// src/store/memory.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    config::PendingReviewPolicy,
    engine::{lifecycle, scoring},
    error::{AppError, AppResult},
    models::{
        attempt::{Answer, AttemptDetail, QuizAttempt, Selection},
        question::{AnswerOption, NewQuestion, Question, QuestionWithOptions},
        quiz::{NewQuiz, Quiz, QuizDetail, QuizStatus, QuizSummary, RecordState},
    },
    store::{ManualGrade, QuizStore, StartedAttempt},
};

/// In-process store. A single mutex makes every method one serialized unit of work;
/// the keyed maps play the role of the unique constraints.
pub struct MemoryQuizStore {
    state: Mutex<MemoryState>,
    policy: PendingReviewPolicy,
}

#[derive(Default)]
struct MemoryState {
    quizzes: HashMap<Uuid, Quiz>,
    questions: HashMap<Uuid, Question>,
    options: HashMap<Uuid, AnswerOption>,
    attempts: HashMap<Uuid, QuizAttempt>,
    attempt_keys: HashMap<(Uuid, String), Uuid>,
    answers: HashMap<Uuid, Answer>,
    answer_keys: HashMap<(Uuid, Uuid), Uuid>,
}

impl MemoryQuizStore {
    pub fn new(policy: PendingReviewPolicy) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            policy,
        }
    }
}

impl Default for MemoryQuizStore {
    fn default() -> Self {
        Self::new(PendingReviewPolicy::default())
    }
}

impl MemoryState {
    fn quiz(&self, quiz_id: Uuid) -> AppResult<&Quiz> {
        self.quizzes
            .get(&quiz_id)
            .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))
    }

    fn quiz_mut(&mut self, quiz_id: Uuid) -> AppResult<&mut Quiz> {
        self.quizzes
            .get_mut(&quiz_id)
            .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))
    }

    fn attempt(&self, attempt_id: Uuid) -> AppResult<&QuizAttempt> {
        self.attempts
            .get(&attempt_id)
            .ok_or_else(|| AppError::NotFound("Attempt not found".to_string()))
    }

    fn questions_of(&self, quiz_id: Uuid) -> Vec<&Question> {
        let mut questions: Vec<&Question> = self.questions.values().filter(|q| q.quiz_id == quiz_id).collect();
        questions.sort_by_key(|q| q.position);
        questions
    }

    fn options_of(&self, question_id: Uuid) -> Vec<AnswerOption> {
        let mut options: Vec<AnswerOption> = self
            .options
            .values()
            .filter(|o| o.question_id == question_id)
            .cloned()
            .collect();
        options.sort_by_key(|o| o.position);
        options
    }

    fn answers_of(&self, attempt_id: Uuid) -> Vec<Answer> {
        let mut answers: Vec<Answer> = self
            .answers
            .values()
            .filter(|a| a.attempt_id == attempt_id)
            .cloned()
            .collect();
        answers.sort_by_key(|a| self.questions.get(&a.question_id).map(|q| q.position));
        answers
    }

    fn attempt_count(&self, quiz_id: Uuid) -> usize {
        self.attempts.values().filter(|a| a.quiz_id == quiz_id).count()
    }

    /// Rewrites `total_points` from the current question set.
    fn recompute_total(&mut self, quiz_id: Uuid) -> AppResult<Quiz> {
        let total = scoring::total_points(self.questions_of(quiz_id).iter().map(|q| q.points));
        let quiz = self.quiz_mut(quiz_id)?;
        quiz.total_points = total;
        Ok(quiz.clone())
    }
}

#[async_trait]
impl QuizStore for MemoryQuizStore {
    async fn create_quiz(&self, quiz: NewQuiz, now: DateTime<Utc>) -> AppResult<Quiz> {
        let mut state = self.state.lock().await;
        let quiz = quiz.into_quiz(Uuid::new_v4(), now);
        state.quizzes.insert(quiz.id, quiz.clone());
        Ok(quiz)
    }

    async fn list_quizzes(&self, status: Option<QuizStatus>) -> AppResult<Vec<QuizSummary>> {
        let state = self.state.lock().await;
        let mut summaries: Vec<QuizSummary> = state
            .quizzes
            .values()
            .filter(|q| q.record_state.is_active())
            .filter(|q| status.is_none_or(|s| q.status == s))
            .map(|q| QuizSummary {
                quiz: q.clone(),
                question_count: state.questions_of(q.id).len() as i64,
                attempt_count: state.attempt_count(q.id) as i64,
            })
            .collect();
        summaries.sort_by(|a, b| b.quiz.created_at.cmp(&a.quiz.created_at));
        Ok(summaries)
    }

    async fn get_quiz(&self, quiz_id: Uuid) -> AppResult<QuizDetail> {
        let state = self.state.lock().await;
        let quiz = state.quiz(quiz_id)?;
        lifecycle::ensure_live(quiz)?;

        let questions = state
            .questions_of(quiz_id)
            .into_iter()
            .map(|q| QuestionWithOptions {
                question: q.clone(),
                options: state.options_of(q.id),
            })
            .collect();

        Ok(QuizDetail {
            quiz: quiz.clone(),
            questions,
        })
    }

    async fn publish_quiz(&self, quiz_id: Uuid) -> AppResult<Quiz> {
        let mut state = self.state.lock().await;
        let question_count = state.questions_of(quiz_id).len();
        lifecycle::ensure_publishable(state.quiz(quiz_id)?, question_count)?;

        state.quiz_mut(quiz_id)?.status = QuizStatus::Published;
        state.recompute_total(quiz_id)
    }

    async fn close_quiz(&self, quiz_id: Uuid) -> AppResult<Quiz> {
        let mut state = self.state.lock().await;
        let quiz = state.quiz_mut(quiz_id)?;
        lifecycle::ensure_live(quiz)?;
        quiz.status = QuizStatus::Closed;
        Ok(quiz.clone())
    }

    async fn delete_quiz(&self, quiz_id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let attempt_count = state.attempt_count(quiz_id);
        lifecycle::ensure_deletable(state.quiz(quiz_id)?, attempt_count)?;

        state.quiz_mut(quiz_id)?.record_state = RecordState::Deleted { at: now };
        Ok(())
    }

    async fn add_question(
        &self,
        quiz_id: Uuid,
        question: NewQuestion,
        now: DateTime<Utc>,
    ) -> AppResult<QuestionWithOptions> {
        let mut state = self.state.lock().await;
        lifecycle::ensure_questions_editable(state.quiz(quiz_id)?)?;

        let current_max = state.questions_of(quiz_id).last().map(|q| q.position);
        let built = question.build(quiz_id, lifecycle::next_position(current_max), now);

        state.questions.insert(built.question.id, built.question.clone());
        for option in &built.options {
            state.options.insert(option.id, option.clone());
        }
        state.recompute_total(quiz_id)?;

        Ok(built)
    }

    async fn delete_question(&self, question_id: Uuid) -> AppResult<Quiz> {
        let mut state = self.state.lock().await;
        let quiz_id = state
            .questions
            .get(&question_id)
            .map(|q| q.quiz_id)
            .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;
        lifecycle::ensure_questions_editable(state.quiz(quiz_id)?)?;

        state.questions.remove(&question_id);
        state.options.retain(|_, o| o.question_id != question_id);
        state.answers.retain(|_, a| a.question_id != question_id);
        state.answer_keys.retain(|(_, q), _| *q != question_id);

        state.recompute_total(quiz_id)
    }

    async fn start_attempt(&self, quiz_id: Uuid, student_id: &str, now: DateTime<Utc>) -> AppResult<StartedAttempt> {
        let mut state = self.state.lock().await;
        let question_count = state.questions_of(quiz_id).len();
        lifecycle::ensure_accepting_attempts(state.quiz(quiz_id)?, question_count, now)?;

        let key = (quiz_id, student_id.to_string());
        if let Some(existing_id) = state.attempt_keys.get(&key) {
            let existing = state.attempt(*existing_id)?;
            lifecycle::resume_existing(existing)?;
            return Ok(StartedAttempt {
                attempt: existing.clone(),
                resumed: true,
            });
        }

        let attempt = QuizAttempt::start(quiz_id, student_id, now);
        state.attempt_keys.insert(key, attempt.id);
        state.attempts.insert(attempt.id, attempt.clone());

        Ok(StartedAttempt {
            attempt,
            resumed: false,
        })
    }

    async fn submit_answer(
        &self,
        attempt_id: Uuid,
        student_id: &str,
        question_id: Uuid,
        selection: Selection,
        now: DateTime<Utc>,
    ) -> AppResult<Answer> {
        let mut state = self.state.lock().await;
        let attempt = state.attempt(attempt_id)?;
        lifecycle::ensure_owner(attempt, student_id)?;
        lifecycle::ensure_in_progress(attempt)?;

        let question = state
            .questions
            .get(&question_id)
            .filter(|q| q.quiz_id == attempt.quiz_id)
            .ok_or_else(|| AppError::NotFound("Question not found in this quiz".to_string()))?;
        let grade = scoring::grade_selection(question, &state.options_of(question_id), &selection)?;

        let answer_id = state
            .answer_keys
            .get(&(attempt_id, question_id))
            .copied()
            .unwrap_or_else(Uuid::new_v4);
        let answer = Answer {
            id: answer_id,
            attempt_id,
            question_id,
            selected_option_id: selection.option_id(),
            text_answer: selection.text().map(str::to_string),
            is_correct: grade.is_correct,
            points_earned: grade.points_earned,
            feedback: None,
            graded_by: None,
            answered_at: now,
            graded_at: grade.points_earned.map(|_| now),
        };

        state.answer_keys.insert((attempt_id, question_id), answer_id);
        state.answers.insert(answer_id, answer.clone());
        Ok(answer)
    }

    async fn submit_attempt(&self, attempt_id: Uuid, student_id: &str, now: DateTime<Utc>) -> AppResult<QuizAttempt> {
        let mut state = self.state.lock().await;
        let attempt = state.attempt(attempt_id)?;
        lifecycle::ensure_owner(attempt, student_id)?;
        lifecycle::ensure_in_progress(attempt)?;

        let quiz = state.quiz(attempt.quiz_id)?;
        let question_types: Vec<_> = state.questions_of(quiz.id).iter().map(|q| q.question_type).collect();
        let answers = state.answers_of(attempt_id);
        let update = lifecycle::finalize_submission(self.policy, &answers, &question_types, quiz.total_points, now);

        let attempt = state
            .attempts
            .get_mut(&attempt_id)
            .ok_or_else(|| AppError::NotFound("Attempt not found".to_string()))?;
        update.apply(attempt);
        Ok(attempt.clone())
    }

    async fn grade_answer(&self, answer_id: Uuid, grade: ManualGrade, now: DateTime<Utc>) -> AppResult<QuizAttempt> {
        let mut state = self.state.lock().await;
        let answer = state
            .answers
            .get(&answer_id)
            .ok_or_else(|| AppError::NotFound("Answer not found".to_string()))?;
        let attempt = state.attempt(answer.attempt_id)?;
        lifecycle::ensure_gradable(attempt)?;

        let question = state
            .questions
            .get(&answer.question_id)
            .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;
        let verdict = scoring::grade_manual(question.points, grade.points_earned)?;
        let attempt_id = attempt.id;

        if let Some(answer) = state.answers.get_mut(&answer_id) {
            answer.is_correct = verdict.is_correct;
            answer.points_earned = verdict.points_earned;
            answer.feedback = grade.feedback;
            answer.graded_by = Some(grade.grader_id);
            answer.graded_at = Some(now);
        }

        let answers = state.answers_of(attempt_id);
        let attempt = state.attempt(attempt_id)?;
        let total_points = state.quiz(attempt.quiz_id)?.total_points;
        let update = lifecycle::regrade(attempt, &answers, total_points, now);

        let attempt = state
            .attempts
            .get_mut(&attempt_id)
            .ok_or_else(|| AppError::NotFound("Attempt not found".to_string()))?;
        update.apply(attempt);
        Ok(attempt.clone())
    }

    async fn get_attempt(&self, attempt_id: Uuid) -> AppResult<AttemptDetail> {
        let state = self.state.lock().await;
        let attempt = state.attempt(attempt_id)?.clone();
        let answers = state.answers_of(attempt_id);
        Ok(AttemptDetail { attempt, answers })
    }

    async fn list_attempts(&self, quiz_id: Uuid) -> AppResult<Vec<QuizAttempt>> {
        let state = self.state.lock().await;
        lifecycle::ensure_live(state.quiz(quiz_id)?)?;

        let mut attempts: Vec<QuizAttempt> = state
            .attempts
            .values()
            .filter(|a| a.quiz_id == quiz_id)
            .cloned()
            .collect();
        attempts.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(attempts)
    }
}
