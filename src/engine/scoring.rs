// src/engine/scoring.rs

use crate::{
    error::AppError,
    models::{
        attempt::Selection,
        question::{AnswerOption, Question},
    },
};

/// Grading outcome for one answer. `None` fields mean "awaiting a grader".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grade {
    pub is_correct: Option<bool>,
    pub points_earned: Option<f64>,
}

impl Grade {
    pub fn ungraded() -> Self {
        Grade {
            is_correct: None,
            points_earned: None,
        }
    }
}

/// Auto-grades a selection against the question's options.
///
/// * Option-based questions: correct option earns the question's full points, any other earns 0.
/// * Short answers stay ungraded.
///
/// The option must belong to `question`; free text on an option-based question
/// (or an option on a short answer) is rejected.
pub fn grade_selection(question: &Question, options: &[AnswerOption], selection: &Selection) -> Result<Grade, AppError> {
    match (question.question_type.is_option_based(), selection) {
        (true, Selection::SingleOption { option_id, .. }) => {
            let option = options
                .iter()
                .find(|o| o.id == *option_id && o.question_id == question.id)
                .ok_or_else(|| AppError::Validation("Selected option does not belong to this question".to_string()))?;

            Ok(Grade {
                is_correct: Some(option.is_correct),
                points_earned: Some(if option.is_correct { question.points } else { 0.0 }),
            })
        }
        (true, Selection::FreeText(_)) => Err(AppError::Validation(format!(
            "{} questions require a selected option",
            question.question_type
        ))),
        (false, Selection::SingleOption { .. }) => {
            Err(AppError::Validation("Short answer questions do not take options".to_string()))
        }
        (false, Selection::FreeText(_)) => Ok(Grade::ungraded()),
    }
}

/// Grade assigned by a human. Any credit above zero counts as correct.
pub fn grade_manual(max_points: f64, points_earned: f64) -> Result<Grade, AppError> {
    if !points_earned.is_finite() || points_earned < 0.0 || points_earned > max_points {
        return Err(AppError::Validation(format!(
            "points_earned must be between 0 and {}",
            max_points
        )));
    }

    Ok(Grade {
        is_correct: Some(points_earned > 0.0),
        points_earned: Some(points_earned),
    })
}

pub fn total_points<I>(points: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    points.into_iter().sum()
}

/// `score / max(total_points, 1) * 100`, rounded to two decimals.
pub fn percentage(score: f64, total_points: f64) -> f64 {
    let ratio = score / total_points.max(1.0) * 100.0;
    (ratio * 100.0).round() / 100.0
}

/// Attempt-level totals derived from every answer's `points_earned`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregate {
    pub score: f64,
    pub percentage: f64,
    /// Answers still waiting for a grader.
    pub ungraded: usize,
}

impl Aggregate {
    pub fn all_graded(&self) -> bool {
        self.ungraded == 0
    }
}

/// Sums earned points, treating ungraded answers as 0.
pub fn aggregate<I>(earned: I, total_points: f64) -> Aggregate
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut score = 0.0;
    let mut ungraded = 0;
    for points in earned {
        match points {
            Some(p) => score += p,
            None => ungraded += 1,
        }
    }

    Aggregate {
        score,
        percentage: percentage(score, total_points),
        ungraded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::{Difficulty, QuestionType};
    use chrono::Utc;
    use uuid::Uuid;

    fn question(question_type: QuestionType, points: f64) -> Question {
        Question {
            id: Uuid::new_v4(),
            quiz_id: Uuid::new_v4(),
            question_type,
            difficulty: Difficulty::Medium,
            text: "Q".to_string(),
            explanation: None,
            points,
            position: 1,
            created_at: Utc::now(),
        }
    }

    fn option(question: &Question, is_correct: bool, position: i32) -> AnswerOption {
        AnswerOption {
            id: Uuid::new_v4(),
            question_id: question.id,
            text: format!("opt {}", position),
            is_correct,
            position,
        }
    }

    fn pick(option: &AnswerOption) -> Selection {
        Selection::SingleOption {
            option_id: option.id,
            text: None,
        }
    }

    #[test]
    fn correct_option_earns_full_points() {
        let q = question(QuestionType::MultipleChoice, 2.0);
        let options = vec![option(&q, true, 1), option(&q, false, 2)];

        let grade = grade_selection(&q, &options, &pick(&options[0])).unwrap();
        assert_eq!(grade.is_correct, Some(true));
        assert_eq!(grade.points_earned, Some(2.0));

        let grade = grade_selection(&q, &options, &pick(&options[1])).unwrap();
        assert_eq!(grade.is_correct, Some(false));
        assert_eq!(grade.points_earned, Some(0.0));
    }

    #[test]
    fn option_from_another_question_is_rejected() {
        let q = question(QuestionType::TrueFalse, 1.0);
        let other = question(QuestionType::TrueFalse, 1.0);
        let foreign = option(&other, true, 1);
        let options = vec![option(&q, true, 1), option(&q, false, 2), foreign.clone()];

        assert!(matches!(
            grade_selection(&q, &options, &pick(&foreign)),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn short_answer_stays_ungraded() {
        let q = question(QuestionType::ShortAnswer, 3.0);
        let grade = grade_selection(&q, &[], &Selection::FreeText("heap".to_string())).unwrap();
        assert_eq!(grade, Grade::ungraded());
    }

    #[test]
    fn selection_kind_must_match_question_type() {
        let short = question(QuestionType::ShortAnswer, 3.0);
        let sel = Selection::SingleOption {
            option_id: Uuid::new_v4(),
            text: None,
        };
        assert!(grade_selection(&short, &[], &sel).is_err());

        let mc = question(QuestionType::MultipleChoice, 1.0);
        assert!(grade_selection(&mc, &[], &Selection::FreeText("a".into())).is_err());
    }

    #[test]
    fn manual_grade_conflates_credit_with_correctness() {
        assert_eq!(grade_manual(3.0, 1.5).unwrap().is_correct, Some(true));
        assert_eq!(grade_manual(3.0, 0.0).unwrap().is_correct, Some(false));
        assert!(grade_manual(3.0, 3.5).is_err());
        assert!(grade_manual(3.0, -1.0).is_err());
        assert!(grade_manual(3.0, f64::NAN).is_err());
    }

    #[test]
    fn aggregate_rounds_percentage() {
        let agg = aggregate([Some(1.0), Some(0.0), Some(3.0)], 6.0);
        assert_eq!(agg.score, 4.0);
        assert_eq!(agg.percentage, 66.67);
        assert!(agg.all_graded());
    }

    #[test]
    fn ungraded_answers_count_as_zero() {
        let agg = aggregate([Some(2.0), None], 5.0);
        assert_eq!(agg.score, 2.0);
        assert_eq!(agg.percentage, 40.0);
        assert_eq!(agg.ungraded, 1);
    }

    #[test]
    fn zero_point_quiz_uses_floor_of_one() {
        let agg = aggregate(std::iter::empty(), 0.0);
        assert_eq!(agg.score, 0.0);
        assert_eq!(agg.percentage, 0.0);
        assert!(agg.percentage.is_finite());
    }

    #[test]
    fn total_points_sums_fractions() {
        assert_eq!(total_points([0.5, 1.5, 3.0]), 5.0);
        assert_eq!(total_points(Vec::<f64>::new()), 0.0);
    }
}
