// tests/common/mod.rs

#![allow(dead_code)]

use chrono::Utc;
use quiz_engine::{
    models::{
        attempt::Selection,
        question::{Difficulty, NewOption, NewQuestion, QuestionType, QuestionWithOptions},
        quiz::{NewQuiz, Quiz},
    },
    store::QuizStore,
};

pub fn new_quiz(title: &str) -> NewQuiz {
    NewQuiz {
        title: title.to_string(),
        description: None,
        creator_id: "instructor-1".to_string(),
        duration: 30,
        passing_score: 60.0,
        shuffle_questions: false,
        shuffle_options: false,
        show_results: true,
        allow_review: true,
        start_time: None,
        end_time: None,
    }
}

/// Multiple choice with three options; `correct` is the index of the right one.
pub fn multiple_choice(points: f64, correct: usize) -> NewQuestion {
    NewQuestion {
        question_type: QuestionType::MultipleChoice,
        difficulty: Difficulty::Medium,
        text: "Pick one".to_string(),
        explanation: None,
        points,
        options: ["A", "B", "C"]
            .iter()
            .enumerate()
            .map(|(idx, text)| NewOption {
                text: text.to_string(),
                is_correct: idx == correct,
            })
            .collect(),
    }
}

pub fn short_answer(points: f64) -> NewQuestion {
    NewQuestion {
        question_type: QuestionType::ShortAnswer,
        difficulty: Difficulty::Hard,
        text: "Explain".to_string(),
        explanation: None,
        points,
        options: vec![],
    }
}

pub fn pick(question: &QuestionWithOptions, idx: usize) -> Selection {
    Selection::SingleOption {
        option_id: question.options[idx].id,
        text: None,
    }
}

pub fn correct_option(question: &QuestionWithOptions) -> Selection {
    let idx = question
        .options
        .iter()
        .position(|o| o.is_correct)
        .expect("question has a correct option");
    pick(question, idx)
}

pub fn wrong_option(question: &QuestionWithOptions) -> Selection {
    let idx = question
        .options
        .iter()
        .position(|o| !o.is_correct)
        .expect("question has a wrong option");
    pick(question, idx)
}

/// Creates a quiz, adds the questions in order and publishes it.
pub async fn published_quiz(
    store: &dyn QuizStore,
    quiz: NewQuiz,
    questions: Vec<NewQuestion>,
) -> (Quiz, Vec<QuestionWithOptions>) {
    let now = Utc::now();
    let created = store.create_quiz(quiz, now).await.expect("create quiz");

    let mut added = Vec::new();
    for question in questions {
        added.push(store.add_question(created.id, question, now).await.expect("add question"));
    }

    let quiz = store.publish_quiz(created.id).await.expect("publish quiz");
    (quiz, added)
}
