use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::flashcard::Difficulty;
use crate::errors::AppError;

pub const OPTIONS_PER_QUESTION: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub explanation: String,
    pub difficulty: Difficulty,
}

/// One answer as submitted by the user.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmittedAnswer {
    pub question_index: usize,
    pub selected_answer: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserAnswer {
    pub question_index: usize,
    pub selected_answer: String,
    pub is_correct: bool,
    pub answered_at: DateTime<Utc>,
}

/// A graded quiz attempt.
#[derive(Debug, Clone, Serialize)]
pub struct QuizAttempt {
    pub user_answers: Vec<UserAnswer>,
    pub score: usize,
    pub total_questions: usize,
    pub completed_at: DateTime<Utc>,
}

/// Grade `answers` against `questions`.
///
/// An answer is correct when it equals the question's correct answer,
/// ignoring case and surrounding whitespace. Unanswered questions count as
/// wrong. Indices outside the quiz and repeated indices are rejected.
pub fn score_quiz(
    questions: &[QuizQuestion],
    answers: &[SubmittedAnswer],
) -> Result<QuizAttempt, AppError> {
    let mut answered = vec![false; questions.len()];
    let mut user_answers = Vec::with_capacity(answers.len());
    let now = Utc::now();

    for answer in answers {
        let Some(question) = questions.get(answer.question_index) else {
            return Err(AppError::Validation(format!(
                "Question index {} is out of range (quiz has {} questions)",
                answer.question_index,
                questions.len()
            )));
        };
        if std::mem::replace(&mut answered[answer.question_index], true) {
            return Err(AppError::Validation(format!(
                "Question {} was answered more than once",
                answer.question_index
            )));
        }

        let selected = answer.selected_answer.trim();
        user_answers.push(UserAnswer {
            question_index: answer.question_index,
            selected_answer: selected.to_string(),
            is_correct: selected.eq_ignore_ascii_case(question.correct_answer.trim()),
            answered_at: now,
        });
    }

    Ok(QuizAttempt {
        score: user_answers.iter().filter(|a| a.is_correct).count(),
        user_answers,
        total_questions: questions.len(),
        completed_at: now,
    })
}
