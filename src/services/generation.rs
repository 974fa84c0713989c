//! Prompt construction and parsing of the line-oriented formats the model is
//! asked to answer in.

use std::sync::LazyLock;

use regex::Regex;

use crate::db::models::document_chunk::Chunk;
use crate::db::models::flashcard::{Difficulty, Flashcard};
use crate::db::models::quiz::{OPTIONS_PER_QUESTION, QuizQuestion};

const BLOCK_SEPARATOR: &str = "---";

static OPTION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0\d:").expect("option pattern is valid"));

/// First `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// Chunk contents in the given order, separated by a blank line.
pub fn join_context(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .map(|c| c.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn flashcard_prompt(text: &str, count: usize) -> String {
    format!(
        "Generate exactly {count} educational flashcards from the following text.\n\n\
         Format each flashcard as:\n\
         Q: [Clear, specific question]\n\
         A: [Concise, accurate answer]\n\
         D: [Difficulty level: easy, medium, or hard]\n\n\
         Separate each flashcard with \"{BLOCK_SEPARATOR}\"\n\n\
         Text:\n{text}\n"
    )
}

pub fn quiz_prompt(text: &str, questions: usize) -> String {
    format!(
        "Generate exactly {questions} multiple choice questions from the following text.\n\n\
         Format each question as:\n\
         Q: [Question]\n\
         01: [Option 1]\n\
         02: [Option 2]\n\
         03: [Option 3]\n\
         04: [Option 4]\n\
         C: [Correct option, exactly as written above]\n\
         E: [Brief explanation]\n\
         D: [Difficulty: easy, medium, or hard]\n\n\
         Separate questions with \"{BLOCK_SEPARATOR}\"\n\n\
         Text:\n{text}\n"
    )
}

pub fn summary_prompt(text: &str) -> String {
    format!(
        "Provide a concise summary of the following text, highlighting the key concepts \
         and main ideas. Keep the summary clear and structured.\n\nText:\n{text}\n"
    )
}

pub fn chat_prompt(question: &str, context: &str) -> String {
    format!("Context:\n{context}\n\nQuestion: {question}")
}

pub fn explain_prompt(concept: &str, context: &str) -> String {
    format!(
        "Explain the concept of \"{concept}\" based on the following context. \
         Provide a clear, educational explanation that is easy to understand. \
         Include examples if relevant.\n\nContext:\n{context}\n"
    )
}

fn blocks(generated: &str) -> impl Iterator<Item = &str> {
    generated
        .split(BLOCK_SEPARATOR)
        .map(str::trim)
        .filter(|b| !b.is_empty())
}

fn field<'a>(line: &'a str, tag: &str) -> Option<&'a str> {
    line.strip_prefix(tag).map(str::trim)
}

/// Parse `Q:`/`A:`/`D:` blocks; blocks missing a question or answer are skipped.
pub fn parse_flashcards(generated: &str, count: usize) -> Vec<Flashcard> {
    let mut cards = Vec::new();

    for block in blocks(generated) {
        let mut question = "";
        let mut answer = "";
        let mut difficulty = Difficulty::default();

        for line in block.lines().map(str::trim) {
            if let Some(q) = field(line, "Q:") {
                question = q;
            } else if let Some(a) = field(line, "A:") {
                answer = a;
            } else if let Some(d) = field(line, "D:") {
                difficulty = Difficulty::parse(d).unwrap_or(difficulty);
            }
        }

        if !question.is_empty() && !answer.is_empty() {
            cards.push(Flashcard {
                question: question.to_string(),
                answer: answer.to_string(),
                difficulty,
            });
        }
    }

    cards.truncate(count);
    cards
}

/// Parse quiz blocks; only questions with four options and a correct answer survive.
pub fn parse_quiz(generated: &str, questions: usize) -> Vec<QuizQuestion> {
    let mut parsed = Vec::new();

    for block in blocks(generated) {
        let mut question = "";
        let mut options: Vec<String> = Vec::new();
        let mut correct_answer = "";
        let mut explanation = "";
        let mut difficulty = Difficulty::default();

        for line in block.lines().map(str::trim) {
            if let Some(q) = field(line, "Q:") {
                question = q;
            } else if OPTION_LINE.is_match(line) {
                options.push(line[3..].trim().to_string());
            } else if let Some(c) = field(line, "C:") {
                correct_answer = c;
            } else if let Some(e) = field(line, "E:") {
                explanation = e;
            } else if let Some(d) = field(line, "D:") {
                difficulty = Difficulty::parse(d).unwrap_or(difficulty);
            }
        }

        if !question.is_empty() && options.len() == OPTIONS_PER_QUESTION && !correct_answer.is_empty() {
            parsed.push(QuizQuestion {
                question: question.to_string(),
                options,
                correct_answer: correct_answer.to_string(),
                explanation: explanation.to_string(),
                difficulty,
            });
        }
    }

    parsed.truncate(questions);
    parsed
}
