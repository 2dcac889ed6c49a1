// src/models/exam.rs

use std::{collections::HashSet, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::config::{MEDIUM_EXAM_MAX_MINUTES, SHORT_EXAM_MAX_MINUTES};

/// Difficulty level of an exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    Beginner,
    Intermediate,
    Advanced,
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "beginner" => Ok(Level::Beginner),
            "intermediate" => Ok(Level::Intermediate),
            "advanced" => Ok(Level::Advanced),
            other => Err(format!("Unknown level '{}'", other)),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Beginner => "Beginner",
            Level::Intermediate => "Intermediate",
            Level::Advanced => "Advanced",
        };
        f.write_str(name)
    }
}

/// Duration bucket used for catalog filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationBucket {
    /// Up to 10 minutes.
    Short,
    /// 11 to 20 minutes.
    Medium,
    /// More than 20 minutes.
    Long,
}

impl DurationBucket {
    pub fn contains(self, time_limit_minutes: i64) -> bool {
        match self {
            DurationBucket::Short => time_limit_minutes <= SHORT_EXAM_MAX_MINUTES,
            DurationBucket::Medium => {
                time_limit_minutes > SHORT_EXAM_MAX_MINUTES
                    && time_limit_minutes <= MEDIUM_EXAM_MAX_MINUTES
            }
            DurationBucket::Long => time_limit_minutes > MEDIUM_EXAM_MAX_MINUTES,
        }
    }
}

impl FromStr for DurationBucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "short" => Ok(DurationBucket::Short),
            "medium" => Ok(DurationBucket::Medium),
            "long" => Ok(DurationBucket::Long),
            other => Err(format!("Unknown duration '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionOption {
    pub id: String,
    pub text: String,
}

/// A multiple-choice question embedded in an exam.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[validate(length(min = 1, max = 20))]
    pub id: String,
    #[validate(length(min = 1, max = 1000))]
    pub text: String,
    pub options: Vec<QuestionOption>,
    pub correct_option_id: String,
    /// e.g. vocabulary, grammar.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 50))]
    pub category: Option<String>,
}

impl Question {
    pub fn has_option(&self, option_id: &str) -> bool {
        self.options.iter().any(|o| o.id == option_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: i64,
    pub title: String,
    pub language: String,
    pub level: Level,
    pub description: String,
    /// In minutes.
    pub time_limit: i64,
    pub questions: Vec<Question>,
    pub created_at: DateTime<Utc>,
}

impl Exam {
    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    /// Time allotted to an attempt, in seconds.
    pub fn time_limit_seconds(&self) -> u64 {
        self.time_limit.max(0) as u64 * 60
    }
}

/// Fields the store needs to create an exam.
#[derive(Debug, Clone)]
pub struct NewExam {
    pub title: String,
    pub language: String,
    pub level: Level,
    pub description: String,
    pub time_limit: i64,
    pub questions: Vec<Question>,
}

/// DTO for sending an exam to clients (answer key removed).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicExam {
    pub id: i64,
    pub title: String,
    pub language: String,
    pub level: Level,
    pub description: String,
    pub time_limit: i64,
    pub question_count: usize,
    pub questions: Vec<PublicQuestion>,
    pub created_at: DateTime<Utc>,
}

/// DTO for sending a question to clients (excludes the correct option).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: String,
    pub text: String,
    pub options: Vec<QuestionOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl From<Exam> for PublicExam {
    fn from(exam: Exam) -> Self {
        PublicExam {
            id: exam.id,
            title: exam.title,
            language: exam.language,
            level: exam.level,
            description: exam.description,
            time_limit: exam.time_limit,
            question_count: exam.questions.len(),
            questions: exam
                .questions
                .into_iter()
                .map(|q| PublicQuestion {
                    id: q.id,
                    text: q.text,
                    options: q.options,
                    category: q.category,
                })
                .collect(),
            created_at: exam.created_at,
        }
    }
}

/// Query parameters for listing exams.
/// `all` or an empty value disables the corresponding filter.
#[derive(Debug, Default, Deserialize)]
pub struct ExamListParams {
    pub language: Option<String>,
    pub level: Option<String>,
    pub duration: Option<String>,
}

/// DTO for creating a new exam (admin).
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateExamRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 50))]
    pub language: String,
    pub level: Level,
    #[validate(length(min = 1, max = 5000))]
    pub description: String,
    #[validate(range(min = 1, max = 600, message = "Time limit must be between 1 and 600 minutes."))]
    pub time_limit: i64,
    #[validate(custom(function = validate_questions))]
    pub questions: Vec<Question>,
}

/// Checks the structure of an exam's question list: at least one question,
/// unique question ids, two or more uniquely-identified options per question,
/// and a correct option that references one of them.
fn validate_questions(questions: &[Question]) -> Result<(), validator::ValidationError> {
    if questions.is_empty() {
        return Err(validator::ValidationError::new("questions_cannot_be_empty"));
    }

    let mut question_ids = HashSet::new();
    for q in questions {
        if q.validate().is_err() {
            return Err(validator::ValidationError::new("invalid_question"));
        }
        if !question_ids.insert(q.id.as_str()) {
            return Err(validator::ValidationError::new("duplicate_question_id"));
        }
        if q.options.len() < 2 {
            return Err(validator::ValidationError::new("too_few_options"));
        }
        if q.options.iter().any(|o| {
            o.id.is_empty() || o.id.len() > 20 || o.text.is_empty() || o.text.len() > 500
        }) {
            return Err(validator::ValidationError::new("invalid_option"));
        }
        let mut option_ids = HashSet::new();
        if !q.options.iter().all(|o| option_ids.insert(o.id.as_str())) {
            return Err(validator::ValidationError::new("duplicate_option_id"));
        }
        if !q.has_option(&q.correct_option_id) {
            return Err(validator::ValidationError::new("unknown_correct_option"));
        }
    }
    Ok(())
}
