// src/models/exam_attempt.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::user::User;

/// One selected option for one question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserAnswer {
    pub question_id: String,
    pub selected_option_id: String,
}

/// A user's single pass at an exam.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExamAttempt {
    pub id: i64,
    pub user_id: i64,
    pub exam_id: i64,
    /// 0-100; stays 0 until completed.
    pub score: i64,
    /// Seconds.
    pub time_taken: i64,
    pub answers: Vec<UserAnswer>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields the store needs to create an attempt.
#[derive(Debug, Clone)]
pub struct NewExamAttempt {
    pub user_id: i64,
    pub exam_id: i64,
    pub score: i64,
    pub time_taken: i64,
    pub answers: Vec<UserAnswer>,
    pub completed: bool,
}

impl NewExamAttempt {
    /// A fresh, unanswered attempt.
    pub fn pending(user_id: i64, exam_id: i64) -> Self {
        NewExamAttempt {
            user_id,
            exam_id,
            score: 0,
            time_taken: 0,
            answers: Vec::new(),
            completed: false,
        }
    }
}

/// Partial update merged into a stored attempt. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ExamAttemptUpdate {
    pub score: Option<i64>,
    pub time_taken: Option<i64>,
    pub answers: Option<Vec<UserAnswer>>,
    pub completed: Option<bool>,
}

/// DTO for starting an attempt.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAttemptRequest {
    pub exam_id: i64,
}

/// DTO for `PUT /exam-attempts/{id}`.
///
/// `score` and `time_taken` are accepted for compatibility with older clients
/// but ignored: both are computed on the server.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAttemptRequest {
    pub answers: Option<Vec<UserAnswer>>,
    pub completed: Option<bool>,
    pub score: Option<i64>,
    pub time_taken: Option<i64>,
}

/// Remaining time of an in-progress attempt.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AttemptTimer {
    pub attempt_id: i64,
    pub remaining_seconds: u64,
    pub elapsed_seconds: u64,
    pub total_seconds: u64,
}

/// Per-question outcome of a completed attempt.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReviewItem {
    pub question_id: String,
    pub text: String,
    pub selected_option_id: Option<String>,
    pub correct_option_id: String,
    pub is_correct: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptReview {
    pub attempt_id: i64,
    pub exam_id: i64,
    pub exam_title: String,
    pub score: i64,
    pub correct_count: usize,
    pub total_questions: usize,
    pub items: Vec<ReviewItem>,
}

/// Aggregated row of the leaderboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub user: User,
    pub average_score: i64,
    pub exams_completed: usize,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardParams {
    pub limit: Option<usize>,
}

/// Dashboard statistics for the current user.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub exams_completed: usize,
    pub average_score: i64,
    pub languages: Vec<LanguageProgress>,
    pub recent_activity: Vec<RecentActivity>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LanguageProgress {
    pub language: String,
    pub exams_completed: usize,
    pub average_score: i64,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivity {
    pub attempt_id: i64,
    pub exam_id: i64,
    pub exam_title: String,
    pub language: String,
    pub score: i64,
    pub created_at: DateTime<Utc>,
}
