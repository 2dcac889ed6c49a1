// src/store/mod.rs

//! Entity storage.
//!
//! Handlers and services only see the [`Repository`] trait; the process keeps
//! everything in a [`MemoryStore`]. Lookups return `Ok(None)` when a record is
//! absent. Only `create_user` has a failure mode of its own (`Conflict`).

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        exam::{Exam, NewExam},
        exam_attempt::{ExamAttempt, ExamAttemptUpdate, NewExamAttempt},
        user::{NewUser, User},
    },
};

#[async_trait]
pub trait Repository: Send + Sync {
    // Users
    async fn create_user(&self, user: NewUser) -> Result<User, AppError>;
    async fn get_user(&self, id: i64) -> Result<Option<User>, AppError>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    /// All users in insertion order.
    async fn list_users(&self) -> Result<Vec<User>, AppError>;

    // Exams
    async fn create_exam(&self, exam: NewExam) -> Result<Exam, AppError>;
    async fn get_exam(&self, id: i64) -> Result<Option<Exam>, AppError>;
    /// All exams in insertion order.
    async fn get_all_exams(&self) -> Result<Vec<Exam>, AppError>;

    // Exam attempts
    async fn create_exam_attempt(&self, attempt: NewExamAttempt) -> Result<ExamAttempt, AppError>;
    async fn get_exam_attempt(&self, id: i64) -> Result<Option<ExamAttempt>, AppError>;
    async fn get_exam_attempts_by_user_id(&self, user_id: i64) -> Result<Vec<ExamAttempt>, AppError>;
    async fn get_exam_attempts_by_exam_id(&self, exam_id: i64) -> Result<Vec<ExamAttempt>, AppError>;
    async fn get_all_exam_attempts(&self) -> Result<Vec<ExamAttempt>, AppError>;
    /// Merges the present fields of `update` into the stored attempt.
    /// Returns `Ok(None)` if the id is unknown.
    async fn update_exam_attempt(
        &self,
        id: i64,
        update: ExamAttemptUpdate,
    ) -> Result<Option<ExamAttempt>, AppError>;
}
