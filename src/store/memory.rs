// src/store/memory.rs

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::Repository;
use crate::{
    error::AppError,
    models::{
        exam::{Exam, NewExam},
        exam_attempt::{ExamAttempt, ExamAttemptUpdate, NewExamAttempt},
        user::{NewUser, User},
    },
};

/// Process-lifetime storage for users, exams and attempts.
///
/// Ids are sequential per entity, start at 1 and are never reused. Maps are
/// keyed by id, so iteration order is insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Debug)]
struct Inner {
    users: BTreeMap<i64, User>,
    exams: BTreeMap<i64, Exam>,
    attempts: BTreeMap<i64, ExamAttempt>,
    next_user_id: i64,
    next_exam_id: i64,
    next_attempt_id: i64,
}

impl Default for Inner {
    fn default() -> Self {
        Inner {
            users: BTreeMap::new(),
            exams: BTreeMap::new(),
            attempts: BTreeMap::new(),
            next_user_id: 1,
            next_exam_id: 1,
            next_attempt_id: 1,
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id the next created attempt will receive.
    pub async fn next_attempt_id(&self) -> i64 {
        self.inner.read().await.next_attempt_id
    }
}

#[async_trait]
impl Repository for MemoryStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User, AppError> {
        let mut inner = self.inner.write().await;

        if inner.users.values().any(|u| u.username == new_user.username) {
            return Err(AppError::Conflict(format!(
                "Username '{}' already exists",
                new_user.username
            )));
        }
        if inner.users.values().any(|u| u.email == new_user.email) {
            return Err(AppError::Conflict(format!(
                "Email '{}' already exists",
                new_user.email
            )));
        }

        let id = inner.next_user_id;
        inner.next_user_id += 1;

        let user = User {
            id,
            username: new_user.username,
            password: new_user.password,
            name: new_user.name,
            email: new_user.email,
            role: new_user.role,
            created_at: Utc::now(),
        };
        inner.users.insert(id, user.clone());
        tracing::debug!("Created user {} ({})", id, user.username);
        Ok(user)
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.username == username).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        Ok(self.inner.read().await.users.values().cloned().collect())
    }

    async fn create_exam(&self, new_exam: NewExam) -> Result<Exam, AppError> {
        let mut inner = self.inner.write().await;
        let id = inner.next_exam_id;
        inner.next_exam_id += 1;

        let exam = Exam {
            id,
            title: new_exam.title,
            language: new_exam.language,
            level: new_exam.level,
            description: new_exam.description,
            time_limit: new_exam.time_limit,
            questions: new_exam.questions,
            created_at: Utc::now(),
        };
        inner.exams.insert(id, exam.clone());
        tracing::debug!("Created exam {} ({})", id, exam.title);
        Ok(exam)
    }

    async fn get_exam(&self, id: i64) -> Result<Option<Exam>, AppError> {
        Ok(self.inner.read().await.exams.get(&id).cloned())
    }

    async fn get_all_exams(&self) -> Result<Vec<Exam>, AppError> {
        Ok(self.inner.read().await.exams.values().cloned().collect())
    }

    async fn create_exam_attempt(&self, new_attempt: NewExamAttempt) -> Result<ExamAttempt, AppError> {
        let mut inner = self.inner.write().await;
        let id = inner.next_attempt_id;
        inner.next_attempt_id += 1;

        let attempt = ExamAttempt {
            id,
            user_id: new_attempt.user_id,
            exam_id: new_attempt.exam_id,
            score: new_attempt.score,
            time_taken: new_attempt.time_taken,
            answers: new_attempt.answers,
            completed: new_attempt.completed,
            created_at: Utc::now(),
        };
        inner.attempts.insert(id, attempt.clone());
        Ok(attempt)
    }

    async fn get_exam_attempt(&self, id: i64) -> Result<Option<ExamAttempt>, AppError> {
        Ok(self.inner.read().await.attempts.get(&id).cloned())
    }

    async fn get_exam_attempts_by_user_id(&self, user_id: i64) -> Result<Vec<ExamAttempt>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .attempts
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_exam_attempts_by_exam_id(&self, exam_id: i64) -> Result<Vec<ExamAttempt>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .attempts
            .values()
            .filter(|a| a.exam_id == exam_id)
            .cloned()
            .collect())
    }

    async fn get_all_exam_attempts(&self) -> Result<Vec<ExamAttempt>, AppError> {
        Ok(self.inner.read().await.attempts.values().cloned().collect())
    }

    async fn update_exam_attempt(
        &self,
        id: i64,
        update: ExamAttemptUpdate,
    ) -> Result<Option<ExamAttempt>, AppError> {
        let mut inner = self.inner.write().await;
        let Some(attempt) = inner.attempts.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(score) = update.score {
            attempt.score = score;
        }
        if let Some(time_taken) = update.time_taken {
            attempt.time_taken = time_taken;
        }
        if let Some(answers) = update.answers {
            attempt.answers = answers;
        }
        if let Some(completed) = update.completed {
            attempt.completed = completed;
        }

        Ok(Some(attempt.clone()))
    }
}
