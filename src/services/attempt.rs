// src/services/attempt.rs

//! Exam attempt lifecycle: start, record answers, submit, expire.
//!
//! Every in-progress attempt has a session guarded by its own mutex, so
//! Record/Submit/Expire on one attempt never interleave while different
//! attempts proceed independently. A spawned task per session submits the
//! attempt when its deadline passes; a user-driven submit aborts that task.

use std::{
    collections::HashMap,
    sync::{Arc, Weak},
    time::Duration,
};

use chrono::Utc;
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::Instant,
};

use crate::{
    error::AppError,
    models::{
        exam::Exam,
        exam_attempt::{
            AttemptReview, AttemptTimer, ExamAttempt, ExamAttemptUpdate, NewExamAttempt,
            ReviewItem, UserAnswer,
        },
    },
    store::Repository,
};

/// Returns `(correct_count, score)` for the given answers.
///
/// Unanswered questions count as incorrect. The result only depends on the
/// final question → option mapping, not on the order answers were recorded.
pub fn grade(exam: &Exam, answers: &HashMap<String, String>) -> (usize, i64) {
    let correct = exam
        .questions
        .iter()
        .filter(|q| {
            answers
                .get(&q.id)
                .is_some_and(|selected| *selected == q.correct_option_id)
        })
        .count();
    (correct, percentage(correct, exam.questions.len()))
}

/// `round(100 * correct / total)` with halves rounded up; 0 when `total` is 0.
pub fn percentage(correct: usize, total: usize) -> i64 {
    if total == 0 {
        return 0;
    }
    ((200 * correct + total) / (2 * total)) as i64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    User,
    Expiry,
}

struct AttemptSession {
    attempt_id: i64,
    user_id: i64,
    exam: Exam,
    started_at: Instant,
    deadline: Instant,
    /// question id -> selected option id
    answers: HashMap<String, String>,
    completed: bool,
    expiry: Option<JoinHandle<()>>,
}

impl AttemptSession {
    /// Staged answers in exam question order.
    fn answer_list(&self) -> Vec<UserAnswer> {
        self.exam
            .questions
            .iter()
            .filter_map(|q| {
                self.answers.get(&q.id).map(|selected| UserAnswer {
                    question_id: q.id.clone(),
                    selected_option_id: selected.clone(),
                })
            })
            .collect()
    }

    fn ensure_owner(&self, user_id: i64) -> Result<(), AppError> {
        ensure_owner(self.user_id, user_id)
    }
}

enum Lookup {
    Active(Arc<Mutex<AttemptSession>>),
    Finished(ExamAttempt),
}

fn ensure_owner(owner_id: i64, user_id: i64) -> Result<(), AppError> {
    if owner_id != user_id {
        return Err(AppError::Forbidden(
            "You can only access your own exam attempts".to_string(),
        ));
    }
    Ok(())
}

pub struct AttemptService {
    store: Arc<dyn Repository>,
    sessions: Mutex<HashMap<i64, Arc<Mutex<AttemptSession>>>>,
    me: Weak<AttemptService>,
}

impl AttemptService {
    pub fn new(store: Arc<dyn Repository>) -> Arc<Self> {
        Arc::new_cyclic(|me| AttemptService {
            store,
            sessions: Mutex::new(HashMap::new()),
            me: me.clone(),
        })
    }

    /// Creates a pending attempt for `exam_id` and starts its countdown.
    ///
    /// Fails with `NotFound` before anything is stored if the exam is unknown.
    pub async fn start(&self, user_id: i64, exam_id: i64) -> Result<ExamAttempt, AppError> {
        let exam = self
            .store
            .get_exam(exam_id)
            .await?
            .ok_or(AppError::NotFound(format!("Exam {} not found", exam_id)))?;

        // The registry stays locked until the session is in place, so a
        // request for the new id cannot rebuild a second session meanwhile.
        let mut sessions = self.sessions.lock().await;
        let attempt = self
            .store
            .create_exam_attempt(NewExamAttempt::pending(user_id, exam_id))
            .await?;

        let started_at = Instant::now();
        let deadline = started_at + Duration::from_secs(exam.time_limit_seconds());
        let expiry = self.schedule_expiry(attempt.id, deadline);

        let session = AttemptSession {
            attempt_id: attempt.id,
            user_id,
            exam,
            started_at,
            deadline,
            answers: HashMap::new(),
            completed: false,
            expiry: Some(expiry),
        };
        sessions.insert(attempt.id, Arc::new(Mutex::new(session)));
        drop(sessions);

        tracing::info!(
            "User {} started attempt {} on exam {}",
            user_id,
            attempt.id,
            exam_id
        );
        Ok(attempt)
    }

    /// Records one answer, overwriting any earlier selection for the question.
    pub async fn record_answer(
        &self,
        attempt_id: i64,
        user_id: i64,
        question_id: &str,
        option_id: &str,
    ) -> Result<ExamAttempt, AppError> {
        self.record_answers(
            attempt_id,
            user_id,
            vec![UserAnswer {
                question_id: question_id.to_string(),
                selected_option_id: option_id.to_string(),
            }],
        )
        .await
    }

    /// Records a batch of answers. The whole batch is validated before any
    /// entry is applied, so an invalid entry leaves the attempt untouched.
    pub async fn record_answers(
        &self,
        attempt_id: i64,
        user_id: i64,
        answers: Vec<UserAnswer>,
    ) -> Result<ExamAttempt, AppError> {
        let session = match self.lookup(attempt_id, Some(user_id)).await? {
            Lookup::Active(session) => session,
            Lookup::Finished(_) => return Err(AppError::AlreadyCompleted(attempt_id)),
        };

        let mut session = session.lock().await;
        session.ensure_owner(user_id)?;
        if session.completed {
            return Err(AppError::AlreadyCompleted(attempt_id));
        }
        if Instant::now() >= session.deadline {
            self.finalize(&mut session, Trigger::Expiry, None).await?;
            return Err(AppError::AlreadyCompleted(attempt_id));
        }

        for answer in &answers {
            let question = session.exam.question(&answer.question_id).ok_or_else(|| {
                AppError::BadRequest(format!(
                    "Question '{}' is not part of this exam",
                    answer.question_id
                ))
            })?;
            if !question.has_option(&answer.selected_option_id) {
                return Err(AppError::BadRequest(format!(
                    "Option '{}' is not valid for question '{}'",
                    answer.selected_option_id, answer.question_id
                )));
            }
        }

        for answer in answers {
            session
                .answers
                .insert(answer.question_id, answer.selected_option_id);
        }

        let update = ExamAttemptUpdate {
            answers: Some(session.answer_list()),
            ..Default::default()
        };
        self.store
            .update_exam_attempt(attempt_id, update)
            .await?
            .ok_or(AppError::NotFound(format!("Exam attempt {} not found", attempt_id)))
    }

    /// Scores and completes the attempt.
    ///
    /// `explicit_time_taken` is only for trusted callers; HTTP clients always
    /// get the elapsed time measured here. Either way the value is clamped to
    /// the exam's time limit. A second submit fails with `AlreadyCompleted`
    /// and changes nothing.
    pub async fn submit(
        &self,
        attempt_id: i64,
        user_id: i64,
        explicit_time_taken: Option<u64>,
    ) -> Result<ExamAttempt, AppError> {
        let session = match self.lookup(attempt_id, Some(user_id)).await? {
            Lookup::Active(session) => session,
            Lookup::Finished(_) => return Err(AppError::AlreadyCompleted(attempt_id)),
        };

        let mut session = session.lock().await;
        session.ensure_owner(user_id)?;
        if session.completed {
            return Err(AppError::AlreadyCompleted(attempt_id));
        }

        self.finalize(&mut session, Trigger::User, explicit_time_taken)
            .await
    }

    /// Records `answers` (if any) and, when `submit` is set, completes the
    /// attempt. Recording and submitting take the attempt lock separately, so
    /// an expiry that lands in between wins and its result is returned.
    /// Submitting an already completed attempt returns it unchanged.
    pub async fn update(
        &self,
        attempt_id: i64,
        user_id: i64,
        answers: Option<Vec<UserAnswer>>,
        submit: bool,
    ) -> Result<ExamAttempt, AppError> {
        let mut latest = None;
        if let Some(answers) = answers {
            match self.record_answers(attempt_id, user_id, answers).await {
                Ok(attempt) => latest = Some(attempt),
                // A retried submit may carry answers for an attempt that is already done.
                Err(AppError::AlreadyCompleted(_)) if submit => {}
                Err(e) => return Err(e),
            }
        }

        if submit {
            return match self.submit(attempt_id, user_id, None).await {
                Err(AppError::AlreadyCompleted(_)) => {
                    tracing::debug!("Duplicate submit for attempt {}", attempt_id);
                    self.get_attempt(attempt_id, user_id).await
                }
                other => other,
            };
        }

        match latest {
            Some(attempt) => Ok(attempt),
            None => self.get_attempt(attempt_id, user_id).await,
        }
    }

    /// Timer-driven submit. Returns `Ok(None)` when the attempt was already
    /// completed by the time the lock was acquired.
    async fn expire(&self, attempt_id: i64) -> Result<Option<ExamAttempt>, AppError> {
        let session = match self.lookup(attempt_id, None).await? {
            Lookup::Active(session) => session,
            Lookup::Finished(_) => return Ok(None),
        };

        let mut session = session.lock().await;
        if session.completed {
            return Ok(None);
        }
        self.finalize(&mut session, Trigger::Expiry, None)
            .await
            .map(Some)
    }

    async fn finalize(
        &self,
        session: &mut AttemptSession,
        trigger: Trigger,
        explicit_time_taken: Option<u64>,
    ) -> Result<ExamAttempt, AppError> {
        let limit = session.exam.time_limit_seconds();
        let time_taken = match trigger {
            Trigger::Expiry => limit,
            Trigger::User => explicit_time_taken
                .unwrap_or_else(|| session.started_at.elapsed().as_secs())
                .min(limit),
        };
        let (correct, score) = grade(&session.exam, &session.answers);

        let update = ExamAttemptUpdate {
            score: Some(score),
            time_taken: Some(time_taken as i64),
            answers: Some(session.answer_list()),
            completed: Some(true),
        };
        let attempt = self
            .store
            .update_exam_attempt(session.attempt_id, update)
            .await?
            .ok_or(AppError::NotFound(format!(
                "Exam attempt {} not found",
                session.attempt_id
            )))?;

        session.completed = true;
        // The expiry task may be the caller here; it must not abort itself.
        if let Some(handle) = session.expiry.take() {
            if trigger == Trigger::User {
                handle.abort();
            }
        }
        self.sessions.lock().await.remove(&session.attempt_id);

        tracing::info!(
            "Attempt {} completed ({:?}): {}/{} correct, score {}, {}s",
            attempt.id,
            trigger,
            correct,
            session.exam.questions.len(),
            attempt.score,
            attempt.time_taken
        );
        Ok(attempt)
    }

    fn schedule_expiry(&self, attempt_id: i64, deadline: Instant) -> JoinHandle<()> {
        let service = self.me.clone();
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let Some(service) = service.upgrade() else {
                return;
            };
            match service.expire(attempt_id).await {
                Ok(Some(_)) => tracing::info!("Attempt {} expired", attempt_id),
                Ok(None) => tracing::debug!("Attempt {} finished before expiry", attempt_id),
                Err(e) => tracing::error!("Failed to expire attempt {}: {}", attempt_id, e),
            }
        })
    }

    /// Finds the live session for an attempt, rebuilding it from the store if
    /// the attempt is in progress but has no session yet.
    ///
    /// `caller` is checked against the stored owner before anything is
    /// rebuilt; the expiry task passes `None`.
    async fn lookup(&self, attempt_id: i64, caller: Option<i64>) -> Result<Lookup, AppError> {
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.get(&attempt_id) {
            return Ok(Lookup::Active(session.clone()));
        }

        let attempt = self
            .store
            .get_exam_attempt(attempt_id)
            .await?
            .ok_or(AppError::NotFound(format!("Exam attempt {} not found", attempt_id)))?;
        if let Some(user_id) = caller {
            ensure_owner(attempt.user_id, user_id)?;
        }
        if attempt.completed {
            return Ok(Lookup::Finished(attempt));
        }

        let exam = self
            .store
            .get_exam(attempt.exam_id)
            .await?
            .ok_or(AppError::NotFound(format!("Exam {} not found", attempt.exam_id)))?;

        let elapsed = (Utc::now() - attempt.created_at)
            .to_std()
            .unwrap_or_default();
        let now = Instant::now();
        let started_at = now.checked_sub(elapsed).unwrap_or(now);
        let deadline = started_at + Duration::from_secs(exam.time_limit_seconds());

        let session = Arc::new(Mutex::new(AttemptSession {
            attempt_id,
            user_id: attempt.user_id,
            answers: attempt
                .answers
                .iter()
                .map(|a| (a.question_id.clone(), a.selected_option_id.clone()))
                .collect(),
            exam,
            started_at,
            deadline,
            completed: false,
            expiry: Some(self.schedule_expiry(attempt_id, deadline)),
        }));
        sessions.insert(attempt_id, session.clone());

        tracing::debug!("Rebuilt session for attempt {}", attempt_id);
        Ok(Lookup::Active(session))
    }

    pub async fn get_attempt(&self, attempt_id: i64, user_id: i64) -> Result<ExamAttempt, AppError> {
        let attempt = self
            .store
            .get_exam_attempt(attempt_id)
            .await?
            .ok_or(AppError::NotFound(format!("Exam attempt {} not found", attempt_id)))?;
        ensure_owner(attempt.user_id, user_id)?;
        Ok(attempt)
    }

    pub async fn attempts_for_user(&self, user_id: i64) -> Result<Vec<ExamAttempt>, AppError> {
        self.store.get_exam_attempts_by_user_id(user_id).await
    }

    /// Countdown state of an in-progress attempt.
    pub async fn timer(&self, attempt_id: i64, user_id: i64) -> Result<AttemptTimer, AppError> {
        let session = match self.lookup(attempt_id, Some(user_id)).await? {
            Lookup::Active(session) => session,
            Lookup::Finished(_) => return Err(AppError::AlreadyCompleted(attempt_id)),
        };

        let session = session.lock().await;
        session.ensure_owner(user_id)?;
        if session.completed {
            return Err(AppError::AlreadyCompleted(attempt_id));
        }

        let total = session.exam.time_limit_seconds();
        let elapsed = session.started_at.elapsed().as_secs().min(total);
        Ok(AttemptTimer {
            attempt_id,
            remaining_seconds: total - elapsed,
            elapsed_seconds: elapsed,
            total_seconds: total,
        })
    }

    /// Question-by-question outcome of a completed attempt.
    pub async fn review(&self, attempt_id: i64, user_id: i64) -> Result<AttemptReview, AppError> {
        let attempt = self.get_attempt(attempt_id, user_id).await?;
        if !attempt.completed {
            return Err(AppError::BadRequest(
                "Exam attempt is not completed yet".to_string(),
            ));
        }

        let exam = self
            .store
            .get_exam(attempt.exam_id)
            .await?
            .ok_or(AppError::NotFound(format!("Exam {} not found", attempt.exam_id)))?;

        let selected: HashMap<&str, &str> = attempt
            .answers
            .iter()
            .map(|a| (a.question_id.as_str(), a.selected_option_id.as_str()))
            .collect();

        let items: Vec<ReviewItem> = exam
            .questions
            .iter()
            .map(|q| {
                let choice = selected.get(q.id.as_str()).map(|s| s.to_string());
                ReviewItem {
                    question_id: q.id.clone(),
                    text: q.text.clone(),
                    is_correct: choice.as_deref() == Some(q.correct_option_id.as_str()),
                    selected_option_id: choice,
                    correct_option_id: q.correct_option_id.clone(),
                }
            })
            .collect();

        Ok(AttemptReview {
            attempt_id,
            exam_id: exam.id,
            exam_title: exam.title,
            score: attempt.score,
            correct_count: items.iter().filter(|i| i.is_correct).count(),
            total_questions: items.len(),
            items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{
            exam::{Level, NewExam, Question, QuestionOption},
            user::{NewUser, User},
        },
        store::MemoryStore,
    };
    use async_trait::async_trait;

    /// Store whose `create_exam_attempt` takes a while to return, like a
    /// database round trip after the row is written.
    struct SlowStore {
        inner: MemoryStore,
        delay: Duration,
    }

    #[async_trait]
    impl Repository for SlowStore {
        async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
            self.inner.create_user(user).await
        }
        async fn get_user(&self, id: i64) -> Result<Option<User>, AppError> {
            self.inner.get_user(id).await
        }
        async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
            self.inner.get_user_by_username(username).await
        }
        async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
            self.inner.get_user_by_email(email).await
        }
        async fn list_users(&self) -> Result<Vec<User>, AppError> {
            self.inner.list_users().await
        }
        async fn create_exam(&self, exam: NewExam) -> Result<Exam, AppError> {
            self.inner.create_exam(exam).await
        }
        async fn get_exam(&self, id: i64) -> Result<Option<Exam>, AppError> {
            self.inner.get_exam(id).await
        }
        async fn get_all_exams(&self) -> Result<Vec<Exam>, AppError> {
            self.inner.get_all_exams().await
        }
        async fn create_exam_attempt(&self, attempt: NewExamAttempt) -> Result<ExamAttempt, AppError> {
            let created = self.inner.create_exam_attempt(attempt).await?;
            tokio::time::sleep(self.delay).await;
            Ok(created)
        }
        async fn get_exam_attempt(&self, id: i64) -> Result<Option<ExamAttempt>, AppError> {
            self.inner.get_exam_attempt(id).await
        }
        async fn get_exam_attempts_by_user_id(&self, user_id: i64) -> Result<Vec<ExamAttempt>, AppError> {
            self.inner.get_exam_attempts_by_user_id(user_id).await
        }
        async fn get_exam_attempts_by_exam_id(&self, exam_id: i64) -> Result<Vec<ExamAttempt>, AppError> {
            self.inner.get_exam_attempts_by_exam_id(exam_id).await
        }
        async fn get_all_exam_attempts(&self) -> Result<Vec<ExamAttempt>, AppError> {
            self.inner.get_all_exam_attempts().await
        }
        async fn update_exam_attempt(
            &self,
            id: i64,
            update: ExamAttemptUpdate,
        ) -> Result<Option<ExamAttempt>, AppError> {
            self.inner.update_exam_attempt(id, update).await
        }
    }

    fn question(id: &str, correct: &str) -> Question {
        Question {
            id: id.to_string(),
            text: format!("Question {}", id),
            options: ["a", "b", "c"]
                .iter()
                .map(|o| QuestionOption {
                    id: o.to_string(),
                    text: o.to_uppercase(),
                })
                .collect(),
            correct_option_id: correct.to_string(),
            category: None,
        }
    }

    async fn setup(questions: Vec<Question>, minutes: i64) -> (Arc<MemoryStore>, Arc<AttemptService>, Exam) {
        let store = Arc::new(MemoryStore::new());
        let exam = store
            .create_exam(NewExam {
                title: "Spanish: Basics".into(),
                language: "Spanish".into(),
                level: Level::Beginner,
                description: "d".into(),
                time_limit: minutes,
                questions,
            })
            .await
            .unwrap();
        let service = AttemptService::new(store.clone());
        (store, service, exam)
    }

    fn answers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(q, o)| (q.to_string(), o.to_string()))
            .collect()
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(percentage(1, 2), 50);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(4, 4), 100);
    }

    #[tokio::test]
    async fn grade_counts_unanswered_as_incorrect() {
        let (_, _, exam) = setup(
            vec![question("q1", "a"), question("q2", "b"), question("q3", "c")],
            10,
        )
        .await;
        let (correct, score) = grade(&exam, &answers(&[("q1", "a"), ("q3", "a")]));
        assert_eq!(correct, 1);
        assert_eq!(score, 33);
    }

    #[tokio::test]
    async fn grade_ignores_answers_outside_the_exam() {
        let (_, _, exam) = setup(vec![question("q1", "a")], 10).await;
        let (correct, score) = grade(&exam, &answers(&[("q9", "a"), ("q1", "a")]));
        assert_eq!((correct, score), (1, 100));
    }

    #[tokio::test]
    async fn start_creates_pending_attempt() {
        let (_, service, exam) = setup(vec![question("q1", "a")], 10).await;
        let attempt = service.start(7, exam.id).await.unwrap();

        assert!(!attempt.completed);
        assert_eq!(attempt.score, 0);
        assert_eq!(attempt.time_taken, 0);
        assert!(attempt.answers.is_empty());
        assert_eq!(attempt.user_id, 7);
        assert_eq!(attempt.exam_id, exam.id);
    }

    #[tokio::test]
    async fn start_with_unknown_exam_creates_nothing() {
        let (store, service, _) = setup(vec![question("q1", "a")], 10).await;
        let before = store.next_attempt_id().await;

        let err = service.start(1, 999).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(store.next_attempt_id().await, before);
        assert!(store.get_all_exam_attempts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn half_correct_submission_scores_fifty() {
        let (_, service, exam) = setup(vec![question("q1", "b"), question("q2", "b")], 10).await;
        let attempt = service.start(1, exam.id).await.unwrap();

        service.record_answer(attempt.id, 1, "q1", "b").await.unwrap();
        service.record_answer(attempt.id, 1, "q2", "a").await.unwrap();
        let done = service.submit(attempt.id, 1, None).await.unwrap();

        assert_eq!(done.score, 50);
        assert!(done.completed);
        assert_eq!(done.answers.len(), 2);
    }

    #[tokio::test]
    async fn later_answer_overwrites_earlier_one() {
        let (_, service, exam) = setup(vec![question("q1", "b")], 10).await;
        let attempt = service.start(1, exam.id).await.unwrap();

        service.record_answer(attempt.id, 1, "q1", "a").await.unwrap();
        let staged = service.record_answer(attempt.id, 1, "q1", "b").await.unwrap();
        assert_eq!(staged.answers.len(), 1);
        assert_eq!(staged.answers[0].selected_option_id, "b");

        let done = service.submit(attempt.id, 1, None).await.unwrap();
        assert_eq!(done.score, 100);
    }

    #[tokio::test]
    async fn unknown_question_is_rejected_without_mutation() {
        let (store, service, exam) = setup(vec![question("q1", "a")], 10).await;
        let attempt = service.start(1, exam.id).await.unwrap();
        service.record_answer(attempt.id, 1, "q1", "c").await.unwrap();

        let err = service
            .record_answer(attempt.id, 1, "q42", "a")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = service
            .record_answer(attempt.id, 1, "q1", "z")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let stored = store.get_exam_attempt(attempt.id).await.unwrap().unwrap();
        assert_eq!(
            stored.answers,
            vec![UserAnswer {
                question_id: "q1".into(),
                selected_option_id: "c".into()
            }]
        );
    }

    #[tokio::test]
    async fn invalid_batch_applies_nothing() {
        let (store, service, exam) = setup(vec![question("q1", "a"), question("q2", "a")], 10).await;
        let attempt = service.start(1, exam.id).await.unwrap();

        let batch = vec![
            UserAnswer { question_id: "q1".into(), selected_option_id: "a".into() },
            UserAnswer { question_id: "q2".into(), selected_option_id: "nope".into() },
        ];
        assert!(service.record_answers(attempt.id, 1, batch).await.is_err());

        let stored = store.get_exam_attempt(attempt.id).await.unwrap().unwrap();
        assert!(stored.answers.is_empty());
    }

    #[tokio::test]
    async fn second_submit_changes_nothing() {
        let (store, service, exam) = setup(vec![question("q1", "a")], 10).await;
        let attempt = service.start(1, exam.id).await.unwrap();
        service.record_answer(attempt.id, 1, "q1", "a").await.unwrap();

        let first = service.submit(attempt.id, 1, Some(30)).await.unwrap();
        let err = service.submit(attempt.id, 1, Some(500)).await.unwrap_err();

        assert_eq!(err, AppError::AlreadyCompleted(attempt.id));
        let stored = store.get_exam_attempt(attempt.id).await.unwrap().unwrap();
        assert_eq!(stored, first);
        assert_eq!(stored.time_taken, 30);
    }

    #[tokio::test]
    async fn racing_submits_have_one_winner() {
        let (_, service, exam) = setup(vec![question("q1", "a")], 10).await;
        let attempt = service.start(1, exam.id).await.unwrap();

        let (a, b) = tokio::join!(
            service.submit(attempt.id, 1, None),
            service.submit(attempt.id, 1, None)
        );

        let wins = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1);
        assert!(
            [a, b]
                .into_iter()
                .any(|r| r == Err(AppError::AlreadyCompleted(attempt.id)))
        );
    }

    #[tokio::test]
    async fn answers_after_completion_are_rejected() {
        let (_, service, exam) = setup(vec![question("q1", "a")], 10).await;
        let attempt = service.start(1, exam.id).await.unwrap();
        service.submit(attempt.id, 1, None).await.unwrap();

        let err = service
            .record_answer(attempt.id, 1, "q1", "a")
            .await
            .unwrap_err();
        assert_eq!(err, AppError::AlreadyCompleted(attempt.id));
    }

    #[tokio::test]
    async fn other_users_are_forbidden() {
        let (_, service, exam) = setup(vec![question("q1", "a")], 10).await;
        let attempt = service.start(1, exam.id).await.unwrap();

        let err = service
            .record_answer(attempt.id, 2, "q1", "a")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(matches!(
            service.submit(attempt.id, 2, None).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            service.get_attempt(attempt.id, 2).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn unknown_attempt_is_not_found() {
        let (_, service, _) = setup(vec![question("q1", "a")], 10).await;
        assert!(matches!(
            service.submit(77, 1, None).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.record_answer(77, 1, "q1", "a").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn submit_uses_elapsed_time() {
        let (_, service, exam) = setup(vec![question("q1", "a")], 10).await;
        let attempt = service.start(1, exam.id).await.unwrap();

        tokio::time::advance(Duration::from_secs(90)).await;
        let done = service.submit(attempt.id, 1, None).await.unwrap();

        assert_eq!(done.time_taken, 90);
    }

    #[tokio::test]
    async fn explicit_time_is_clamped_to_limit() {
        let (_, service, exam) = setup(vec![question("q1", "a")], 1).await;
        let attempt = service.start(1, exam.id).await.unwrap();

        let done = service.submit(attempt.id, 1, Some(10_000)).await.unwrap();
        assert_eq!(done.time_taken, 60);
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_submits_unanswered_exam() {
        let (store, service, exam) = setup(
            vec![
                question("q1", "a"),
                question("q2", "a"),
                question("q3", "a"),
                question("q4", "a"),
            ],
            5,
        )
        .await;
        let attempt = service.start(1, exam.id).await.unwrap();

        tokio::time::sleep(Duration::from_secs(5 * 60 + 1)).await;

        let stored = store.get_exam_attempt(attempt.id).await.unwrap().unwrap();
        assert!(stored.completed);
        assert_eq!(stored.score, 0);
        assert_eq!(stored.time_taken, 300);
        assert_eq!(
            service.submit(attempt.id, 1, None).await,
            Err(AppError::AlreadyCompleted(attempt.id))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_keeps_answers_recorded_so_far() {
        let (store, service, exam) = setup(vec![question("q1", "a"), question("q2", "b")], 1).await;
        let attempt = service.start(1, exam.id).await.unwrap();
        service.record_answer(attempt.id, 1, "q1", "a").await.unwrap();

        tokio::time::sleep(Duration::from_secs(61)).await;

        let stored = store.get_exam_attempt(attempt.id).await.unwrap().unwrap();
        assert!(stored.completed);
        assert_eq!(stored.score, 50);
        assert_eq!(stored.time_taken, 60);
        assert_eq!(
            service.record_answer(attempt.id, 1, "q2", "b").await,
            Err(AppError::AlreadyCompleted(attempt.id))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_does_not_touch_submitted_attempt() {
        let (store, service, exam) = setup(vec![question("q1", "a")], 1).await;
        let attempt = service.start(1, exam.id).await.unwrap();
        service.record_answer(attempt.id, 1, "q1", "a").await.unwrap();

        tokio::time::advance(Duration::from_secs(20)).await;
        let submitted = service.submit(attempt.id, 1, None).await.unwrap();

        tokio::time::sleep(Duration::from_secs(120)).await;

        let stored = store.get_exam_attempt(attempt.id).await.unwrap().unwrap();
        assert_eq!(stored, submitted);
        assert_eq!(stored.time_taken, 20);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_reports_remaining_seconds() {
        let (_, service, exam) = setup(vec![question("q1", "a")], 2).await;
        let attempt = service.start(1, exam.id).await.unwrap();

        tokio::time::advance(Duration::from_secs(45)).await;
        let timer = service.timer(attempt.id, 1).await.unwrap();

        assert_eq!(
            timer,
            AttemptTimer {
                attempt_id: attempt.id,
                remaining_seconds: 75,
                elapsed_seconds: 45,
                total_seconds: 120,
            }
        );
    }

    #[tokio::test]
    async fn attempt_created_outside_the_service_is_picked_up() {
        let (store, service, exam) = setup(vec![question("q1", "a")], 10).await;
        let attempt = store
            .create_exam_attempt(NewExamAttempt::pending(3, exam.id))
            .await
            .unwrap();

        service.record_answer(attempt.id, 3, "q1", "a").await.unwrap();
        let done = service.submit(attempt.id, 3, None).await.unwrap();
        assert_eq!(done.score, 100);
    }

    #[tokio::test]
    async fn review_lists_every_question() {
        let (_, service, exam) = setup(vec![question("q1", "a"), question("q2", "b")], 10).await;
        let attempt = service.start(1, exam.id).await.unwrap();

        assert!(matches!(
            service.review(attempt.id, 1).await,
            Err(AppError::BadRequest(_))
        ));

        service.record_answer(attempt.id, 1, "q1", "a").await.unwrap();
        service.submit(attempt.id, 1, None).await.unwrap();
        let review = service.review(attempt.id, 1).await.unwrap();

        assert_eq!(review.score, 50);
        assert_eq!(review.correct_count, 1);
        assert_eq!(review.total_questions, 2);
        assert!(review.items[0].is_correct);
        assert_eq!(review.items[1].selected_option_id, None);
        assert_eq!(review.items[1].correct_option_id, "b");
    }

    #[tokio::test(start_paused = true)]
    async fn answer_recorded_while_start_is_returning_is_kept() {
        let store = Arc::new(SlowStore {
            inner: MemoryStore::new(),
            delay: Duration::from_millis(50),
        });
        let exam = store
            .create_exam(NewExam {
                title: "French: Basics".into(),
                language: "French".into(),
                level: Level::Beginner,
                description: "d".into(),
                time_limit: 10,
                questions: vec![question("q1", "a")],
            })
            .await
            .unwrap();
        let service = AttemptService::new(store.clone());

        let starting = tokio::spawn({
            let service = service.clone();
            async move { service.start(1, exam.id).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        // Attempt ids start at 1, so the id is known before start returns.
        service.record_answer(1, 1, "q1", "a").await.unwrap();
        let attempt = starting.await.unwrap().unwrap();
        assert_eq!(attempt.id, 1);

        let done = service.submit(attempt.id, 1, None).await.unwrap();
        assert_eq!(done.score, 100);
        assert_eq!(done.answers.len(), 1);
    }

    #[tokio::test]
    async fn other_user_does_not_rebuild_a_session() {
        let (store, service, exam) = setup(vec![question("q1", "a")], 10).await;
        let attempt = store
            .create_exam_attempt(NewExamAttempt::pending(3, exam.id))
            .await
            .unwrap();

        assert!(matches!(
            service.record_answer(attempt.id, 4, "q1", "a").await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            service.timer(attempt.id, 4).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(!service.sessions.lock().await.contains_key(&attempt.id));
    }

    #[tokio::test]
    async fn update_records_then_submits() {
        let (_, service, exam) = setup(vec![question("q1", "a"), question("q2", "b")], 10).await;
        let attempt = service.start(1, exam.id).await.unwrap();

        let staged = service
            .update(
                attempt.id,
                1,
                Some(vec![UserAnswer { question_id: "q1".into(), selected_option_id: "a".into() }]),
                false,
            )
            .await
            .unwrap();
        assert!(!staged.completed);

        let done = service
            .update(
                attempt.id,
                1,
                Some(vec![UserAnswer { question_id: "q2".into(), selected_option_id: "b".into() }]),
                true,
            )
            .await
            .unwrap();
        assert!(done.completed);
        assert_eq!(done.score, 100);

        let again = service.update(attempt.id, 1, None, true).await.unwrap();
        assert_eq!(again, done);
    }

    #[tokio::test(start_paused = true)]
    async fn update_after_deadline_returns_the_expired_attempt() {
        let (store, service, exam) = setup(vec![question("q1", "a"), question("q2", "b")], 1).await;
        let attempt = service.start(1, exam.id).await.unwrap();
        service.record_answer(attempt.id, 1, "q1", "a").await.unwrap();

        tokio::time::sleep(Duration::from_secs(61)).await;

        let result = service
            .update(
                attempt.id,
                1,
                Some(vec![UserAnswer { question_id: "q2".into(), selected_option_id: "b".into() }]),
                true,
            )
            .await
            .unwrap();

        assert!(result.completed);
        assert_eq!(result.score, 50);
        assert_eq!(result.time_taken, 60);
        assert_eq!(result.answers.len(), 1);
        assert_eq!(
            store.get_exam_attempt(attempt.id).await.unwrap().unwrap(),
            result
        );
    }

    #[tokio::test(start_paused = true)]
    async fn update_without_submit_after_deadline_is_rejected() {
        let (_, service, exam) = setup(vec![question("q1", "a")], 1).await;
        let attempt = service.start(1, exam.id).await.unwrap();

        tokio::time::advance(Duration::from_secs(61)).await;

        let err = service
            .update(
                attempt.id,
                1,
                Some(vec![UserAnswer { question_id: "q1".into(), selected_option_id: "a".into() }]),
                false,
            )
            .await
            .unwrap_err();
        assert_eq!(err, AppError::AlreadyCompleted(attempt.id));
    }
}
