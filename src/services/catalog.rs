// src/services/catalog.rs

use std::sync::Arc;

use validator::Validate;

use crate::{
    error::AppError,
    models::exam::{CreateExamRequest, DurationBucket, Exam, ExamListParams, Level, NewExam, Question, QuestionOption},
    store::Repository,
    utils::html::clean_html,
};

/// Optional exact-match filters for the exam catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExamFilter {
    pub language: Option<String>,
    pub level: Option<Level>,
    pub duration: Option<DurationBucket>,
}

impl ExamFilter {
    pub fn matches(&self, exam: &Exam) -> bool {
        if let Some(language) = &self.language {
            if &exam.language != language {
                return false;
            }
        }
        if let Some(level) = self.level {
            if exam.level != level {
                return false;
            }
        }
        if let Some(bucket) = self.duration {
            if !bucket.contains(exam.time_limit) {
                return false;
            }
        }
        true
    }
}

impl TryFrom<ExamListParams> for ExamFilter {
    type Error = AppError;

    fn try_from(params: ExamListParams) -> Result<Self, Self::Error> {
        let level = active(params.level)
            .map(|v| v.parse::<Level>())
            .transpose()
            .map_err(AppError::BadRequest)?;
        let duration = active(params.duration)
            .map(|v| v.parse::<DurationBucket>())
            .transpose()
            .map_err(AppError::BadRequest)?;

        Ok(ExamFilter {
            language: active(params.language),
            level,
            duration,
        })
    }
}

/// `None`, an empty string and `all` all mean "do not filter".
fn active(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

/// Read access to exams, plus admin creation.
#[derive(Clone)]
pub struct ExamCatalog {
    store: Arc<dyn Repository>,
}

impl ExamCatalog {
    pub fn new(store: Arc<dyn Repository>) -> Self {
        Self { store }
    }

    pub async fn list_exams(&self, filter: &ExamFilter) -> Result<Vec<Exam>, AppError> {
        let exams = self.store.get_all_exams().await?;
        Ok(exams.into_iter().filter(|e| filter.matches(e)).collect())
    }

    pub async fn get_exam_by_id(&self, id: i64) -> Result<Exam, AppError> {
        self.store
            .get_exam(id)
            .await?
            .ok_or(AppError::NotFound(format!("Exam {} not found", id)))
    }

    /// Validates, sanitizes and stores a new exam.
    pub async fn create_exam(&self, req: CreateExamRequest) -> Result<Exam, AppError> {
        req.validate()?;

        let questions = req
            .questions
            .into_iter()
            .map(|q| Question {
                id: q.id,
                text: clean_html(&q.text),
                options: q
                    .options
                    .into_iter()
                    .map(|o| QuestionOption {
                        id: o.id,
                        text: clean_html(&o.text),
                    })
                    .collect(),
                correct_option_id: q.correct_option_id,
                category: q.category,
            })
            .collect();

        let exam = self
            .store
            .create_exam(NewExam {
                title: clean_html(&req.title),
                language: req.language.trim().to_string(),
                level: req.level,
                description: clean_html(&req.description),
                time_limit: req.time_limit,
                questions,
            })
            .await?;

        tracing::info!("Exam {} '{}' created", exam.id, exam.title);
        Ok(exam)
    }
}
