// src/services/stats.rs

use std::collections::HashMap;

use crate::{
    config::RECENT_ACTIVITY_LIMIT,
    error::AppError,
    models::exam_attempt::{LanguageProgress, RecentActivity, UserStats},
    services::rounded_mean,
    store::Repository,
};

/// Dashboard numbers for one user, computed from their completed attempts.
pub async fn user_stats(store: &dyn Repository, user_id: i64) -> Result<UserStats, AppError> {
    let completed: Vec<_> = store
        .get_exam_attempts_by_user_id(user_id)
        .await?
        .into_iter()
        .filter(|a| a.completed)
        .collect();

    let exams: HashMap<i64, _> = store
        .get_all_exams()
        .await?
        .into_iter()
        .map(|e| (e.id, e))
        .collect();

    let scores: Vec<i64> = completed.iter().map(|a| a.score).collect();

    // Languages in the order they were first completed.
    let mut languages: Vec<(String, Vec<i64>)> = Vec::new();
    for attempt in &completed {
        let Some(exam) = exams.get(&attempt.exam_id) else {
            tracing::warn!(
                "Attempt {} references missing exam {}",
                attempt.id,
                attempt.exam_id
            );
            continue;
        };
        match languages.iter_mut().find(|(lang, _)| *lang == exam.language) {
            Some((_, lang_scores)) => lang_scores.push(attempt.score),
            None => languages.push((exam.language.clone(), vec![attempt.score])),
        }
    }

    let recent_activity = completed
        .iter()
        .rev()
        .filter_map(|a| {
            let exam = exams.get(&a.exam_id)?;
            Some(RecentActivity {
                attempt_id: a.id,
                exam_id: a.exam_id,
                exam_title: exam.title.clone(),
                language: exam.language.clone(),
                score: a.score,
                created_at: a.created_at,
            })
        })
        .take(RECENT_ACTIVITY_LIMIT)
        .collect();

    Ok(UserStats {
        exams_completed: completed.len(),
        average_score: rounded_mean(&scores),
        languages: languages
            .into_iter()
            .map(|(language, lang_scores)| LanguageProgress {
                language,
                exams_completed: lang_scores.len(),
                average_score: rounded_mean(&lang_scores),
            })
            .collect(),
        recent_activity,
    })
}
