// src/services/leaderboard.rs

use std::collections::HashMap;

use crate::{
    error::AppError,
    models::exam_attempt::LeaderboardEntry,
    services::rounded_mean,
    store::Repository,
};

/// Ranks users by the average score of their completed attempts.
///
/// Users without a completed attempt are left out. Ties keep user insertion
/// order. Recomputed from the store on every call.
pub async fn compute_leaderboard(
    store: &dyn Repository,
    limit: Option<usize>,
) -> Result<Vec<LeaderboardEntry>, AppError> {
    let users = store.list_users().await?;
    let attempts = store.get_all_exam_attempts().await?;

    let mut scores: HashMap<i64, Vec<i64>> = HashMap::new();
    for attempt in attempts.iter().filter(|a| a.completed) {
        scores.entry(attempt.user_id).or_default().push(attempt.score);
    }

    let mut board: Vec<LeaderboardEntry> = users
        .into_iter()
        .filter_map(|user| {
            let user_scores = scores.get(&user.id)?;
            Some(LeaderboardEntry {
                average_score: rounded_mean(user_scores),
                exams_completed: user_scores.len(),
                user,
            })
        })
        .collect();

    // `sort_by` is stable, so equal averages stay in user order.
    board.sort_by(|a, b| b.average_score.cmp(&a.average_score));

    if let Some(limit) = limit {
        board.truncate(limit);
    }
    Ok(board)
}
