// src/services/mod.rs

pub mod attempt;
pub mod catalog;
pub mod leaderboard;
pub mod stats;

/// Mean of `scores` rounded to the nearest integer (halves up); 0 when empty.
/// Scores are non-negative.
pub fn rounded_mean(scores: &[i64]) -> i64 {
    if scores.is_empty() {
        return 0;
    }
    let n = scores.len() as i64;
    let sum: i64 = scores.iter().sum();
    (2 * sum + n) / (2 * n)
}
