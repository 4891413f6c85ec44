use crate::models::Vote;

/// Arithmetic mean of all voter scores, or `0.0` when nobody has voted.
///
/// Scores are validated when votes are cast, so this never fails.
pub fn compute_relevancy(voters: &[Vote]) -> f64 {
    if voters.is_empty() {
        return 0.0;
    }

    let total: u32 = voters.iter().map(|v| u32::from(v.score)).sum();
    f64::from(total) / voters.len() as f64
}
