//! Collapses candidates to one per (learner, course).
//!
//! Within a key the winner is the lowest priority number; equal priorities go to the
//! strictly higher confidence; anything still tied keeps the candidate seen first. Callers
//! feed candidates in [`Strategy::ORDER`](super::strategies::Strategy::ORDER), so a full tie
//! resolves to the earlier strategy. Output keeps the order in which keys first appeared.

use std::collections::HashMap;

use super::domain::RecommendationCandidate;

pub fn merge_candidates<I>(candidates: I) -> Vec<RecommendationCandidate>
where
    I: IntoIterator<Item = RecommendationCandidate>,
{
    let mut winners: Vec<RecommendationCandidate> = Vec::new();
    let mut index = HashMap::new();

    for candidate in candidates {
        let key = candidate.key();
        match index.get(&key).copied() {
            Some(slot) => {
                if supersedes(&candidate, &winners[slot]) {
                    winners[slot] = candidate;
                }
            }
            None => {
                index.insert(key, winners.len());
                winners.push(candidate);
            }
        }
    }

    winners
}

fn supersedes(challenger: &RecommendationCandidate, incumbent: &RecommendationCandidate) -> bool {
    challenger.priority < incumbent.priority
        || (challenger.priority == incumbent.priority
            && challenger.confidence.value() > incumbent.confidence.value())
}
