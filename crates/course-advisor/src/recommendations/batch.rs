//! Multi-learner generation on the tokio runtime.
//!
//! Each learner runs on the blocking pool; a semaphore caps how many run at once. One
//! learner failing never affects the others, and duplicate ids in the request are
//! collapsed before anything is scheduled.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use super::domain::{LearnerId, Recommendation};
use super::repository::RecommendationRepository;
use super::service::CourseRecommendationService;
use crate::config::BatchConfig;

/// Per-learner outcome of a batch run.
#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    pub generated: BTreeMap<LearnerId, Vec<Recommendation>>,
    pub failures: BTreeMap<LearnerId, String>,
}

impl BatchReport {
    pub fn total_generated(&self) -> usize {
        self.generated.values().map(Vec::len).sum()
    }
}

pub async fn generate_for_learners<R>(
    service: Arc<CourseRecommendationService<R>>,
    learners: Vec<LearnerId>,
    target_period: String,
    config: BatchConfig,
) -> BatchReport
where
    R: RecommendationRepository + 'static,
{
    let learners: BTreeSet<LearnerId> = learners.into_iter().collect();
    let permits = Arc::new(Semaphore::new(config.max_concurrency.max(1)));
    info!(
        learners = learners.len(),
        max_concurrency = config.max_concurrency,
        %target_period,
        "starting batch generation"
    );

    let mut unreported = learners.clone();
    let mut tasks = JoinSet::new();
    for learner_id in learners {
        let service = Arc::clone(&service);
        let permits = Arc::clone(&permits);
        let target_period = target_period.clone();

        tasks.spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(err) => return (learner_id, Err(err.to_string())),
            };

            let id = learner_id.clone();
            let outcome = tokio::task::spawn_blocking(move || {
                service
                    .generate_recommendations(&id, &target_period)
                    .map_err(|err| err.to_string())
            })
            .await
            .unwrap_or_else(|err| Err(format!("generation task failed: {err}")));

            (learner_id, outcome)
        });
    }

    let mut report = BatchReport::default();
    let mut aborted = None;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((learner_id, outcome)) => {
                unreported.remove(&learner_id);
                match outcome {
                    Ok(records) => {
                        report.generated.insert(learner_id, records);
                    }
                    Err(reason) => {
                        warn!(learner = %learner_id, %reason, "recommendation generation failed");
                        report.failures.insert(learner_id, reason);
                    }
                }
            }
            Err(err) => {
                error!(%err, "batch task aborted");
                aborted = Some(err.to_string());
            }
        }
    }

    // Aborted tasks never return their learner id, so anyone still unreported was one.
    if let Some(reason) = aborted {
        for learner_id in unreported {
            report
                .failures
                .insert(learner_id, format!("generation task aborted: {reason}"));
        }
    }

    info!(
        succeeded = report.generated.len(),
        failed = report.failures.len(),
        recommendations = report.total_generated(),
        "batch generation finished"
    );
    report
}
