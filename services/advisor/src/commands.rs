use crate::infra::{term_for, CatalogSnapshot, InMemoryRecommendationRepository, SnapshotCatalog};
use chrono::Local;
use clap::Args;
use course_advisor::config::AppConfig;
use course_advisor::error::AppError;
use course_advisor::recommendations::{
    generate_for_learners, BatchReport, Collaborators, CourseRecommendationService, LearnerId,
    Recommendation, RecommendationView,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub(crate) type AdvisorService = CourseRecommendationService<InMemoryRecommendationRepository>;

#[derive(Args, Debug)]
pub(crate) struct GenerateArgs {
    /// Catalog snapshot (JSON) with courses, pathways and learner records
    #[arg(long)]
    pub(crate) snapshot: PathBuf,
    /// Learner to generate recommendations for
    #[arg(long)]
    pub(crate) learner: String,
    /// Target term label, e.g. 2026-FALL (defaults to the current term)
    #[arg(long)]
    pub(crate) period: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct BatchArgs {
    /// Catalog snapshot (JSON) with courses, pathways and learner records
    #[arg(long)]
    pub(crate) snapshot: PathBuf,
    /// Target term label (defaults to the current term)
    #[arg(long)]
    pub(crate) period: Option<String>,
    /// Learners to include; every learner in the snapshot when omitted
    #[arg(long = "learner")]
    pub(crate) learners: Vec<String>,
}

#[derive(Serialize)]
struct BatchOutput {
    generated: BTreeMap<LearnerId, Vec<RecommendationView>>,
    failures: BTreeMap<LearnerId, String>,
}

impl From<BatchReport> for BatchOutput {
    fn from(report: BatchReport) -> Self {
        Self {
            generated: report
                .generated
                .into_iter()
                .map(|(learner, records)| (learner, views(&records)))
                .collect(),
            failures: report.failures,
        }
    }
}

pub(crate) fn build_service(snapshot: CatalogSnapshot, config: &AppConfig) -> AdvisorService {
    let catalog = Arc::new(SnapshotCatalog::new(snapshot));
    CourseRecommendationService::new(
        Arc::new(InMemoryRecommendationRepository::default()),
        Collaborators::from_shared(catalog),
        config.engine.clone(),
    )
}

pub(crate) fn resolve_period(period: Option<String>) -> String {
    period.unwrap_or_else(|| term_for(Local::now().date_naive()))
}

pub(crate) fn views(records: &[Recommendation]) -> Vec<RecommendationView> {
    records.iter().map(Recommendation::view).collect()
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn run_generate(args: GenerateArgs, config: &AppConfig) -> Result<(), AppError> {
    let GenerateArgs {
        snapshot,
        learner,
        period,
    } = args;

    let service = build_service(CatalogSnapshot::load(&snapshot)?, config);
    let period = resolve_period(period);
    let records = service.generate_recommendations(&LearnerId::new(learner), &period)?;

    print_json(&views(&records))
}

pub(crate) async fn run_batch(args: BatchArgs, config: &AppConfig) -> Result<(), AppError> {
    let BatchArgs {
        snapshot,
        period,
        learners,
    } = args;

    let snapshot = CatalogSnapshot::load(&snapshot)?;
    let learners = if learners.is_empty() {
        snapshot.learner_ids()
    } else {
        learners.into_iter().map(LearnerId::new).collect()
    };
    let service = Arc::new(build_service(snapshot, config));

    let report = generate_for_learners(
        Arc::clone(&service),
        learners,
        resolve_period(period),
        config.batch,
    )
    .await;
    info!(summary = %service.statistics()?, "batch complete");

    print_json(&BatchOutput::from(report))
}
