use crate::commands::{build_service, print_json, resolve_period, views};
use crate::infra::CatalogSnapshot;
use clap::Args;
use course_advisor::config::AppConfig;
use course_advisor::error::AppError;
use course_advisor::recommendations::{
    generate_for_learners, RecommendationStatistics, RecommendationView,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

const DEMO_SNAPSHOT: &str = include_str!("../fixtures/demo_catalog.json");

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Target term label (defaults to the current term)
    #[arg(long)]
    pub(crate) period: Option<String>,
}

#[derive(Serialize)]
struct DemoOutput {
    period: String,
    recommendations: Vec<RecommendationView>,
    accepted: Option<RecommendationView>,
    failures: Vec<String>,
    statistics: RecommendationStatistics,
}

pub(crate) async fn run_demo(args: DemoArgs, config: &AppConfig) -> Result<(), AppError> {
    let snapshot = CatalogSnapshot::from_json(DEMO_SNAPSHOT)?;
    let learners = snapshot.learner_ids();
    let service = Arc::new(build_service(snapshot, config));
    let period = resolve_period(args.period);

    let report =
        generate_for_learners(Arc::clone(&service), learners, period.clone(), config.batch).await;

    // Walk the first learner's top recommendation through a student acceptance.
    let accepted = match report
        .generated
        .values()
        .find_map(|records| records.first())
    {
        Some(first) => Some(service.accept_by_student(&first.id)?.view()),
        None => None,
    };

    let mut recommendations = Vec::new();
    for record in report.generated.values().flatten() {
        recommendations.push(service.get(&record.id)?);
    }

    let statistics = service.statistics()?;
    info!(%statistics, "demo finished");

    print_json(&DemoOutput {
        period,
        recommendations: views(&recommendations),
        accepted,
        failures: report
            .failures
            .into_iter()
            .map(|(learner, reason)| format!("{learner}: {reason}"))
            .collect(),
        statistics,
    })
}
