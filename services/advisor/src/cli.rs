use crate::commands::{run_batch, run_generate, BatchArgs, GenerateArgs};
use crate::demo::{run_demo, DemoArgs};
use clap::{Parser, Subcommand};
use course_advisor::config::AppConfig;
use course_advisor::error::AppError;
use course_advisor::telemetry;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(
    name = "course-advisor",
    about = "Generate and review course recommendations from a school catalog snapshot",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate recommendations for a single learner
    Generate(GenerateArgs),
    /// Generate recommendations for many learners concurrently
    Batch(BatchArgs),
    /// Run the built-in demo snapshot end to end (default command)
    Demo(DemoArgs),
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    debug!(environment = ?config.environment, "configuration loaded");

    let command = cli
        .command
        .unwrap_or_else(|| Command::Demo(DemoArgs::default()));

    match command {
        Command::Generate(args) => run_generate(args, &config),
        Command::Batch(args) => run_batch(args, &config).await,
        Command::Demo(args) => run_demo(args, &config).await,
    }
}
