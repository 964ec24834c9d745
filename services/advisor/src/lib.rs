mod cli;
mod commands;
mod demo;
mod infra;

use course_advisor::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
