mod cli;
mod demo;
mod evaluate;
mod infra;
mod routes;
mod server;

use policy_engine::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
