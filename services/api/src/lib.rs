mod cli;
mod infra;
mod report;
mod routes;
mod server;
mod upstream;

use flight_delay::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
