use crate::report::{run_predict, run_stats, PredictArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use flight_delay::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Flight Delay Predictor",
    about = "Score flight departure delay risk from the command line or over HTTP",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Predict the delay risk of a single flight
    Predict(PredictArgs),
    /// Show loaded profile tables and scoring method
    Stats,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Predict(args) => run_predict(args).await,
        Command::Stats => run_stats(),
    }
}
