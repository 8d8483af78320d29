use crate::demo::{run_demo, DemoArgs};
use crate::evaluate::{run_evaluate, EvaluateTarget};
use crate::server;
use clap::{Args, Parser, Subcommand};
use policy_engine::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Lending Policy Engine",
    about = "Serve and exercise lending policies from the command line",
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
    /// Evaluate a policy, policy set or rule against an input document
    Evaluate {
        #[command(subcommand)]
        target: EvaluateTarget,
    },
    /// Run sample applicants through every policy set of a catalog
    Demo(DemoArgs),
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
        Command::Evaluate { target } => run_evaluate(target),
        Command::Demo(args) => run_demo(args),
    }
}
