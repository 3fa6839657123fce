use crate::report::{run_extension_validate, run_score, ExtensionValidateArgs, ScoreArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use regional_scorecard::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Regional Scorecard",
    about = "Score regions on weighted activity data and serve the results over HTTP",
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
    /// Score a data folder and print the ranking
    Score(ScoreArgs),
    /// Inspect extension descriptors
    Extension {
        #[command(subcommand)]
        command: ExtensionCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ExtensionCommand {
    /// Dry-run a descriptor registration and show the resulting policy
    Validate(ExtensionValidateArgs),
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
        Command::Score(args) => run_score(args),
        Command::Extension {
            command: ExtensionCommand::Validate(args),
        } => run_extension_validate(args),
    }
}
