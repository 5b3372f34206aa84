use crate::commands::{
    run_overview, run_report_export, run_student_import, OverviewArgs, ReportExportArgs,
    StudentImportArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use vaxtrack::config::AppConfig;
use vaxtrack::error::AppError;
use vaxtrack::telemetry;

#[derive(Parser, Debug)]
#[command(
    name = "School Vaccination Tracker",
    about = "Schedule vaccination drives, manage the student roster, and report coverage",
    version
)]
struct Cli {
    /// Override the snapshot file (an empty value keeps data in memory)
    #[arg(long, global = true)]
    data_path: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Manage the student roster
    Students {
        #[command(subcommand)]
        command: StudentsCommand,
    },
    /// Vaccination reports
    Report {
        #[command(subcommand)]
        command: ReportCommand,
    },
    /// Print the dashboard overview
    Overview(OverviewArgs),
}

#[derive(Subcommand, Debug)]
enum StudentsCommand {
    /// Import students from a CSV roster (all-or-nothing)
    Import(StudentImportArgs),
}

#[derive(Subcommand, Debug)]
enum ReportCommand {
    /// Write the vaccination report as CSV
    Export(ReportExportArgs),
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
    let mut config = AppConfig::load()?;
    if let Some(path) = cli.data_path {
        config.storage.data_path = if path.as_os_str().is_empty() {
            None
        } else {
            Some(path)
        };
    }
    telemetry::init(&config.telemetry)?;

    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(config, args).await,
        Command::Students {
            command: StudentsCommand::Import(args),
        } => run_student_import(&config, args),
        Command::Report {
            command: ReportCommand::Export(args),
        } => run_report_export(&config, args),
        Command::Overview(args) => run_overview(&config, args),
    }
}
