use crate::infra::{build_service, parse_date};
use chrono::NaiveDate;
use clap::Args;
use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use vaxtrack::config::AppConfig;
use vaxtrack::error::AppError;
use vaxtrack::vaccination::DashboardOverview;

#[derive(Args, Debug)]
pub(crate) struct StudentImportArgs {
    /// CSV roster with a `name,student_id,student_class,...` header
    #[arg(long)]
    pub(crate) csv: PathBuf,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ReportExportArgs {
    /// Only include vaccines whose name contains this text
    #[arg(long)]
    pub(crate) vaccine_name: Option<String>,
    /// Destination file (defaults to stdout)
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct OverviewArgs {
    /// Evaluate the dashboard as of this date (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) fn run_student_import(
    config: &AppConfig,
    args: StudentImportArgs,
) -> Result<(), AppError> {
    let service = build_service(config, None)?;
    let reader = BufReader::new(File::open(&args.csv)?);
    let stored = service.import_roster(reader)?;

    println!(
        "Imported {} students from {}",
        stored.len(),
        args.csv.display()
    );
    Ok(())
}

pub(crate) fn run_report_export(
    config: &AppConfig,
    args: ReportExportArgs,
) -> Result<(), AppError> {
    let service = build_service(config, None)?;
    let csv = service.export_report(args.vaccine_name.as_deref())?;

    match args.output {
        Some(path) => {
            fs::write(&path, &csv)?;
            eprintln!("Report written to {}", path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&csv)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

pub(crate) fn run_overview(config: &AppConfig, args: OverviewArgs) -> Result<(), AppError> {
    let service = build_service(config, args.today)?;
    let overview = service.overview()?;
    render_overview(&overview, service.today());
    Ok(())
}

fn render_overview(overview: &DashboardOverview, today: NaiveDate) {
    println!("Vaccination overview as of {today}");
    println!(
        "- {} of {} students vaccinated ({:.1}%)",
        overview.vaccinated_students, overview.total_students, overview.percentage_vaccinated
    );

    if overview.ongoing_drives.is_empty() {
        println!("- No drive running today");
    } else {
        println!("Running today:");
        for drive in &overview.ongoing_drives {
            println!("  - #{} {}", drive.id, drive.vaccine);
        }
    }

    if overview.upcoming_drives.is_empty() {
        println!("- No upcoming drives scheduled");
    } else {
        println!("Upcoming drives:");
        for drive in &overview.upcoming_drives {
            println!("  - #{} {} on {}", drive.id, drive.vaccine, drive.date);
        }
    }
}
