use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use statement_to_csv::{
    ExtractOptions, Extraction, HeaderMode, PageSelection, QualityMode, StatementReport,
    TableExtractor, TextLayerExtractor, stage_and_extract, tables_from_json, tables_to_json,
    write_csv, write_xlsx,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "stmt2csv",
    version,
    about = "Extract bank statement transactions from text PDFs into CSV or XLSX"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract transactions from a statement PDF.
    Extract(ExtractArgs),
    /// Dump the tables found in a PDF as JSON.
    Tables(TablesArgs),
    /// Normalize a tables JSON document produced by any extractor.
    Normalize(NormalizeArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Csv,
    Xlsx,
}

#[derive(Debug, Args)]
struct PdfArgs {
    /// Input PDF path, or `-` to read from stdin.
    #[arg(short, long)]
    input: PathBuf,

    /// Page selection like 1-3,5.
    #[arg(long, value_parser = PageSelection::from_str)]
    pages: Option<PageSelection>,

    /// Force header interpretation on first row of each table.
    #[arg(long, conflicts_with = "no_header")]
    has_header: bool,

    /// Disable header interpretation; keep first row as data.
    #[arg(long, conflicts_with = "has_header")]
    no_header: bool,

    /// Minimum cells required per candidate table row.
    #[arg(long, default_value_t = 2)]
    min_cols: usize,

    /// Handling of low-confidence tables: best-effort, strict or skip-ambiguous.
    #[arg(long, value_parser = QualityMode::from_str, default_value = "best-effort")]
    quality: QualityMode,

    /// Treat every page as a single-column table of its lines.
    #[arg(long)]
    no_table_structure: bool,

    /// Directory for staging stdin input.
    #[arg(long)]
    work_dir: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct OutputArgs {
    /// Output path; the format follows the extension unless --format is set.
    #[arg(short, long)]
    output: PathBuf,

    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// CSV delimiter character.
    #[arg(long, default_value = ",")]
    delimiter: char,

    /// Enable verbose warning output.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Args)]
struct ExtractArgs {
    #[command(flatten)]
    pdf: PdfArgs,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Debug, Args)]
struct TablesArgs {
    #[command(flatten)]
    pdf: PdfArgs,

    /// Output JSON path; stdout when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct NormalizeArgs {
    /// Tables JSON document.
    #[arg(short, long)]
    tables: PathBuf,

    #[command(flatten)]
    output: OutputArgs,
}

fn options_from_args(args: &PdfArgs) -> ExtractOptions {
    let header_mode = if args.has_header {
        HeaderMode::HasHeader
    } else if args.no_header {
        HeaderMode::NoHeader
    } else {
        HeaderMode::AutoDetect
    };

    ExtractOptions {
        pages: args.pages.clone(),
        header_mode,
        quality_mode: args.quality,
        min_cols: args.min_cols,
        do_table_structure: !args.no_table_structure,
        work_dir: args.work_dir.clone(),
        ..ExtractOptions::default()
    }
}

fn run_extraction(args: &PdfArgs) -> Result<Extraction> {
    let options = options_from_args(args);
    let extractor = TextLayerExtractor::new(options).context("invalid extraction options")?;

    let extraction = if args.input.as_os_str() == "-" {
        stage_and_extract(
            &mut io::stdin().lock(),
            args.work_dir.as_deref(),
            &extractor,
        )
    } else {
        extractor.extract_path(&args.input)
    };
    Ok(extraction)
}

fn output_format(args: &OutputArgs) -> OutputFormat {
    args.format.unwrap_or_else(|| {
        let is_xlsx = args
            .output
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"));
        if is_xlsx {
            OutputFormat::Xlsx
        } else {
            OutputFormat::Csv
        }
    })
}

fn write_report(report: &StatementReport, args: &OutputArgs) -> Result<()> {
    if !args.delimiter.is_ascii() {
        anyhow::bail!("delimiter must be a single ASCII character");
    }

    let written = match output_format(args) {
        OutputFormat::Csv => write_csv(&args.output, &report.records, args.delimiter as u8),
        OutputFormat::Xlsx => write_xlsx(&args.output, &report.records),
    };
    written.with_context(|| format!("failed to write '{}'", args.output.display()))
}

fn log_report(report: &StatementReport, verbose: bool) {
    if let Some(error) = &report.error {
        eprintln!("error: {error}");
    } else {
        eprintln!(
            "found {} table(s), {} transaction(s)",
            report.number_of_tables,
            report.records.len()
        );
    }

    for failure in &report.failures {
        eprintln!("warning: {}", failure.message);
    }

    if report.warnings.is_empty() {
        return;
    }

    eprintln!("warning: {} issue(s) detected", report.warnings.len());
    if verbose {
        for warning in &report.warnings {
            eprintln!(
                "  - {:?} page={:?} table={:?} confidence={:?}: {}",
                warning.code,
                warning.page,
                warning.table_number,
                warning.confidence,
                warning.message
            );
        }
    }
}

fn exit_code_for(report: &StatementReport) -> ExitCode {
    if report.records.is_empty() {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    }
}

fn run_extract(args: &ExtractArgs) -> Result<StatementReport> {
    let extraction = run_extraction(&args.pdf)
        .with_context(|| format!("failed to extract tables from '{}'", args.pdf.input.display()))?;
    let report = StatementReport::from_extraction(extraction);
    write_report(&report, &args.output)?;
    Ok(report)
}

fn run_tables(args: &TablesArgs) -> Result<usize> {
    let extraction = run_extraction(&args.pdf)
        .with_context(|| format!("failed to extract tables from '{}'", args.pdf.input.display()))?;
    let json = tables_to_json(&extraction)?;
    match &args.output {
        Some(path) => write_text(path, &json)?,
        None => println!("{json}"),
    }
    Ok(extraction.tables.len())
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    fs::write(path, text).with_context(|| format!("failed to write '{}'", path.display()))
}

fn run_normalize(args: &NormalizeArgs) -> Result<StatementReport> {
    let json = fs::read_to_string(&args.tables)
        .with_context(|| format!("failed to read '{}'", args.tables.display()))?;
    let document = tables_from_json(&json)
        .with_context(|| format!("failed to parse '{}'", args.tables.display()))?;
    let report = StatementReport::from_extraction(document.into());
    write_report(&report, &args.output)?;
    Ok(report)
}

fn main() -> ExitCode {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("statement_to_csv=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let cli = Cli::parse();
    let result = match &cli.command {
        Commands::Extract(args) => run_extract(args).map(|report| {
            log_report(&report, args.output.verbose);
            exit_code_for(&report)
        }),
        Commands::Normalize(args) => run_normalize(args).map(|report| {
            log_report(&report, args.output.verbose);
            exit_code_for(&report)
        }),
        Commands::Tables(args) => run_tables(args).map(|count| {
            if count > 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            }
        }),
    };

    result.unwrap_or_else(|error| {
        eprintln!("error: {error:#}");
        ExitCode::from(1)
    })
}
