//! # Show sheet shape and headers
//! ivpanel inspect --input data/surface_daily.csv
//!
//! # Reshape into a long panel and write it out
//! ivpanel reshape --input data/surface_daily.csv --output panel.parquet --enrich
//!
//! # Correlate strike/duration series
//! ivpanel correlate --input data/surface_weekly.csv --policy upper-or-equal --output corr.csv
//!
//! # Integrity report
//! ivpanel validate --input data/surface_daily.csv --mode dual

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use polars::prelude::*;

use ivpanel::analytics::{CorrelationTableBuilder, PairingPolicy, SeriesField};
use ivpanel::data::{DateOrder, LoaderConfig, Periodicity, RawSheet, Sheet, SheetLoader};
use ivpanel::layout::{LayoutConfig, ReshapeMode};
use ivpanel::panel::{ColumnEvent, Panel, PanelReshaper, ReshapeObserver, ReshapeSummary};
use ivpanel::validation::PanelIntegrityValidator;

const SEPARATOR: &str = "============================================================";

#[derive(Parser)]
#[command(name = "ivpanel")]
#[command(about = "Reshape volatility-surface sheets into long panels and correlate them")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show sheet shape and column headers
    Inspect {
        #[command(flatten)]
        sheet: SheetArgs,
    },

    /// Reshape a sheet into a long panel
    Reshape {
        #[command(flatten)]
        sheet: SheetArgs,

        #[command(flatten)]
        mode: ModeArgs,

        /// Output file (.csv or .parquet)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Append duration and calendar columns
        #[arg(long)]
        enrich: bool,
    },

    /// Build the pairwise correlation table
    Correlate {
        #[command(flatten)]
        sheet: SheetArgs,

        #[command(flatten)]
        mode: ModeArgs,

        /// Pairing policy: strict-upper, upper-or-equal or cross-tier
        #[arg(long, default_value = "strict-upper")]
        policy: PairingPolicy,

        /// Correlated value: implied-vol, real-implied-vol, implied-vol-next
        /// or change-in-implied-vol
        #[arg(long, default_value = "implied-vol")]
        field: SeriesField,

        /// Output file (.csv or .parquet)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run integrity checks on the reshaped panel
    Validate {
        #[command(flatten)]
        sheet: SheetArgs,

        #[command(flatten)]
        mode: ModeArgs,
    },
}

#[derive(Args)]
struct SheetArgs {
    /// CSV export of the surface workbook
    #[arg(short, long)]
    input: PathBuf,

    /// Rows before the two header rows
    #[arg(long, default_value_t = 2)]
    preamble_rows: usize,

    /// daily or weekly; inferred from the file name when omitted
    #[arg(long)]
    periodicity: Option<Periodicity>,

    /// Field order of slash dates: month-first or day-first
    #[arg(long, default_value = "month-first")]
    date_order: DateOrder,
}

#[derive(Args)]
struct ModeArgs {
    /// JSON layout overriding the default column positions
    #[arg(long)]
    layout: Option<PathBuf>,

    /// single (realized-vol target) or dual (next-period targets)
    #[arg(long, default_value = "single")]
    mode: ReshapeMode,
}

impl SheetArgs {
    fn loader(&self) -> SheetLoader {
        SheetLoader::new(LoaderConfig {
            preamble_rows: self.preamble_rows,
            date_order: self.date_order,
        })
    }

    fn load(&self) -> Result<(RawSheet, Periodicity)> {
        let loader = self.loader();
        let sheet = loader
            .load(&self.input)
            .with_context(|| format!("Failed to load {}", self.input.display()))?;
        let periodicity = self
            .periodicity
            .unwrap_or_else(|| loader.periodicity(&self.input));
        Ok((sheet, periodicity))
    }
}

impl ModeArgs {
    fn layout(&self) -> Result<LayoutConfig> {
        match &self.layout {
            Some(path) => LayoutConfig::from_json_file(path)
                .with_context(|| format!("Invalid layout file {}", path.display())),
            None => Ok(LayoutConfig::default()),
        }
    }
}

/// Drives a progress bar from reshape events.
struct ProgressObserver {
    pb: ProgressBar,
}

impl ProgressObserver {
    fn new() -> Result<Self> {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
                .progress_chars("=>-"),
        );
        Ok(Self { pb })
    }
}

impl ReshapeObserver for ProgressObserver {
    fn on_start(&self, _source: Option<&str>, surface_columns: usize) {
        self.pb.set_length(surface_columns as u64);
    }

    fn on_column(&self, event: &ColumnEvent) {
        self.pb
            .set_message(format!("{} {}", event.duration, event.strike));
        self.pb.inc(1);
    }

    fn on_finish(&self, summary: &ReshapeSummary) {
        self.pb.finish_with_message(format!(
            "{} records kept, {} dropped",
            summary.kept,
            summary.dropped()
        ));
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ivpanel=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { sheet } => cmd_inspect(&sheet)?,
        Commands::Reshape {
            sheet,
            mode,
            output,
            enrich,
        } => cmd_reshape(&sheet, &mode, output.as_deref(), enrich)?,
        Commands::Correlate {
            sheet,
            mode,
            policy,
            field,
            output,
        } => cmd_correlate(&sheet, &mode, policy, field, output.as_deref())?,
        Commands::Validate { sheet, mode } => cmd_validate(&sheet, &mode)?,
    }

    Ok(())
}

fn build_panel(args: &SheetArgs, mode: &ModeArgs) -> Result<Panel> {
    let (sheet, periodicity) = args.load()?;
    let reshaper = PanelReshaper::new(mode.layout()?, mode.mode)
        .context("Invalid layout")?
        .with_observer(ProgressObserver::new()?);
    let panel = reshaper
        .reshape(&sheet, periodicity)
        .with_context(|| format!("Failed to reshape {}", args.input.display()))?;
    Ok(panel)
}

fn cmd_inspect(args: &SheetArgs) -> Result<()> {
    let (sheet, periodicity) = args.load()?;

    println!("{}", SEPARATOR);
    println!("Sheet: {}", sheet.source_name().unwrap_or("<unknown>"));
    println!("{}", SEPARATOR);
    println!("  Rows: {}", sheet.num_rows());
    println!("  Columns: {}", sheet.num_cols());
    println!("  Periodicity: {}", periodicity);
    println!("\nHeaders:");
    for (col, header) in sheet.headers().iter().enumerate() {
        println!("  {:>3}: {}", col, header);
    }

    Ok(())
}

fn cmd_reshape(
    args: &SheetArgs,
    mode: &ModeArgs,
    output: Option<&Path>,
    enrich: bool,
) -> Result<()> {
    let panel = build_panel(args, mode)?;

    println!("\nPanel:");
    println!("  Mode: {}", panel.mode());
    println!("  Periodicity: {}", panel.periodicity());
    println!("  Records: {}", panel.len());
    println!("  Dates: {}", panel.dates().len());
    println!("  Durations: {:?}", panel.durations().iter().map(|d| d.as_str()).collect::<Vec<_>>());
    println!("  Strikes: {}", panel.strikes().len());

    if let Some(path) = output {
        let mut df = if enrich {
            panel.to_enriched_dataframe()?
        } else {
            panel.to_dataframe()?
        };
        write_frame(&mut df, path)?;
        println!("\nWrote {} rows to {}", df.height(), path.display());
    }

    Ok(())
}

fn cmd_correlate(
    args: &SheetArgs,
    mode: &ModeArgs,
    policy: PairingPolicy,
    field: SeriesField,
    output: Option<&Path>,
) -> Result<()> {
    let panel = build_panel(args, mode)?;
    let table = CorrelationTableBuilder::new(policy)
        .with_field(field)
        .build(&panel)
        .context("Correlation build failed")?;

    println!("\nCorrelation ({}, {}):", table.policy(), table.field());
    println!("  Pairs: {}", table.len());
    println!("  Omitted: {}", table.omitted().len());

    match output {
        Some(path) => {
            let mut df = table.to_dataframe()?;
            write_frame(&mut df, path)?;
            println!("\nWrote {} rows to {}", df.height(), path.display());
        }
        None => {
            for r in table.records().iter().take(20) {
                println!(
                    "  {}/{} vs {}/{}: {:.4} (n={})",
                    r.duration1, r.strike1, r.duration2, r.strike2, r.pearson_corr, r.observations
                );
            }
            if table.len() > 20 {
                println!("  ... {} more", table.len() - 20);
            }
        }
    }

    Ok(())
}

fn cmd_validate(args: &SheetArgs, mode: &ModeArgs) -> Result<()> {
    let reshaper = PanelReshaper::new(mode.layout()?, mode.mode).context("Invalid layout")?;
    let validator = PanelIntegrityValidator::from_parts(args.loader(), reshaper);
    let report = validator
        .validate_file(&args.input, args.periodicity)
        .with_context(|| format!("Failed to validate {}", args.input.display()))?;

    println!("{}", SEPARATOR);
    println!("{}", report.summary());
    println!("{}", SEPARATOR);
    for check in &report.checks {
        let status = if check.passed { "PASS" } else { "FAIL" };
        println!("  [{}] {}: {}", status, check.name, check.message);
        if let Some(details) = &check.details {
            println!("         {}", details);
        }
    }

    if !report.all_passed() {
        anyhow::bail!("{} checks failed", report.failed_checks().len());
    }

    Ok(())
}

/// Write a frame as Parquet (zstd) or CSV, chosen by extension.
fn write_frame(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    match path.extension().and_then(|e| e.to_str()) {
        Some("parquet") => {
            ParquetWriter::new(file)
                .with_compression(ParquetCompression::Zstd(Some(ZstdLevel::try_new(3)?)))
                .finish(df)?;
        }
        _ => {
            CsvWriter::new(file).include_header(true).finish(df)?;
        }
    }

    Ok(())
}
