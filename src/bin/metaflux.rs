//! Metaflux CLI - command line for the calorimetry pipeline
//!
//! Commands:
//! - aggregate: hourly day windows over a multi-day protocol (batch mode)
//! - calendar: hourly aggregation by calendar day/hour, whole experiment
//! - raw: select one day window without aggregation
//! - annotate: print dark-phase intervals for a day and light cycle
//! - validate: ingest a source and report dropped rows

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::NaiveDate;

use metaflux::encoder::PayloadEncoder;
use metaflux::series;
use metaflux::{
    Aggregation, AnalysisConfig, Analyzer, CsvSource, EnergyModel, LightCycle, PipelineError,
    RecordSource, SchemaMap, WindowAlignment, METAFLUX_VERSION,
};

/// Metaflux - batch compute engine for indirect-calorimetry time series
#[derive(Parser)]
#[command(name = "metaflux")]
#[command(version = METAFLUX_VERSION)]
#[command(about = "Aggregate calorimetry exports into hourly analysis windows", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate a multi-day protocol into hourly day windows
    Aggregate {
        /// Input CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Column mapping preset
        #[arg(long, default_value = "named")]
        schema: SchemaPreset,

        /// First analysis day (YYYY-MM-DD); each day runs from the day start
        /// hour for 24 h
        #[arg(long)]
        start_date: NaiveDate,

        /// Timestamp position in the 15-min sampling window: 1 = start,
        /// 2 = center, 3 = end
        #[arg(long, default_value = "2")]
        alignment: String,

        /// Hour of day each analysis day starts at
        #[arg(long, default_value = "7")]
        day_start_hour: u32,

        /// Light cycle codes, one per day, comma separated (1 = LD1:1,
        /// 2 = DD, 3 = LD12:12)
        #[arg(long, default_value = "3,2,1,3")]
        cycles: String,

        /// Discard feed deltas above 2 g per sampling interval
        #[arg(long)]
        filter_feed_outliers: bool,

        /// Energy expenditure aggregation within a bucket
        #[arg(long, value_enum, default_value = "sum")]
        energy_agg: AggChoice,

        /// Activity aggregation within a bucket
        #[arg(long, value_enum, default_value = "sum")]
        activity_agg: AggChoice,

        /// Body-weight table (JSON) for deriving energy from VO2
        #[arg(long)]
        weights: Option<PathBuf>,

        /// Payload output path (use - for stdout)
        #[arg(short, long)]
        output: PathBuf,

        /// Also write a wide per-animal hourly table (CSV)
        #[arg(long)]
        table: Option<PathBuf>,
    },

    /// Aggregate by calendar day and hour across the whole source
    Calendar {
        /// Input CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Column mapping preset
        #[arg(long, default_value = "named")]
        schema: SchemaPreset,

        /// Timestamp position in the sampling window (1, 2 or 3)
        #[arg(long, default_value = "2")]
        alignment: String,

        /// Discard feed deltas above 2 g per sampling interval
        #[arg(long)]
        filter_feed_outliers: bool,

        /// Wide per-animal table output path (use - for stdout)
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Select one 24 h day window without aggregation
    Raw {
        /// Input CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Column mapping preset
        #[arg(long, default_value = "named")]
        schema: SchemaPreset,

        /// Analysis day (YYYY-MM-DD)
        #[arg(long)]
        start_date: NaiveDate,

        /// Hour of day the window starts at
        #[arg(long, default_value = "7")]
        day_start_hour: u32,

        /// Timestamp position in the sampling window (1, 2 or 3)
        #[arg(long, default_value = "3")]
        alignment: String,

        /// Record table output path (use - for stdout)
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print dark-phase intervals for one day and light cycle
    Annotate {
        /// Analysis day (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        /// Hour of day the analysis day starts at
        #[arg(long, default_value = "7")]
        day_start_hour: u32,

        /// Light cycle code (1, 2 or 3)
        #[arg(long)]
        cycle: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Ingest a source and report what was dropped
    Validate {
        /// Input CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Column mapping preset
        #[arg(long, default_value = "named")]
        schema: SchemaPreset,

        /// Output report as JSON
        #[arg(long)]
        json: bool,

        /// Fail when any row was dropped
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemaPreset {
    /// Canonical header names (Date, Time, Animal, RER, XT+YT, Feed, EE)
    Named,
    /// Positional mapping for the merged instrument export
    Merged,
}

impl SchemaPreset {
    fn schema(self) -> SchemaMap {
        match self {
            SchemaPreset::Named => SchemaMap::default(),
            SchemaPreset::Merged => SchemaMap::merged_export(),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum AggChoice {
    Sum,
    Mean,
}

impl From<AggChoice> for Aggregation {
    fn from(choice: AggChoice) -> Self {
        match choice {
            AggChoice::Sum => Aggregation::Sum,
            AggChoice::Mean => Aggregation::Mean,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), MetafluxCliError> {
    match cli.command {
        Commands::Aggregate {
            input,
            schema,
            start_date,
            alignment,
            day_start_hour,
            cycles,
            filter_feed_outliers,
            energy_agg,
            activity_agg,
            weights,
            output,
            table,
        } => {
            let cycle_schedule = parse_cycles(&cycles)?;
            let config = AnalysisConfig {
                alignment: WindowAlignment::from_code(&alignment)?,
                day_start_hour,
                day_count: cycle_schedule.len() as u32,
                cycle_schedule,
                feed_outlier_filter: filter_feed_outliers,
                energy_aggregation: energy_agg.into(),
                activity_aggregation: activity_agg.into(),
            };

            let mut analyzer = Analyzer::new(config.clone())?;
            if let Some(weights_path) = weights {
                let json = fs::read_to_string(&weights_path)?;
                let model =
                    EnergyModel::from_json(&json).map_err(PipelineError::JsonError)?;
                analyzer = analyzer.with_energy_model(model);
            }

            let source = CsvSource::new(&input).with_schema(schema.schema());
            let result = analyzer.run(&source, start_date)?;

            // Everything is computed before anything is written; a failed run
            // leaves no partial files behind.
            if let Some(table_path) = &table {
                let mut buf = Vec::new();
                series::write_day_table(&result.days, &mut buf)?;
                fs::write(table_path, buf)?;
            }

            let encoder = PayloadEncoder::new();
            let json =
                encoder.encode_to_json(&result.source, result.report, &config, result.days)?;
            write_output(&output, &json)?;

            Ok(())
        }

        Commands::Calendar {
            input,
            schema,
            alignment,
            filter_feed_outliers,
            output,
        } => {
            let config = AnalysisConfig {
                alignment: WindowAlignment::from_code(&alignment)?,
                feed_outlier_filter: filter_feed_outliers,
                ..AnalysisConfig::default()
            };

            let source = CsvSource::new(&input).with_schema(schema.schema());
            let (windows, _report) = Analyzer::new(config)?.run_calendar(&source)?;

            let mut buf = Vec::new();
            series::write_calendar_table(&windows, &mut buf)?;
            write_output_bytes(&output, &buf)?;

            Ok(())
        }

        Commands::Raw {
            input,
            schema,
            start_date,
            day_start_hour,
            alignment,
            output,
        } => {
            let config = AnalysisConfig {
                alignment: WindowAlignment::from_code(&alignment)?,
                day_start_hour,
                ..AnalysisConfig::default()
            };
            let day_start = start_date
                .and_hms_opt(day_start_hour, 0, 0)
                .ok_or(PipelineError::InvalidDayStartHour(day_start_hour))?;

            let source = CsvSource::new(&input).with_schema(schema.schema());
            let analyzer = Analyzer::new(config)?;
            let (normalized, _report) = analyzer.ingest(&source)?;
            let selected =
                metaflux::WindowAggregator::select_day(&normalized, day_start);

            let mut buf = Vec::new();
            series::write_records_table(&selected, &mut buf)?;
            write_output_bytes(&output, &buf)?;

            Ok(())
        }

        Commands::Annotate {
            date,
            day_start_hour,
            cycle,
            json,
        } => {
            let cycle = LightCycle::from_code(&cycle)?;
            let day_start = date
                .and_hms_opt(day_start_hour, 0, 0)
                .ok_or(PipelineError::InvalidDayStartHour(day_start_hour))?;
            let intervals = metaflux::dark_intervals(day_start, cycle);

            if json {
                println!("{}", serde_json::to_string_pretty(&intervals)?);
            } else {
                println!(
                    "Dark intervals for {} ({}), day start {}:",
                    date,
                    cycle.label(),
                    day_start.format("%H:%M")
                );
                for (from, to) in &intervals {
                    println!("  {} .. {}", from, to);
                }
            }
            Ok(())
        }

        Commands::Validate {
            input,
            schema,
            json,
            strict,
        } => {
            let source = CsvSource::new(&input).with_schema(schema.schema());
            let batch = source.load()?;
            let report = batch.report;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Ingest Report");
                println!("=============");
                println!("Total rows:        {}", report.total_rows);
                println!("Ingested:          {}", report.ingested);
                println!("Bad timestamps:    {}", report.dropped_bad_timestamp);
                println!("Bad animal ids:    {}", report.dropped_bad_animal_id);
            }

            if strict && report.dropped() > 0 {
                Err(MetafluxCliError::ValidationFailed(report.dropped()))
            } else {
                Ok(())
            }
        }
    }
}

fn parse_cycles(cycles: &str) -> Result<Vec<LightCycle>, PipelineError> {
    cycles
        .split(',')
        .map(LightCycle::from_code)
        .collect()
}

fn write_output(path: &Path, data: &str) -> Result<(), MetafluxCliError> {
    if path.to_string_lossy() == "-" {
        let mut stdout = io::stdout();
        if atty::is(atty::Stream::Stdout) {
            writeln!(stdout, "{}", data)?;
        } else {
            write!(stdout, "{}", data)?;
        }
        stdout.flush()?;
    } else {
        fs::write(path, data)?;
    }
    Ok(())
}

fn write_output_bytes(path: &Path, data: &[u8]) -> Result<(), MetafluxCliError> {
    if path.to_string_lossy() == "-" {
        let mut stdout = io::stdout();
        stdout.write_all(data)?;
        stdout.flush()?;
    } else {
        fs::write(path, data)?;
    }
    Ok(())
}

// Error types

#[derive(Debug)]
enum MetafluxCliError {
    Io(io::Error),
    Pipeline(PipelineError),
    Json(serde_json::Error),
    ValidationFailed(usize),
}

impl From<io::Error> for MetafluxCliError {
    fn from(e: io::Error) -> Self {
        MetafluxCliError::Io(e)
    }
}

impl From<PipelineError> for MetafluxCliError {
    fn from(e: PipelineError) -> Self {
        MetafluxCliError::Pipeline(e)
    }
}

impl From<serde_json::Error> for MetafluxCliError {
    fn from(e: serde_json::Error) -> Self {
        MetafluxCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<MetafluxCliError> for CliError {
    fn from(e: MetafluxCliError) -> Self {
        match e {
            MetafluxCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            MetafluxCliError::Pipeline(e) => CliError {
                code: "PIPELINE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check the source file and the run configuration".to_string()),
            },
            MetafluxCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            MetafluxCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} rows were dropped during ingestion", count),
                hint: Some("Run 'metaflux validate' without --strict for details".to_string()),
            },
        }
    }
}
