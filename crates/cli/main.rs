mod frames;

use config::{Config, DEFAULT_CONFIG_FILE};
use pipeline::load::LoadOptions;
use pipeline::{DerivedMetrics, Selection, StudentTable};

use chrono::{DateTime, Local};
use clap::builder::PossibleValuesParser;
use clap::Parser;
use csv::Writer;
use env_logger::Env;
use polars::prelude::*;
use serde::Serialize;
use std::path::PathBuf;
use std::{error::Error, fs::File, path::Path};

use log::{debug, error, info};

/// 写入csv文件
///
/// # 参数
/// * `filename` - 文件名
/// * `header` - csv文件头
/// * `data` - csv文件数据
pub fn write_csv<P: AsRef<Path>>(
    filename: P,
    header: Vec<String>,
    data: Vec<Vec<String>>,
) -> Result<(), Box<dyn Error>> {
    let file = File::create(&filename)?;
    let mut wtr = Writer::from_writer(file);

    wtr.write_record(header)?;

    for record in data {
        wtr.write_record(record)?;
    }
    wtr.flush()?;
    info!("CSV file written successfully: {:?}", filename.as_ref());

    Ok(())
}

enum OutputType {
    CSV,
    JSON,
    TABLE,
    POLAR,
}

impl OutputType {
    fn from_str(s: &str) -> Option<Self> {
        match s {
            "csv" => Some(OutputType::CSV),
            "json" => Some(OutputType::JSON),
            "table" => Some(OutputType::TABLE),
            "polar" => Some(OutputType::POLAR),
            _ => None,
        }
    }
}

trait Output {
    fn output(&self) -> Result<(), Box<dyn Error>>;
}

struct PolarOutput {
    metrics: DerivedMetrics,
}

impl PolarOutput {
    fn new(metrics: DerivedMetrics) -> Self {
        PolarOutput { metrics }
    }
}

impl Output for PolarOutput {
    fn output(&self) -> Result<(), Box<dyn Error>> {
        let m = &self.metrics;
        println!(
            "modalidade: {} | curso: {}",
            m.selection.modality, m.selection.course
        );
        println!("{}", frames::kpi_frame(m)?);
        for (metric, df) in frames::frames(m)? {
            println!("{}", metric.name());
            println!("{}", df);
        }
        for b in &m.breakdowns {
            if b.excluded > 0 {
                info!("{}: {} rows without a value", b.category.as_str(), b.excluded);
            }
        }
        Ok(())
    }
}

struct CsvOutput {
    dir: PathBuf,
    metrics: DerivedMetrics,
}

impl CsvOutput {
    fn new(dir: PathBuf, metrics: DerivedMetrics) -> Self {
        CsvOutput { dir, metrics }
    }

    fn kpi_rows(&self) -> Vec<Vec<String>> {
        let m = &self.metrics;
        let fmt = |rate: Option<f64>| rate.map(|r| format!("{:.4}", r)).unwrap_or_default();
        let mut rows = vec![
            ("institution_rate", "instituição", &m.institution),
            ("modality_rate", m.selection.modality.as_str(), &m.modality),
            ("course_rate", m.selection.course.as_str(), &m.course),
        ]
        .into_iter()
        .map(|(metric, scope, r)| {
            vec![
                metric.to_string(),
                scope.to_string(),
                r.students.to_string(),
                r.dropouts.to_string(),
                fmt(r.rate),
            ]
        })
        .collect::<Vec<_>>();
        for (metric, c) in [
            ("course_max", &m.extremes.max),
            ("course_min", &m.extremes.min),
        ] {
            rows.push(vec![
                metric.to_string(),
                c.course.clone(),
                c.students.to_string(),
                c.dropouts.to_string(),
                fmt(c.rate),
            ]);
        }
        rows
    }
}

impl Output for CsvOutput {
    fn output(&self) -> Result<(), Box<dyn Error>> {
        std::fs::create_dir_all(&self.dir)?;
        for (metric, mut df) in frames::frames(&self.metrics)? {
            let filename = self.dir.join(format!("{}.csv", metric.name()));
            let mut file = File::create(&filename)?;
            CsvWriter::new(&mut file).finish(&mut df)?;
            debug!("{} rows written to {:?}", df.height(), filename);
        }
        let header = ["metrica", "escopo", "total_alunos", "total_evadidos", "taxa_evasao"]
            .into_iter()
            .map(String::from)
            .collect();
        write_csv(self.dir.join("kpis.csv"), header, self.kpi_rows())
    }
}

#[derive(Serialize)]
struct Report<'a> {
    generated_at: DateTime<Local>,
    source: &'a str,
    metrics: &'a DerivedMetrics,
}

struct JsonOutput {
    source: String,
    metrics: DerivedMetrics,
}

impl JsonOutput {
    fn new(source: String, metrics: DerivedMetrics) -> Self {
        JsonOutput { source, metrics }
    }
}

impl Output for JsonOutput {
    fn output(&self) -> Result<(), Box<dyn Error>> {
        let report = Report {
            generated_at: Local::now(),
            source: &self.source,
            metrics: &self.metrics,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    }
}

struct TableOutput<'a> {
    table: &'a StudentTable,
    selection: Selection,
}

impl<'a> TableOutput<'a> {
    fn new(table: &'a StudentTable, selection: Selection) -> Self {
        TableOutput { table, selection }
    }
}

impl Output for TableOutput<'_> {
    fn output(&self) -> Result<(), Box<dyn Error>> {
        ui::tui::run(self.table, self.selection.clone())
    }
}

/// Dropout statistics by modality and course
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(
        short = 'F',
        long = "format",
        value_parser = PossibleValuesParser::new(["csv", "json", "table", "polar"]),
        default_value = "polar",
        help = "output format"
    )]
    format: String,

    #[arg(long = "source", help = "student csv file, overrides `source` in the config")]
    source: Option<String>,

    #[arg(long = "config", default_value = DEFAULT_CONFIG_FILE, help = "yaml config file")]
    config: String,

    #[arg(
        long = "output-dir",
        help = "directory for --format csv, overrides `output_dir` in the config"
    )]
    output_dir: Option<String>,

    /// initial modality, defaults to the first one in the file
    #[arg(long = "modality")]
    modality: Option<String>,

    /// initial course, defaults to the first one of the modality
    #[arg(long = "course")]
    course: Option<String>,

    #[arg(long = "list", action=clap::ArgAction::SetTrue, help="list modalities and courses, then exit")]
    list: bool,
}

fn load_options(conf: &Config) -> Result<LoadOptions, Box<dyn Error>> {
    Ok(LoadOptions {
        columns: conf.columns.clone(),
        separator: conf.separator_byte()?,
        dropout_status: conf.dropout_status.clone(),
    })
}

fn print_selections(table: &StudentTable) {
    for modality in table.modalities() {
        println!("{}", modality);
        for course in table.courses(modality) {
            println!("  {}", course);
        }
    }
}

fn get_output<'a>(
    output_type: OutputType,
    table: &'a StudentTable,
    selection: Selection,
    source: String,
    dir: PathBuf,
) -> Result<Box<dyn Output + 'a>, Box<dyn Error>> {
    if let OutputType::TABLE = output_type {
        return Ok(Box::new(TableOutput::new(table, selection)));
    }
    let metrics = pipeline::recompute(table, &selection)?;
    let output: Box<dyn Output + 'a> = match output_type {
        OutputType::CSV => Box::new(CsvOutput::new(dir, metrics)),
        OutputType::JSON => Box::new(JsonOutput::new(source, metrics)),
        OutputType::POLAR | OutputType::TABLE => Box::new(PolarOutput::new(metrics)),
    };
    Ok(output)
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let conf = Config::new(&args.config)?;
    debug!("config: {:?}", conf);

    let source = args.source.clone().unwrap_or(conf.source.clone());
    let table = pipeline::load(&source, &load_options(&conf)?)?;

    if args.list {
        print_selections(&table);
        return Ok(());
    }

    let selection =
        Selection::resolve(&table, args.modality.as_deref(), args.course.as_deref())?;
    info!(
        "selection: modality {}, course {}",
        selection.modality, selection.course
    );

    let out_type = OutputType::from_str(args.format.as_str()).ok_or("unknown output format")?;
    let dir = PathBuf::from(args.output_dir.unwrap_or(conf.output_dir));
    let output = get_output(out_type, &table, selection, source, dir)?;
    output.output()
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        error!("{}", e);
        std::process::exit(1);
    }
}
