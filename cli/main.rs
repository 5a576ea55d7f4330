#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process;

use cohort::analyze::regression::fit_regression_with;
use cohort::config::AnalysisConfig;
use cohort::report::{run_analysis, sweep_seeds, write_population_csv};
use cohort::shared::schema::{Attribute, NUM_FEATURES};

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Toml,
}

/// Population settings shared by every subcommand that generates students.
#[derive(Args)]
pub struct PopulationArgs {
    /// TOML configuration file; flags given on the command line take precedence
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Number of students to generate
    #[arg(long, value_name = "N")]
    pub size: Option<usize>,

    /// Seed of the deterministic generator (any integer)
    #[arg(long, allow_hyphen_values = true)]
    pub seed: Option<i64>,

    /// Standard deviation of the additive outcome noise
    #[arg(long, value_name = "SIGMA")]
    pub noise: Option<f64>,
}

impl PopulationArgs {
    /// Loads the configuration file (or defaults) and applies flag overrides.
    fn resolve(&self) -> Result<AnalysisConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::load(path)?,
            None => AnalysisConfig::default(),
        };
        if let Some(size) = self.size {
            config.population.size = size;
        }
        if let Some(seed) = self.seed {
            config.population.seed = seed;
        }
        if let Some(noise) = self.noise {
            config.population.outcome_noise_std = noise;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Args)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub population: PopulationArgs,

    /// Write the CSV here instead of standard output
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub population: PopulationArgs,

    /// Number of k-means clusters (clamped to the population size)
    #[arg(long, value_name = "K")]
    pub clusters: Option<usize>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Args)]
pub struct SweepArgs {
    #[command(flatten)]
    pub population: PopulationArgs,

    /// Comma-separated list of seeds, analyzed in parallel
    #[arg(long, value_delimiter = ',', required = true, allow_hyphen_values = true)]
    pub seeds: Vec<i64>,
}

#[derive(Args)]
pub struct PredictArgs {
    #[command(flatten)]
    pub population: PopulationArgs,

    #[arg(long)]
    pub comprehension: f64,

    #[arg(long)]
    pub attention: f64,

    #[arg(long)]
    pub focus: f64,

    #[arg(long)]
    pub retention: f64,

    /// Minutes per day, 0 to 120
    #[arg(long)]
    pub engagement_time: f64,
}

impl PredictArgs {
    fn features(&self) -> [f64; NUM_FEATURES] {
        Attribute::ALL.map(|a| match a {
            Attribute::Comprehension => self.comprehension,
            Attribute::Attention => self.attention,
            Attribute::Focus => self.focus,
            Attribute::Retention => self.retention,
            Attribute::EngagementTime => self.engagement_time,
        })
    }
}

#[derive(Parser)]
#[command(
    name = "cohort",
    about = "Deterministic synthetic student cohorts and their analytics",
    long_about = "Generates reproducible synthetic student populations from a seed and \
                 analyzes them with descriptive statistics, k-means personas and a \
                 gradient-descent linear regression."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a population and write it as CSV
    #[command(about = "Generate a synthetic population (outputs: CSV)")]
    Generate(GenerateArgs),

    /// Run statistics, clustering, regression and insights on one population
    #[command(about = "Analyze one synthetic population")]
    Analyze(AnalyzeArgs),

    /// Analyze several seeds in parallel and print one line per seed
    #[command(about = "Analyze several seeds in parallel")]
    Sweep(SweepArgs),

    /// Fit the regression on the configured population and score a new student
    #[command(about = "Score a new student with the fitted regression")]
    Predict(PredictArgs),

    /// Display version and build information
    #[command(about = "Display version and build information")]
    Version,
}

fn run_generate(args: GenerateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.population.resolve()?;
    let students = config.population.builder().build();

    match &args.output {
        Some(path) => {
            let file = BufWriter::new(File::create(path)?);
            write_population_csv(&students, file)?;
            eprintln!("Wrote {} students to {}", students.len(), path.display());
        }
        None => write_population_csv(&students, io::stdout().lock())?,
    }
    Ok(())
}

fn run_analyze(args: AnalyzeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = args.population.resolve()?;
    if let Some(k) = args.clusters {
        config.clustering.clusters = k;
    }

    let report = run_analysis(&config);
    match args.format {
        OutputFormat::Text => print!("{report}"),
        OutputFormat::Toml => print!("{}", report.to_toml()?),
    }
    Ok(())
}

fn run_sweep(args: SweepArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.population.resolve()?;
    let reports = sweep_seeds(&config, &args.seeds);

    let mut out = io::stdout().lock();
    for report in &reports {
        writeln!(out, "{}", report.summary_line())?;
    }
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.population.resolve()?;
    let students = config.population.builder().build();
    let model = fit_regression_with(&students, &config.regression)
        .ok_or("cannot fit a regression on an empty population")?;

    let features = args.features();
    for a in Attribute::ALL {
        let value = features[a.index()];
        if !(0.0..=a.upper_bound()).contains(&value) {
            log::warn!(
                "{a} = {value} is outside 0..={}; the prediction extrapolates",
                a.upper_bound()
            );
        }
    }

    println!(
        "Predicted assessment score: {:.1} (training R² {:.4}, n={})",
        model.predict_features(&features),
        model.r_squared,
        students.len()
    );
    Ok(())
}

fn print_version_info() {
    let version = env!("CARGO_PKG_VERSION");
    let build_timestamp: u64 = env!("COHORT_BUILD_TIMESTAMP").parse().unwrap_or(0);

    println!("cohort {version}");
    if build_timestamp > 0 {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        println!("Built: {}", format_duration_ago(now.saturating_sub(build_timestamp)));
    }
}

/// Format seconds into a human-readable duration like "2.4 hours ago"
fn format_duration_ago(seconds: u64) -> String {
    const MINUTE: u64 = 60;
    const HOUR: u64 = 60 * MINUTE;
    const DAY: u64 = 24 * HOUR;

    if seconds < MINUTE {
        "just now".to_string()
    } else if seconds < HOUR {
        format!("{:.1} minutes ago", seconds as f64 / MINUTE as f64)
    } else if seconds < DAY {
        format!("{:.1} hours ago", seconds as f64 / HOUR as f64)
    } else {
        format!("{:.1} days ago", seconds as f64 / DAY as f64)
    }
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let Cli { command } = cli;

    let result = match command {
        Some(Commands::Generate(args)) => run_generate(args),
        Some(Commands::Analyze(args)) => run_analyze(args),
        Some(Commands::Sweep(args)) => run_sweep(args),
        Some(Commands::Predict(args)) => run_predict(args),
        Some(Commands::Version) => {
            print_version_info();
            Ok(())
        }
        None => Cli::command()
            .print_help()
            .map(|()| println!())
            .map_err(Into::into),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
