use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use court_agents::config::{check_endpoint, CourtConfig};
use court_agents::{console, RigGenerator};
use courtroom::batch::{
    load_cases, load_raw, report_file_name, split_cases, write_raw, BatchLearner, BenchmarkMode,
    BenchmarkRunner, CsvReport, DEFENDANT_LABEL, PLAINTIFF_LABEL,
};
use courtroom::{Courtroom, JsonCaseArchive, JsonStrategyStore};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

const DEFAULT_CASE: &str = "아파트 층간소음으로 인한 손해배상 청구";

/// Adversarial courtroom simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML file overriding the COURT_* environment settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for the strategy store, case archive and reports
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one interactive trial and print every phase
    Trial {
        /// Case description given to both advocates
        #[arg(long, default_value = DEFAULT_CASE)]
        case: String,

        /// Fix the associate bench selection
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Seed the knowledge stores from a JSONL dataset
    Learn { dataset: PathBuf },
    /// Run full trials over a labelled JSONL dataset and write a CSV report
    Benchmark {
        dataset: PathBuf,

        #[arg(long, value_enum, default_value_t = ModeArg::Trained)]
        mode: ModeArg,

        /// Report directory (defaults to <data-dir>/reports)
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Shuffle a JSONL dataset into test.jsonl and train.jsonl
    Split {
        dataset: PathBuf,

        #[arg(long, default_value_t = 100)]
        test_size: usize,

        #[arg(long, default_value = ".")]
        out_dir: PathBuf,

        #[arg(long)]
        seed: Option<u64>,
    },
    /// Check that the configured inference endpoint answers
    Check,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Trained,
    Untrained,
}

impl From<ModeArg> for BenchmarkMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Trained => BenchmarkMode::Trained,
            ModeArg::Untrained => BenchmarkMode::Untrained,
        }
    }
}

/// File-backed stores under the data directory.
struct Stores {
    strategies: JsonStrategyStore,
    archive: JsonCaseArchive,
}

impl Stores {
    fn open(config: &CourtConfig) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)
            .with_context(|| format!("Failed to create {}", config.data_dir.display()))?;
        Ok(Self {
            strategies: JsonStrategyStore::open(config.strategies_path())
                .context("Failed to open strategy store")?,
            archive: JsonCaseArchive::open(config.archive_path())
                .context("Failed to open case archive")?,
        })
    }
}

fn load_config(cli: &Cli) -> Result<CourtConfig> {
    let mut config = match &cli.config {
        Some(path) => CourtConfig::from_file(path)?,
        None => CourtConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    Ok(config)
}

fn model_backend(config: &CourtConfig) -> Result<RigGenerator> {
    config.validate()?;
    RigGenerator::new(config)
}

async fn run_trial(config: &CourtConfig, case: &str, seed: Option<u64>) -> Result<()> {
    let generator = model_backend(config)?;
    let stores = Stores::open(config)?;
    let mut trial_config = config.trial_config();
    if seed.is_some() {
        trial_config.seed = seed;
    }

    println!("{}", console::header("AI 법정 시뮬레이션"));
    println!("{}", console::speech("사건", case));

    let court = Courtroom::new(&generator, &stores.strategies, &stores.archive)
        .with_config(trial_config);
    let mut run = court.open_trial(case, PLAINTIFF_LABEL, DEFENDANT_LABEL)?;
    while let Some(step) = run.next_phase().await {
        let event = step.context("Trial aborted")?;
        let text = console::phase_event(&event);
        if !text.is_empty() {
            println!("{text}");
        }
    }
    info!(trial = %run.id(), transitions = run.transitions().len(), "Trial finished");
    println!("{}", console::rule("재판 종료"));
    Ok(())
}

async fn run_learn(config: &CourtConfig, dataset: &Path) -> Result<()> {
    let cases = load_cases(dataset)?;
    let generator = model_backend(config)?;
    let stores = Stores::open(config)?;

    let title = format!("일괄 학습: {}건", cases.len());
    println!("{}", console::header(&title));
    let summary = BatchLearner::new(&generator, &stores.strategies, &stores.archive)
        .with_pacing(config.pacing())
        .with_write_policy(config.write_policy)
        .with_generation_timeout(config.trial_config().generation_timeout())
        .run(&cases, |index, total, learned| {
            println!("{}", console::learned_case(index, total, learned));
        })
        .await
        .context("Batch learning aborted")?;
    println!("{}", console::learn_summary(&summary));
    Ok(())
}

async fn run_benchmark(
    config: &CourtConfig,
    dataset: &Path,
    mode: BenchmarkMode,
    out_dir: Option<PathBuf>,
) -> Result<()> {
    let cases = load_cases(dataset)?;
    let generator = model_backend(config)?;
    let stores = Stores::open(config)?;

    let out_dir = out_dir.unwrap_or_else(|| config.data_dir.join("reports"));
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    let report_path = out_dir.join(report_file_name(mode.as_str(), Local::now()));
    let file = File::create(&report_path)
        .with_context(|| format!("Failed to create {}", report_path.display()))?;
    let mut report = CsvReport::new(BufWriter::new(file))?;

    let title = format!("벤치마크 ({mode}): {}건", cases.len());
    println!("{}", console::header(&title));
    let metrics = BenchmarkRunner::new(&generator, &stores.strategies, &stores.archive)
        .with_trial_config(config.trial_config())
        .with_pacing(config.pacing())
        .run(mode, &cases, &mut report, |index, case, event| {
            if event.phase == courtroom::TrialPhase::Critique {
                println!(
                    "[{}/{}] 사건 {} 완료: {}",
                    index + 1,
                    cases.len(),
                    case.case_id,
                    event.state.status_line()
                );
            }
        })
        .await
        .context("Benchmark aborted")?;

    let metrics_path = report_path.with_extension("json");
    fs::write(&metrics_path, metrics.to_json()?)
        .with_context(|| format!("Failed to write {}", metrics_path.display()))?;

    println!("{}", console::benchmark_summary(&metrics));
    println!("CSV report: {}", report_path.display());
    println!("Metrics:    {}", metrics_path.display());
    Ok(())
}

fn run_split(dataset: &Path, test_size: usize, out_dir: &Path, seed: Option<u64>) -> Result<()> {
    let records = load_raw(dataset)?;
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let (test, train) = split_cases(records, test_size, &mut rng)?;

    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    write_raw(&out_dir.join("test.jsonl"), &test)?;
    write_raw(&out_dir.join("train.jsonl"), &train)?;
    println!(
        "test.jsonl: {}건, train.jsonl: {}건 ({})",
        test.len(),
        train.len(),
        out_dir.display()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli)?;
    info!(
        provider = %config.provider,
        model = %config.model,
        data_dir = %config.data_dir.display(),
        prompt_version = court_agents::prompts::PROMPT_VERSION,
        "Courtroom starting"
    );

    match cli.command {
        Command::Trial { case, seed } => run_trial(&config, &case, seed).await,
        Command::Learn { dataset } => run_learn(&config, &dataset).await,
        Command::Benchmark {
            dataset,
            mode,
            out_dir,
        } => run_benchmark(&config, &dataset, mode.into(), out_dir).await,
        Command::Split {
            dataset,
            test_size,
            out_dir,
            seed,
        } => run_split(&dataset, test_size, &out_dir, seed),
        Command::Check => {
            let api_key = config.api_key.as_deref();
            if check_endpoint(&config.base_url, api_key).await {
                println!("{} ({}) reachable", config.base_url, config.model);
                Ok(())
            } else {
                warn!(url = %config.base_url, "Inference endpoint unreachable");
                anyhow::bail!("Inference endpoint {} is not reachable", config.base_url)
            }
        }
    }
}
