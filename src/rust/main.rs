use incident_classifier::{
    load_records, ClassifierBuilder, ClassifierConfig, ClassifierError, Classify, Evaluator,
    FailurePolicy, ModelManager, OptimizationLevel,
};
use log::info;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

/// Shown in place of a category when a report could not be classified
const PLACEHOLDER_CATEGORY: &str = "...";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Model to load: a path, file:// URL or http(s):// URL
    #[arg(short, long)]
    model: Option<String>,

    /// Expected SHA-256 of the model artifact
    #[arg(long)]
    sha256: Option<String>,

    /// Directory remote models are downloaded into
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// ONNX Runtime intra-op threads (0 lets the runtime decide)
    #[arg(long)]
    intra_threads: Option<usize>,

    /// ONNX Runtime inter-op threads (0 lets the runtime decide)
    #[arg(long)]
    inter_threads: Option<usize>,

    /// Graph optimization: disable, basic, extended or all
    #[arg(long)]
    opt_level: Option<OptimizationLevel>,

    /// Force a fresh download of a remote model
    #[arg(short, long)]
    fresh: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Guess the category of a single report
    Classify {
        #[arg(short, long, default_value = "")]
        title: String,
        #[arg(short, long, default_value = "")]
        content: String,
    },
    /// Measure accuracy against a labelled JSON dataset
    Evaluate {
        #[arg(short, long)]
        dataset: PathBuf,
        /// Count failed classifications as mismatches instead of aborting
        #[arg(long)]
        count_failures: bool,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Args {
    fn config(&self) -> ClassifierConfig {
        let mut config = ClassifierConfig::from_env();
        if let Some(model) = &self.model {
            config.model.url = model.clone();
            config.model.sha256 = None;
        }
        if let Some(sha256) = &self.sha256 {
            config.model = config.model.clone().with_sha256(sha256.clone());
        }
        if let Some(dir) = &self.cache_dir {
            config.cache_dir = Some(dir.clone());
        }
        if let Some(threads) = self.intra_threads {
            config.runtime.intra_threads = threads;
        }
        if let Some(threads) = self.inter_threads {
            config.runtime.inter_threads = threads;
        }
        if let Some(level) = self.opt_level {
            config.runtime.optimization_level = level;
        }
        config
    }
}

fn category_line(category: &str) -> String {
    format!("I think this is in the {} category", category)
}

/// Classifies one report and returns the line to print. Any failure,
/// including a model that cannot be loaded, yields the placeholder line.
async fn classify_single<C: Classify>(
    classifier: &C,
    title: &str,
    content: &str,
) -> (String, Option<ClassifierError>) {
    match classifier.classify(title, content).await {
        Ok(category) => (category_line(&category), None),
        Err(e) => (category_line(PLACEHOLDER_CATEGORY), Some(e)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    env_logger::init();
    let args = Args::parse();
    let config = args.config();

    if args.fresh {
        let manager = match &config.cache_dir {
            Some(dir) => ModelManager::new(dir)?,
            None => ModelManager::new_default()?,
        };
        info!("Fresh download requested - removing any cached model file...");
        manager.remove_download(&config.model.url)?;
    }

    let classifier = ClassifierBuilder::from_config(&config).build()?;

    match args.command {
        Command::Classify { title, content } => {
            let start_time = Instant::now();
            let (line, error) = classify_single(&classifier, &title, &content).await;
            println!("{}", line);
            match error {
                Some(e) => {
                    eprintln!("Classification unavailable: {}", e);
                    Ok(ExitCode::FAILURE)
                }
                None => {
                    info!("Classified in {:.2?}", start_time.elapsed());
                    Ok(ExitCode::SUCCESS)
                }
            }
        }
        Command::Evaluate { dataset, count_failures, json } => {
            let start_time = Instant::now();
            info!("Loading model from {}", config.model.url);
            classifier.warm_up().await?;
            info!("Model ready (took {:.2?})", start_time.elapsed());

            let records = load_records(&dataset)?;
            let policy = if count_failures {
                FailurePolicy::CountAsMismatch
            } else {
                FailurePolicy::Abort
            };
            let evaluator = Evaluator::new(&classifier).with_failure_policy(policy);

            let eval_start = Instant::now();
            let summary = evaluator.evaluate(&records).await?;
            info!(
                "Evaluated {} records in {:.2?}",
                summary.total,
                eval_start.elapsed()
            );
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{}", summary);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
