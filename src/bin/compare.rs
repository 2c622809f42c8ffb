//! Command line tool to compare NER models on one dataset

use anyhow::anyhow;
use log::{info, LevelFilter};
use ner_compare::{
    cli::Backend, comparison::ModelComparator, config::ComparisonConfig,
    utils::hugging_face::download_model_config,
};
use pico_args::Arguments;

const HELP: &str = "\
Usage: compare DATASET [OPTIONS]

Arguments:
  DATASET                 JSON file of {\"tokens\": [...], \"ner_tags\": [...]} sentences

Options:
  -h, --help              Print help
  -o, --output-dir        Directory for per-model artifacts (defaults to 'model_comparison_results')
  -r, --results           Where to write the metrics JSON (defaults to 'model_comparison_results.json')
  -c, --config            YAML config with models, split and backend settings
  -b, --backend           Training backend: 'command' or 'baseline'
  -s, --seed              Seed for the train/test split
  --summary-csv           Also write a CSV summary to this path
  --fail-fast             Stop at the first model that fails
  --allow-non-positive    Pick a best model even if no F1 score is above zero
  --prefetch              Download each model's config from the Hugging Face Hub first
";

#[derive(Debug)]
struct Args {
    dataset: String,
    output_dir: String,
    results: String,
    config: Option<String>,
    backend: Option<String>,
    seed: Option<u64>,
    summary_csv: Option<String>,
    fail_fast: bool,
    allow_non_positive: bool,
    prefetch: bool,
}

impl Args {
    fn parse() -> anyhow::Result<Option<Self>> {
        let mut pargs = Arguments::from_env();

        // Help has a higher priority and should be handled separately.
        if pargs.contains(["-h", "--help"]) {
            return Ok(None);
        }

        let args = Args {
            output_dir: pargs
                .opt_value_from_str(["-o", "--output-dir"])?
                .unwrap_or_else(|| "model_comparison_results".to_string()),
            results: pargs
                .opt_value_from_str(["-r", "--results"])?
                .unwrap_or_else(|| "model_comparison_results.json".to_string()),
            config: pargs.opt_value_from_str(["-c", "--config"])?,
            backend: pargs.opt_value_from_str(["-b", "--backend"])?,
            seed: pargs.opt_value_from_str(["-s", "--seed"])?,
            summary_csv: pargs.opt_value_from_str("--summary-csv")?,
            fail_fast: pargs.contains("--fail-fast"),
            allow_non_positive: pargs.contains("--allow-non-positive"),
            prefetch: pargs.contains("--prefetch"),
            dataset: pargs.free_from_str().map_err(|e| match e {
                pico_args::Error::MissingArgument => anyhow!("Missing required argument: DATASET"),
                _ => anyhow!("{}", e),
            })?,
        };

        let remaining = pargs.finish();
        if !remaining.is_empty() {
            return Err(anyhow!("Unexpected arguments: {:?}", remaining));
        }

        Ok(Some(args))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::formatted_builder()
        .filter_level(LevelFilter::Info)
        .parse_env("RUST_LOG")
        .init();

    let Some(args) = Args::parse()? else {
        print!("{}", HELP);

        return Ok(());
    };

    let mut config = match &args.config {
        Some(path) => ComparisonConfig::load(path).await?,
        None => ComparisonConfig::default(),
    };

    if let Some(backend) = &args.backend {
        config.backend = Backend::try_from(backend.as_str())?;
    }

    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    if args.fail_fast {
        config.fail_fast = true;
    }

    if args.prefetch {
        for (name, identifier) in config.models.iter() {
            info!("Prefetching {} ({})", name, identifier);
            download_model_config(identifier)
                .await
                .map_err(|e| anyhow!("Unable to fetch {} from the Hub: {}", identifier, e))?;
        }
    }

    info!(
        "Comparing {} models with the {} backend",
        config.models.len(),
        config.backend
    );

    let mut comparator = ModelComparator::from_config(&config, config.factory());
    let summary = comparator
        .compare_models(&args.dataset, &args.output_dir)
        .await?;

    let best_model = if args.allow_non_positive {
        comparator.get_best_model_above(f64::NEG_INFINITY)
    } else {
        comparator.get_best_model()
    };

    println!("\nBest model: {}", best_model.unwrap_or("none"));

    comparator.save_comparison_results(&args.results).await?;

    if let Some(path) = &args.summary_csv {
        comparator.save_summary_csv(path)?;
    }

    if !summary.is_complete() {
        for failure in &summary.failed {
            eprintln!(
                "{} ({}) failed: {}",
                failure.name, failure.identifier, failure.error
            );
        }

        return Err(anyhow!(
            "{} of {} models failed",
            summary.failed.len(),
            config.models.len()
        ));
    }

    Ok(())
}
