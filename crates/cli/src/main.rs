mod archive;
mod cli;
mod config;
mod pipeline;

use std::fs::File;
use std::io::BufWriter;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use docrelay_core::config::load_dotenv;
use docrelay_core::Config;
use docrelay_ingest::{load_document, read_prompt};
use docrelay_llm::providers::create_provider;
use docrelay_llm::{
    default_estimator, HistoryStore, LogObserver, RetryPolicy, StatusObserver, Transport,
};

use crate::archive::ChunkArchive;
use crate::cli::{CliArgs, Command, Mode, RunArgs};
use crate::config::RunSettings;
use crate::pipeline::{Pipeline, PipelineSettings};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    load_dotenv();
    let args = CliArgs::parse();

    let config = Config::load(args.config.as_deref()).context("failed to load configuration")?;

    match args.command {
        Command::ShowConfig => {
            println!("{}", serde_json::to_string_pretty(&config.redacted_summary())?);
            Ok(())
        }
        Command::Process(run_args) => run(Mode::Process, run_args, config).await,
        Command::Translate(run_args) => run(Mode::Translate, run_args, config).await,
    }
}

async fn run(mode: Mode, args: RunArgs, config: Config) -> Result<()> {
    let settings = RunSettings::resolve(mode, args, config);
    settings.config.log_summary();

    // Local inputs are validated before any network activity.
    let document = load_document(&settings.input)
        .with_context(|| format!("failed to read input {}", settings.input.display()))?;
    let system_prompt = read_prompt(&settings.prompt_path).context("failed to load system prompt")?;

    let provider =
        create_provider(&settings.config.llm).context("failed to create LLM provider")?;
    let observer: Arc<dyn StatusObserver> = Arc::new(LogObserver);
    let transport = Transport::new(
        provider,
        RetryPolicy::from_config(&settings.config.retry),
        observer.clone(),
    );
    info!(
        max_attempts = transport.policy().max_attempts(),
        "Requests retry with exponential backoff"
    );
    let mut history = HistoryStore::new(default_estimator(&settings.config.llm.model));

    let archive = match &settings.keep_chunks {
        Some(dir) => {
            let archive = ChunkArchive::create(
                dir.clone(),
                settings.config.pipeline.write_retries,
                observer.clone(),
            )
            .with_context(|| format!("failed to create chunk directory {}", dir.display()))?;
            info!(dir = %archive.dir().display(), "Saving per-chunk copies");
            Some(archive)
        }
        None => None,
    };

    let file = File::create(&settings.output)
        .with_context(|| format!("failed to create output {}", settings.output.display()))?;
    let mut sink = BufWriter::new(file);

    info!(
        "Starting {} of '{}'...",
        settings.mode.verb().to_lowercase(),
        settings.input.display()
    );

    let pipeline = Pipeline::new(
        PipelineSettings {
            system_prompt,
            max_words: settings.max_words,
            policy: settings.policy,
            context_tokens: settings.config.pipeline.context_tokens,
            echo_inputs: settings.echo_inputs,
            verb: settings.mode.verb(),
            done: settings.mode.past_tense(),
        },
        transport,
        observer,
    );
    let summary = pipeline
        .run(&document, &mut history, &mut sink, archive.as_ref())
        .await?;

    if summary.failed_chunks > 0 {
        warn!(
            failed = summary.failed_chunks,
            total = summary.chunks,
            "Some chunks failed; their error text was written in place of the response"
        );
    }
    info!("Output saved to {}", settings.output.display());
    Ok(())
}
