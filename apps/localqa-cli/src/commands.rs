use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use localqa_core::config::{Config, Settings};
use localqa_core::types::RagAnswer;
use localqa_rag::RagPipeline;
use localqa_vector::{load_artifacts, ArtifactPaths};

use crate::args::{resolve_k, Args, Commands};

/// Without `--config-dir` or `--env` this is the working directory under
/// `RUST_ENV`.
pub fn load_config(args: &Args) -> Result<Config> {
    if args.config_dir.is_none() && args.env.is_none() {
        return Config::load().context("loading configuration from the working directory");
    }
    let config_dir = args.config_dir();
    Config::load_from(&config_dir, &args.env_name())
        .with_context(|| format!("loading configuration from {}", config_dir.display()))
}

pub async fn run(args: Args) -> Result<()> {
    let config = load_config(&args)?;
    let settings = config.settings()?;
    debug!(env = %args.env_name(), "configuration loaded");

    match args.command {
        Commands::Ask { question, k, show_context } => {
            let k = resolve_k(k, &settings.retrieval)?;
            let pipeline = load_pipeline(&config).await?;
            let answer = answer_with_spinner(pipeline, question, k).await?;
            print_answer(&answer, show_context);
            Ok(())
        }
        Commands::Repl { k } => {
            let k = resolve_k(k, &settings.retrieval)?;
            repl(&config, &settings, k).await
        }
        Commands::Inspect => inspect(&config, &settings).await,
    }
}

fn spinner(message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg} [{elapsed}]")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

async fn load_pipeline(config: &Config) -> Result<Arc<RagPipeline>> {
    let pb = spinner("Loading models...")?;
    let pipeline = RagPipeline::from_config(config).await;
    pb.finish_and_clear();
    Ok(Arc::new(pipeline?))
}

async fn answer_with_spinner(pipeline: Arc<RagPipeline>, question: String, k: usize) -> Result<RagAnswer> {
    let pb = spinner("Thinking...")?;
    let joined = tokio::task::spawn_blocking(move || pipeline.answer_with_context(&question, k)).await;
    pb.finish_and_clear();
    Ok(joined.context("answer worker panicked")??)
}

fn print_answer(answer: &RagAnswer, show_context: bool) {
    println!("{}", answer.text);
    if show_context {
        println!();
        for chunk in &answer.context {
            println!("[#{}] {}", chunk.chunk_id, chunk.text);
        }
    }
}

fn print_repl_help(k: usize, settings: &Settings) {
    println!("Ask a question about the manual. k={} (allowed {}..={})", k, settings.retrieval.min_k, settings.retrieval.max_k);
    println!("Commands: :k N to change k, :quit to leave");
}

async fn repl(config: &Config, settings: &Settings, mut k: usize) -> Result<()> {
    let pipeline = load_pipeline(config).await?;
    print_repl_help(k, settings);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, ":quit" | ":q" | ":exit") {
            break;
        }
        if let Some(rest) = line.strip_prefix(":k") {
            match rest.trim().parse::<usize>().map_err(anyhow::Error::from).and_then(|n| resolve_k(Some(n), &settings.retrieval)) {
                Ok(n) => {
                    k = n;
                    println!("k = {}", k);
                }
                Err(e) => eprintln!("error: {:#}", e),
            }
            continue;
        }
        match answer_with_spinner(pipeline.clone(), line.to_string(), k).await {
            Ok(answer) => print_answer(&answer, true),
            Err(e) => eprintln!("error: {:#}", e),
        }
        println!();
    }
    Ok(())
}

async fn inspect(config: &Config, settings: &Settings) -> Result<()> {
    let dir = config.resolve(&settings.artifacts.dir);
    let paths = ArtifactPaths::from_settings(&settings.artifacts, &dir);
    let corpus = load_artifacts(&paths).await?;
    let m = corpus.manifest();
    info!(dir = %dir.display(), "artifacts consistent");
    println!("artifacts:        {}", dir.display());
    println!("chunks:           {}", corpus.len());
    println!("dimension:        {}", corpus.dim());
    println!("metric:           {:?}", m.metric);
    println!("normalized:       {}", m.normalized);
    println!("embedding model:  {}", m.embedding_model);
    if m.embedding_model != settings.embedding.model_name {
        println!("note: configured encoder is '{}'", settings.embedding.model_name);
    }
    Ok(())
}
