use anyhow::Context;
use std::time::Instant;
use tracing::{debug_span, info};

use localqa_core::config::Config;
use localqa_core::error::Result;
use localqa_core::types::RagAnswer;
use localqa_embed::load_embedder;
use localqa_llm::load_language_model;
use localqa_vector::{load_artifacts, ArtifactPaths};

use crate::generator::AnswerGenerator;
use crate::prompt::PromptTemplate;
use crate::retriever::Retriever;

/// Question in, grounded answer out. Holds no per-question state and can be
/// shared across threads; completions themselves run one at a time.
/// Answering blocks, so async callers go through `spawn_blocking`.
pub struct RagPipeline {
    retriever: Retriever,
    template: PromptTemplate,
    generator: AnswerGenerator,
    max_new_tokens: usize,
}

impl RagPipeline {
    pub fn new(retriever: Retriever, template: PromptTemplate, generator: AnswerGenerator, max_new_tokens: usize) -> Self {
        Self { retriever, template, generator, max_new_tokens }
    }

    /// Loads the artifacts, the sentence encoder and the language model named
    /// by `config`.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let settings = config.settings()?;
        let paths = ArtifactPaths::from_settings(&settings.artifacts, &config.resolve(&settings.artifacts.dir));
        let corpus = load_artifacts(&paths).await.context("loading artifacts")?;
        info!(chunks = corpus.len(), dim = corpus.dim(), "corpus loaded");

        let embedder = load_embedder(&settings.embedding, &config.resolve(&settings.embedding.model_dir))?;
        let model = load_language_model(
            &settings.llm,
            &config.resolve(&settings.llm.model_path),
            &config.resolve(&settings.llm.tokenizer_path),
        )?;

        let retriever = Retriever::new(corpus, embedder)?;
        let generator = AnswerGenerator::with_stop(model, settings.llm.stop.clone());
        Ok(Self::new(retriever, PromptTemplate::from(&settings.prompt), generator, settings.llm.max_new_tokens))
    }

    pub fn answer(&self, question: &str, k: usize) -> Result<String> {
        Ok(self.answer_with_context(question, k)?.text)
    }

    /// Like [`answer`](Self::answer) but also returns the chunks the prompt
    /// was built from.
    pub fn answer_with_context(&self, question: &str, k: usize) -> Result<RagAnswer> {
        let span = debug_span!("answer", k);
        let _enter = span.enter();
        let start = Instant::now();

        let context = self.retriever.retrieve(question, k)?;
        let prompt = self.template.compose(question, &context);
        let text = self.generator.generate(&prompt, self.max_new_tokens)?;

        info!(
            k,
            context = ?context.iter().map(|c| c.chunk_id).collect::<Vec<_>>(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "answered"
        );
        Ok(RagAnswer { text, context })
    }
}
