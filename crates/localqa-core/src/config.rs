use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Error;

pub const DEFAULT_INSTRUCTION: &str = "You are a product-manual assistant. \
Use ONLY the context to answer; if not answerable, say you don't know. \
Show the chunk id(s) at the end.";
pub const DEFAULT_SEPARATOR: &str = "\n\n---\n\n";
pub const DEFAULT_STOP: &str = "### Question";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub artifacts: ArtifactSettings,
    pub embedding: EmbeddingSettings,
    pub llm: LlmSettings,
    pub retrieval: RetrievalSettings,
    pub prompt: PromptSettings,
}

/// Where the precomputed corpus and index live. File names are relative to `dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactSettings {
    pub dir: String,
    pub chunks_file: String,
    pub index_dir: String,
    pub table: String,
    pub manifest_file: String,
}

impl Default for ArtifactSettings {
    fn default() -> Self {
        Self {
            dir: "model_assets".to_string(),
            chunks_file: "chunks.json".to_string(),
            index_dir: "index.lance".to_string(),
            table: "vectors".to_string(),
            manifest_file: "manifest.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub model_dir: String,
    pub model_name: String,
    pub max_len: usize,
    pub fake: bool,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model_dir: "models/all-MiniLM-L6-v2".to_string(),
            model_name: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            max_len: 256,
            fake: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub model_path: String,
    pub tokenizer_path: String,
    pub context_window: usize,
    pub max_new_tokens: usize,
    /// 0 selects greedy decoding.
    pub temperature: f64,
    pub top_k: usize,
    pub top_p: f64,
    pub repeat_penalty: f32,
    pub repeat_last_n: usize,
    pub seed: u64,
    pub stop: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model_path: "models/tinyllama-1.1b-chat-v1.0.Q4_0.gguf".to_string(),
            tokenizer_path: "models/tinyllama-1.1b-chat-v1.0.tokenizer.json".to_string(),
            context_window: 2048,
            max_new_tokens: 128,
            temperature: 0.8,
            top_k: 40,
            top_p: 0.95,
            repeat_penalty: 1.1,
            repeat_last_n: 64,
            seed: 299_792_458,
            stop: DEFAULT_STOP.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub default_k: usize,
    pub min_k: usize,
    pub max_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { default_k: 5, min_k: 3, max_k: 10 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSettings {
    pub instruction: String,
    pub separator: String,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            instruction: DEFAULT_INSTRUCTION.to_string(),
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> crate::error::Result<()> {
        let r = &self.retrieval;
        if r.min_k == 0 {
            return Err(Error::InvalidConfig("retrieval.min_k must be at least 1".into()));
        }
        if !(r.min_k <= r.default_k && r.default_k <= r.max_k) {
            return Err(Error::InvalidConfig(format!(
                "retrieval.default_k={} must lie within [{}, {}]",
                r.default_k, r.min_k, r.max_k
            )));
        }
        let l = &self.llm;
        if l.max_new_tokens == 0 || l.context_window == 0 {
            return Err(Error::InvalidConfig(
                "llm.max_new_tokens and llm.context_window must be positive".into(),
            ));
        }
        if !(l.top_p > 0.0 && l.top_p <= 1.0) {
            return Err(Error::InvalidConfig(format!("llm.top_p={} must lie within (0, 1]", l.top_p)));
        }
        if l.temperature < 0.0 {
            return Err(Error::InvalidConfig("llm.temperature must not be negative".into()));
        }
        if l.stop.is_empty() || self.prompt.separator.is_empty() {
            return Err(Error::InvalidConfig("llm.stop and prompt.separator must not be empty".into()));
        }
        Ok(())
    }
}

pub struct Config {
    figment: Figment,
    base_dir: PathBuf,
}

impl Config {
    /// Loads from the working directory using `RUST_ENV` (default `dev`).
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_from(Path::new("."), &env_name)
    }

    pub fn load_from(base_dir: &Path, env_name: &str) -> anyhow::Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(base_dir.join("config.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(base_dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(base_dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(base_dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment, base_dir: base_dir.to_path_buf() };
        config.settings()?.validate()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    pub fn settings(&self) -> anyhow::Result<Settings> {
        self.figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to extract settings: {}", e))
    }

    /// Resolves a configured path against the directory the config was loaded from.
    pub fn resolve<S: AsRef<str>>(&self, p: S) -> PathBuf {
        resolve_with_base(&self.base_dir, p)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
