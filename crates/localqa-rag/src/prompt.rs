//! Prompt rendering. Pure: the same question and context always yield the
//! same bytes.
use localqa_core::config::PromptSettings;
use localqa_core::types::Chunk;

pub const CONTEXT_HEADER: &str = "### Context";
pub const QUESTION_HEADER: &str = "### Question";
pub const ANSWER_CUE: &str = "### Answer:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    pub instruction: String,
    pub separator: String,
}

impl Default for PromptTemplate {
    fn default() -> Self { Self::from(&PromptSettings::default()) }
}

impl From<&PromptSettings> for PromptTemplate {
    fn from(s: &PromptSettings) -> Self {
        Self { instruction: s.instruction.clone(), separator: s.separator.clone() }
    }
}

impl PromptTemplate {
    /// `[#<id>] <text>` per chunk, in the given order.
    pub fn render_context(&self, context: &[Chunk]) -> String {
        context
            .iter()
            .map(|c| format!("[#{}] {}", c.chunk_id, c.text))
            .collect::<Vec<_>>()
            .join(&self.separator)
    }

    pub fn compose(&self, question: &str, context: &[Chunk]) -> String {
        format!(
            "{}\n\n{}\n{}\n\n{}\n{}\n\n{}",
            self.instruction,
            CONTEXT_HEADER,
            self.render_context(context),
            QUESTION_HEADER,
            question,
            ANSWER_CUE
        )
    }
}

/// Renders with the default template.
pub fn compose(question: &str, context: &[Chunk]) -> String {
    PromptTemplate::default().compose(question, context)
}
