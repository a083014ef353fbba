use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use tutor_core::{Evidence, Subject};

/// Fallback answer texts. Placeholders: `{question}`, `{subject}`, `{tip}`,
/// `{excerpt}` and `{sources}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Templates {
    pub evidence: String,
    pub no_evidence: String,
    pub error: String,
    /// Study tip per subject, keyed by subject name (`mathematics`, ...).
    pub tips: BTreeMap<String, String>,
    pub excerpt_chars: usize,
}

impl Default for Templates {
    fn default() -> Self {
        let tips = [
            (Subject::Mathematics, "Work through the definitions, then redo a worked example step by step."),
            (Subject::Physics, "Write down the known quantities and units before choosing a law."),
            (Subject::Chemistry, "Balance the equation first and keep track of concentrations."),
            (Subject::Electrical, "Sketch the circuit and label every voltage and current."),
            (Subject::Computing, "Trace the algorithm by hand on a small input."),
            (Subject::Biology, "Relate each structure to the function it serves."),
            (Subject::Unclassified, "Ask a more specific question to get a more precise answer."),
        ]
        .into_iter()
        .map(|(s, tip)| (s.name().to_string(), tip.to_string()))
        .collect();

        Self {
            evidence: "**ANSWER BASED ON YOUR DOCUMENTS**\n\n\
                       **Question:** {question}\n\
                       **Subject:** {subject}\n\n\
                       Here are the key passages found in your course material.\n\n\
                       **Relevant content:**\n{excerpt}\n\n\
                       **Sources:** {sources}\n\n\
                       **Tip:** {tip}"
                .to_string(),
            no_evidence: "**STUDY ASSISTANT**\n\n\
                          **Question:** {question}\n\
                          **Subject:** {subject}\n\n\
                          I could not find material on this in the indexed documents. To get a precise answer:\n\n\
                          1. Add your course documents and rebuild the index\n\
                          2. Give more context in your question\n\
                          3. Mention the level you are studying at\n\n\
                          **Tip:** {tip}"
                .to_string(),
            error: "**STUDY ASSISTANT: DEGRADED MODE**\n\n\
                    I am having technical difficulties right now.\n\n\
                    **Your question:** {question}\n\n\
                    Try rephrasing it more specifically, or consult your course documents directly."
                .to_string(),
            tips,
            excerpt_chars: 300,
        }
    }
}

/// At most `max` characters of `text`, with an ellipsis when cut.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

impl Templates {
    fn tip(&self, subject: Subject) -> &str {
        self.tips
            .get(subject.name())
            .or_else(|| self.tips.get(Subject::Unclassified.name()))
            .map_or("", String::as_str)
    }

    /// Deterministic answer built from the question, its subject and, when
    /// present, the best evidence item.
    pub fn render_fallback(&self, question: &str, subject: Subject, evidence: &[Evidence]) -> String {
        let template = if evidence.is_empty() { &self.no_evidence } else { &self.evidence };
        let excerpt = evidence.first().map(|e| truncate_chars(e.chunk.content.trim(), self.excerpt_chars)).unwrap_or_default();
        let mut sources: Vec<&str> = Vec::new();
        for source in evidence.iter().filter_map(|e| e.chunk.source()) {
            if !sources.contains(&source) {
                sources.push(source);
            }
        }
        template
            .replace("{question}", question.trim())
            .replace("{subject}", subject.label())
            .replace("{tip}", self.tip(subject))
            .replace("{excerpt}", &excerpt)
            .replace("{sources}", &sources.join(", "))
    }

    pub fn render_error(&self, question: &str) -> String {
        self.error.replace("{question}", question.trim())
    }
}
