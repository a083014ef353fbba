use tutor_core::Evidence;

use crate::templates::truncate_chars;

/// `[Source: name]` blocks for the best `max_docs` evidence items, each cut
/// to `max_chars` characters.
pub fn build_context(evidence: &[Evidence], max_docs: usize, max_chars: usize) -> String {
    evidence
        .iter()
        .take(max_docs)
        .enumerate()
        .map(|(i, e)| {
            let source = e.chunk.source().map_or_else(|| format!("Document {}", i + 1), str::to_string);
            format!("[Source: {source}]\n{}", truncate_chars(e.chunk.content.trim(), max_chars))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn build_prompt(question: &str, context: &str) -> String {
    format!(
        "You are an experienced, patient teacher. A student asks a question and you have access to course documents.\n\n\
         COURSE DOCUMENTS:\n{context}\n\n\
         STUDENT QUESTION:\n{question}\n\n\
         INSTRUCTIONS:\n\
         - Answer clearly and pedagogically\n\
         - Use the information in the documents above\n\
         - Give concrete examples when possible\n\
         - Structure the answer with headings if needed\n\
         - Stay precise and factual\n\n\
         COMPLETE ANSWER:"
    )
}

/// Trim model output; long unstructured answers get a heading.
pub fn clean_response(text: &str) -> String {
    let text = text.trim();
    if !text.starts_with("**") && text.chars().count() > 100 && text.lines().count() > 2 {
        format!("**EXPLANATION**\n\n{text}")
    } else {
        text.to_string()
    }
}
