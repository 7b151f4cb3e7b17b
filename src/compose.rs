//! Prompt assembly and answer generation.

use anyhow::Result;

use crate::llm::LanguageModel;
use crate::models::RetrievalResult;

/// Built-in prompt; `{context}` and `{question}` are substituted.
pub const PROMPT_TEMPLATE: &str = "
Answer the question based only on the following context:
{context}
 - -
Answer the question based on the above context: {question}
";

/// Separator placed between retrieved chunks in the context block.
pub const CONTEXT_DELIMITER: &str = "\n\n - -\n\n";

/// Join chunk texts in retrieval order.
pub fn build_context(results: &[RetrievalResult]) -> String {
    results
        .iter()
        .map(|r| r.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_DELIMITER)
}

/// Substitute both placeholders in one pass, so placeholder-like text inside
/// the context or question is left untouched.
pub fn fill_prompt(template: &str, context: &str, question: &str) -> String {
    let mut out = String::with_capacity(template.len() + context.len() + question.len());
    let mut rest = template;

    loop {
        let next_context = rest.find("{context}").map(|i| (i, "{context}", context));
        let next_question = rest.find("{question}").map(|i| (i, "{question}", question));
        let next = match (next_context, next_question) {
            (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
            (a, b) => a.or(b),
        };

        match next {
            Some((index, placeholder, value)) => {
                out.push_str(&rest[..index]);
                out.push_str(value);
                rest = &rest[index + placeholder.len()..];
            }
            None => {
                out.push_str(rest);
                return out;
            }
        }
    }
}

/// Build the prompt from `results` and `question`, and return the model's raw output.
pub async fn compose_answer(
    model: &dyn LanguageModel,
    template: &str,
    results: &[RetrievalResult],
    question: &str,
) -> Result<String> {
    let context = build_context(results);
    let prompt = fill_prompt(template, &context, question);
    tracing::debug!(
        model = model.model_name(),
        context_chunks = results.len(),
        prompt_chars = prompt.len(),
        "generating answer"
    );
    model.generate(&prompt).await
}
