/// Returned verbatim whenever the page does not contain the answer.
pub const NOT_FOUND_ANSWER: &str = "The answer is not available on the provided website.";

pub const SYSTEM_PROMPT: &str = "You are an AI assistant answering questions strictly \
based on the provided website content.

Rules you must follow:
1. Use ONLY the information given in the context.
2. Do NOT use external knowledge.
3. Do NOT guess or hallucinate.
4. If the answer is not present in the context, respond exactly with:

\"The answer is not available on the provided website.\"";

#[must_use]
pub fn build_user_prompt(context: &str, question: &str) -> String {
    format!("Website Content:\n{context}\n\nUser Question:\n{question}\n\nAnswer:")
}
