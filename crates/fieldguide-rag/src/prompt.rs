//! Prompt assembly for the retrieval chain.

use fieldguide_core::{base_name, Chunk};

/// Build the system prompt for manual Q&A.
pub fn build_system_prompt() -> String {
    r#"You are a helpful assistant for field engineers. You answer questions about installation and maintenance manuals using the provided excerpts.

Guidelines:
- Base your answers on the context provided
- If the context doesn't contain the answer, say that you don't know
- Be concise but thorough; give steps in order when the manual does
- When relevant, mention the document and page your answer is based on
- Do not make up values, part numbers, or procedures not present in the context"#
        .to_string()
}

/// Build the answer prompt: prior conversation, numbered context, then the question.
pub fn build_rag_prompt(question: &str, history: &str, context: &[Chunk]) -> String {
    let mut prompt = String::new();

    if !history.is_empty() {
        prompt.push_str("Conversation so far:\n");
        prompt.push_str(history);
        prompt.push_str("\n\n");
    }

    prompt.push_str("Use the following context to answer the question. If the context doesn't contain relevant information, say so.\n\n");
    prompt.push_str("Context:\n");
    prompt.push_str("─────────────────────────────────────\n");

    if context.is_empty() {
        prompt.push_str("\n(no matching excerpts)\n");
    }
    for (i, chunk) in context.iter().enumerate() {
        prompt.push_str(&format!(
            "\n[{}] From: {}, page {}\n",
            i + 1,
            base_name(&chunk.source),
            chunk.page
        ));
        prompt.push_str(&chunk.text);
        prompt.push('\n');
    }

    prompt.push_str("\n─────────────────────────────────────\n\n");
    prompt.push_str(&format!("Question: {}\n\n", question));
    prompt.push_str("Answer:");

    prompt
}

/// Ask the model to turn a follow-up into a question that stands on its own.
pub fn build_condense_prompt(question: &str, history: &str) -> String {
    format!(
        "Given the following conversation and a follow up question, rephrase the follow up question to be a standalone question, in its original language. Reply with the question only.\n\nChat History:\n{}\nFollow Up Input: {}\nStandalone question:",
        history, question
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_rag_prompt() {
        let context = vec![
            Chunk::new("docs/compressor_user_manual.pdf", 2, 0, 0, "Drain the tank daily."),
            Chunk::new("docs/compressor_user_manual.pdf", 7, 1, 2350, "Torque bolts to 25 Nm."),
        ];

        let prompt = build_rag_prompt("How often do I drain the tank?", "", &context);

        assert!(prompt.contains("[1] From: compressor_user_manual.pdf, page 2"));
        assert!(prompt.contains("[2] From: compressor_user_manual.pdf, page 7"));
        assert!(prompt.contains("Torque bolts to 25 Nm."));
        assert!(prompt.ends_with("Question: How often do I drain the tank?\n\nAnswer:"));
        assert!(!prompt.contains("Conversation so far"));
    }

    #[test]
    fn test_history_precedes_context() {
        let prompt = build_rag_prompt("And weekly?", "Human: q\nAssistant: a", &[]);
        let history_at = prompt.find("Human: q").unwrap();
        let context_at = prompt.find("Context:").unwrap();

        assert!(history_at < context_at);
        assert!(prompt.contains("(no matching excerpts)"));
    }

    #[test]
    fn test_condense_prompt() {
        let prompt = build_condense_prompt("What about the filter?", "Human: How do I clean it?");
        assert!(prompt.contains("Follow Up Input: What about the filter?"));
        assert!(prompt.ends_with("Standalone question:"));
    }
}
