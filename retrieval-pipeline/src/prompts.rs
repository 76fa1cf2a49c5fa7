/// System prompt for retrieval-grounded question answering.
pub const MOVIE_ANALYST_SYSTEM_PROMPT: &str = "You are a movie analyst AI. \
Using the provided movie dialogue context, answer the user's question \
conversationally. Ground every claim in the context; if the context does \
not contain the answer, say so instead of inventing plot details.";

/// System prompt for per-chunk summary narration. Each chunk is narrated
/// independently, so the prompt asks for seamless continuation.
pub const NARRATOR_SYSTEM_PROMPT: &str = "You are narrating a movie for a \
film summary service. Narrate this part of the movie as an expert \
storyteller, focusing on the key plot points. The text may continue from \
an earlier part of the movie, so keep the narration natural and seamless. \
Respond with the narration text only.";

/// Formats the retrieved context and question into one user message.
pub fn create_user_message(context: &str, question: &str) -> String {
    format!(
        r#"
        Context Information:
        ==================
        {context}

        User Question:
        ==================
        {question}
        "#
    )
}
