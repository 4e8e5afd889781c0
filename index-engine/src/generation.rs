use async_openai::{
    error::OpenAIError,
    types::{
        ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
        CreateChatCompletionResponse,
    },
};
use serde_json::Value;

use common::error::AppError;

use crate::engine::RetrievedChunk;

const QA_SYSTEM_PROMPT: &str = "You are a question answering assistant. \
    Answer the user's question using only the provided context excerpts. \
    If the context does not contain the answer, say so plainly.";

pub(crate) fn chunks_to_context(chunks: &[RetrievedChunk]) -> Value {
    fn round_score(value: f64) -> f64 {
        (value * 1000.0).round() / 1000.0
    }

    serde_json::json!(chunks
        .iter()
        .map(|chunk| {
            serde_json::json!({
                "source": chunk.file_name,
                "content": chunk.chunk,
                "score": round_score(chunk.similarity()),
            })
        })
        .collect::<Vec<_>>())
}

pub(crate) fn create_user_message(context_json: &Value, query: &str) -> String {
    format!(
        r"
        Context Information:
        ==================
        {context_json}

        User Question:
        ==================
        {query}
        "
    )
}

pub(crate) fn create_chat_request(
    user_message: String,
    model: &str,
) -> Result<CreateChatCompletionRequest, OpenAIError> {
    CreateChatCompletionRequestArgs::default()
        .model(model)
        .messages([
            ChatCompletionRequestSystemMessage::from(QA_SYSTEM_PROMPT).into(),
            ChatCompletionRequestUserMessage::from(user_message).into(),
        ])
        .build()
}

pub(crate) fn extract_answer_text(
    response: &CreateChatCompletionResponse,
) -> Result<String, AppError> {
    response
        .choices
        .first()
        .and_then(|choice| choice.message.content.clone())
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| AppError::Engine("no content found in model response".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(file_name: &str, text: &str, distance: f64) -> RetrievedChunk {
        RetrievedChunk {
            chunk: text.to_string(),
            document_id: "doc-1".to_string(),
            file_name: file_name.to_string(),
            distance,
        }
    }

    #[test]
    fn context_carries_source_and_rounded_score() {
        let context = chunks_to_context(&[chunk("sky.txt", "The sky is blue.", 0.1234)]);

        let entries = context.as_array().expect("context should be an array");
        assert_eq!(entries.len(), 1);
        let entry = entries.first().expect("missing entry");
        assert_eq!(entry["source"], "sky.txt");
        assert_eq!(entry["content"], "The sky is blue.");
        assert_eq!(entry["score"], 0.877);
    }

    #[test]
    fn user_message_embeds_context_and_question() {
        let context = chunks_to_context(&[chunk("sky.txt", "The sky is blue.", 0.0)]);
        let message = create_user_message(&context, "What color is the sky?");

        assert!(message.contains("The sky is blue."));
        assert!(message.contains("What color is the sky?"));
    }

    #[test]
    fn chat_request_targets_the_configured_model() {
        let request =
            create_chat_request("question".to_string(), "gpt-4o-mini").expect("build failed");
        assert_eq!(request.model, "gpt-4o-mini");
        assert_eq!(request.messages.len(), 2);
    }
}
