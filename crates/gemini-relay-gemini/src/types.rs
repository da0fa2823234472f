//! Gemini `generateContent` wire types.

use gemini_relay_core::{Candidate, CompletionChunk, Part};
use serde::{Deserialize, Serialize};

/// Request body for `streamGenerateContent`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<RequestContent>,
}

impl GenerateContentRequest {
    /// Single user turn holding one text part.
    #[must_use]
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            contents: vec![RequestContent {
                role: "user".to_string(),
                parts: vec![RequestPart { text: text.into() }],
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestContent {
    pub role: String,
    pub parts: Vec<RequestPart>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestPart {
    pub text: String,
}

/// One streamed response unit.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<ResponseCandidate>,
    pub prompt_feedback: Option<PromptFeedback>,
    pub usage_metadata: Option<UsageMetadata>,
    /// Present when the API reports a failure inside the stream.
    pub error: Option<ApiError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseCandidate {
    pub content: Option<ResponseContent>,
    pub finish_reason: Option<String>,
    pub index: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
    pub role: Option<String>,
}

/// Content part; only text parts are relayed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    pub prompt_token_count: Option<u32>,
    pub candidates_token_count: Option<u32>,
    pub total_token_count: Option<u32>,
}

/// Error object returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub code: Option<u16>,
    #[serde(default)]
    pub message: String,
    pub status: Option<String>,
}

/// Body of a non-2xx response.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: ApiError,
}

impl From<GenerateContentResponse> for CompletionChunk {
    fn from(response: GenerateContentResponse) -> Self {
        Self {
            candidates: response
                .candidates
                .into_iter()
                .map(|candidate| Candidate {
                    parts: candidate
                        .content
                        .map(|content| content.parts)
                        .unwrap_or_default()
                        .into_iter()
                        .map(|part| Part { text: part.text })
                        .collect(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let json = serde_json::to_value(GenerateContentRequest::user_text("hi")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"contents": [{"role": "user", "parts": [{"text": "hi"}]}]})
        );
    }

    #[test]
    fn test_text_response_converts() {
        let raw = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "Hel"}, {"text": "lo"}], "role": "model"},
                "finishReason": "STOP",
                "index": 0
            }],
            "usageMetadata": {"promptTokenCount": 3, "candidatesTokenCount": 2, "totalTokenCount": 5}
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.candidates[0].finish_reason.as_deref(), Some("STOP"));
        assert_eq!(response.usage_metadata.unwrap().total_token_count, Some(5));

        let chunk = CompletionChunk::from(response);
        let fragments: Vec<String> = chunk.into_fragments().collect();
        assert_eq!(fragments, vec!["Hel", "lo"]);
    }

    #[test]
    fn test_blocked_prompt_has_no_candidates() {
        let raw = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let response: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            response.prompt_feedback.as_ref().unwrap().block_reason.as_deref(),
            Some("SAFETY")
        );

        let chunk = CompletionChunk::from(response);
        assert!(!chunk.has_content());
    }

    #[test]
    fn test_candidate_without_content() {
        let raw = r#"{"candidates": [{"finishReason": "SAFETY", "index": 0}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        let chunk = CompletionChunk::from(response);
        assert!(chunk.has_content());
        assert_eq!(chunk.into_fragments().count(), 0);
    }

    #[test]
    fn test_non_text_part_is_kept_without_text() {
        let raw = r#"{"candidates": [{"content": {"parts": [{"functionCall": {"name": "f"}}, {"text": "ok"}]}}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        let fragments: Vec<String> = CompletionChunk::from(response).into_fragments().collect();
        assert_eq!(fragments, vec!["ok"]);
    }

    #[test]
    fn test_error_response() {
        let raw = r#"{"error": {"code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED"}}"#;
        let parsed: ErrorResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.error.code, Some(429));
        assert_eq!(parsed.error.status.as_deref(), Some("RESOURCE_EXHAUSTED"));
    }
}
