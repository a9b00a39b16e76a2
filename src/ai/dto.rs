use serde::{Deserialize, Serialize};

use crate::ai::evaluator::Evaluation;
use crate::ai::providers::ProviderResult;
use crate::error::ApiError;

/// Body for every AI-facing endpoint. The prompt is optional at the serde
/// layer so a missing key becomes a 400 rather than a deserialization error.
#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    pub prompt: Option<String>,
}

impl PromptRequest {
    /// A blank prompt counts as missing.
    pub fn into_prompt(self) -> Result<String, ApiError> {
        self.prompt
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| ApiError::validation("Prompt is required"))
    }
}

#[derive(Debug, Serialize)]
pub struct CompareResponse {
    pub groq: ProviderResult,
    pub gemini: ProviderResult,
}

#[derive(Debug, Serialize)]
pub struct RubricCompareResponse {
    pub prompt: String,
    pub responses: CompareResponse,
    pub evaluation: Evaluation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_prompt_is_rejected() {
        let req: PromptRequest = serde_json::from_str("{}").unwrap();
        assert!(req.into_prompt().is_err());
    }

    #[test]
    fn blank_prompt_is_rejected() {
        let req: PromptRequest = serde_json::from_str(r#"{"prompt":"   "}"#).unwrap();
        assert!(req.into_prompt().is_err());
    }

    #[test]
    fn present_prompt_passes_through() {
        let req: PromptRequest = serde_json::from_str(r#"{"prompt":"2+2?"}"#).unwrap();
        assert_eq!(req.into_prompt().unwrap(), "2+2?");
    }
}
