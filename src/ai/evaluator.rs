use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::ai::providers::{Provider, RUBRIC_MAX_TOKENS};

/// Outcome of the rubric evaluation. Failure is carried as data; the caller
/// never sees an Err from this layer.
#[derive(Debug, Serialize)]
pub struct Evaluation {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rubric: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluator_used: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Fixed judging template: five criteria scored 1-10 plus strengths,
/// weaknesses, an overall comparison and a recommendation, returned as JSON.
pub fn rubric_prompt(prompt: &str, response_a: &str, response_b: &str) -> String {
    format!(
        r#"You are an expert AI evaluator. Compare these two AI responses to the same prompt and provide a detailed evaluation.

Original Prompt: {prompt}

Response A (Groq/Llama 3.3): {response_a}

Response B (Gemini): {response_b}

Please evaluate both responses using the following rubric (score each criterion from 1-10):

1. **Accuracy**: How factually correct and reliable is the information?
2. **Relevance**: How well does it address the prompt?
3. **Clarity**: How clear and easy to understand is the response?
4. **Completeness**: How thorough and comprehensive is the answer?
5. **Usefulness**: How practical and helpful is the response?

Provide your evaluation in the following JSON format:
{{
    "response_a": {{
        "accuracy": <score>,
        "relevance": <score>,
        "clarity": <score>,
        "completeness": <score>,
        "usefulness": <score>,
        "total": <sum of all scores>,
        "strengths": ["strength 1", "strength 2"],
        "weaknesses": ["weakness 1", "weakness 2"]
    }},
    "response_b": {{
        "accuracy": <score>,
        "relevance": <score>,
        "clarity": <score>,
        "completeness": <score>,
        "usefulness": <score>,
        "total": <sum of all scores>,
        "strengths": ["strength 1", "strength 2"],
        "weaknesses": ["weakness 1", "weakness 2"]
    }},
    "overall_comparison": "Brief summary of which is better and why",
    "recommendation": "Which response would you recommend and why?"
}}"#
    )
}

/// Judge models often wrap their JSON in a fenced code block; strip the fence
/// before parsing.
fn strip_code_fence(text: &str) -> &str {
    let inner = if let Some((_, rest)) = text.split_once("```json") {
        rest.split("```").next().unwrap_or(rest)
    } else if let Some((_, rest)) = text.split_once("```") {
        rest.split("```").next().unwrap_or(rest)
    } else {
        text
    };
    inner.trim()
}

/// Parse judge output as JSON. Valid JSON missing expected rubric keys is
/// passed through as-is; only parseability is enforced here.
pub fn parse_rubric(text: &str) -> anyhow::Result<Value> {
    let rubric = serde_json::from_str(strip_code_fence(text))?;
    Ok(rubric)
}

async fn judge(provider: &dyn Provider, rubric_prompt: &str) -> anyhow::Result<Value> {
    let text = provider.complete(rubric_prompt, RUBRIC_MAX_TOKENS).await?;
    parse_rubric(&text)
}

/// Ask the primary judge to score both responses; on any failure (network,
/// missing credential, malformed JSON) retry once via the fallback judge.
pub async fn evaluate(
    primary: &dyn Provider,
    fallback: &dyn Provider,
    prompt: &str,
    response_a: &str,
    response_b: &str,
) -> Evaluation {
    let comparison_prompt = rubric_prompt(prompt, response_a, response_b);

    match judge(primary, &comparison_prompt).await {
        Ok(rubric) => {
            return Evaluation {
                success: true,
                rubric: Some(rubric),
                evaluator_used: Some(primary.judge_label()),
                error: None,
                details: None,
            };
        }
        Err(e) => {
            warn!(judge = primary.name(), error = %e, "rubric generation failed, trying fallback");
        }
    }

    match judge(fallback, &comparison_prompt).await {
        Ok(rubric) => Evaluation {
            success: true,
            rubric: Some(rubric),
            evaluator_used: Some(fallback.judge_label()),
            error: None,
            details: None,
        },
        Err(e) => {
            warn!(judge = fallback.name(), error = %e, "fallback rubric generation failed");
            Evaluation {
                success: false,
                rubric: None,
                evaluator_used: None,
                error: Some("Failed to generate comparison rubric"),
                details: Some(e.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FakeJudge {
        name: &'static str,
        label: &'static str,
        reply: anyhow::Result<String>,
    }

    impl FakeJudge {
        fn ok(name: &'static str, label: &'static str, reply: &str) -> Self {
            Self {
                name,
                label,
                reply: Ok(reply.to_string()),
            }
        }
        fn failing(name: &'static str, label: &'static str) -> Self {
            Self {
                name,
                label,
                reply: Err(anyhow::anyhow!("upstream unavailable")),
            }
        }
    }

    #[async_trait]
    impl Provider for FakeJudge {
        fn name(&self) -> &'static str {
            self.name
        }
        fn judge_label(&self) -> &'static str {
            self.label
        }
        async fn complete(&self, _prompt: &str, _max_tokens: u32) -> anyhow::Result<String> {
            match &self.reply {
                Ok(s) => Ok(s.clone()),
                Err(e) => Err(anyhow::anyhow!(e.to_string())),
            }
        }
    }

    #[test]
    fn strips_json_tagged_fence() {
        let text = "Here you go:\n```json\n{\"recommendation\": \"A\"}\n```\nDone.";
        assert_eq!(strip_code_fence(text), "{\"recommendation\": \"A\"}");
    }

    #[test]
    fn strips_plain_fence() {
        let text = "```\n{\"recommendation\": \"B\"}\n```";
        assert_eq!(strip_code_fence(text), "{\"recommendation\": \"B\"}");
    }

    #[test]
    fn leaves_unfenced_text_alone() {
        assert_eq!(strip_code_fence("  {\"a\": 1}  "), "{\"a\": 1}");
    }

    #[test]
    fn parse_rubric_accepts_fenced_json() {
        let rubric = parse_rubric("```json\n{\"response_a\": {\"total\": 42}}\n```").unwrap();
        assert_eq!(rubric["response_a"]["total"], 42);
    }

    #[test]
    fn parse_rubric_passes_through_missing_keys() {
        // Valid JSON without the expected rubric shape is not re-validated.
        let rubric = parse_rubric("{\"unexpected\": true}").unwrap();
        assert_eq!(rubric["unexpected"], true);
    }

    #[test]
    fn parse_rubric_rejects_non_json() {
        assert!(parse_rubric("I think response A is better.").is_err());
    }

    #[test]
    fn prompt_embeds_inputs_and_criteria() {
        let p = rubric_prompt("2+2?", "four", "4");
        assert!(p.contains("Original Prompt: 2+2?"));
        assert!(p.contains("Response A (Groq/Llama 3.3): four"));
        assert!(p.contains("Response B (Gemini): 4"));
        for criterion in ["Accuracy", "Relevance", "Clarity", "Completeness", "Usefulness"] {
            assert!(p.contains(criterion), "missing criterion {criterion}");
        }
        assert!(p.contains("\"overall_comparison\""));
        assert!(p.contains("\"recommendation\""));
    }

    #[tokio::test]
    async fn primary_judge_success_skips_fallback() {
        let primary = FakeJudge::ok(
            "Gemini",
            "Gemini Flash",
            "```json\n{\"overall_comparison\": \"tie\"}\n```",
        );
        let fallback = FakeJudge::failing("Groq", "Groq Llama 3.3");
        let eval = evaluate(&primary, &fallback, "p", "a", "b").await;
        assert!(eval.success);
        assert_eq!(eval.evaluator_used, Some("Gemini Flash"));
        assert_eq!(eval.rubric.unwrap()["overall_comparison"], "tie");
    }

    #[tokio::test]
    async fn falls_back_when_primary_fails() {
        let primary = FakeJudge::failing("Gemini", "Gemini Flash");
        let fallback = FakeJudge::ok("Groq", "Groq Llama 3.3", "{\"recommendation\": \"B\"}");
        let eval = evaluate(&primary, &fallback, "p", "a", "b").await;
        assert!(eval.success);
        assert_eq!(eval.evaluator_used, Some("Groq Llama 3.3"));
    }

    #[tokio::test]
    async fn falls_back_when_primary_returns_malformed_json() {
        let primary = FakeJudge::ok("Gemini", "Gemini Flash", "response A wins, no JSON here");
        let fallback = FakeJudge::ok("Groq", "Groq Llama 3.3", "{\"recommendation\": \"A\"}");
        let eval = evaluate(&primary, &fallback, "p", "a", "b").await;
        assert!(eval.success);
        assert_eq!(eval.evaluator_used, Some("Groq Llama 3.3"));
    }

    #[tokio::test]
    async fn reports_failure_when_both_judges_fail() {
        let primary = FakeJudge::failing("Gemini", "Gemini Flash");
        let fallback = FakeJudge::failing("Groq", "Groq Llama 3.3");
        let eval = evaluate(&primary, &fallback, "p", "a", "b").await;
        assert!(!eval.success);
        assert!(eval.rubric.is_none());
        assert!(eval.evaluator_used.is_none());
        assert_eq!(eval.error, Some("Failed to generate comparison rubric"));
        assert!(eval.details.unwrap().contains("upstream unavailable"));
    }
}
