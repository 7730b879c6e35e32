//! Anthropic Messages API client implementing [`Classifier`], [`Evaluator`],
//! and [`Compiler`] against a single Claude model. Parse/shape failures are
//! swallowed per the documented node failure modes; only the HTTP
//! round-trip itself is retried by the caller's worker-pool retry policy.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use threadloom_core::{Classification, CompiledArticle, Evaluation, RawMessage, GENERAL_LANGUAGE};

use crate::traits::{extract_json_object, format_thread, Classifier, Compiler, Evaluator};

const MESSAGES_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
const MODEL: &str = "claude-haiku-4-5-20251001";
const ANTHROPIC_VERSION: &str = "2023-06-01";

const CLASSIFIER_DEADLINE: Duration = Duration::from_secs(10);
const EVALUATOR_DEADLINE: Duration = Duration::from_secs(10);
const COMPILER_DEADLINE: Duration = Duration::from_secs(30);

const ROUTER_SYSTEM_PROMPT: &str = r#"You are a community discussion classifier. Analyze a conversation thread and classify it.

Categories:
- NOISE: spam, greetings, off-topic chat, memes, bot commands, self-promotion
- TROUBLESHOOTING: error/bug report with debugging discussion and fix (usually has code/stack traces)
- QUESTION_ANSWER: "How do I...?" question with a clear answer (code is optional)
- GUIDE: tutorial, walkthrough, architectural explanation, or step-by-step instructions
- DISCUSSION_SUMMARY: general discussion with valuable insights, multiple perspectives, but no single answer

Rules:
- If the thread has stack traces, error messages, or debugging -> TROUBLESHOOTING
- If someone asks "How to..." and gets a direct answer -> QUESTION_ANSWER
- If it reads like a tutorial or explanation -> GUIDE
- If multiple people share opinions/experiences with no single answer -> DISCUSSION_SUMMARY
- Greetings, jokes, < 2 substantive messages -> NOISE
- When uncertain, classify as QUESTION_ANSWER (broadest useful category)

Respond with JSON: {"classification": "CATEGORY", "reason": "one sentence"}"#;

const EVALUATOR_SYSTEM_PROMPT: &str = r#"You are evaluating a community discussion thread.

Analyze the thread and determine:
1. has_solution: Does anyone provide a concrete answer, solution, or explanation?
2. has_code: Is there a code snippet, config change, or command?
3. is_resolved: Did the original poster confirm it helped or is the answer clearly correct?
4. reasoning: Brief explanation (2-3 sentences).

Respond with ONLY a JSON object:
{
  "has_solution": true/false,
  "has_code": true/false,
  "is_resolved": true/false,
  "reasoning": "Brief explanation"
}"#;

fn compiler_system_prompt(article_type: &str) -> String {
    format!(
        r#"You are a knowledge compiler. Given a community discussion thread,
extract structured knowledge based on the article type.

ARTICLE TYPE: {article_type}

RULES:
- language: Use the primary programming language, or "general" if no code involved
- tags: 3-7 lowercase kebab-case tags for discoverability
- confidence: 0.9+ clear/confirmed, 0.7-0.9 good but gaps, 0.5-0.7 uncertain
- Do NOT hallucinate. Only extract what was ACTUALLY discussed.

Respond with ONLY a JSON object with fields: symptom, diagnosis, solution,
code_snippet (nullable), language, framework (nullable), tags (array),
confidence (0.0-1.0), thread_summary (<=100 chars), source_url (nullable)."#
    )
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: &'static str,
    max_tokens: u32,
    temperature: f32,
    system: String,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

/// Anthropic Messages API backed implementation of all three extraction
/// behaviors. API key is read once at construction from
/// `ANTHROPIC_API_KEY`.
pub struct AnthropicLlm {
    client: Client,
    api_key: String,
    api_url: String,
}

impl AnthropicLlm {
    pub fn new(api_key: impl Into<String>) -> Self {
        AnthropicLlm {
            client: Client::new(),
            api_key: api_key.into(),
            api_url: MESSAGES_ENDPOINT.to_string(),
        }
    }

    /// Points the client at a different endpoint. Exists so tests can swap
    /// in a mock server; production callers never need it.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Returns `None` when `ANTHROPIC_API_KEY` is unset, so the caller can
    /// disable the classifier/evaluator/compiler subsystem rather than
    /// abort the process.
    pub fn from_env() -> Option<Self> {
        std::env::var("ANTHROPIC_API_KEY").ok().map(Self::new)
    }

    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
        deadline: Duration,
    ) -> Option<String> {
        let request = AnthropicRequest {
            model: MODEL,
            max_tokens,
            temperature: 0.0,
            system: system_prompt.to_string(),
            messages: vec![AnthropicMessage {
                role: "user",
                content: user_prompt.to_string(),
            }],
        };

        let call = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send();

        let response = match tokio::time::timeout(deadline, call).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "llm_request_failed");
                return None;
            }
            Err(_) => {
                tracing::warn!(deadline_secs = deadline.as_secs(), "llm_request_timed_out");
                return None;
            }
        };

        let response = match response.error_for_status() {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "llm_request_rejected");
                return None;
            }
        };

        match response.json::<AnthropicResponse>().await {
            Ok(body) => body.content.into_iter().next().map(|b| b.text),
            Err(e) => {
                tracing::warn!(error = %e, "llm_response_malformed");
                None
            }
        }
    }
}

#[async_trait]
impl Classifier for AnthropicLlm {
    async fn classify(&self, thread: &[RawMessage]) -> Classification {
        let formatted = format_thread(thread);
        let user_prompt = format!("Classify this thread:\n\n{formatted}");
        let Some(text) = self
            .complete(ROUTER_SYSTEM_PROMPT, &user_prompt, 150, CLASSIFIER_DEADLINE)
            .await
        else {
            return Classification::QuestionAnswer;
        };

        let upper = text.trim().to_uppercase();
        for label in [
            "NOISE",
            "TROUBLESHOOTING",
            "QUESTION_ANSWER",
            "GUIDE",
            "DISCUSSION_SUMMARY",
        ] {
            if upper.contains(label) {
                return Classification::parse_lenient(label);
            }
        }
        Classification::QuestionAnswer
    }
}

#[async_trait]
impl Evaluator for AnthropicLlm {
    async fn evaluate(&self, thread: &[RawMessage]) -> Evaluation {
        let formatted = format_thread(thread);
        let user_prompt = format!("Evaluate this thread:\n\n{formatted}");
        let Some(text) = self
            .complete(EVALUATOR_SYSTEM_PROMPT, &user_prompt, 300, EVALUATOR_DEADLINE)
            .await
        else {
            return Evaluation::all_false("model provider call failed");
        };
        parse_evaluation(&text)
    }
}

fn parse_evaluation(text: &str) -> Evaluation {
    let json_str = extract_json_object(text).unwrap_or(text);
    match serde_json::from_str::<Value>(json_str) {
        Ok(data) => Evaluation::new(
            data.get("has_solution").and_then(Value::as_bool).unwrap_or(false),
            data.get("has_code").and_then(Value::as_bool).unwrap_or(false),
            data.get("is_resolved").and_then(Value::as_bool).unwrap_or(false),
            data.get("reasoning")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        ),
        Err(_) => {
            let prefix: String = text.chars().take(200).collect();
            Evaluation::all_false(format!("failed to parse model response: {prefix}"))
        }
    }
}

#[async_trait]
impl Compiler for AnthropicLlm {
    async fn compile(
        &self,
        thread: &[RawMessage],
        article_type: Classification,
    ) -> Option<CompiledArticle> {
        let formatted = format_thread(thread);
        let system = compiler_system_prompt(article_type.as_str());
        let user_prompt = format!("Compile this thread:\n\n{formatted}");
        let text = self
            .complete(&system, &user_prompt, 1500, COMPILER_DEADLINE)
            .await?;
        let json_str = extract_json_object(&text)?;
        let data: Value = serde_json::from_str(json_str).ok()?;

        let article = CompiledArticle {
            article_type,
            symptom: data.get("symptom")?.as_str()?.to_string(),
            diagnosis: data.get("diagnosis")?.as_str()?.to_string(),
            solution: data.get("solution")?.as_str()?.to_string(),
            code_snippet: data.get("code_snippet").and_then(Value::as_str).map(str::to_string),
            language: data
                .get("language")
                .and_then(Value::as_str)
                .unwrap_or(GENERAL_LANGUAGE)
                .to_string(),
            framework: data.get("framework").and_then(Value::as_str).map(str::to_string),
            tags: data
                .get("tags")
                .and_then(Value::as_array)
                .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                .unwrap_or_default(),
            confidence: data.get("confidence").and_then(Value::as_f64).unwrap_or(0.0),
            thread_summary: data
                .get("thread_summary")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            source_url: data.get("source_url").and_then(Value::as_str).map(str::to_string),
        };

        if article.validate().is_err() {
            tracing::warn!("compiler_produced_invalid_article");
            return None;
        }

        tracing::info!(
            article_type = article_type.as_str(),
            confidence = article.confidence,
            "compiler_success"
        );
        Some(article)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_evaluation_all_false_on_garbage() {
        let e = parse_evaluation("not json at all");
        assert!(!e.has_solution && !e.has_code && !e.is_resolved);
    }

    #[test]
    fn parse_evaluation_reads_fields() {
        let e = parse_evaluation(r#"{"has_solution": true, "has_code": false, "is_resolved": true, "reasoning": "ok"}"#);
        assert!(e.has_solution);
        assert!(e.is_resolved);
    }

    #[test]
    fn parse_evaluation_resolved_requires_solution() {
        let e = parse_evaluation(r#"{"has_solution": false, "is_resolved": true}"#);
        assert!(!e.is_resolved);
    }
}
