//! Evaluator client: question generation, answer feedback, and ideal
//! answers, backed by an OpenAI-compatible chat-completions endpoint.

use std::env;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::EvaluatorError;

/// Parameters describing the interview a question set is generated for.
///
/// `profile` and `level` are always present; everything else narrows the
/// prompt when the user filled it in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationRequest {
    pub profile: String,
    pub level: String,
    pub skills: Option<String>,
    pub interview_type: Option<String>,
    pub language: Option<String>,
    pub target_company: Option<String>,
    pub focus_topics: Option<String>,
}

impl GenerationRequest {
    #[must_use]
    pub fn new(profile: impl Into<String>, level: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
            level: level.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_skills(mut self, skills: impl Into<String>) -> Self {
        self.skills = Some(skills.into());
        self
    }

    #[must_use]
    pub fn with_interview_type(mut self, interview_type: impl Into<String>) -> Self {
        self.interview_type = Some(interview_type.into());
        self
    }

    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    #[must_use]
    pub fn with_target_company(mut self, company: impl Into<String>) -> Self {
        self.target_company = Some(company.into());
        self
    }

    #[must_use]
    pub fn with_focus_topics(mut self, topics: impl Into<String>) -> Self {
        self.focus_topics = Some(topics.into());
        self
    }
}

/// Client for the model that writes questions, feedback, and ideal answers.
///
/// Implementations return plain text; score extraction from feedback is the
/// caller's concern.
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Evaluate the user's answer to `question`. The returned feedback is
    /// expected, not guaranteed, to end with a `Score: N` line.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluatorError`] if the request fails or the response is
    /// empty.
    async fn evaluate(&self, question: &str, answer: &str) -> Result<String, EvaluatorError>;

    /// Produce a model answer for a question the user skipped.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluatorError`] if the request fails or the response is
    /// empty.
    async fn ideal_answer(&self, question: &str) -> Result<String, EvaluatorError>;

    /// Generate the question set for an interview, one question per entry,
    /// already stripped of list markers.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluatorError`] if the request fails or the response is
    /// empty.
    async fn generate_questions(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<String>, EvaluatorError>;
}

/// Configuration for the HTTP evaluator, resolved from environment
/// variables.
#[derive(Clone, Debug)]
pub struct EvaluatorConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl EvaluatorConfig {
    /// Reads `REHEARSE_AI_API_KEY`, `REHEARSE_AI_BASE_URL`, and
    /// `REHEARSE_AI_MODEL`. Returns `None` when no usable API key is set,
    /// which leaves the evaluator disabled.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("REHEARSE_AI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url = env::var("REHEARSE_AI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let model =
            env::var("REHEARSE_AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        Some(Self {
            base_url,
            api_key,
            model,
        })
    }
}

/// [`Evaluator`] backed by an OpenAI-compatible chat-completions API.
#[derive(Clone)]
pub struct HttpEvaluator {
    client: Client,
    config: Option<EvaluatorConfig>,
}

impl HttpEvaluator {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(EvaluatorConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<EvaluatorConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Whether a configuration was provided. When `false`, every call
    /// returns [`EvaluatorError::Disabled`].
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    async fn chat(&self, prompt: String) -> Result<String, EvaluatorError> {
        let config = self.config.as_ref().ok_or(EvaluatorError::Disabled)?;

        let url = format!(
            "{}/chat/completions",
            config.base_url.trim_end_matches('/')
        );
        let payload = ChatRequest {
            model: config.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.2,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(EvaluatorError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(EvaluatorError::EmptyResponse)?;

        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(EvaluatorError::EmptyResponse);
        }
        Ok(trimmed.to_string())
    }
}

#[async_trait]
impl Evaluator for HttpEvaluator {
    async fn evaluate(&self, question: &str, answer: &str) -> Result<String, EvaluatorError> {
        self.chat(format!(
            "You are an interview coach. Evaluate the candidate's answer.\n\n\
             Question: {question}\n\
             Answer: {answer}\n\n\
             Give short, concrete feedback, then a final line formatted exactly \
             as `Score: N` where N is a whole number from 0 to 10."
        ))
        .await
    }

    async fn ideal_answer(&self, question: &str) -> Result<String, EvaluatorError> {
        self.chat(format!(
            "You are an interview coach. The candidate skipped this question.\n\n\
             Question: {question}\n\n\
             Write a model answer they can learn from. Do not include a score."
        ))
        .await
    }

    async fn generate_questions(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<String>, EvaluatorError> {
        let text = self.chat(generation_prompt(request)).await?;
        Ok(parse_question_list(&text))
    }
}

fn generation_prompt(request: &GenerationRequest) -> String {
    let mut prompt = format!(
        "Write interview questions for a {} candidate at the {} level.",
        request.profile, request.level
    );
    if let Some(interview_type) = &request.interview_type {
        prompt.push_str(&format!(" The interview format is: {interview_type}."));
    }
    if let Some(skills) = &request.skills {
        prompt.push_str(&format!(" Focus on these skills: {skills}."));
    }
    if let Some(topics) = &request.focus_topics {
        prompt.push_str(&format!(" Emphasize these topics: {topics}."));
    }
    if let Some(company) = &request.target_company {
        prompt.push_str(&format!(
            " Tailor the questions to an interview at {company}."
        ));
    }
    if let Some(language) = &request.language {
        prompt.push_str(&format!(" Write the questions in {language}."));
    }
    prompt.push_str(" Return one question per line, numbered.");
    prompt
}

/// Splits model output into one question per line, dropping blank lines and
/// stripping bullet markers and numeric prefixes such as `1.`, `2)`, or
/// `3 -`.
#[must_use]
pub fn parse_question_list(text: &str) -> Vec<String> {
    text.lines().filter_map(clean_question_line).collect()
}

fn clean_question_line(line: &str) -> Option<String> {
    let mut rest = line.trim();
    while let Some(stripped) = rest.strip_prefix(['-', '*', '\u{2022}']) {
        rest = stripped.trim_start();
    }
    let digits = rest.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let after = rest[digits..].trim_start();
        if let Some(stripped) = after.strip_prefix(['.', ')', ':', '-']) {
            rest = stripped.trim_start();
        }
    }
    if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    }
}

// ─── REQUEST/RESPONSE DTOS ─────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numbered_question_lists() {
        let text = "1. Tell me about yourself\n2) Why this role?\n3 - Describe a conflict";
        assert_eq!(
            parse_question_list(text),
            vec![
                "Tell me about yourself",
                "Why this role?",
                "Describe a conflict",
            ]
        );
    }

    #[test]
    fn strips_bullets_and_blank_lines() {
        let text = "- First question\n\n* Second question\n\u{2022} Third question\n   \n";
        assert_eq!(
            parse_question_list(text),
            vec!["First question", "Second question", "Third question"]
        );
    }

    #[test]
    fn keeps_lines_that_merely_start_with_a_number() {
        let text = "5 habits interviewers look for?";
        assert_eq!(
            parse_question_list(text),
            vec!["5 habits interviewers look for?"]
        );
    }

    #[test]
    fn handles_bulleted_numbers_and_double_digit_prefixes() {
        let text = "- 1. First\n10. Tenth";
        assert_eq!(parse_question_list(text), vec!["First", "Tenth"]);
    }

    #[test]
    fn enabled_reflects_config_presence() {
        // from_env is driven by process-wide state, so only the pure parts
        // are covered here.
        let config = EvaluatorConfig {
            base_url: "https://api.openai.com/v1/".to_string(),
            api_key: "key".to_string(),
            model: "gpt-4o-mini".to_string(),
        };
        let evaluator = HttpEvaluator::new(Some(config));
        assert!(evaluator.enabled());
        assert!(!HttpEvaluator::new(None).enabled());
    }

    #[test]
    fn generation_prompt_mentions_optional_fields() {
        let request = GenerationRequest::new("Backend Engineer", "Senior")
            .with_skills("Rust, SQL")
            .with_target_company("Acme");
        let prompt = generation_prompt(&request);
        assert!(prompt.contains("Backend Engineer"));
        assert!(prompt.contains("Senior"));
        assert!(prompt.contains("Rust, SQL"));
        assert!(prompt.contains("Acme"));
        assert!(!prompt.contains("topics"));
    }
}
