use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::external::text_generator::{TextGenError, TextGenerator};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Gemini implementation of the text generator over the Generative
/// Language REST API. One client serves every model in the fallback chain;
/// the model name is part of the request path.
pub struct GeminiGenerator {
    client: reqwest::Client,
    api_key: String,
}

impl GeminiGenerator {
    pub fn from_env() -> Result<Self, TextGenError> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| TextGenError::Unavailable("GEMINI_API_KEY not set".into()))?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
        })
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: String,
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        timeout: Duration,
    ) -> Result<String, TextGenError> {
        let url = format!("{}/{}:generateContent", API_BASE, model);

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TextGenError::Timeout
                } else {
                    TextGenError::Unavailable(e.to_string())
                }
            })?;

        let status = resp.status();
        if status == 429 {
            return Err(TextGenError::RateLimited);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_else(|_| "unknown error".into());
            return Err(TextGenError::Unavailable(format!("HTTP {}: {}", status, body)));
        }

        let body = resp
            .json::<GenerateResponse>()
            .await
            .map_err(|e| TextGenError::InvalidResponse(e.to_string()))?;

        let text = body
            .candidates
            .and_then(|mut c| if c.is_empty() { None } else { Some(c.remove(0)) })
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .ok_or_else(|| TextGenError::InvalidResponse("no candidates in response".into()))?;

        Ok(text)
    }
}
