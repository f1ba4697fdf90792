use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::external::text_generator::TextGenerator;
use crate::models::InsightResponse;
use crate::services::context::ContextBlock;

/// Versioned fallback insights, consumed only when the whole provider
/// chain is exhausted. Edit deliberately; tests pin the exact contents.
pub const STATIC_INSIGHTS: [&str; 4] = [
    "Strong diversification across asset classes",
    "Monitor concentration risk in top holdings",
    "Growth opportunities in underweight sectors",
    "Optimize advisor client distribution",
];

pub const STATIC_SOURCE: &str = "static-default";

/// A response is accepted only when its trimmed text is strictly longer
/// than this.
pub const MIN_ACCEPTABLE_CHARS: usize = 10;

pub const MAX_INSIGHT_LINES: usize = 4;

const PERSONA: &str = "\
You are an expert assistant for private banking advisors with deep knowledge \
of wealth management, portfolio construction, asset allocation, risk \
management and high-net-worth client relationships. Be professional and \
precise, and ground every observation in the data provided.";

const FOCUS_AREAS: [&str; 4] = [
    "Portfolio diversification opportunities",
    "Asset allocation recommendations",
    "Risk management strategies",
    "Client growth opportunities",
];

/// Generates advisory insights through an ordered provider fallback chain.
/// Infallible by contract: exhaustion degrades to the static defaults.
pub struct InsightGenerator {
    generator: Arc<dyn TextGenerator>,
    chain: Vec<String>,
    per_call_timeout: Duration,
}

impl InsightGenerator {
    pub fn new(generator: Arc<dyn TextGenerator>, chain: Vec<String>, per_call_timeout: Duration) -> Self {
        Self {
            generator,
            chain,
            per_call_timeout,
        }
    }

    /// One prompt per request: persona, then the composed data blocks in
    /// catalog order, then the enumerated task instruction.
    pub fn build_prompt(blocks: &[ContextBlock]) -> String {
        let mut prompt = String::from(PERSONA);
        prompt.push_str("\n\n");

        for block in blocks {
            prompt.push_str(&block.label.to_uppercase());
            prompt.push_str(":\n");
            prompt.push_str(&block.text);
            prompt.push_str("\n\n");
        }

        prompt.push_str(&format!(
            "Provide {} strategic insights for a banking advisor focusing on:\n",
            MAX_INSIGHT_LINES
        ));
        for (i, area) in FOCUS_AREAS.iter().enumerate() {
            prompt.push_str(&format!("{}. {}\n", i + 1, area));
        }
        prompt.push_str("\nKeep each insight concise and actionable, one per line.");

        prompt
    }

    /// Walk the fallback chain in order and return the first acceptable
    /// response. Candidate failures are logged and swallowed; they never
    /// surface past this boundary.
    pub async fn generate(&self, blocks: &[ContextBlock]) -> InsightResponse {
        let prompt = Self::build_prompt(blocks);

        for model in &self.chain {
            let attempt = timeout(
                self.per_call_timeout,
                self.generator.generate(model, &prompt, self.per_call_timeout),
            )
            .await;

            match attempt {
                Ok(Ok(text)) => {
                    let trimmed = text.trim();
                    if trimmed.len() > MIN_ACCEPTABLE_CHARS {
                        let lines = normalize_lines(trimmed);
                        if !lines.is_empty() {
                            info!("insights generated by provider {}", model);
                            return InsightResponse {
                                lines,
                                source: model.clone(),
                                degraded: false,
                            };
                        }
                    }
                    warn!("provider {} returned unusable output, trying next", model);
                }
                Ok(Err(e)) => {
                    warn!("provider {} failed: {}, trying next", model, e);
                }
                Err(_) => {
                    warn!(
                        "provider {} timed out after {:?}, trying next",
                        model, self.per_call_timeout
                    );
                }
            }
        }

        warn!("all insight providers exhausted, using static defaults");
        Self::static_default()
    }

    pub fn static_default() -> InsightResponse {
        InsightResponse {
            lines: STATIC_INSIGHTS.iter().map(|s| s.to_string()).collect(),
            source: STATIC_SOURCE.to_string(),
            degraded: true,
        }
    }
}

/// Normalization contract for generated text: trim each line, strip
/// leading bullet/markdown markers and list numbering, drop blanks, clamp
/// to the maximum line count.
pub fn normalize_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| strip_markers(line.trim()).trim())
        .filter(|line| !line.is_empty())
        .take(MAX_INSIGHT_LINES)
        .map(String::from)
        .collect()
}

fn strip_markers(line: &str) -> &str {
    let mut s = line;
    loop {
        let stripped = s.trim_start_matches(['-', '•', '*', '#']).trim_start();
        let stripped = strip_list_number(stripped);
        if stripped == s {
            return s;
        }
        s = stripped;
    }
}

/// Remove leading "1." / "12)" style numbering.
fn strip_list_number(s: &str) -> &str {
    let digits = s.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return s;
    }
    match s[digits..].chars().next() {
        Some('.') | Some(')') => s[digits + 1..].trim_start(),
        _ => s,
    }
}
