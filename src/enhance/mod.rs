//! Contract of the text-enhancement service used by the editor.
//!
//! A request carries one bullet point or summary; the service answers with a
//! rewritten text plus alternatives. Completions come from a language model
//! and are parsed leniently: anything that is not the expected JSON becomes a
//! plain-text answer.

#[cfg(feature = "enhance")]
pub mod http;
pub mod prompts;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{Error, Result};

pub use prompts::system_prompt;

#[cfg(feature = "enhance")]
pub use http::{EnhancerConfig, HttpEnhancer};

pub const MAX_ALTERNATIVES: usize = 3;
pub const MAX_KEY_WORDS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnhanceKind {
    #[default]
    Bullet,
    Summary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceRequest {
    pub text: String,
    #[serde(rename = "type", default)]
    pub kind: EnhanceKind,
    #[serde(default)]
    pub get_suggestions: bool,
}

impl EnhanceRequest {
    pub fn new(text: impl Into<String>, kind: EnhanceKind) -> Self {
        Self { text: text.into(), kind, get_suggestions: false }
    }

    pub fn with_suggestions(mut self, on: bool) -> Self {
        self.get_suggestions = on;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(Error::InvalidInput("Text is required".into()));
        }
        Ok(())
    }

    pub fn system_prompt(&self) -> &'static str {
        system_prompt(self.kind, self.get_suggestions)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceResponse {
    pub enhanced_text: String,
    #[serde(default)]
    pub alternatives: Vec<String>,
    #[serde(default)]
    pub key_words: Vec<String>,
    #[serde(default)]
    pub improvement_tips: Vec<String>,
}

impl EnhanceResponse {
    /// A plain-text answer with no extras.
    pub fn plain(text: &str) -> Self {
        Self { enhanced_text: text.to_string(), ..Default::default() }
    }
}

/// Shape the model is asked to produce. A missing or mistyped field reads as
/// empty without discarding the others.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Completion {
    #[serde(deserialize_with = "lenient_text")]
    enhanced_text: Option<String>,
    #[serde(deserialize_with = "lenient_list")]
    alternatives: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    key_words: Vec<String>,
    #[serde(deserialize_with = "lenient_list")]
    improvement_tips: Vec<String>,
}

fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// String entries of an array; anything else is skipped.
fn lenient_list<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

/// Remove a surrounding Markdown code fence, with or without a `json` tag.
fn strip_fences(raw: &str) -> &str {
    let mut s = raw.trim();
    s = s
        .strip_prefix("```json")
        .or_else(|| s.strip_prefix("```"))
        .unwrap_or(s);
    s = s.strip_suffix("```").unwrap_or(s);
    s.trim()
}

/// Turn raw model output into a response. Never fails: output that is not a
/// JSON object becomes [`EnhanceResponse::plain`] of the raw text.
pub fn parse_completion(raw: &str) -> EnhanceResponse {
    match serde_json::from_str::<Completion>(strip_fences(raw)) {
        Ok(c) => EnhanceResponse {
            enhanced_text: c.enhanced_text.filter(|t| !t.is_empty()).unwrap_or_else(|| raw.to_string()),
            alternatives: c.alternatives.into_iter().take(MAX_ALTERNATIVES).collect(),
            key_words: c.key_words.into_iter().take(MAX_KEY_WORDS).collect(),
            improvement_tips: c.improvement_tips,
        },
        Err(e) => {
            log::debug!("completion is not JSON ({}), using it as plain text", e);
            EnhanceResponse::plain(raw)
        }
    }
}

/// Rewrites résumé text.
pub trait Enhancer: Send + Sync {
    fn enhance(&self, request: &EnhanceRequest) -> Result<EnhanceResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uses_wire_names() {
        let req: EnhanceRequest =
            serde_json::from_str(r#"{"text":"Did sales","type":"summary","getSuggestions":true}"#).unwrap();
        assert_eq!(req.kind, EnhanceKind::Summary);
        assert!(req.get_suggestions);
        let req: EnhanceRequest = serde_json::from_str(r#"{"text":"x"}"#).unwrap();
        assert_eq!(req.kind, EnhanceKind::Bullet);
        assert!(!req.get_suggestions);
    }

    #[test]
    fn blank_text_is_rejected() {
        assert!(matches!(EnhanceRequest::new("  ", EnhanceKind::Bullet).validate(), Err(Error::InvalidInput(_))));
        assert!(EnhanceRequest::new("Led a team", EnhanceKind::Bullet).validate().is_ok());
    }

    #[test]
    fn summary_prompt_wins_over_suggestions() {
        assert_eq!(system_prompt(EnhanceKind::Summary, true), prompts::SUMMARY);
        assert_eq!(system_prompt(EnhanceKind::Bullet, true), prompts::SUGGESTIONS);
        assert_eq!(system_prompt(EnhanceKind::Bullet, false), prompts::BULLET);
    }

    #[test]
    fn fenced_json_is_parsed_and_truncated() {
        let raw = "```json\n{\"enhancedText\":\"Led 5 engineers\",\"alternatives\":[\"a\",\"b\",\"c\",\"d\"],\"keyWords\":[\"1\",\"2\",\"3\",\"4\",\"5\",\"6\"]}\n```";
        let r = parse_completion(raw);
        assert_eq!(r.enhanced_text, "Led 5 engineers");
        assert_eq!(r.alternatives, vec!["a", "b", "c"]);
        assert_eq!(r.key_words.len(), 5);
        assert!(r.improvement_tips.is_empty());
    }

    #[test]
    fn plain_text_falls_back() {
        let r = parse_completion("Spearheaded regional expansion");
        assert_eq!(r, EnhanceResponse::plain("Spearheaded regional expansion"));
        // Valid JSON that is not an object also falls back.
        assert_eq!(parse_completion("\"just a string\"").enhanced_text, "\"just a string\"");
    }

    #[test]
    fn bad_fields_do_not_discard_good_ones() {
        let raw = r#"{"enhancedText":"Grew revenue 30%","alternatives":null,"keyWords":["sales",7,"growth"],"improvementTips":"none"}"#;
        let r = parse_completion(raw);
        assert_eq!(r.enhanced_text, "Grew revenue 30%");
        assert!(r.alternatives.is_empty());
        assert_eq!(r.key_words, vec!["sales", "growth"]);
        assert!(r.improvement_tips.is_empty());
    }

    #[test]
    fn missing_enhanced_text_uses_raw() {
        let raw = r#"{"alternatives":["x"]}"#;
        let r = parse_completion(raw);
        assert_eq!(r.enhanced_text, raw);
        assert_eq!(r.alternatives, vec!["x"]);
    }

    #[test]
    fn response_serialises_camel_case() {
        let json = serde_json::to_value(EnhanceResponse::plain("t")).unwrap();
        assert!(json.get("enhancedText").is_some());
        assert!(json.get("keyWords").is_some());
        assert!(json.get("improvementTips").is_some());
    }
}
