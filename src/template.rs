//! Message template compilation and rendering.
//!
//! Templates are compiled once at bridge start into literal/placeholder
//! segment lists (placeholder syntax: `${field.path}`) and rendered against
//! each input event. Rendering is total: missing paths render empty, and a
//! timestamp that does not parse as an integer falls back to the current
//! wall-clock time in milliseconds.

use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessageTemplateConfig {
    #[serde(default)]
    pub key: String,
    #[serde(default = "default_value_template")]
    pub value: String,
    #[serde(default)]
    pub timestamp: String,
}

impl Default for MessageTemplateConfig {
    fn default() -> Self {
        Self {
            key: String::new(),
            value: default_value_template(),
            timestamp: String::new(),
        }
    }
}

fn default_value_template() -> String {
    // The whole event as compact JSON
    "${.}".to_string()
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    /// Dot-separated field path; empty means the event root.
    Placeholder(Vec<String>),
}

/// A single compiled template fragment.
#[derive(Debug, Clone)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn compile(fragment: &str, raw: &str) -> Result<Self> {
        let segments = parse_segments(raw).map_err(|reason| Error::TemplateSyntax {
            fragment: fragment.to_string(),
            reason,
        })?;
        Ok(Self { segments })
    }

    pub fn render(&self, event: &Value) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(lit) => out.push_str(lit),
                Segment::Placeholder(path) => out.push_str(&render_path(event, path)),
            }
        }
        out
    }
}

fn parse_segments(raw: &str) -> std::result::Result<Vec<Segment>, String> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = raw;

    while let Some(start) = rest.find("${") {
        literal.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| "unclosed placeholder".to_string())?;
        let path = parse_path(&after[..end])?;

        if !literal.is_empty() {
            segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }
        segments.push(Segment::Placeholder(path));
        rest = &after[end + 1..];
    }

    literal.push_str(rest);
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    Ok(segments)
}

fn parse_path(inner: &str) -> std::result::Result<Vec<String>, String> {
    if inner.is_empty() {
        return Err("empty placeholder".to_string());
    }
    // `${.}` selects the event root
    if inner == "." {
        return Ok(Vec::new());
    }
    inner
        .split('.')
        .map(|part| {
            if part.is_empty() {
                Err(format!("empty path segment in `{}`", inner))
            } else {
                Ok(part.to_string())
            }
        })
        .collect()
}

fn render_path(event: &Value, path: &[String]) -> String {
    let mut current = event;
    for part in path {
        match current.get(part) {
            Some(value) => current = value,
            None => return String::new(),
        }
    }

    match current {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => current.to_string(),
    }
}

/// A rendered wire record ready for the producer.
#[derive(Debug, Clone)]
pub struct RenderedMessage {
    pub key: Bytes,
    pub value: Bytes,
    pub timestamp_ms: i64,
}

/// The three compiled fragments of a message template.
///
/// Compiled once at bridge start, immutable thereafter.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    key: Template,
    value: Template,
    timestamp: Template,
}

impl CompiledTemplate {
    pub fn compile(config: &MessageTemplateConfig) -> Result<Self> {
        Ok(Self {
            key: Template::compile("key", &config.key)?,
            value: Template::compile("value", &config.value)?,
            timestamp: Template::compile("timestamp", &config.timestamp)?,
        })
    }

    /// Renders the template against an event. Total: never fails.
    pub fn render(&self, event: &Value) -> RenderedMessage {
        let timestamp = self.timestamp.render(event);
        let timestamp_ms = timestamp
            .trim()
            .parse::<i64>()
            .unwrap_or_else(|_| Utc::now().timestamp_millis());

        RenderedMessage {
            key: Bytes::from(self.key.render(event)),
            value: Bytes::from(self.value.render(event)),
            timestamp_ms,
        }
    }
}
