//! Template rendering contract
//!
//! Source files named `*.tmpl` are rendered through a [`TemplateEngine`]
//! against one caller-supplied data value. The engine sees raw bytes and
//! returns raw bytes; any failure aborts loading the source tree.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Template failures, without path context (the loader adds it).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("parse error: {message}")]
    Parse { message: String },

    #[error("execution error: {message}")]
    Execute { message: String },
}

impl TemplateError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn execute(message: impl Into<String>) -> Self {
        Self::Execute {
            message: message.into(),
        }
    }
}

/// Renders template source against a data value.
pub trait TemplateEngine {
    /// Render `source`. `name` identifies the template in diagnostics.
    fn render(&self, name: &str, source: &[u8], data: &Value) -> Result<Vec<u8>, TemplateError>;
}

/// Substitutes `{{ key.path }}` expressions from the data value.
///
/// A path is a dot-separated list of object keys or array indices. Strings
/// are inserted verbatim, numbers and booleans as their JSON text, and null
/// as nothing. Objects and arrays cannot be inserted.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleEngine;

impl SimpleEngine {
    pub fn new() -> Self {
        Self
    }
}

static EXPRESSION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([^{}]*?)\s*\}\}").expect("Invalid template expression regex")
});

static PATH_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]+(\.[A-Za-z0-9_-]+)*$").expect("Invalid template path regex")
});

impl TemplateEngine for SimpleEngine {
    fn render(&self, name: &str, source: &[u8], data: &Value) -> Result<Vec<u8>, TemplateError> {
        let text = std::str::from_utf8(source)
            .map_err(|e| TemplateError::parse(format!("{}: not valid UTF-8: {}", name, e)))?;

        let mut output = String::with_capacity(text.len());
        let mut last = 0;
        for caps in EXPRESSION_REGEX.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            let expression = caps.get(1).map_or("", |m| m.as_str());

            let literal = &text[last..whole.start()];
            check_unterminated(name, literal)?;
            output.push_str(literal);
            output.push_str(&evaluate(name, expression, data)?);
            last = whole.end();
        }
        let rest = &text[last..];
        check_unterminated(name, rest)?;
        output.push_str(rest);

        Ok(output.into_bytes())
    }
}

fn check_unterminated(name: &str, literal: &str) -> Result<(), TemplateError> {
    if literal.contains("{{") {
        return Err(TemplateError::parse(format!(
            "{}: unterminated or malformed expression",
            name
        )));
    }
    Ok(())
}

fn evaluate(name: &str, expression: &str, data: &Value) -> Result<String, TemplateError> {
    if !PATH_REGEX.is_match(expression) {
        return Err(TemplateError::parse(format!(
            "{}: invalid expression {:?}",
            name, expression
        )));
    }

    let mut value = data;
    for key in expression.split('.') {
        let next = match value {
            Value::Object(map) => map.get(key),
            Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        value = next.ok_or_else(|| {
            TemplateError::execute(format!("{}: no value for {:?}", name, expression))
        })?;
    }

    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Null => Ok(String::new()),
        Value::Bool(_) | Value::Number(_) => Ok(value.to_string()),
        Value::Array(_) | Value::Object(_) => Err(TemplateError::execute(format!(
            "{}: {:?} is not a scalar value",
            name, expression
        ))),
    }
}
