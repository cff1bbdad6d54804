//! Message templates
//!
//! Templates use `{name}` placeholders. A template that parses as a JSON
//! object is an embed: values are JSON-escaped before substitution and the
//! result is parsed again.

use std::collections::BTreeMap;

use invitetrack_core::{InviteCountBreakdown, TemplateError};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([A-Za-z0-9_]+)\}").expect("placeholder pattern is valid")
});

/// Named values substituted into a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVars(BTreeMap<String, String>);

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Merge another set of values in, overwriting on conflict.
    pub fn extend(&mut self, other: TemplateVars) {
        self.0.extend(other.0);
    }
}

/// A rendered message: plain text or an embed object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RenderedMessage {
    Text(String),
    Embed(serde_json::Value),
}

impl RenderedMessage {
    /// The text body, if this is a text message.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RenderedMessage::Text(text) => Some(text),
            RenderedMessage::Embed(_) => None,
        }
    }
}

/// Fill a template with values. Unknown placeholders are left as written.
pub fn fill_template(template: &str, vars: &TemplateVars) -> Result<RenderedMessage, TemplateError> {
    let is_embed = serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(template).is_ok();
    if !is_embed {
        return Ok(RenderedMessage::Text(substitute(template, vars, |v| v.to_string())));
    }

    let filled = substitute(template, vars, json_escape);
    let value: serde_json::Value =
        serde_json::from_str(&filled).map_err(|e| TemplateError::InvalidEmbed {
            reason: e.to_string(),
        })?;
    Ok(RenderedMessage::Embed(value))
}

fn substitute(template: &str, vars: &TemplateVars, encode: impl Fn(&str) -> String) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| match vars.get(&caps[1]) {
            Some(value) => encode(value),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Escape a value for use inside a JSON string literal.
fn json_escape(value: &str) -> String {
    let quoted = serde_json::Value::String(value.to_string()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}

/// Template values describing an invite breakdown.
pub fn invite_count_vars(counts: &InviteCountBreakdown) -> TemplateVars {
    TemplateVars::new()
        .with("numInvites", counts.total.to_string())
        .with("numRegularInvites", counts.regular.to_string())
        .with("numBonusInvites", counts.custom.to_string())
        .with("numFakeInvites", counts.fake.to_string())
        .with("numLeaveInvites", counts.leave.to_string())
}
