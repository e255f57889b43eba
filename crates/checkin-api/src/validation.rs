//! Form field rules for reader requests.

use checkin_storage::BindParameter;
use std::collections::BTreeMap;
use thiserror::Error;

/// Decoded `application/x-www-form-urlencoded` body or query string
pub type FormData = BTreeMap<String, String>;

/// Expected shape of a field value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text, trimmed, bound as STR
    Text,
    /// Signed integer, bound as INT
    Int,
    /// Digits only, bound as STR
    IntText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub key: &'static str,
    pub kind: FieldKind,
}

impl FieldRule {
    pub const fn new(key: &'static str, kind: FieldKind) -> Self {
        Self { key, kind }
    }

    fn to_param(self, raw: &str) -> Result<BindParameter, ValidationError> {
        let value = raw.trim();
        if value.is_empty() {
            return Err(ValidationError::Missing(self.key.to_string()));
        }

        match self.kind {
            FieldKind::Text => {
                if value.chars().any(char::is_control) {
                    return Err(self.invalid("control characters are not allowed"));
                }
                Ok(BindParameter::text(self.key, value))
            }
            FieldKind::Int => value
                .parse::<i64>()
                .map(|v| BindParameter::int(self.key, v))
                .map_err(|e| self.invalid(&e.to_string())),
            FieldKind::IntText => {
                if !value.chars().all(|c| c.is_ascii_digit()) {
                    return Err(self.invalid("expected digits only"));
                }
                Ok(BindParameter::text(self.key, value))
            }
        }
    }

    fn invalid(self, reason: &str) -> ValidationError {
        ValidationError::Invalid {
            key: self.key.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing field '{0}'")]
    Missing(String),

    #[error("invalid field '{key}': {reason}")]
    Invalid { key: String, reason: String },
}

/// Ordered set of field rules
#[derive(Debug, Clone, Copy)]
pub struct Rules {
    rules: &'static [FieldRule],
}

/// Fields of a scan posted by a reader
pub const POST_RULES: Rules = Rules::new(&[
    FieldRule::new("tag_id", FieldKind::Text),
    FieldRule::new("check_time", FieldKind::Int),
    FieldRule::new("leaving", FieldKind::IntText),
]);

/// Fields of a summary lookup
pub const GET_RULES: Rules = Rules::new(&[FieldRule::new("tag_id", FieldKind::Text)]);

impl Rules {
    pub const fn new(rules: &'static [FieldRule]) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &'static [FieldRule] {
        self.rules
    }

    /// Every rule key is present with a non-blank value
    pub fn check_keys(&self, form: &FormData) -> Result<(), ValidationError> {
        for rule in self.rules {
            match form.get(rule.key) {
                Some(value) if !value.trim().is_empty() => {}
                _ => return Err(ValidationError::Missing(rule.key.to_string())),
            }
        }
        Ok(())
    }

    /// Type-check every field and convert it to a bind parameter
    ///
    /// Parameters come out in rule order.
    pub fn prepare(&self, form: &FormData) -> Result<Vec<BindParameter>, ValidationError> {
        self.rules
            .iter()
            .map(|rule| {
                let raw = form
                    .get(rule.key)
                    .ok_or_else(|| ValidationError::Missing(rule.key.to_string()))?;
                rule.to_param(raw)
            })
            .collect()
    }

    /// Like [`Rules::prepare`], dropping missing or invalid fields
    pub fn prepare_lenient(&self, form: &FormData) -> Vec<BindParameter> {
        self.rules
            .iter()
            .filter_map(|rule| form.get(rule.key).and_then(|raw| rule.to_param(raw).ok()))
            .collect()
    }
}
