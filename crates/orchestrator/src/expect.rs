//! Live evaluation of `expect` actions against a verification session.

use std::fmt;

use regex::RegexBuilder;

use recorder_core::{
    AutomationSession, Comparator, ElementHandle, ExpectTarget, Expectation, SessionResult,
};

use crate::codegen::split_regex_literal;
use crate::error::{OrchestratorError, Result};

/// A value read back from the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observed {
    Text(String),
    Flag(bool),
    /// Attribute, cookie or storage entry that does not exist.
    Missing,
}

impl fmt::Display for Observed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{text:?}"),
            Self::Flag(flag) => write!(f, "{flag}"),
            Self::Missing => f.write_str("nothing"),
        }
    }
}

/// Read the value named by `target`. Element targets need the waited-for element.
pub async fn observe(
    session: &dyn AutomationSession,
    target: &ExpectTarget,
    element: Option<&ElementHandle>,
) -> SessionResult<Observed> {
    let observed = match (target, element) {
        (ExpectTarget::Value { .. }, Some(el)) => Observed::Text(session.element_value(el).await?),
        (ExpectTarget::Text { .. }, Some(el)) => Observed::Text(session.element_text(el).await?),
        (ExpectTarget::Displayed { .. }, Some(el)) => {
            Observed::Flag(session.element_displayed(el).await?)
        }
        (ExpectTarget::Enabled { .. }, Some(el)) => {
            Observed::Flag(session.element_enabled(el).await?)
        }
        (ExpectTarget::Selected { .. }, Some(el)) => {
            Observed::Flag(session.element_selected(el).await?)
        }
        (ExpectTarget::Attribute { name, .. }, Some(el)) => {
            optional(session.element_attribute(el, name).await?)
        }
        (ExpectTarget::Css { name, .. }, Some(el)) => {
            Observed::Text(session.element_css(el, name).await?)
        }
        (ExpectTarget::Url, _) => Observed::Text(session.current_url().await?),
        (ExpectTarget::Title, _) => Observed::Text(session.title().await?),
        (ExpectTarget::Cookie { name }, _) => optional(session.cookie(name).await?),
        (ExpectTarget::LocalStorage { key }, _) => optional(session.local_storage(key).await?),
        (ExpectTarget::SessionStorage { key }, _) => {
            optional(session.session_storage(key).await?)
        }
        (_, None) => Observed::Missing,
    };
    Ok(observed)
}

fn optional(value: Option<String>) -> Observed {
    value.map(Observed::Text).unwrap_or(Observed::Missing)
}

/// Compare an observed value against the recorded expectation.
pub fn verify(expectation: &Expectation, observed: &Observed) -> Result<()> {
    let expected = expectation.expected.as_str();
    let passed = match (expectation.comparator, observed) {
        (_, Observed::Missing) => false,
        (Comparator::Equal, Observed::Flag(flag)) => match expected {
            "true" => *flag,
            "false" => !*flag,
            _ => false,
        },
        (Comparator::Equal, Observed::Text(text)) => text == expected,
        (Comparator::Contain, Observed::Text(text)) => text.contains(expected),
        (Comparator::Contain, Observed::Flag(flag)) => flag.to_string().contains(expected),
        (Comparator::Regexp, Observed::Text(text)) => compile(expected)?.is_match(text),
        (Comparator::Regexp, Observed::Flag(flag)) => compile(expected)?.is_match(&flag.to_string()),
    };

    if passed {
        Ok(())
    } else {
        Err(OrchestratorError::assertion(
            format!("{} {:?}", expectation.comparator.as_str(), expected),
            observed.to_string(),
        ))
    }
}

/// Build a matcher from a `/pattern/flags` literal or a bare pattern.
pub fn compile(literal: &str) -> Result<regex::Regex> {
    let (pattern, flags) = split_regex_literal(literal);
    RegexBuilder::new(pattern)
        .case_insensitive(flags.contains('i'))
        .multi_line(flags.contains('m'))
        .dot_matches_new_line(flags.contains('s'))
        .build()
        .map_err(|e| OrchestratorError::InvalidRegex {
            pattern: literal.to_string(),
            reason: e.to_string(),
        })
}
