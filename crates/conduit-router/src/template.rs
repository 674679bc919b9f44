//! URI template compilation and matching.
//!
//! A template such as `users/{id}/devices` is compiled once, at registration
//! time, into an anchored regular expression. Literal text is escaped and
//! every `{name}` becomes a `[^/]+` capture group. Both templates and paths
//! are matched in a canonical form with a single trailing slash, so a
//! template always ends on a segment boundary: `users` matches `users/42` in
//! `StartsWith` mode but never `usersfoo`.

use std::fmt;

use conduit_core::{normalize_path, Params, ResourceError, ResourceResult};
use regex::Regex;

/// How much of the resource path a template must consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoutingMode {
    /// The template must match the whole path.
    Equals,
    /// The template may match a prefix; the rest is left for the next stage.
    StartsWith,
}

impl fmt::Display for RoutingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Equals => "equals",
            Self::StartsWith => "starts_with",
        })
    }
}

/// A compiled URI template.
///
/// # Example
///
/// ```rust
/// use conduit_router::{RoutingMode, UriTemplate};
///
/// let template = UriTemplate::compile(RoutingMode::StartsWith, "users/{id}").unwrap();
/// let m = template.matches("users/42/devices/7").unwrap();
///
/// assert_eq!(m.matched(), "users/42");
/// assert_eq!(m.remaining(), "devices/7");
/// assert_eq!(m.variables().get("id"), Some("42"));
/// ```
#[derive(Debug, Clone)]
pub struct UriTemplate {
    mode: RoutingMode,
    template: String,
    variables: Vec<String>,
    regex: Regex,
}

impl UriTemplate {
    /// Compiles `template` for the given routing mode.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` for an unterminated `{`, an unmatched `}`, an
    /// empty or illegal variable name, a repeated variable name, or two
    /// variables with no literal text between them.
    pub fn compile(mode: RoutingMode, template: &str) -> ResourceResult<Self> {
        let template = normalize_path(template);
        let mut pattern = String::with_capacity(template.len() * 2 + 16);
        let mut variables: Vec<String> = Vec::new();
        let mut literal = String::new();
        let mut after_variable = false;

        pattern.push_str("^(");
        let mut chars = template.char_indices();
        while let Some((pos, c)) = chars.next() {
            match c {
                '{' => {
                    if after_variable {
                        return Err(syntax_error(
                            &template,
                            pos,
                            "variables must be separated by literal text",
                        ));
                    }
                    pattern.push_str(&regex::escape(&literal));
                    literal.clear();

                    let mut name = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    if !closed {
                        return Err(syntax_error(&template, pos, "unterminated '{'"));
                    }
                    validate_variable(&template, pos, &name)?;
                    if variables.contains(&name) {
                        return Err(syntax_error(
                            &template,
                            pos,
                            &format!("variable '{name}' appears more than once"),
                        ));
                    }

                    pattern.push_str("([^/]+)");
                    variables.push(name);
                    after_variable = true;
                }
                '}' => return Err(syntax_error(&template, pos, "unmatched '}'")),
                c => {
                    literal.push(c);
                    after_variable = false;
                }
            }
        }
        pattern.push_str(&regex::escape(&literal));
        if !template.is_empty() {
            pattern.push('/');
        }
        pattern.push(')');
        match mode {
            RoutingMode::Equals => pattern.push('$'),
            RoutingMode::StartsWith => pattern.push_str("(.*)$"),
        }

        let regex = Regex::new(&pattern).map_err(|e| {
            ResourceError::bad_request(format!("Invalid URI template '{template}': {e}"))
        })?;

        Ok(Self {
            mode,
            template,
            variables,
            regex,
        })
    }

    /// The routing mode.
    #[must_use]
    pub const fn mode(&self) -> RoutingMode {
        self.mode
    }

    /// The normalised template text.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Variable names in template order.
    #[must_use]
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Returns true if both templates accept exactly the same paths with the
    /// same mode, regardless of variable names.
    #[must_use]
    pub fn same_matcher(&self, other: &Self) -> bool {
        self.mode == other.mode && self.regex.as_str() == other.regex.as_str()
    }

    /// Matches a resource path against this template.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<TemplateMatch> {
        let path = normalize_path(path);
        let canonical = if path.is_empty() {
            path
        } else {
            format!("{path}/")
        };

        let caps = self.regex.captures(&canonical)?;
        let matched = caps.get(1).map_or("", |m| m.as_str());

        let mut variables = Params::with_capacity(self.variables.len());
        for (i, name) in self.variables.iter().enumerate() {
            let raw = caps.get(i + 2).map_or("", |m| m.as_str());
            variables.push(name.as_str(), decode(raw));
        }

        let remaining = match self.mode {
            RoutingMode::Equals => String::new(),
            RoutingMode::StartsWith => caps
                .get(self.variables.len() + 2)
                .map_or_else(String::new, |m| normalize_path(m.as_str())),
        };

        Some(TemplateMatch {
            consumed: matched.len(),
            matched: matched.trim_end_matches('/').to_string(),
            remaining,
            variables,
        })
    }
}

impl fmt::Display for UriTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

/// The result of matching a path against a [`UriTemplate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateMatch {
    pub(crate) matched: String,
    pub(crate) remaining: String,
    pub(crate) variables: Params,
    pub(crate) consumed: usize,
}

impl TemplateMatch {
    /// The consumed portion of the path, without a trailing slash.
    #[must_use]
    pub fn matched(&self) -> &str {
        &self.matched
    }

    /// The unconsumed remainder; always empty in `Equals` mode.
    #[must_use]
    pub fn remaining(&self) -> &str {
        &self.remaining
    }

    /// Captured, percent-decoded variables.
    #[must_use]
    pub fn variables(&self) -> &Params {
        &self.variables
    }

    /// Number of bytes of the canonical path consumed by the template.
    #[must_use]
    pub const fn consumed(&self) -> usize {
        self.consumed
    }
}

fn validate_variable(template: &str, pos: usize, name: &str) -> ResourceResult<()> {
    if name.is_empty() {
        return Err(syntax_error(template, pos, "empty variable name"));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
    {
        return Err(syntax_error(
            template,
            pos,
            &format!("illegal character '{bad}' in variable name"),
        ));
    }
    Ok(())
}

fn syntax_error(template: &str, pos: usize, reason: &str) -> ResourceError {
    ResourceError::bad_request(format!(
        "Invalid URI template '{template}' at position {pos}: {reason}"
    ))
}

// Undecodable sequences are kept verbatim.
fn decode(raw: &str) -> String {
    urlencoding::decode(raw).map_or_else(|_| raw.to_string(), std::borrow::Cow::into_owned)
}
