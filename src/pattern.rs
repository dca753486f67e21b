//! Route patterns and path matching.
//!
//! A pattern is a `/`-delimited template. Each segment is one of:
//!
//! - a literal, compared case-sensitively;
//! - `:name`, capturing exactly one path segment (possibly empty);
//! - `:name*`, capturing every remaining segment joined with `/`.
//!
//! Segment kinds are derived once when the pattern is compiled.

use std::collections::HashMap;
use std::fmt;

use crate::error::RouteError;

/// One compiled pattern segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(String),
    Wildcard(String),
}

impl Segment {
    fn parse(raw: &str) -> Option<Self> {
        match raw.strip_prefix(':') {
            None => Some(Self::Literal(raw.to_string())),
            Some(name) => match name.strip_suffix('*') {
                Some("") => None,
                Some(name) => Some(Self::Wildcard(name.to_string())),
                None if name.is_empty() => None,
                None => Some(Self::Param(name.to_string())),
            },
        }
    }
}

/// A compiled route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    raw: String,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Compile `raw`.
    ///
    /// # Errors
    ///
    /// [`RouteError::InvalidPattern`] if the pattern does not start with
    /// `/` or contains a capture without a name (`:` or `:*`).
    pub fn parse(raw: &str) -> Result<Self, RouteError> {
        if !raw.starts_with('/') {
            return Err(RouteError::InvalidPattern(raw.to_string()));
        }
        let segments = raw
            .split('/')
            .map(Segment::parse)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| RouteError::InvalidPattern(raw.to_string()))?;
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Match a concrete path, returning the captured parameters.
    ///
    /// Without a wildcard the segment counts must be equal, so `/user/` and
    /// `/user` are different paths.
    pub fn matches(&self, path: &str) -> Option<Params> {
        let parts: Vec<&str> = path.split('/').collect();
        let mut params = Params::default();

        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Wildcard(name) => {
                    let rest = parts.get(i..).unwrap_or_default().join("/");
                    params.insert(name, rest);
                    return Some(params);
                }
                Segment::Param(name) => {
                    params.insert(name, (*parts.get(i)?).to_string());
                }
                Segment::Literal(lit) => {
                    if parts.get(i) != Some(&lit.as_str()) {
                        return None;
                    }
                }
            }
        }

        (self.segments.len() == parts.len()).then_some(params)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Parameters captured by one successful match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    values: HashMap<String, String>,
}

impl Params {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn insert(&mut self, name: &str, value: String) {
        self.values.insert(name.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(raw: &str) -> Pattern {
        Pattern::parse(raw).unwrap()
    }

    #[test]
    fn segments_are_classified_once() {
        let p = pattern("/files/:dir/:rest*");
        assert_eq!(
            p.segments(),
            &[
                Segment::Literal(String::new()),
                Segment::Literal("files".into()),
                Segment::Param("dir".into()),
                Segment::Wildcard("rest".into()),
            ]
        );
    }

    #[test]
    fn rejects_unnamed_captures_and_relative_patterns() {
        assert!(Pattern::parse("/a/:").is_err());
        assert!(Pattern::parse("/a/:*").is_err());
        assert!(Pattern::parse("users").is_err());
    }

    #[test]
    fn literal_match_is_case_sensitive() {
        assert!(pattern("/Users").matches("/Users").is_some());
        assert!(pattern("/Users").matches("/users").is_none());
    }

    #[test]
    fn named_params_capture_segments() {
        let params = pattern("/users/:id/posts/:post").matches("/users/42/posts/7").unwrap();
        assert_eq!(params.get("id"), Some("42"));
        assert_eq!(params.get("post"), Some("7"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn named_param_may_be_empty() {
        let params = pattern("/users/:id").matches("/users/").unwrap();
        assert_eq!(params.get("id"), Some(""));
    }

    #[test]
    fn wildcard_captures_remainder_with_slashes() {
        let params = pattern("/static/:path*").matches("/static/css/site/main.css").unwrap();
        assert_eq!(params.get("path"), Some("css/site/main.css"));
    }

    #[test]
    fn wildcard_with_nothing_left_is_empty() {
        let params = pattern("/static/:path*").matches("/static").unwrap();
        assert_eq!(params.get("path"), Some(""));
    }

    #[test]
    fn wildcard_in_the_middle_ends_matching() {
        let params = pattern("/a/:rest*/ignored").matches("/a/b/c").unwrap();
        assert_eq!(params.get("rest"), Some("b/c"));
    }

    #[test]
    fn segment_count_mismatch_fails() {
        assert!(pattern("/users/:id").matches("/users/1/extra").is_none());
        assert!(pattern("/users/:id").matches("/users").is_none());
    }

    #[test]
    fn trailing_slash_is_significant() {
        assert!(pattern("/user").matches("/user/").is_none());
        assert!(pattern("/user/").matches("/user").is_none());
        assert!(pattern("/user/").matches("/user/").is_some());
    }

    #[test]
    fn root_pattern() {
        assert!(pattern("/").matches("/").is_some());
        assert!(pattern("/").matches("/x").is_none());
    }
}
