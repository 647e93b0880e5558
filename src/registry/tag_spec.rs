//! Symbolic subscription specs
//!
//! Grammar, checked in this order:
//! - `*`: every known tag
//! - a category token such as `storage-ops`
//! - `PREFIX<lo>-<hi>` (also `PREFIX-<lo>-<hi>`): `PREFIX<i>` for `i` in
//!   `[min(lo,hi), max(lo,hi)]`
//! - `PREFIX*`: `PREFIX<i>` for `i` in `[0, 30)`
//! - anything else is a literal tag
//!
//! Ranges and suffix wildcards keep only the generated names that are known
//! tags and fail when none is.

use super::categories::{self, Category};
use crate::errors::RegistrationError;
use crate::events::tags::{is_known_tag, known_tags};
use std::str::FromStr;

/// Upper bound (exclusive) of a suffix wildcard expansion
pub const SUFFIX_WILDCARD_LIMIT: u32 = 30;

/// Largest numeric suffix of any known tag (`PUSH32`); ranges are clamped to it
pub const MAX_TAG_SUFFIX: u32 = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagSpec {
    Universal,
    Category(Category),
    Range { prefix: String, lo: u32, hi: u32 },
    Suffix(String),
    Literal(String),
}

impl TagSpec {
    pub fn parse(spec: &str) -> Result<Self, RegistrationError> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(malformed(spec, "empty spec"));
        }
        if spec == "*" {
            return Ok(TagSpec::Universal);
        }
        if let Some(category) = categories::lookup(spec) {
            return Ok(TagSpec::Category(category));
        }
        if let Some(prefix) = spec.strip_suffix('*') {
            if prefix.is_empty() || prefix.contains('*') {
                return Err(malformed(spec, "wildcard must follow a non-empty prefix"));
            }
            return Ok(TagSpec::Suffix(prefix.to_string()));
        }
        if let Some((head, hi)) = spec.rsplit_once('-') {
            return parse_range(spec, head, hi);
        }
        Ok(TagSpec::Literal(spec.to_string()))
    }

    /// Concrete tags this spec stands for, in ascending order for generated
    /// families and table order for categories
    pub fn expand(&self, spec: &str) -> Result<Vec<String>, RegistrationError> {
        let tags: Vec<String> = match self {
            TagSpec::Universal => known_tags().iter().map(|t| t.to_string()).collect(),
            TagSpec::Category(category) => category.tags.iter().map(|t| t.to_string()).collect(),
            TagSpec::Range { prefix, lo, hi } => {
                let (lo, hi) = if lo <= hi { (*lo, *hi) } else { (*hi, *lo) };
                numbered(prefix, lo..=hi.min(MAX_TAG_SUFFIX))
            }
            TagSpec::Suffix(prefix) => numbered(prefix, 0..SUFFIX_WILDCARD_LIMIT),
            TagSpec::Literal(tag) => {
                if !is_known_tag(tag) {
                    return Err(RegistrationError::UnknownTag(tag.clone()));
                }
                vec![tag.clone()]
            }
        };
        if tags.is_empty() {
            return Err(malformed(spec, "matches no known tag"));
        }
        Ok(tags)
    }
}

impl FromStr for TagSpec {
    type Err = RegistrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TagSpec::parse(s)
    }
}

/// Parse and expand in one go
pub fn expand_spec(spec: &str) -> Result<Vec<String>, RegistrationError> {
    TagSpec::parse(spec)?.expand(spec)
}

fn parse_range(spec: &str, head: &str, hi: &str) -> Result<TagSpec, RegistrationError> {
    let hi: u32 = hi
        .parse()
        .map_err(|_| malformed(spec, "range upper bound is not a number"))?;
    let head = head.strip_suffix('-').unwrap_or(head);
    let split = head
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)
        .ok_or_else(|| malformed(spec, "range lower bound is missing"))?;
    let (prefix, lo) = head.split_at(split);
    let prefix = prefix.strip_suffix('-').unwrap_or(prefix);
    if prefix.is_empty() {
        return Err(malformed(spec, "range prefix is empty"));
    }
    let lo: u32 = lo
        .parse()
        .map_err(|_| malformed(spec, "range lower bound is not a number"))?;
    Ok(TagSpec::Range {
        prefix: prefix.to_string(),
        lo,
        hi,
    })
}

fn numbered<I: IntoIterator<Item = u32>>(prefix: &str, indices: I) -> Vec<String> {
    indices
        .into_iter()
        .map(|i| format!("{prefix}{i}"))
        .filter(|tag| is_known_tag(tag))
        .collect()
}

fn malformed(spec: &str, reason: &str) -> RegistrationError {
    RegistrationError::MalformedTagSpec {
        spec: spec.to_string(),
        reason: reason.to_string(),
    }
}
