// src/dom/fingerprint.rs

//! Structural fingerprints: the compound-selector subset used to identify
//! nodes of interest in the host tree.
//!
//! Supported grammar (no combinators):
//!
//! ```text
//! tag? ( '#' ident | '.' ident | '[' name ( '=' value )? ']' )*
//! ```
//!
//! where `value` is a bare identifier or a single/double quoted string.
//! Examples: `div#appMountPoint`, `div.watch-video--player-view`,
//! `button[data-uia="player-blocked-play"]`, `video`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::{PlayguardError, Result};

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[A-Za-z][A-Za-z0-9-]*|\*)").expect("valid tag regex"));

static PART_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(?:(?P<kind>[.#])(?P<ident>[A-Za-z0-9_-]+)|\[\s*(?P<attr>[A-Za-z_][A-Za-z0-9_:-]*)\s*(?:=\s*(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)'|(?P<bare>[A-Za-z0-9_-]+)))?\s*\])"#,
    )
    .expect("valid part regex")
});

/// An attribute requirement inside a fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrMatcher {
    name: String,
    /// `None` means "attribute present with any value".
    value: Option<String>,
}

/// Identity payload of an element: everything a fingerprint can test.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementData {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: BTreeMap<String, String>,
}

impl ElementData {
    /// Build the element a fingerprint describes.
    ///
    /// Used to create nodes from the same notation that later finds them;
    /// a bare `[attr]` becomes an empty-valued attribute and a missing tag
    /// becomes `div`.
    pub fn from_fingerprint(fp: &Fingerprint) -> Self {
        let attributes = fp
            .attrs
            .iter()
            .map(|a| (a.name.clone(), a.value.clone().unwrap_or_default()))
            .collect();
        Self {
            tag: fp.tag.clone().unwrap_or_else(|| "div".to_string()),
            id: fp.id.clone(),
            classes: fp.classes.clone(),
            attributes,
        }
    }

    /// Attribute lookup that also exposes `id` and `class`.
    pub fn attribute(&self, name: &str) -> Option<String> {
        match name {
            "id" => self.id.clone(),
            "class" if !self.classes.is_empty() => Some(self.classes.join(" ")),
            _ => self.attributes.get(name).cloned(),
        }
    }
}

/// Parsed structural fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    source: String,
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrMatcher>,
}

impl Fingerprint {
    pub fn parse(input: &str) -> Result<Self> {
        let source = input.trim();
        if source.is_empty() {
            return Err(PlayguardError::InvalidFingerprint(
                "empty fingerprint".to_string(),
            ));
        }

        let mut rest = source;
        let mut tag = None;
        if let Some(m) = TAG_RE.find(rest) {
            if m.as_str() != "*" {
                tag = Some(m.as_str().to_ascii_lowercase());
            }
            rest = &rest[m.end()..];
        }

        let mut id = None;
        let mut classes = Vec::new();
        let mut attrs = Vec::new();

        while !rest.is_empty() {
            let caps = PART_RE.captures(rest).ok_or_else(|| {
                PlayguardError::InvalidFingerprint(format!(
                    "unsupported syntax near '{rest}' in '{source}'"
                ))
            })?;

            if let Some(ident) = caps.name("ident") {
                match caps.name("kind").map(|k| k.as_str()) {
                    Some("#") => {
                        if id.replace(ident.as_str().to_string()).is_some() {
                            return Err(PlayguardError::InvalidFingerprint(format!(
                                "more than one #id in '{source}'"
                            )));
                        }
                    }
                    _ => classes.push(ident.as_str().to_string()),
                }
            } else if let Some(name) = caps.name("attr") {
                let value = caps
                    .name("dq")
                    .or_else(|| caps.name("sq"))
                    .or_else(|| caps.name("bare"))
                    .map(|v| v.as_str().to_string());
                attrs.push(AttrMatcher {
                    name: name.as_str().to_ascii_lowercase(),
                    value,
                });
            }

            let consumed = caps.get(0).map(|m| m.end()).unwrap_or(rest.len());
            rest = &rest[consumed..];
        }

        Ok(Self {
            source: source.to_string(),
            tag,
            id,
            classes,
            attrs,
        })
    }

    /// The notation this fingerprint was parsed from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, element: &ElementData) -> bool {
        if let Some(tag) = &self.tag {
            if !element.tag.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if element.id.as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| element.classes.contains(c)) {
            return false;
        }
        self.attrs.iter().all(|a| match (element.attribute(&a.name), &a.value) {
            (Some(_), None) => true,
            (Some(actual), Some(expected)) => &actual == expected,
            (None, _) => false,
        })
    }
}

impl FromStr for Fingerprint {
    type Err = PlayguardError;

    fn from_str(s: &str) -> Result<Self> {
        Fingerprint::parse(s)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
