//! Hierarchical, concurrent lookup maps for command paths and custom IDs
//!
//! One map instance serves the slash-command path trie, another the
//! custom-ID trie for component and modal handlers. Interior nodes are
//! created on demand and never reclaimed; leaves hold either an exact entry
//! or a compiled wildcard pattern. Lookups are lock-free along the trie and
//! take a short shared lock on the wildcard bucket of the final node.

use std::sync::{Arc, RwLock};

use dashmap::{mapref::entry::Entry, DashMap};
use regex::Regex;

use crate::error::Error;

/// Delimiters of the named-wildcard syntax in handler name patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WildcardSyntax {
    /// Character opening a named wildcard
    pub open: char,
    /// Character closing a named wildcard
    pub close: char,
}

impl Default for WildcardSyntax {
    fn default() -> Self { Self { open: '{', close: '}' } }
}

fn constraint_pattern(kind: &str) -> Option<&'static str> {
    Some(match kind {
        "alpha" => r"\w+",
        "int" => r"-?\d+",
        "bool" => r"(?:true|false)",
        "float" | "decimal" => r"-?\d+(?:\.\d+)?",
        "datetime" => r"\d{4}-\d{2}-\d{2}(?:[T ]\d{2}:\d{2}(?::\d{2})?)?",
        "guid" => {
            r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}"
        },
        _ => return None,
    })
}

fn valid_group_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

struct Compiled {
    regex: Regex,
    normalized: String,
    names: Vec<Option<String>>,
}

impl WildcardSyntax {
    /// True if the segment uses wildcard syntax and must be compiled rather
    /// than matched exactly
    #[must_use]
    pub fn is_pattern(&self, segment: &str) -> bool {
        segment.contains(self.open) || segment.contains('*')
    }

    /// Number of captures the segment's pattern produces, validating the
    /// pattern along the way
    pub(crate) fn capture_count(&self, segment: &str) -> Result<usize, Error> {
        self.compile(segment).map(|c| c.names.len())
    }

    fn compile(&self, segment: &str) -> Result<Compiled, Error> {
        let mut source = String::from(r"\A");
        let mut normalized = String::from(r"\A");
        let mut names: Vec<Option<String>> = vec![];
        let mut literal = String::new();

        let mut flush = |literal: &mut String, source: &mut String, normalized: &mut String| {
            if !literal.is_empty() {
                let escaped = regex::escape(literal);
                source.push_str(&escaped);
                normalized.push_str(&escaped);
                literal.clear();
            }
        };

        let mut chars = segment.chars();
        while let Some(c) = chars.next() {
            if c == self.open {
                flush(&mut literal, &mut source, &mut normalized);

                let mut inner = String::new();
                loop {
                    match chars.next() {
                        Some(c) if c == self.close => break,
                        Some(c) => inner.push(c),
                        None => {
                            return Err(Error::parse(format!(
                                "Unterminated wildcard in pattern {segment:?}"
                            )))
                        },
                    }
                }

                let (name, pattern) = match inner.split_once(':') {
                    Some((name, kind)) => {
                        let pattern = constraint_pattern(kind).ok_or_else(|| {
                            Error::parse(format!(
                                "Unknown wildcard constraint {kind:?} in pattern {segment:?}"
                            ))
                        })?;
                        (name, pattern)
                    },
                    None => (inner.as_str(), r"\w+"),
                };

                if !valid_group_name(name) {
                    return Err(Error::parse(format!(
                        "Invalid wildcard name {name:?} in pattern {segment:?}"
                    )));
                }
                if names.iter().flatten().any(|n| n == name) {
                    return Err(Error::parse(format!(
                        "Duplicate wildcard name {name:?} in pattern {segment:?}"
                    )));
                }

                source.push_str(&format!("(?P<{name}>{pattern})"));
                normalized.push_str(&format!("({pattern})"));
                names.push(Some(name.to_owned()));
            } else if c == '*' {
                flush(&mut literal, &mut source, &mut normalized);
                source.push_str(r"(\S+)");
                normalized.push_str(r"(\S+)");
                names.push(None);
            } else {
                literal.push(c);
            }
        }

        flush(&mut literal, &mut source, &mut normalized);
        source.push_str(r"\z");
        normalized.push_str(r"\z");

        let regex = Regex::new(&source)
            .map_err(|e| Error::parse(format!("Invalid wildcard pattern {segment:?}: {e}")))?;
        Ok(Compiled {
            regex,
            normalized,
            names,
        })
    }
}

/// One value captured by a wildcard, named unless the wildcard was a bare
/// `*`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    /// Wildcard name, absent for `*` wildcards
    pub name: Option<String>,
    /// Matched text
    pub value: String,
}

/// A successful lookup: the stored value plus any wildcard captures in
/// pattern order
#[derive(Debug, Clone)]
pub struct Hit<T> {
    /// The stored value
    pub value: T,
    /// Wildcard captures; empty for exact matches
    pub captures: Vec<Capture>,
}

struct PatternLeaf<T> {
    normalized: String,
    regex: Regex,
    names: Vec<Option<String>>,
    value: T,
}

struct Node<T> {
    children: DashMap<String, Arc<Node<T>>>,
    exact: DashMap<String, T>,
    patterns: RwLock<Vec<PatternLeaf<T>>>,
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self {
            children: DashMap::new(),
            exact: DashMap::new(),
            patterns: RwLock::new(Vec::new()),
        }
    }
}

/// A concurrent path trie with exact and wildcard leaves
pub struct CommandMap<T> {
    root: Arc<Node<T>>,
    syntax: WildcardSyntax,
}

impl<T> std::fmt::Debug for CommandMap<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandMap")
            .field("syntax", &self.syntax)
            .finish_non_exhaustive()
    }
}

impl<T> Default for CommandMap<T> {
    fn default() -> Self { Self::new(WildcardSyntax::default()) }
}

impl<T> CommandMap<T> {
    /// Construct an empty map with the given wildcard syntax
    #[must_use]
    pub fn new(syntax: WildcardSyntax) -> Self {
        Self {
            root: Arc::new(Node::default()),
            syntax,
        }
    }

    fn descend<S: AsRef<str>>(&self, init: &[S]) -> Option<Arc<Node<T>>> {
        let mut node = Arc::clone(&self.root);
        for seg in init {
            let next = node
                .children
                .get(seg.as_ref())
                .map(|r| Arc::clone(r.value()))?;
            node = next;
        }
        Some(node)
    }

    /// Insert a value at the given path
    ///
    /// When `wildcards` is set and the final segment uses wildcard syntax,
    /// the segment is compiled to an anchored case-sensitive regex and added
    /// to the node's pattern bucket; otherwise the segment is stored as an
    /// exact key.
    ///
    /// # Errors
    /// Returns `DuplicateCommand` if the exact key, or a pattern with the
    /// same normalized form, is already present, and `ParseFailed` if the
    /// pattern does not compile.
    pub fn insert<S: AsRef<str>>(
        &self,
        path: &[S],
        value: T,
        wildcards: bool,
    ) -> Result<(), Error> {
        let Some((last, init)) = path.split_last() else {
            return Err(Error::parse("Empty command path"));
        };
        let last = last.as_ref();

        let mut node = Arc::clone(&self.root);
        for seg in init {
            let next = Arc::clone(node.children.entry(seg.as_ref().to_owned()).or_default().value());
            node = next;
        }

        if wildcards && self.syntax.is_pattern(last) {
            let compiled = self.syntax.compile(last)?;
            let mut patterns = node.patterns.write().unwrap_or_else(|e| e.into_inner());
            if patterns.iter().any(|p| p.normalized == compiled.normalized) {
                return Err(Error::DuplicateCommand(last.to_owned()));
            }
            patterns.push(PatternLeaf {
                normalized: compiled.normalized,
                regex: compiled.regex,
                names: compiled.names,
                value,
            });
            Ok(())
        } else {
            match node.exact.entry(last.to_owned()) {
                Entry::Occupied(_) => Err(Error::DuplicateCommand(
                    path.iter()
                        .map(AsRef::as_ref)
                        .collect::<Vec<_>>()
                        .join(" "),
                )),
                Entry::Vacant(e) => {
                    e.insert(value);
                    Ok(())
                },
            }
        }
    }

    /// Remove the value at the given path, compiling the final segment as a
    /// pattern when applicable
    ///
    /// Interior nodes are deliberately left in place.
    pub fn remove<S: AsRef<str>>(&self, path: &[S]) -> bool {
        let Some((last, init)) = path.split_last() else {
            return false;
        };
        let last = last.as_ref();
        let Some(node) = self.descend(init) else {
            return false;
        };

        if self.syntax.is_pattern(last) {
            let Ok(compiled) = self.syntax.compile(last) else {
                return false;
            };
            let mut patterns = node.patterns.write().unwrap_or_else(|e| e.into_inner());
            let before = patterns.len();
            patterns.retain(|p| p.normalized != compiled.normalized);
            patterns.len() != before
        } else {
            node.exact.remove(last).is_some()
        }
    }
}

impl<T: Clone> CommandMap<T> {
    /// Look up the value at the given path
    ///
    /// Exact entries win over patterns; patterns are tried in insertion
    /// order and the first whose match spans the entire final segment wins.
    ///
    /// # Errors
    /// Returns `UnknownCommand` if nothing matches.
    pub fn lookup<S: AsRef<str>>(&self, path: &[S]) -> Result<Hit<T>, Error> {
        let Some((last, init)) = path.split_last() else {
            return Err(Error::UnknownCommand);
        };
        let last = last.as_ref();
        let node = self.descend(init).ok_or(Error::UnknownCommand)?;

        if let Some(value) = node.exact.get(last) {
            return Ok(Hit {
                value: value.clone(),
                captures: vec![],
            });
        }

        let patterns = node.patterns.read().unwrap_or_else(|e| e.into_inner());
        for leaf in patterns.iter() {
            if let Some(caps) = leaf.regex.captures(last) {
                let captures = leaf
                    .names
                    .iter()
                    .enumerate()
                    .map(|(i, name)| Capture {
                        name: name.clone(),
                        value: caps
                            .get(i + 1)
                            .map_or_else(String::new, |m| m.as_str().to_owned()),
                    })
                    .collect();
                return Ok(Hit {
                    value: leaf.value.clone(),
                    captures,
                });
            }
        }

        Err(Error::UnknownCommand)
    }
}
