//! Filename grammar
//!
//! Every file in an entry directory is named
//!
//! ```text
//! <basename>[.H_<hostname> | .G<NN>_<group>][.<extension>]
//! ```
//!
//! where the specificity token is only allowed for handlers that accept it
//! and the extension is required exactly when the handler declares a set of
//! extensions. A [`FilenameGrammar`] is compiled once per (handler, basename)
//! pair and answers three questions about a filename: does it parse, is its
//! specificity token malformed, and is it ignored.

use regex::Regex;

use crate::error::{Error, Result};
use crate::specificity::Specificity;

/// The pieces of a filename that parsed successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    pub basename: String,
    pub specificity: Specificity,
    pub extension: Option<String>,
}

impl ParsedName {
    /// Canonical filename for these pieces; the inverse of [`FilenameGrammar::parse`].
    pub fn format(&self) -> String {
        format_filename(&self.basename, &self.specificity, self.extension.as_deref())
    }
}

/// Build a filename from its parts.
pub fn format_filename(basename: &str, specificity: &Specificity, extension: Option<&str>) -> String {
    let mut name = String::from(basename);
    name.push_str(&specificity.suffix());
    if let Some(ext) = extension {
        name.push('.');
        name.push_str(ext);
    }
    name
}

/// Compiled filename grammar for one handler and one set of basenames.
#[derive(Debug, Clone)]
pub struct FilenameGrammar {
    strict: Regex,
    loose: Option<Regex>,
    ignore: Vec<String>,
}

impl FilenameGrammar {
    /// Compile the grammar.
    ///
    /// * `basenames` - literal basenames the file may start with
    /// * `specific` - whether `.H_`/`.G` tokens are allowed
    /// * `extensions` - required extension set; empty means no extension
    /// * `ignore` - suffixes that mark a file as deliberately skipped
    pub fn new(basenames: &[&str], specific: bool, extensions: &[&str], ignore: &[&str]) -> Result<Self> {
        let base = alternation(basenames);
        let ext = if extensions.is_empty() {
            String::new()
        } else {
            format!(r"\.(?P<extension>{})", alternation(extensions))
        };

        let strict = if specific {
            format!(
                r"^(?P<basename>{})(?:\.H_(?P<hostname>\S+?)|\.G(?P<prio>\d{{2}})_(?P<group>\S+?))?{}$",
                base, ext
            )
        } else {
            format!(r"^(?P<basename>{}){}$", base, ext)
        };

        // Same shape with the token contents relaxed, so that a file which is
        // clearly meant for this handler but carries a bad token is reported
        // rather than silently passed over.
        let loose = if specific {
            Some(Regex::new(&format!(
                r"^({})(\.H_(?P<hostname>\S*?)|\.G(?P<prio>[^_.]*)_(?P<group>\S*?)){}$",
                base, ext
            ))?)
        } else {
            None
        };

        Ok(Self {
            strict: Regex::new(&strict)?,
            loose,
            ignore: ignore.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Parse `filename`.
    ///
    /// Returns `Ok(None)` when the filename is not in this grammar at all and
    /// `Err(MalformedSpecificity)` when it is, but its specificity token is
    /// unusable.
    pub fn parse(&self, filename: &str) -> Result<Option<ParsedName>> {
        if let Some(caps) = self.strict.captures(filename) {
            let specificity = if let Some(host) = caps.name("hostname") {
                Specificity::host(host.as_str())
            } else if let (Some(prio), Some(group)) = (caps.name("prio"), caps.name("group")) {
                let priority = prio.as_str().parse::<u32>().map_err(|e| Error::MalformedSpecificity {
                    filename: filename.to_string(),
                    message: format!("priority '{}': {}", prio.as_str(), e),
                })?;
                Specificity::group(group.as_str(), priority)
            } else {
                Specificity::All
            };
            return Ok(Some(ParsedName {
                basename: caps["basename"].to_string(),
                specificity,
                extension: caps.name("extension").map(|m| m.as_str().to_string()),
            }));
        }

        if let Some(caps) = self.loose.as_ref().and_then(|re| re.captures(filename)) {
            let message = if let Some(host) = caps.name("hostname") {
                if host.as_str().is_empty() {
                    "empty hostname".to_string()
                } else {
                    format!("invalid hostname '{}'", host.as_str())
                }
            } else {
                let prio = caps.name("prio").map(|m| m.as_str()).unwrap_or_default();
                let group = caps.name("group").map(|m| m.as_str()).unwrap_or_default();
                if group.is_empty() {
                    "empty group name".to_string()
                } else {
                    format!("priority '{}' is not a two-digit number", prio)
                }
            };
            return Err(Error::MalformedSpecificity {
                filename: filename.to_string(),
                message,
            });
        }

        Ok(None)
    }

    /// Whether the grammar accepts `filename`.
    pub fn handles(&self, filename: &str) -> bool {
        self.strict.is_match(filename)
    }

    /// Whether `filename` ends in one of the ignored suffixes.
    ///
    /// An ignored file is skipped by every handler, not deferred to the next.
    pub fn ignores(&self, filename: &str) -> bool {
        self.ignore
            .iter()
            .any(|suffix| filename.ends_with(&format!(".{}", suffix)))
    }
}

fn alternation(items: &[&str]) -> String {
    items
        .iter()
        .map(|item| regex::escape(item))
        .collect::<Vec<_>>()
        .join("|")
}
