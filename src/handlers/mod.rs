//! # Handler Taxonomy
//!
//! Every candidate file plays exactly one of four roles in producing a bound
//! entry:
//!
//! - **Generator**: produces the initial content (`motd`, `motd.genshi`).
//! - **Filter**: transforms the generated content (`motd.cat`, `motd.diff`).
//! - **Info**: supplies default attributes such as owner and permissions
//!   (`info.xml`, legacy `info` / `:info`).
//! - **Verifier**: validates the final content (`:test`).
//!
//! A [`Handler`] describes which filenames it claims (basenames, extensions,
//! ignored suffixes, whether specificity tokens are allowed) and exposes its
//! role through [`Role`]. Handlers are stateless: the candidate they operate
//! on is passed in on every call, so the entry index stays the only owner of
//! file data.
//!
//! The [`HandlerRegistry`] is an explicit, ordered list. When a new file
//! appears, handlers are consulted in registry order and the first whose
//! grammar accepts the filename claims it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::candidate::CandidateFile;
use crate::entry::{AbstractEntry, Data};
use crate::error::Result;
use crate::grammar::FilenameGrammar;
use crate::metadata::ClientMetadata;

pub mod cat;
pub mod command;
pub mod diff;
pub mod info_xml;
pub mod legacy_info;
pub mod plaintext;
pub mod template;

pub use cat::CatFilter;
pub use command::CommandVerifier;
pub use diff::DiffFilter;
pub use info_xml::InfoXml;
pub use legacy_info::LegacyInfo;
pub use plaintext::PlaintextGenerator;
pub use template::{TemplateContext, TemplateGenerator, TemplateRenderer, VariableRenderer};

/// The four roles, without behaviour attached
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HandlerRole {
    Generator,
    Filter,
    Info,
    Verifier,
}

impl fmt::Display for HandlerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerRole::Generator => write!(f, "generator"),
            HandlerRole::Filter => write!(f, "filter"),
            HandlerRole::Info => write!(f, "info"),
            HandlerRole::Verifier => write!(f, "verifier"),
        }
    }
}

/// A handler's role together with its behaviour
pub enum Role<'a> {
    Generator(&'a dyn Generator),
    Filter(&'a dyn Filter),
    Info(&'a dyn Info),
    Verifier(&'a dyn Verifier),
}

impl Role<'_> {
    pub fn kind(&self) -> HandlerRole {
        match self {
            Role::Generator(_) => HandlerRole::Generator,
            Role::Filter(_) => HandlerRole::Filter,
            Role::Info(_) => HandlerRole::Info,
            Role::Verifier(_) => HandlerRole::Verifier,
        }
    }
}

/// Filename claims and role of one handler type
pub trait Handler: Send + Sync {
    /// Stable name used in logs, lint output and verifier grouping
    fn name(&self) -> &'static str;

    /// Fixed basenames this handler claims. Empty means the entry's own
    /// basename (the name of its directory).
    fn basenames(&self) -> &'static [&'static str] {
        &[]
    }

    /// Extensions that must follow the specificity token. Empty means none.
    fn extensions(&self) -> &'static [&'static str] {
        &[]
    }

    /// Suffixes that mark a file as deliberately skipped by every handler.
    fn ignore(&self) -> &'static [&'static str] {
        &[]
    }

    /// Whether `.H_` / `.G` specificity tokens are allowed.
    fn specific(&self) -> bool {
        true
    }

    fn deprecated(&self) -> bool {
        false
    }

    fn role(&self) -> Role<'_>;

    /// Sanity-check a freshly indexed candidate. Failures are logged by the
    /// index; the candidate is kept so a later change can fix it.
    fn check(&self, _file: &CandidateFile) -> Result<()> {
        Ok(())
    }
}

/// Produces the initial content of an entry
pub trait Generator: Send + Sync {
    fn generate(&self, file: &CandidateFile, entry: &AbstractEntry, client: &ClientMetadata) -> Result<Data>;
}

/// Transforms generated content; never touches attributes
pub trait Filter: Send + Sync {
    fn modify(
        &self,
        file: &CandidateFile,
        entry: &AbstractEntry,
        client: &ClientMetadata,
        data: Data,
    ) -> Result<Data>;
}

/// Supplies attributes for an entry
pub trait Info: Send + Sync {
    fn info(
        &self,
        file: &CandidateFile,
        entry: &AbstractEntry,
        client: &ClientMetadata,
    ) -> Result<BTreeMap<String, String>>;
}

/// Validates the final content and attributes of an entry
pub trait Verifier: Send + Sync {
    fn verify(&self, file: &CandidateFile, entry: &AbstractEntry, client: &ClientMetadata, data: &[u8]) -> Result<()>;
}

/// Human description of the files a handler claims, e.g. `.cat` or `info/:info`
pub fn file_description(handler: &dyn Handler) -> String {
    if !handler.basenames().is_empty() {
        handler.basenames().join("/")
    } else if !handler.extensions().is_empty() {
        format!(".{}", handler.extensions().join("/."))
    } else {
        handler.name().to_string()
    }
}

/// A handler with its grammar compiled for one entry basename
#[derive(Clone)]
pub struct CompiledHandler {
    pub handler: Arc<dyn Handler>,
    pub grammar: FilenameGrammar,
}

/// Ordered set of handler types consulted for every new file
#[derive(Clone)]
pub struct HandlerRegistry {
    handlers: Vec<Arc<dyn Handler>>,
}

impl HandlerRegistry {
    /// A registry with no handlers
    pub fn empty() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// The built-in handlers, rendering templates with [`VariableRenderer`]
    pub fn builtin() -> Self {
        Self::builtin_with_renderer(Arc::new(VariableRenderer))
    }

    /// The built-in handlers with a custom template renderer.
    ///
    /// Handlers with extensions or fixed basenames come first; the plaintext
    /// generator accepts any token after the basename and must come last.
    pub fn builtin_with_renderer(renderer: Arc<dyn TemplateRenderer>) -> Self {
        Self::empty()
            .with_handler(CatFilter)
            .with_handler(DiffFilter)
            .with_handler(TemplateGenerator::new(renderer))
            .with_handler(InfoXml)
            .with_handler(LegacyInfo)
            .with_handler(CommandVerifier)
            .with_handler(PlaintextGenerator)
    }

    /// Append a handler; it is consulted after every handler already present
    pub fn with_handler<H: Handler + 'static>(mut self, handler: H) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Insert a handler ahead of every handler already present
    pub fn with_handler_first<H: Handler + 'static>(mut self, handler: H) -> Self {
        self.handlers.insert(0, Arc::new(handler));
        self
    }

    pub fn handlers(&self) -> &[Arc<dyn Handler>] {
        &self.handlers
    }

    /// Handler names in consultation order
    pub fn names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// Compile every handler's grammar for the entry basename `basename`
    pub fn compile(&self, basename: &str) -> Result<Vec<CompiledHandler>> {
        self.handlers
            .iter()
            .map(|handler| {
                let basenames: Vec<&str> = if handler.basenames().is_empty() {
                    vec![basename]
                } else {
                    handler.basenames().to_vec()
                };
                let grammar = FilenameGrammar::new(
                    &basenames,
                    handler.specific(),
                    handler.extensions(),
                    handler.ignore(),
                )?;
                Ok(CompiledHandler {
                    handler: Arc::clone(handler),
                    grammar,
                })
            })
            .collect()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_order_puts_plaintext_last() {
        let names = HandlerRegistry::builtin().names();
        assert_eq!(names.last(), Some(&"PlaintextGenerator"));
        assert_eq!(names.first(), Some(&"CatFilter"));
        assert_eq!(names.len(), 7);
    }

    #[test]
    fn test_compile_uses_entry_basename_or_fixed_names() {
        let compiled = HandlerRegistry::builtin().compile("motd").unwrap();
        let by_name = |name: &str| {
            compiled
                .iter()
                .find(|c| c.handler.name() == name)
                .unwrap()
                .grammar
                .clone()
        };
        assert!(by_name("PlaintextGenerator").handles("motd.H_web01"));
        assert!(by_name("InfoXml").handles("info.xml"));
        assert!(!by_name("InfoXml").handles("motd"));
        assert!(by_name("CommandVerifier").handles(":test.G10_web"));
        assert!(by_name("TemplateGenerator").handles("motd.cheetah"));
    }

    #[test]
    fn test_file_description() {
        assert_eq!(file_description(&CatFilter), ".cat");
        assert_eq!(file_description(&LegacyInfo), "info/:info");
    }

    #[test]
    fn test_roles() {
        assert_eq!(CatFilter.role().kind(), HandlerRole::Filter);
        assert_eq!(InfoXml.role().kind(), HandlerRole::Info);
        assert_eq!(CommandVerifier.role().kind(), HandlerRole::Verifier);
        assert_eq!(PlaintextGenerator.role().kind(), HandlerRole::Generator);
    }
}
