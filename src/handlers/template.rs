//! Template generators
//!
//! `.genshi` and `.cheetah` files are rendered per client. The template
//! language itself is pluggable through [`TemplateRenderer`]; the built-in
//! [`VariableRenderer`] only substitutes `${name}` placeholders.

use std::collections::BTreeMap;
use std::sync::Arc;

use regex::Regex;

use crate::candidate::CandidateFile;
use crate::entry::{AbstractEntry, Data};
use crate::error::{Error, Result};
use crate::handlers::{Generator, Handler, Role};
use crate::metadata::ClientMetadata;

/// Variables visible to a template
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateContext {
    pub vars: BTreeMap<String, String>,
}

impl TemplateContext {
    /// Context for rendering `file` as `entry` for `client`.
    ///
    /// Provides `hostname`, `groups` (sorted, comma separated), `path` (the
    /// entry's realname), `source_path` and `group:<name>` for each group.
    pub fn new(file: &CandidateFile, entry: &AbstractEntry, client: &ClientMetadata) -> Self {
        let mut vars = BTreeMap::new();
        vars.insert("hostname".to_string(), client.hostname.clone());
        vars.insert(
            "groups".to_string(),
            client.group_names().collect::<Vec<_>>().join(","),
        );
        vars.insert("path".to_string(), entry.realname().to_string());
        vars.insert("source_path".to_string(), file.path.display().to_string());
        for group in client.group_names() {
            vars.insert(format!("group:{}", group), "true".to_string());
        }
        Self { vars }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }
}

/// Renders template source to output text
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, source: &str, context: &TemplateContext) -> Result<String>;
}

/// Substitutes `${name}` placeholders; `$$` is a literal dollar sign
#[derive(Debug, Clone, Copy, Default)]
pub struct VariableRenderer;

const PLACEHOLDER: &str = r"\$\$|\$\{([A-Za-z_][A-Za-z0-9_:.\-]*)\}";

impl TemplateRenderer for VariableRenderer {
    fn render(&self, source: &str, context: &TemplateContext) -> Result<String> {
        let placeholder = Regex::new(PLACEHOLDER)?;
        let mut output = String::with_capacity(source.len());
        let mut last = 0;
        for caps in placeholder.captures_iter(source) {
            let whole = caps.get(0).map(|m| (m.start(), m.end())).unwrap_or((last, last));
            output.push_str(&source[last..whole.0]);
            match caps.get(1) {
                Some(name) => {
                    let value = context.get(name.as_str()).ok_or_else(|| Error::Template {
                        message: "Undefined variable".to_string(),
                        variable: Some(name.as_str().to_string()),
                    })?;
                    output.push_str(value);
                }
                None => output.push('$'),
            }
            last = whole.1;
        }
        output.push_str(&source[last..]);
        Ok(output)
    }
}

/// Generator for `.genshi` and `.cheetah` templates
#[derive(Clone)]
pub struct TemplateGenerator {
    renderer: Arc<dyn TemplateRenderer>,
}

impl TemplateGenerator {
    pub fn new(renderer: Arc<dyn TemplateRenderer>) -> Self {
        Self { renderer }
    }
}

impl Handler for TemplateGenerator {
    fn name(&self) -> &'static str {
        "TemplateGenerator"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["genshi", "cheetah"]
    }

    fn ignore(&self) -> &'static [&'static str] {
        &["genshi_include"]
    }

    fn role(&self) -> Role<'_> {
        Role::Generator(self)
    }
}

impl Generator for TemplateGenerator {
    fn generate(&self, file: &CandidateFile, entry: &AbstractEntry, client: &ClientMetadata) -> Result<Data> {
        let source = file.encoding.decode(&file.data).map_err(|(_, message)| Error::Template {
            message: format!("cannot decode {} as {}: {}", file.filename, file.encoding, message),
            variable: None,
        })?;
        let context = TemplateContext::new(file, entry, client);
        self.renderer.render(&source, &context).map(Data::Text)
    }
}
