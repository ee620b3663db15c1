//! `info.xml` metadata files
//!
//! ```xml
//! <FileInfo>
//!   <Group name="secure">
//!     <Info owner="root" group="root" perms="0600"/>
//!   </Group>
//!   <Info owner="root" group="root" perms="0644"/>
//! </FileInfo>
//! ```
//!
//! The first `<Info>` in document order that applies to the client wins.
//! `<Group>` and `<Client>` scope their children to a group or host, and
//! `negate="true"` inverts the test.

use std::collections::BTreeMap;

use xot::{Node, Xot};

use crate::candidate::CandidateFile;
use crate::entry::AbstractEntry;
use crate::error::{Error, Result};
use crate::handlers::{Handler, Info, Role};
use crate::metadata::ClientMetadata;

/// Attributes an `<Info>` element may carry
pub const INFO_ATTRIBUTES: &[&str] = &[
    "owner",
    "group",
    "perms",
    "secontext",
    "important",
    "paranoid",
    "sensitive",
    "encoding",
    "mtime",
];

/// Info supplier backed by an `info.xml` document
#[derive(Debug, Clone, Copy, Default)]
pub struct InfoXml;

impl Handler for InfoXml {
    fn name(&self) -> &'static str {
        "InfoXml"
    }

    fn basenames(&self) -> &'static [&'static str] {
        &["info.xml"]
    }

    fn specific(&self) -> bool {
        false
    }

    fn role(&self) -> Role<'_> {
        Role::Info(self)
    }

    fn check(&self, file: &CandidateFile) -> Result<()> {
        let mut xot = Xot::new();
        parse_document(&mut xot, file).map(|_| ())
    }
}

impl Info for InfoXml {
    fn info(
        &self,
        file: &CandidateFile,
        _entry: &AbstractEntry,
        client: &ClientMetadata,
    ) -> Result<BTreeMap<String, String>> {
        let mut xot = Xot::new();
        let root = parse_document(&mut xot, file)?;
        let names = Names::new(&mut xot);
        Ok(find_info(&xot, &names, root, client).unwrap_or_default())
    }
}

struct Names {
    info: xot::NameId,
    group: xot::NameId,
    client: xot::NameId,
    name: xot::NameId,
    negate: xot::NameId,
    attributes: Vec<(&'static str, xot::NameId)>,
}

impl Names {
    fn new(xot: &mut Xot) -> Self {
        Self {
            info: xot.add_name("Info"),
            group: xot.add_name("Group"),
            client: xot.add_name("Client"),
            name: xot.add_name("name"),
            negate: xot.add_name("negate"),
            attributes: INFO_ATTRIBUTES
                .iter()
                .map(|attr| (*attr, xot.add_name(attr)))
                .collect(),
        }
    }
}

/// Parse the candidate and return its `<FileInfo>` element
fn parse_document(xot: &mut Xot, file: &CandidateFile) -> Result<Node> {
    let invalid = |message: String| Error::InfoFile {
        path: file.path.display().to_string(),
        message,
    };
    let root = xot.parse(&file.text()).map_err(|e| invalid(e.to_string()))?;
    let element = xot
        .document_element(root)
        .map_err(|e| invalid(e.to_string()))?;
    let file_info = xot.add_name("FileInfo");
    if xot.element(element).map(|e| e.name()) != Some(file_info) {
        return Err(invalid("root element must be <FileInfo>".to_string()));
    }
    Ok(element)
}

fn find_info(
    xot: &Xot,
    names: &Names,
    parent: Node,
    client: &ClientMetadata,
) -> Option<BTreeMap<String, String>> {
    for child in xot.children(parent) {
        let Some(element) = xot.element(child) else {
            continue;
        };
        let name = element.name();
        if name == names.info {
            let attributes = names
                .attributes
                .iter()
                .filter_map(|(key, id)| {
                    xot.get_attribute(child, *id)
                        .map(|value| (key.to_string(), value.to_string()))
                })
                .collect();
            return Some(attributes);
        }
        if name == names.group || name == names.client {
            let target = xot.get_attribute(child, names.name).unwrap_or_default();
            let negate = xot
                .get_attribute(child, names.negate)
                .is_some_and(|v| v.eq_ignore_ascii_case("true"));
            let applies = if name == names.group {
                client.in_group(target)
            } else {
                client.hostname == target
            };
            if applies != negate {
                if let Some(found) = find_info(xot, names, child, client) {
                    return Some(found);
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::testing::candidate;
    use crate::specificity::Specificity;

    const DOC: &str = r#"<FileInfo>
  <Client name="db01">
    <Info owner="postgres" group="postgres" perms="0600"/>
  </Client>
  <Group name="secure">
    <Info owner="root" group="wheel" perms="0640"/>
  </Group>
  <Group name="legacy" negate="true">
    <Info owner="root" group="root" perms="0644" paranoid="true"/>
  </Group>
</FileInfo>"#;

    fn info_for(client: &ClientMetadata) -> BTreeMap<String, String> {
        let file = candidate("info.xml", Specificity::All, InfoXml, DOC);
        InfoXml
            .info(&file, &AbstractEntry::path("/etc/motd"), client)
            .unwrap()
    }

    #[test]
    fn test_client_scope_wins_first() {
        let info = info_for(&ClientMetadata::new("db01").with_group("secure", 1));
        assert_eq!(info.get("owner").map(String::as_str), Some("postgres"));
        assert_eq!(info.get("perms").map(String::as_str), Some("0600"));
    }

    #[test]
    fn test_group_scope() {
        let info = info_for(&ClientMetadata::new("web01").with_group("secure", 1));
        assert_eq!(info.get("group").map(String::as_str), Some("wheel"));
    }

    #[test]
    fn test_negated_group() {
        let info = info_for(&ClientMetadata::new("web01"));
        assert_eq!(info.get("paranoid").map(String::as_str), Some("true"));

        let info = info_for(&ClientMetadata::new("web01").with_group("legacy", 1));
        assert!(info.is_empty());
    }

    #[test]
    fn test_malformed_document() {
        let file = candidate("info.xml", Specificity::All, InfoXml, "<FileInfo><Info>");
        let err = InfoXml.check(&file).unwrap_err();
        assert!(matches!(err, Error::InfoFile { .. }));
    }

    #[test]
    fn test_wrong_root_element() {
        let file = candidate("info.xml", Specificity::All, InfoXml, "<Info owner=\"root\"/>");
        assert!(InfoXml.check(&file).is_err());
    }
}
