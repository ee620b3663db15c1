//! Writing client data back into the repository
//!
//! When a client's copy of an entry should become the repository's copy,
//! [`list_accept_choices`] offers the files it could be written to and
//! [`write_update`] writes it, together with an `info.xml` when the
//! ownership or permissions changed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::info;
use xot::Xot;

use crate::encoding::SourceEncoding;
use crate::error::{Error, Result};
use crate::filesystem::FileSource;
use crate::grammar::format_filename;
use crate::handlers::HandlerRole;
use crate::index::EntrySnapshot;
use crate::metadata::ClientMetadata;
use crate::specificity::Specificity;
use crate::stages::select_most_specific;

/// Legacy metadata files replaced by `info.xml` on update
const LEGACY_INFO_FILES: &[&str] = &["info", ":info"];

/// Largest priority a `G` token can carry
const MAX_GROUP_PRIORITY: u32 = 99;

/// Extensions of template generators a pulled file must not shadow
const TEMPLATE_EXTENSIONS: &[&str] = &["genshi", "cheetah"];

/// Content and metadata taken from a client.
///
/// Without `text` only the metadata is written and the content file is left
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullData {
    pub text: Option<String>,
    pub owner: Option<String>,
    pub group: Option<String>,
    pub perms: Option<String>,
}

impl PullData {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// An update carrying only ownership and permissions
    pub fn metadata_only() -> Self {
        Self::default()
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_perms(mut self, perms: impl Into<String>) -> Self {
        self.perms = Some(perms.into());
        self
    }

    /// The metadata attributes that were supplied
    pub fn metadata_updates(&self) -> BTreeMap<String, String> {
        [("owner", &self.owner), ("group", &self.group), ("perms", &self.perms)]
            .into_iter()
            .filter_map(|(key, value)| value.as_ref().map(|v| (key.to_string(), v.clone())))
            .collect()
    }
}

/// Files written and removed by an update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullOutcome {
    pub written: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
}

/// Specificities pulled data for `client` may be written as.
///
/// The current best generator's specificity comes first, followed by a new
/// host-specific file unless the best one already is host-specific.
pub fn list_accept_choices(snapshot: &EntrySnapshot<'_>, client: &ClientMetadata) -> Result<Vec<Specificity>> {
    let generators = snapshot.query(HandlerRole::Generator, client);
    let best = select_most_specific(&generators, client).ok_or_else(|| Error::MissingGenerator {
        entry: snapshot.name().to_string(),
    })?;
    let mut choices = vec![best.winner.specificity.clone()];
    if !best.winner.specificity.is_host() {
        choices.push(Specificity::host(client.hostname.clone()));
    }
    Ok(choices)
}

/// Path of the plain file for `specificity` in the entry directory `dir`.
pub fn build_filename(dir: &Path, basename: &str, specificity: &Specificity) -> PathBuf {
    dir.join(format_filename(basename, specificity, None))
}

/// Write `data` as the file for `specificity`.
///
/// Group priorities above 99 are refused since they cannot be written as a
/// two-digit `G` token.
pub fn write_update(
    snapshot: &EntrySnapshot<'_>,
    source: &dyn FileSource,
    specificity: &Specificity,
    data: &PullData,
    encoding: SourceEncoding,
    defaults: &BTreeMap<String, String>,
) -> Result<PullOutcome> {
    let entry = snapshot.name().to_string();
    let target = build_filename(snapshot.path(), snapshot.basename(), specificity);
    let fail = |message: String| Error::Pull {
        entry: entry.clone(),
        message,
    };

    if let Specificity::Group { priority, .. } = specificity {
        if *priority > MAX_GROUP_PRIORITY {
            return Err(fail(format!(
                "group priority {} is above {}",
                priority, MAX_GROUP_PRIORITY
            )));
        }
    }

    let updates = data.metadata_updates();
    if data.text.is_none() && updates.is_empty() {
        return Err(fail("nothing to write".to_string()));
    }

    let mut outcome = PullOutcome::default();
    if let Some(text) = &data.text {
        for ext in TEMPLATE_EXTENSIONS {
            let template = target.with_file_name(format!("{}.{}", file_name(&target), ext));
            if source.exists(&template) {
                return Err(fail(format!(
                    "{} is generated from {}; edit the template instead",
                    target.display(),
                    template.display()
                )));
            }
        }

        let bytes = encoding
            .encode(text)
            .ok_or_else(|| fail(format!("data cannot be represented as {}", encoding)))?;
        source.write(&target, &bytes)?;
        info!("Wrote file {}", target.display());
        outcome.written.push(target);
    }

    if updates.is_empty() {
        return Ok(outcome);
    }
    for legacy in LEGACY_INFO_FILES {
        let path = snapshot.path().join(legacy);
        if source.exists(&path) {
            info!("Removing {} and replacing with info.xml", path.display());
            source.remove(&path)?;
            outcome.removed.push(path);
        }
    }
    let mut attributes = defaults.clone();
    attributes.extend(updates);
    let document = info_xml(&attributes)?;
    let info_path = snapshot.path().join("info.xml");
    source.write(&info_path, document.as_bytes())?;
    info!("Wrote file {}", info_path.display());
    outcome.written.push(info_path);
    Ok(outcome)
}

/// Serialise `<FileInfo><Info .../></FileInfo>` with the given attributes.
pub fn info_xml(attributes: &BTreeMap<String, String>) -> Result<String> {
    let mut xot = Xot::new();
    let file_info_name = xot.add_name("FileInfo");
    let info_name = xot.add_name("Info");
    let file_info = xot.new_element(file_info_name);
    let root = xot.new_document_with_element(file_info).map_err(xml_error)?;
    let info = xot.new_element(info_name);
    for (key, value) in attributes {
        let name = xot.add_name(key);
        xot.set_attribute(info, name, value.clone());
    }
    xot.append(file_info, info).map_err(xml_error)?;
    let mut document = xot.to_string(root).map_err(xml_error)?;
    document.push('\n');
    Ok(document)
}

fn xml_error(err: impl std::fmt::Display) -> Error {
    Error::InfoFile {
        path: "info.xml".to_string(),
        message: err.to_string(),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
