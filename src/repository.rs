//! # Cfg Repository
//!
//! This module provides [`CfgRepository`], the entry point for embedding the
//! repository. It owns one [`EntrySet`] per entry directory, routes
//! filesystem events to them and binds entries for clients.
//!
//! ## Design
//!
//! The map from entry name to entry set is behind a reader-writer lock that
//! is only held long enough to find or create a set. Each set has its own
//! lock, so events for one entry never block binds of another, and a bind
//! holds its set's read lock from the first stage to the last.
//!
//! All file access goes through a [`FileSource`]. [`CfgRepository::new`]
//! reads the host filesystem; tests and embedders can pass a
//! [`MemoryFS`](crate::filesystem::MemoryFS) to
//! [`CfgRepository::with_source`] instead.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::config::Settings;
use crate::entry::{AbstractEntry, BoundResult};
use crate::error::{Error, Result};
use crate::filesystem::{DiskSource, FileSource};
use crate::handlers::{HandlerRegistry, HandlerRole};
use crate::index::{EntrySet, EventOutcome};
use crate::metadata::ClientMetadata;
use crate::monitor::{EventCode, FileEvent, PseudoMonitor};
use crate::path::{dir_for_entry, entry_name_for_dir, is_at_or_below};
use crate::pull::{self, PullData, PullOutcome};
use crate::specificity::Specificity;
use crate::stages::{pipeline, BindOptions};

/// The live index of a Cfg tree
pub struct CfgRepository {
    root: PathBuf,
    registry: HandlerRegistry,
    source: Arc<dyn FileSource>,
    options: BindOptions,
    entries: RwLock<BTreeMap<String, Arc<EntrySet>>>,
}

impl CfgRepository {
    /// A repository over the host filesystem, configured by `settings`.
    ///
    /// The index starts empty; call [`load`](Self::load) or feed events.
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self::with_source(
            settings.repository.clone(),
            Arc::new(DiskSource),
            HandlerRegistry::builtin(),
            BindOptions::from_settings(settings)?,
        ))
    }

    pub fn with_source(
        root: impl Into<PathBuf>,
        source: Arc<dyn FileSource>,
        registry: HandlerRegistry,
        options: BindOptions,
    ) -> Self {
        Self {
            root: root.into(),
            registry,
            source,
            options,
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn with_options(mut self, options: BindOptions) -> Self {
        self.options = options;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn options(&self) -> &BindOptions {
        &self.options
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Index every file under the root with [`PseudoMonitor`].
    ///
    /// Returns the number of files that were indexed.
    pub fn load(&self) -> Result<usize> {
        if !self.source.is_dir(&self.root) {
            return Err(Error::Config {
                message: format!("repository {} is not a directory", self.root.display()),
                hint: Some("set `repository` in cfg-repo.toml or pass --repository".to_string()),
            });
        }
        let events = PseudoMonitor::new(&self.root).scan()?;
        let indexed = self
            .handle_events(events)
            .iter()
            .filter(|outcome| matches!(outcome, EventOutcome::Indexed { .. }))
            .count();
        info!("Indexed {} files in {}", indexed, self.root.display());
        Ok(indexed)
    }

    /// Apply events in order.
    pub fn handle_events(&self, events: impl IntoIterator<Item = FileEvent>) -> Vec<EventOutcome> {
        events.into_iter().map(|event| self.handle_event(&event)).collect()
    }

    /// Route one event to the entry set of the file's directory.
    ///
    /// A deleted directory drops every entry set at or below it. The first
    /// file in a directory creates its entry set.
    pub fn handle_event(&self, event: &FileEvent) -> EventOutcome {
        debug!("Handling event {}", event);
        if event.code == EventCode::Deleted {
            if let Some(dropped) = self.drop_entries_below(&event.path) {
                return dropped;
            }
        } else if self.source.is_dir(&event.path) {
            return EventOutcome::Ignored;
        }

        let (Some(dir), Some(filename)) = (event.path.parent(), event.path.file_name()) else {
            return EventOutcome::Ignored;
        };
        let filename = filename.to_string_lossy();
        let Some(name) = entry_name_for_dir(&self.root, dir) else {
            let err = Error::UnclassifiedFile {
                basename: self.root.display().to_string(),
                filename: filename.to_string(),
            };
            warn!("Cfg: {} is not inside an entry directory", event.path.display());
            return EventOutcome::Rejected(err);
        };

        let set = if event.code == EventCode::Deleted {
            match self.entry_set(&name) {
                Ok(Some(set)) => set,
                Ok(None) => {
                    warn!("Cfg: got 'deleted' event for unknown file {}", event.path.display());
                    return EventOutcome::Ignored;
                }
                Err(err) => return EventOutcome::Rejected(err),
            }
        } else {
            match self.entry_set_or_create(&name, dir) {
                Ok(set) => set,
                Err(err) => return EventOutcome::Rejected(err),
            }
        };
        set.handle_event(event.code, &filename, self.source.as_ref())
    }

    fn drop_entries_below(&self, path: &Path) -> Option<EventOutcome> {
        let name = entry_name_for_dir(&self.root, path)?;
        let mut entries = match self.entries.write() {
            Ok(entries) => entries,
            Err(_) => return Some(EventOutcome::Rejected(Error::poisoned("entry map"))),
        };
        let below: Vec<String> = entries
            .keys()
            .filter(|key| is_at_or_below(key, &name))
            .cloned()
            .collect();
        if below.is_empty() {
            return None;
        }
        for key in below {
            debug!("Cfg: dropping entry set {}", key);
            entries.remove(&key);
        }
        Some(EventOutcome::Removed)
    }

    fn entry_set_or_create(&self, name: &str, dir: &Path) -> Result<Arc<EntrySet>> {
        if let Some(set) = self.entry_set(name)? {
            return Ok(set);
        }
        let mut entries = self.entries.write().map_err(|_| Error::poisoned("entry map"))?;
        if let Some(set) = entries.get(name) {
            return Ok(Arc::clone(set));
        }
        debug!("Cfg: new entry set {} at {}", name, dir.display());
        let set = Arc::new(EntrySet::new(name, dir, &self.registry, self.options.encoding)?);
        entries.insert(name.to_string(), Arc::clone(&set));
        Ok(set)
    }

    /// The entry set for `name`, if any file of it has been seen
    pub fn entry_set(&self, name: &str) -> Result<Option<Arc<EntrySet>>> {
        let entries = self.entries.read().map_err(|_| Error::poisoned("entry map"))?;
        Ok(entries.get(name).cloned())
    }

    fn require(&self, name: &str) -> Result<Arc<EntrySet>> {
        self.entry_set(name)?.ok_or_else(|| Error::UnknownEntry {
            entry: name.to_string(),
        })
    }

    /// Names of every known entry, sorted
    pub fn entry_names(&self) -> Result<Vec<String>> {
        let entries = self.entries.read().map_err(|_| Error::poisoned("entry map"))?;
        Ok(entries.keys().cloned().collect())
    }

    /// Bind `entry` for `client`.
    ///
    /// On success the entry receives the bound attributes and content; on
    /// failure it is left untouched.
    pub fn bind(&self, entry: &mut AbstractEntry, client: &ClientMetadata) -> Result<BoundResult> {
        let set = self.require(&entry.name)?;
        let snapshot = set.snapshot()?;
        pipeline::bind(&snapshot, entry, client, &self.options)
    }

    /// Bind every known entry as a `Path` for `client`, in parallel.
    pub fn bind_all(&self, client: &ClientMetadata) -> Result<Vec<(String, Result<BoundResult>)>> {
        let entries = self.entry_names()?.into_iter().map(AbstractEntry::path).collect();
        Ok(self.bind_many(entries, client))
    }

    /// Bind several entries for `client` in parallel, keeping their order.
    pub fn bind_many(&self, entries: Vec<AbstractEntry>, client: &ClientMetadata) -> Vec<(String, Result<BoundResult>)> {
        entries
            .into_par_iter()
            .map(|mut entry| {
                let result = self.bind(&mut entry, client);
                (entry.name, result)
            })
            .collect()
    }

    /// Whether some generator for `name` applies to `client`.
    pub fn has_generator(&self, name: &str, client: &ClientMetadata) -> Result<bool> {
        let Some(set) = self.entry_set(name)? else {
            return Ok(false);
        };
        let snapshot = set.snapshot()?;
        Ok(!snapshot.query(HandlerRole::Generator, client).is_empty())
    }

    /// Specificities pulled data for `name` could be written as.
    pub fn list_accept_choices(&self, name: &str, client: &ClientMetadata) -> Result<Vec<Specificity>> {
        let set = self.require(name)?;
        let snapshot = set.snapshot()?;
        pull::list_accept_choices(&snapshot, client)
    }

    /// Path the plain file for `specificity` of entry `name` lives at.
    pub fn build_filename(&self, name: &str, specificity: &Specificity) -> PathBuf {
        let dir = dir_for_entry(&self.root, name);
        pull::build_filename(&dir, crate::path::basename_of(name), specificity)
    }

    /// Write pulled data for `name` and bring the index up to date.
    pub fn write_update(&self, name: &str, specificity: &Specificity, data: &PullData) -> Result<PullOutcome> {
        let set = self.require(name)?;
        let (outcome, known) = {
            let snapshot = set.snapshot()?;
            let outcome = pull::write_update(
                &snapshot,
                self.source.as_ref(),
                specificity,
                data,
                self.options.encoding,
                &self.options.defaults,
            )?;
            let known: Vec<bool> = outcome
                .written
                .iter()
                .map(|path| {
                    path.file_name()
                        .is_some_and(|f| snapshot.get(&f.to_string_lossy()).is_some())
                })
                .collect();
            (outcome, known)
        };

        for path in &outcome.removed {
            self.handle_event(&FileEvent::deleted(path));
        }
        for (path, known) in outcome.written.iter().zip(known) {
            let event = if known {
                FileEvent::changed(path)
            } else {
                FileEvent::created(path)
            };
            self.handle_event(&event);
        }
        Ok(outcome)
    }
}

impl std::fmt::Debug for CfgRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CfgRepository")
            .field("root", &self.root)
            .field("registry", &self.registry)
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::MemoryFS;

    const ROOT: &str = "/repo";

    fn repository(files: &[(&str, &str)]) -> (CfgRepository, Arc<MemoryFS>) {
        let fs = Arc::new(MemoryFS::new());
        let repo = CfgRepository::with_source(ROOT, fs.clone(), HandlerRegistry::builtin(), BindOptions::default());
        for (path, content) in files {
            let path = Path::new(ROOT).join(path);
            fs.add_file_string(&path, content).unwrap();
            repo.handle_event(&FileEvent::created(path));
        }
        (repo, fs)
    }

    #[test]
    fn test_events_create_entry_sets() {
        let (repo, _fs) = repository(&[
            ("etc/motd/motd", "default"),
            ("etc/ssh/sshd_config/sshd_config", "Port 22"),
        ]);
        assert_eq!(repo.entry_names().unwrap(), vec!["/etc/motd", "/etc/ssh/sshd_config"]);
    }

    #[test]
    fn test_bind_unknown_entry() {
        let (repo, _fs) = repository(&[]);
        let mut entry = AbstractEntry::path("/etc/nothing");
        assert!(matches!(
            repo.bind(&mut entry, &ClientMetadata::new("web01")),
            Err(Error::UnknownEntry { .. })
        ));
    }

    #[test]
    fn test_has_generator() {
        let (repo, _fs) = repository(&[("etc/motd/motd.H_web01", "host")]);
        assert!(repo.has_generator("/etc/motd", &ClientMetadata::new("web01")).unwrap());
        assert!(!repo.has_generator("/etc/motd", &ClientMetadata::new("db01")).unwrap());
        assert!(!repo.has_generator("/etc/other", &ClientMetadata::new("web01")).unwrap());
    }

    #[test]
    fn test_file_at_root_is_rejected() {
        let (repo, fs) = repository(&[]);
        fs.add_file_string("/repo/README", "x").unwrap();
        assert!(repo.handle_event(&FileEvent::created("/repo/README")).is_rejected());
    }

    #[test]
    fn test_deleting_a_directory_drops_entries_below() {
        let (repo, _fs) = repository(&[
            ("etc/motd/motd", "default"),
            ("etc/ssh/sshd_config/sshd_config", "Port 22"),
            ("etc/ssh/ssh_config/ssh_config", "Host *"),
        ]);
        let outcome = repo.handle_event(&FileEvent::deleted("/repo/etc/ssh"));
        assert!(matches!(outcome, EventOutcome::Removed));
        assert_eq!(repo.entry_names().unwrap(), vec!["/etc/motd"]);
    }

    #[test]
    fn test_bind_all() {
        let (repo, _fs) = repository(&[
            ("etc/motd/motd", "default\n"),
            ("etc/issue/issue.H_db01", "db only\n"),
        ]);
        let results = repo.bind_all(&ClientMetadata::new("web01")).unwrap();
        let results: BTreeMap<_, _> = results.into_iter().collect();
        assert!(matches!(results["/etc/issue"], Err(Error::MissingGenerator { .. })));
        assert_eq!(results["/etc/motd"].as_ref().unwrap().text(), Some("default\n"));
    }

    #[test]
    fn test_write_update_reindexes() {
        let (repo, _fs) = repository(&[("etc/motd/motd", "default\n")]);
        let client = ClientMetadata::new("web01");
        let choices = repo.list_accept_choices("/etc/motd", &client).unwrap();
        assert_eq!(choices, vec![Specificity::All, Specificity::host("web01")]);

        repo.write_update("/etc/motd", &choices[1], &PullData::new("pulled\n").with_perms("0600"))
            .unwrap();
        let mut entry = AbstractEntry::path("/etc/motd");
        let result = repo.bind(&mut entry, &client).unwrap();
        assert_eq!(result.text(), Some("pulled\n"));
        assert_eq!(entry.get("perms"), Some("0600"));
    }

    #[test]
    fn test_build_filename() {
        let (repo, _fs) = repository(&[]);
        assert_eq!(
            repo.build_filename("/etc/motd", &Specificity::group("web", 7)),
            PathBuf::from("/repo/etc/motd/motd.G07_web")
        );
    }
}
