//! # Entry Index
//!
//! An [`EntrySet`] holds every candidate file of one entry directory, keyed
//! by filename, and is updated only through filesystem events. The set is
//! behind its own reader-writer lock: an event replaces, adds or removes a
//! candidate under the write lock, and a bind holds an [`EntrySnapshot`]
//! (the read lock) for its whole run, so it never sees a half-applied event.
//!
//! Index maintenance never fails: a file that cannot be classified or read
//! produces a logged [`EventOutcome::Rejected`] and the set carries on.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard};

use log::{debug, error, warn};

use crate::candidate::CandidateFile;
use crate::encoding::SourceEncoding;
use crate::error::{Error, Result};
use crate::filesystem::FileSource;
use crate::grammar::ParsedName;
use crate::handlers::{CompiledHandler, HandlerRegistry, HandlerRole};
use crate::metadata::ClientMetadata;
use crate::monitor::EventCode;
use crate::path::basename_of;

/// What an event did to an entry set
#[derive(Debug)]
pub enum EventOutcome {
    /// A new candidate was claimed by `handler`
    Indexed { handler: &'static str },
    /// An indexed candidate was re-read in place
    Updated,
    Removed,
    /// The file is deliberately skipped, or the event was a no-op
    Ignored,
    /// The file was not indexed; the error has been logged
    Rejected(Error),
}

impl EventOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, EventOutcome::Rejected(_))
    }
}

#[derive(Debug, Default)]
struct EntryState {
    candidates: BTreeMap<String, CandidateFile>,
    next_sequence: u64,
}

/// All candidate files for one entry
pub struct EntrySet {
    name: String,
    basename: String,
    path: PathBuf,
    handlers: Vec<CompiledHandler>,
    encoding: SourceEncoding,
    state: RwLock<EntryState>,
}

impl EntrySet {
    /// Create an empty set for the entry `name` stored in `path`.
    pub fn new(name: &str, path: impl Into<PathBuf>, registry: &HandlerRegistry, encoding: SourceEncoding) -> Result<Self> {
        let basename = basename_of(name).to_string();
        Ok(Self {
            name: name.to_string(),
            handlers: registry.compile(&basename)?,
            basename,
            path: path.into(),
            encoding,
            state: RwLock::new(EntryState::default()),
        })
    }

    /// Entry name, e.g. `/etc/motd`
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn basename(&self) -> &str {
        &self.basename
    }

    /// Directory holding the candidates
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply one event for `filename` (relative to the entry directory).
    pub fn handle_event(&self, code: EventCode, filename: &str, source: &dyn FileSource) -> EventOutcome {
        let outcome = match code {
            EventCode::Exists | EventCode::Created => self.add(filename, source),
            EventCode::Changed => self.change(filename, source),
            EventCode::Deleted => self.delete(filename),
        };
        match &outcome {
            EventOutcome::Rejected(err @ Error::MalformedSpecificity { .. }) => error!("Cfg: {}", err),
            EventOutcome::Rejected(err) if err.is_diagnostic() => warn!("Cfg: {}", err),
            EventOutcome::Rejected(err) => error!("Cfg: failed to index {}/{}: {}", self.name, filename, err),
            other => debug!("Cfg: {} {} {}: {:?}", code, self.name, filename, other),
        }
        outcome
    }

    fn add(&self, filename: &str, source: &dyn FileSource) -> EventOutcome {
        match self.state.read() {
            Ok(state) if state.candidates.contains_key(filename) => {
                return EventOutcome::Rejected(Error::DuplicateCandidate {
                    filename: self.path.join(filename).display().to_string(),
                });
            }
            Ok(_) => {}
            Err(_) => return EventOutcome::Rejected(Error::poisoned(self.name.clone())),
        }

        let (handler, parsed) = match self.classify(filename) {
            Ok(Some(claim)) => claim,
            Ok(None) => {
                debug!("Cfg: ignoring {}/{}", self.name, filename);
                return EventOutcome::Ignored;
            }
            Err(err) => return EventOutcome::Rejected(err),
        };

        let path = self.path.join(filename);
        let file = match source.read(&path) {
            Ok(file) => file,
            Err(err) => return EventOutcome::Rejected(err),
        };

        let mut state = match self.state.write() {
            Ok(state) => state,
            Err(_) => return EventOutcome::Rejected(Error::poisoned(self.name.clone())),
        };
        // Another event may have won the race between the two locks
        if state.candidates.contains_key(filename) {
            return EventOutcome::Rejected(Error::DuplicateCandidate {
                filename: path.display().to_string(),
            });
        }
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        let name = handler.handler.name();
        let candidate = CandidateFile::new(path, filename, parsed, handler.handler, file, self.encoding, sequence);
        if let Err(err) = candidate.handler().check(&candidate) {
            warn!("Cfg: {} is not usable yet: {}", candidate, err);
        }
        state.candidates.insert(filename.to_string(), candidate);
        EventOutcome::Indexed { handler: name }
    }

    fn change(&self, filename: &str, source: &dyn FileSource) -> EventOutcome {
        let known = match self.state.read() {
            Ok(state) => state.candidates.contains_key(filename),
            Err(_) => return EventOutcome::Rejected(Error::poisoned(self.name.clone())),
        };
        if !known {
            if self.ignores(filename) {
                debug!("Cfg: ignoring {}/{}", self.name, filename);
                return EventOutcome::Ignored;
            }
            warn!(
                "Cfg: got 'changed' event for unknown file {}/{}, treating it as created",
                self.name, filename
            );
            return self.add(filename, source);
        }

        let file = match source.read(&self.path.join(filename)) {
            Ok(file) => file,
            Err(err) => return EventOutcome::Rejected(err),
        };
        let mut state = match self.state.write() {
            Ok(state) => state,
            Err(_) => return EventOutcome::Rejected(Error::poisoned(self.name.clone())),
        };
        match state.candidates.get_mut(filename) {
            Some(candidate) => {
                candidate.update(file);
                if let Err(err) = candidate.handler().check(candidate) {
                    warn!("Cfg: {} is not usable yet: {}", candidate, err);
                }
                EventOutcome::Updated
            }
            None => EventOutcome::Ignored,
        }
    }

    fn delete(&self, filename: &str) -> EventOutcome {
        let mut state = match self.state.write() {
            Ok(state) => state,
            Err(_) => return EventOutcome::Rejected(Error::poisoned(self.name.clone())),
        };
        match state.candidates.remove(filename) {
            Some(_) => EventOutcome::Removed,
            None => {
                if !self.ignores(filename) {
                    warn!("Cfg: got 'deleted' event for unknown file {}/{}", self.name, filename);
                }
                EventOutcome::Ignored
            }
        }
    }

    fn ignores(&self, filename: &str) -> bool {
        self.handlers.iter().any(|h| h.grammar.ignores(filename))
    }

    /// Find the handler that claims `filename`.
    ///
    /// `Ok(None)` means some handler ignores the file. A malformed
    /// specificity token is only reported when no other handler claims the
    /// file outright.
    fn classify(&self, filename: &str) -> Result<Option<(CompiledHandler, ParsedName)>> {
        if self.ignores(filename) {
            return Ok(None);
        }
        let mut malformed = None;
        for handler in &self.handlers {
            match handler.grammar.parse(filename) {
                Ok(Some(parsed)) => return Ok(Some((handler.clone(), parsed))),
                Ok(None) => {}
                Err(err) => {
                    malformed.get_or_insert(err);
                }
            }
        }
        Err(malformed.unwrap_or_else(|| Error::UnclassifiedFile {
            basename: self.basename.clone(),
            filename: filename.to_string(),
        }))
    }

    /// Take a consistent view of the set for the duration of a bind.
    pub fn snapshot(&self) -> Result<EntrySnapshot<'_>> {
        let state = self
            .state
            .read()
            .map_err(|_| Error::poisoned(self.name.clone()))?;
        Ok(EntrySnapshot { set: self, state })
    }

    pub fn len(&self) -> usize {
        self.state.read().map(|s| s.candidates.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for EntrySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntrySet")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("candidates", &self.len())
            .finish()
    }
}

/// Read-locked view of an [`EntrySet`]
pub struct EntrySnapshot<'a> {
    set: &'a EntrySet,
    state: RwLockReadGuard<'a, EntryState>,
}

impl<'a> EntrySnapshot<'a> {
    pub fn name(&self) -> &str {
        &self.set.name
    }

    pub fn path(&self) -> &Path {
        &self.set.path
    }

    pub fn basename(&self) -> &str {
        &self.set.basename
    }

    pub fn encoding(&self) -> SourceEncoding {
        self.set.encoding
    }

    pub fn get(&self, filename: &str) -> Option<&CandidateFile> {
        self.state.candidates.get(filename)
    }

    /// Every candidate in registration order
    pub fn candidates(&self) -> Vec<&CandidateFile> {
        let mut all: Vec<&CandidateFile> = self.state.candidates.values().collect();
        all.sort_by_key(|c| c.sequence);
        all
    }

    /// Candidates of `role` that apply to `client`, in registration order.
    ///
    /// Use of a deprecated handler type is logged.
    pub fn query(&self, role: HandlerRole, client: &ClientMetadata) -> Vec<&CandidateFile> {
        let matching: Vec<&CandidateFile> = self
            .candidates()
            .into_iter()
            .filter(|c| c.role() == role && c.specificity.matches(client))
            .collect();
        for candidate in matching.iter().filter(|c| c.deprecated()) {
            warn!(
                "Cfg: {}: use of {} is deprecated",
                self.set.name,
                candidate.filename
            );
        }
        matching
    }
}
