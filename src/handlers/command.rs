//! `:test` verifiers: run an executable against the bound data

use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};
use std::thread;

use log::debug;

use crate::candidate::CandidateFile;
use crate::entry::AbstractEntry;
use crate::error::{Error, Result};
use crate::handlers::{Handler, Role, Verifier};
use crate::metadata::ClientMetadata;

/// Runs the candidate file with the final data on stdin.
///
/// The entry name and client hostname are passed in `CFG_ENTRY` and
/// `CFG_CLIENT`. A non-zero exit status fails verification with the
/// command's stderr as the message.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandVerifier;

impl Handler for CommandVerifier {
    fn name(&self) -> &'static str {
        "CommandVerifier"
    }

    fn basenames(&self) -> &'static [&'static str] {
        &[":test"]
    }

    fn role(&self) -> Role<'_> {
        Role::Verifier(self)
    }
}

impl Verifier for CommandVerifier {
    fn verify(&self, file: &CandidateFile, entry: &AbstractEntry, client: &ClientMetadata, data: &[u8]) -> Result<()> {
        let failure = |message: String| Error::VerificationFailure {
            entry: entry.name.clone(),
            client: client.hostname.clone(),
            message,
        };

        debug!("Running {} for {}", file.path.display(), entry.name);
        let mut child = Command::new(&file.path)
            .env("CFG_ENTRY", &entry.name)
            .env("CFG_CLIENT", &client.hostname)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| failure(format!("cannot run {}: {}", file.path.display(), e)))?;

        let stdin = child.stdin.take();
        let output = thread::scope(|scope| {
            scope.spawn(move || {
                if let Some(mut stdin) = stdin {
                    // The command may exit without reading its input
                    if let Err(e) = stdin.write_all(data) {
                        if e.kind() != ErrorKind::BrokenPipe {
                            debug!("Failed to write to {}: {}", file.path.display(), e);
                        }
                    }
                }
            });
            child.wait_with_output()
        })?;

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if stderr.is_empty() {
            Err(failure(format!("{} {}", file.filename, output.status)))
        } else {
            Err(failure(stderr))
        }
    }
}
