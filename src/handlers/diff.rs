//! `.diff` filters: apply a unified diff to the generated content

use regex::bytes::Regex;

use crate::candidate::CandidateFile;
use crate::entry::{AbstractEntry, Data};
use crate::error::{Error, Result};
use crate::handlers::cat::split_lines;
use crate::handlers::{Filter, Handler, Role};
use crate::metadata::ClientMetadata;

/// Applies the candidate as a unified diff
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffFilter;

impl Handler for DiffFilter {
    fn name(&self) -> &'static str {
        "DiffFilter"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["diff"]
    }

    fn deprecated(&self) -> bool {
        true
    }

    fn role(&self) -> Role<'_> {
        Role::Filter(self)
    }

    fn check(&self, file: &CandidateFile) -> Result<()> {
        parse_hunks(&file.data)
            .map(|_| ())
            .map_err(|message| Error::Generator {
                entry: file.path.display().to_string(),
                handler: file.to_string(),
                message,
            })
    }
}

impl Filter for DiffFilter {
    fn modify(
        &self,
        file: &CandidateFile,
        entry: &AbstractEntry,
        _client: &ClientMetadata,
        data: Data,
    ) -> Result<Data> {
        let failure = |message| Error::Generator {
            entry: entry.name.clone(),
            handler: file.to_string(),
            message,
        };
        match data {
            Data::Text(text) => {
                let hunks = parse_hunks(file.text().as_bytes()).map_err(failure)?;
                let output = apply_hunks(text.as_bytes(), &hunks).map_err(failure)?;
                String::from_utf8(output)
                    .map(Data::Text)
                    .map_err(|e| failure(e.to_string()))
            }
            // Left undecoded for the encode stage
            Data::Bytes(bytes) => {
                let hunks = parse_hunks(&file.data).map_err(failure)?;
                apply_hunks(&bytes, &hunks).map(Data::Bytes).map_err(failure)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum HunkLine {
    Context(Vec<u8>),
    Remove(Vec<u8>),
    Add(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Hunk {
    old_start: usize,
    lines: Vec<HunkLine>,
}

fn parse_hunks(diff: &[u8]) -> std::result::Result<Vec<Hunk>, String> {
    let header = Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@")
        .map_err(|e| e.to_string())?;
    let mut hunks = Vec::new();
    let mut lines = split_lines(diff).into_iter().peekable();

    while let Some(line) = lines.next() {
        let Some(caps) = header.captures(line) else {
            continue;
        };
        let number = |i: usize, default: usize| {
            caps.get(i)
                .and_then(|m| std::str::from_utf8(m.as_bytes()).ok())
                .and_then(|n| n.parse::<usize>().ok())
                .unwrap_or(default)
        };
        let old_start = number(1, 0);
        let mut old_left = number(2, 1);
        let mut new_left = number(4, 1);
        let mut body = Vec::new();

        while old_left > 0 || new_left > 0 {
            let Some(line) = lines.next() else {
                return Err(format!("hunk at line {} is truncated", old_start));
            };
            if line.starts_with(b"\\") {
                continue;
            }
            let rest = line.get(1..).unwrap_or_default().to_vec();
            match line.first() {
                Some(b'+') => {
                    body.push(HunkLine::Add(rest));
                    new_left = new_left.saturating_sub(1);
                }
                Some(b'-') => {
                    body.push(HunkLine::Remove(rest));
                    old_left = old_left.saturating_sub(1);
                }
                // An empty line in a hunk is an empty context line
                Some(b' ') | None => {
                    body.push(HunkLine::Context(rest));
                    old_left = old_left.saturating_sub(1);
                    new_left = new_left.saturating_sub(1);
                }
                _ => {
                    return Err(format!(
                        "unexpected line in hunk: {}",
                        String::from_utf8_lossy(line)
                    ))
                }
            }
        }
        while lines.peek().is_some_and(|l| l.starts_with(b"\\")) {
            lines.next();
        }
        hunks.push(Hunk {
            old_start,
            lines: body,
        });
    }
    Ok(hunks)
}

fn apply_hunks(input: &[u8], hunks: &[Hunk]) -> std::result::Result<Vec<u8>, String> {
    let old = split_lines(input);
    let mut output: Vec<&[u8]> = Vec::with_capacity(old.len());
    let mut cursor = 0;

    for hunk in hunks {
        let start = hunk.old_start.saturating_sub(1);
        // Pure additions are anchored after line `old_start`
        let start = if hunk.lines.iter().all(|l| matches!(l, HunkLine::Add(_))) {
            hunk.old_start
        } else {
            start
        };
        if start < cursor || start > old.len() {
            return Err(format!("hunk at line {} is out of range", hunk.old_start));
        }
        output.extend_from_slice(&old[cursor..start]);
        cursor = start;

        for line in &hunk.lines {
            match line {
                HunkLine::Add(text) => output.push(text),
                HunkLine::Context(text) | HunkLine::Remove(text) => {
                    if old.get(cursor).copied() != Some(text.as_slice()) {
                        return Err(format!(
                            "hunk at line {} does not apply: expected '{}' at line {}",
                            hunk.old_start,
                            String::from_utf8_lossy(text),
                            cursor + 1
                        ));
                    }
                    if let HunkLine::Context(_) = line {
                        output.push(text);
                    }
                    cursor += 1;
                }
            }
        }
    }
    output.extend_from_slice(&old[cursor..]);

    let mut result = output.join(&b'\n');
    if (input.is_empty() || input.ends_with(b"\n")) && !result.is_empty() {
        result.push(b'\n');
    }
    Ok(result)
}
