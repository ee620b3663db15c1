//! `.cat` filters: add or remove whole lines

use crate::candidate::CandidateFile;
use crate::entry::{AbstractEntry, Data};
use crate::error::{Error, Result};
use crate::handlers::{Filter, Handler, Role};
use crate::metadata::ClientMetadata;

/// Line-oriented filter.
///
/// `+line` appends the line unless it is already present, `-line` removes
/// every occurrence. Other lines are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatFilter;

impl Handler for CatFilter {
    fn name(&self) -> &'static str {
        "CatFilter"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["cat"]
    }

    fn deprecated(&self) -> bool {
        true
    }

    fn role(&self) -> Role<'_> {
        Role::Filter(self)
    }
}

impl Filter for CatFilter {
    fn modify(
        &self,
        file: &CandidateFile,
        entry: &AbstractEntry,
        _client: &ClientMetadata,
        data: Data,
    ) -> Result<Data> {
        match data {
            Data::Text(text) => {
                let output = apply(text.as_bytes(), file.text().as_bytes());
                String::from_utf8(output)
                    .map(Data::Text)
                    .map_err(|e| Error::Generator {
                        entry: entry.name.clone(),
                        handler: file.to_string(),
                        message: e.to_string(),
                    })
            }
            // Left undecoded for the encode stage
            Data::Bytes(bytes) => Ok(Data::Bytes(apply(&bytes, &file.data))),
        }
    }
}

fn apply(input: &[u8], instructions: &[u8]) -> Vec<u8> {
    let trailing_newline = input.is_empty() || input.ends_with(b"\n");
    let mut lines: Vec<&[u8]> = split_lines(input);

    for instruction in split_lines(instructions) {
        match instruction.split_first() {
            Some((b'+', line)) => {
                if !lines.contains(&line) {
                    lines.push(line);
                }
            }
            Some((b'-', line)) => lines.retain(|l| *l != line),
            _ => {}
        }
    }

    let mut output = lines.join(&b'\n');
    if trailing_newline && !output.is_empty() {
        output.push(b'\n');
    }
    output
}

/// Split on `\n`; a final newline does not start another line.
pub(crate) fn split_lines(data: &[u8]) -> Vec<&[u8]> {
    if data.is_empty() {
        return Vec::new();
    }
    let body = data.strip_suffix(b"\n").unwrap_or(data);
    body.split(|&b| b == b'\n').collect()
}
