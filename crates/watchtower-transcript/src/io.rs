//! Incremental reads of append-only transcript files

use crate::types::{Increment, StreamPosition};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Read the complete lines appended since `from`.
///
/// Only bytes through the last newline are consumed; an unterminated tail
/// is left for the next pass. A file shorter than `from.byte_offset` is
/// treated as rotated and read again from the start.
pub fn read_increment(path: &Path, from: StreamPosition) -> std::io::Result<Increment> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();

    let truncated = len < from.byte_offset;
    let start = if truncated {
        StreamPosition::default()
    } else {
        from
    };

    file.seek(SeekFrom::Start(start.byte_offset))?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;

    let Some(last_newline) = buf.iter().rposition(|b| *b == b'\n') else {
        return Ok(Increment {
            lines: Vec::new(),
            next: start,
            truncated,
        });
    };

    let consumed = &buf[..=last_newline];
    let mut line_number = start.line_number;
    let mut lines = Vec::new();
    for raw in String::from_utf8_lossy(consumed).split('\n') {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        line_number += 1;
        lines.push((line_number, line.to_string()));
    }

    Ok(Increment {
        lines,
        next: StreamPosition {
            byte_offset: start.byte_offset + consumed.len() as u64,
            line_number,
        },
        truncated,
    })
}
