//! Transcript discovery, incremental reads and line parsing

mod io;
mod parse;
mod paths;
mod types;

pub use io::read_increment;
pub use parse::{derived_event_id, parse_line, text_preview, PREVIEW_CHARS};
pub use paths::{discover_targets, parse_targets, session_id_from_file, MAX_TARGETS};
pub use types::{
    Increment, ParsedEvent, ParsedMessage, StreamPosition, ToolCallBlock, ToolResultBlock,
    TranscriptTarget, Usage,
};
