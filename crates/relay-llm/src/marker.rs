//! In-band tool-call markers
//!
//! Models are instructed to request a tool by emitting
//!
//! ```text
//! TOOL_START
//! {"name": "server.get_status", "arguments": {}}
//! TOOL_END
//! ```
//!
//! inline in their output. [`parse`] and [`parse_final`] extract that call
//! from complete or partial text; [`MarkerScanner`] holds marker text back
//! from a live stream until it can be classified.

use serde_json::Value;

use crate::types::ToolCall;

pub const TOOL_START: &str = "TOOL_START";
pub const TOOL_END: &str = "TOOL_END";

/// A tool call found in generated text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedToolCall {
    pub call: ToolCall,
    /// Text preceding the start marker, trailing whitespace removed
    pub prefix: String,
}

/// Outcome of scanning text for a marker block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerScan {
    /// No start marker, or the block did not hold a valid call
    NotFound,
    /// Start marker seen but the closing marker has not arrived yet
    Incomplete,
    Found(ParsedToolCall),
}

impl MarkerScan {
    pub fn into_found(self) -> Option<ParsedToolCall> {
        match self {
            Self::Found(parsed) => Some(parsed),
            Self::NotFound | Self::Incomplete => None,
        }
    }
}

/// Scan text that may still be growing
///
/// Without a closing marker the block is reported as
/// [`MarkerScan::Incomplete`].
pub fn parse(text: &str) -> MarkerScan {
    scan(text, true)
}

/// Scan text that is known to be complete
///
/// Backends stop generating on the closing marker and omit it, so the end
/// of the text closes an open block.
pub fn parse_final(text: &str) -> MarkerScan {
    scan(text, false)
}

fn scan(text: &str, require_end: bool) -> MarkerScan {
    let Some(start) = text.find(TOOL_START) else {
        return MarkerScan::NotFound;
    };

    let after = &text[start + TOOL_START.len()..];
    let body = match after.find(TOOL_END) {
        Some(end) => &after[..end],
        None if require_end => return MarkerScan::Incomplete,
        None => after,
    };

    match decode_call(body.trim()) {
        Ok(call) => MarkerScan::Found(ParsedToolCall {
            call,
            prefix: text[..start].trim_end().to_owned(),
        }),
        Err(reason) => {
            tracing::warn!(reason = %reason, block_len = body.len(), "ignoring malformed tool block");
            MarkerScan::NotFound
        }
    }
}

fn decode_call(body: &str) -> Result<ToolCall, String> {
    let value: Value = serde_json::from_str(body).map_err(|e| e.to_string())?;

    let Value::Object(mut fields) = value else {
        return Err("tool block is not a JSON object".to_owned());
    };

    let name = match fields.remove("name") {
        Some(Value::String(name)) if !name.trim().is_empty() => name,
        _ => return Err("tool block has no string `name`".to_owned()),
    };

    let arguments = match fields.remove("arguments") {
        None | Some(Value::Null) => "{}".to_owned(),
        Some(arguments) => arguments.to_string(),
    };

    Ok(ToolCall::new(name, arguments))
}

/// Remainder of a scanned stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Held {
    /// Trailing text that turned out not to start a marker
    Text(String),
    /// A start marker was seen
    Block {
        /// Unreleased text just before the marker, trailing whitespace included
        lead: String,
        /// Everything from the start marker onward
        block: String,
    },
}

/// Incremental splitter for streamed text
///
/// Text that cannot be part of a start marker is released immediately. A
/// tail that could still grow into one is held back together with the
/// whitespace before it, so a stripped block leaves the same trimmed prefix
/// as [`parse_final`]. Once the marker appears everything from it onward is
/// withheld until [`finish`].
///
/// [`finish`]: MarkerScanner::finish
#[derive(Debug, Default)]
pub struct MarkerScanner {
    pending: String,
    lead: String,
    block: Option<String>,
}

impl MarkerScanner {
    /// Feed one fragment, returning the text that is safe to emit
    pub fn push(&mut self, fragment: &str) -> Option<String> {
        if let Some(block) = &mut self.block {
            block.push_str(fragment);
            return None;
        }

        self.pending.push_str(fragment);

        if let Some(start) = self.pending.find(TOOL_START) {
            self.block = Some(self.pending.split_off(start));
            self.lead = std::mem::take(&mut self.pending);
            return None;
        }

        let marker_start = self.pending.len() - partial_marker_len(&self.pending);
        let keep_from = self.pending[..marker_start].trim_end().len();
        let held = self.pending.split_off(keep_from);
        non_empty(std::mem::replace(&mut self.pending, held))
    }

    pub fn finish(self) -> Held {
        match self.block {
            Some(block) => Held::Block { lead: self.lead, block },
            None => Held::Text(self.pending),
        }
    }
}

/// Length of the longest suffix that is a proper prefix of the start marker
fn partial_marker_len(text: &str) -> usize {
    (1..TOOL_START.len())
        .rev()
        .find(|&len| text.ends_with(&TOOL_START[..len]))
        .unwrap_or(0)
}

fn non_empty(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}
