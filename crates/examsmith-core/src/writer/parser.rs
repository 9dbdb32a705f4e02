// writer/parser.rs
// Sentinel-framed block parsing. Framing is what makes partial output
// recoverable: the last complete block before a truncation always
// parses, where a truncated JSON array would be lost whole.

use crate::domain::GeneratedItem;
use crate::ports::ITEM_SENTINEL;

#[derive(Debug, Default)]
pub struct ParsedChunk {
    pub items: Vec<GeneratedItem>,
    pub failed_blocks: Vec<String>,
    pub truncated: bool,
}

/// Splits raw model output on the sentinel and parses each block as one
/// item. `truncated` is set when the final segment never reached a
/// sentinel, or when the last complete block failed to parse — even if
/// earlier items succeeded.
pub fn parse_chunk(raw: &str) -> ParsedChunk {
    let cleaned = strip_code_fences(raw);
    let mut parsed = ParsedChunk::default();

    let mut segments: Vec<&str> = cleaned.split(ITEM_SENTINEL).collect();
    let leftover = segments.pop().unwrap_or("");

    let mut last_parse_ok = true;
    for segment in segments {
        let block = segment.trim();
        if block.is_empty() {
            continue;
        }
        match serde_json::from_str::<GeneratedItem>(block) {
            Ok(item) => {
                parsed.items.push(item);
                last_parse_ok = true;
            }
            Err(_) => {
                parsed.failed_blocks.push(block.to_string());
                last_parse_ok = false;
            }
        }
    }

    parsed.truncated = !leftover.trim().is_empty() || !last_parse_ok;
    parsed
}

/// Drops markdown fence lines the model sometimes wraps output in.
fn strip_code_fences(raw: &str) -> String {
    raw.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}
