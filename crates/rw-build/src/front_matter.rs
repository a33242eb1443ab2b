//! Metadata block handling.
//!
//! A metadata block starts with a `---` line at the very beginning of the
//! text and ends at the next `---` line. Fields are `key: value` lines.
//! Line endings follow the opening marker (`\n` or `\r\n`).

/// Location of a metadata block inside a text.
struct Block {
    /// Byte offset of the closing marker line.
    closing_start: usize,
    /// Byte offset right after the closing marker line.
    end: usize,
    newline: &'static str,
}

fn find_block(text: &str) -> Option<Block> {
    let (newline, rest) = if let Some(rest) = text.strip_prefix("---\r\n") {
        ("\r\n", rest)
    } else {
        ("\n", text.strip_prefix("---\n")?)
    };

    let mut offset = text.len() - rest.len();
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == "---" {
            return Some(Block {
                closing_start: offset,
                end: offset + line.len(),
                newline,
            });
        }
        offset += line.len();
    }
    None
}

/// Add a `key: value` field to the text's metadata block.
///
/// An existing block gets the field right before its closing marker; every
/// other byte is preserved. Text without a block gets a fresh one prepended.
#[must_use]
pub fn embed_field(text: &str, key: &str, value: &str) -> String {
    match find_block(text) {
        Some(block) => {
            let newline = block.newline;
            let mut result = String::with_capacity(text.len() + key.len() + value.len() + 4);
            result.push_str(&text[..block.closing_start]);
            result.push_str(key);
            result.push_str(": ");
            result.push_str(value);
            result.push_str(newline);
            result.push_str(&text[block.closing_start..]);
            result
        }
        None => format!("---\n{key}: {value}\n---\n{text}"),
    }
}

/// Text without its leading metadata block.
#[must_use]
pub fn strip(text: &str) -> &str {
    find_block(text).map_or(text, |block| &text[block.end..])
}
