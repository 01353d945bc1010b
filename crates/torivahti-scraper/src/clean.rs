//! Text cleanup for extracted HTML fragments: strip tags, decode entities,
//! collapse whitespace. An empty result after cleaning is absent, never an
//! empty string.

use std::sync::LazyLock;

use regex::Regex;

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<[^>]+>").expect("valid tag regex"));

/// Cleans a raw HTML fragment into presentable text.
#[must_use]
pub fn clean_text(raw: &str) -> Option<String> {
    let stripped = TAG_RE.replace_all(raw, "");
    let decoded = decode_entities(&stripped);
    let collapsed = decoded.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// Decodes the named entities that actually occur in the scraped markup,
/// plus numeric (`&#228;`) and hex (`&#xE4;`) references.
fn decode_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match tail.find(';') {
            // Entities are short; anything longer is a stray ampersand.
            Some(end) if end <= 10 => {
                let entity = &tail[1..end];
                match decode_entity(entity) {
                    Some(decoded) => out.push(decoded),
                    None => out.push_str(&tail[..=end]),
                }
                rest = &tail[end + 1..];
            }
            _ => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        "auml" => Some('ä'),
        "ouml" => Some('ö'),
        "Auml" => Some('Ä'),
        "Ouml" => Some('Ö'),
        "euro" => Some('€'),
        _ => {
            let code = if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok()?
            } else {
                return None;
            };
            char::from_u32(code)
        }
    }
}
