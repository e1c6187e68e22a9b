use std::collections::HashMap;

/// Split `key=value` attribute lists, honouring double-quoted values
///
/// HLS tags use `,` between attributes (`BANDWIDTH=1,CODECS="a,b"`) while
/// `#EXTINF` lines use whitespace (`tvg-id="x" group-title="News"`). Quotes
/// are stripped from values. Keys without `=` are ignored.
pub fn parse_attributes(input: &str, is_separator: impl Fn(char) -> bool) -> HashMap<String, String> {
    let mut attributes = HashMap::new();
    let mut current = String::new();
    let mut in_quotes = false;

    let mut flush = |segment: &mut String| {
        if let Some((key, value)) = segment.split_once('=') {
            let key = key.trim();
            if !key.is_empty() {
                let value = value.trim().trim_matches('"');
                attributes.insert(key.to_string(), value.to_string());
            }
        }
        segment.clear();
    };

    for ch in input.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            c if !in_quotes && is_separator(c) => flush(&mut current),
            c => current.push(c),
        }
    }
    flush(&mut current);

    attributes
}

/// Index of the first `,` that is not inside a quoted value
pub fn find_unquoted_comma(input: &str) -> Option<usize> {
    let mut in_quotes = false;
    for (idx, ch) in input.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => return Some(idx),
            _ => {}
        }
    }
    None
}
