//! Line decoding and tokenizing

use std::borrow::Cow;

/// ISO-8859-15 code points that differ from Latin-1
const LATIN9_OVERRIDES: [(u8, char); 8] = [
    (0xA4, '€'),
    (0xA6, 'Š'),
    (0xA8, 'š'),
    (0xB4, 'Ž'),
    (0xB8, 'ž'),
    (0xBC, 'Œ'),
    (0xBD, 'œ'),
    (0xBE, 'Ÿ'),
];

/// Decode one raw line, falling back to ISO-8859-15 when it is not UTF-8
pub fn decode_line(raw: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(raw) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => Cow::Owned(
            raw.iter()
                .map(|&b| {
                    LATIN9_OVERRIDES
                        .iter()
                        .find(|(code, _)| *code == b)
                        .map_or(char::from(b), |(_, c)| *c)
                })
                .collect(),
        ),
    }
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Split a line into tokens; the first token is the command.
///
/// A quoted span opened by `<blank>"` and closed by the last `"<blank>` on
/// the line is one token with its inner whitespace kept. Everything else
/// splits on spaces and tabs. Empty tokens are dropped.
pub fn tokenize(line: &str) -> Vec<String> {
    let padded = format!("{} ", line.trim());
    let chars: Vec<char> = padded.chars().collect();

    let open = chars
        .windows(2)
        .position(|w| is_blank(w[0]) && w[1] == '"');
    let close = open.and_then(|open| {
        (open + 2..chars.len().saturating_sub(1))
            .rev()
            .find(|&j| chars[j] == '"' && is_blank(chars[j + 1]))
    });

    let split = |part: &[char]| -> Vec<String> {
        part.iter()
            .collect::<String>()
            .split(is_blank)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    };

    match (open, close) {
        (Some(open), Some(close)) => {
            let mut tokens = split(&chars[..open]);
            let quoted: String = chars[open + 2..close].iter().collect();
            if !quoted.is_empty() {
                tokens.push(quoted);
            }
            tokens.extend(split(&chars[close + 2..]));
            tokens
        }
        _ => split(&chars),
    }
}
