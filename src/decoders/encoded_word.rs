/*
 * Copyright the mail-extract authors. See the COPYING
 * file at the top-level directory of this distribution.
 *
 * Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
 * https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
 * <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
 * option. This file may not be copied, modified, or distributed
 * except according to those terms.
 */

use crate::decoders::base64::decode_base64;
use crate::decoders::charsets::{charset_encoding, decode_buffer};
use crate::{Error, Result};

/// Decodes the RFC 2047 encoded-words (`=?charset?{B|Q}?text?=`) embedded in
/// a header value.
///
/// Non-encoded runs pass through untouched and a value without any `=?`
/// syntax is returned unchanged. Whitespace between two adjacent
/// encoded-words of the same charset is dropped per the RFC 2047 folding
/// rules. Fails with [`Error::HeaderDecodeError`] when encoded-word syntax is
/// present but not a single word decodes.
pub fn decode_header(raw: &str) -> Result<String> {
    if !raw.contains("=?") {
        return Ok(raw.to_string());
    }

    let mut out = String::with_capacity(raw.len());
    let mut pos = 0;
    let mut candidates = 0;
    let mut decoded_words = 0;
    let mut last_charset = String::new();
    let mut last_word_end = usize::MAX;

    while let Some(found) = raw[pos..].find("=?") {
        let start = pos + found;
        candidates += 1;
        match parse_encoded_word(&raw[start..]) {
            Some((consumed, charset, text)) => {
                let interlude = &raw[pos..start];
                let folded = last_word_end == pos
                    && !interlude.is_empty()
                    && interlude.chars().all(char::is_whitespace)
                    && charset == last_charset;
                if !folded {
                    out.push_str(interlude);
                }
                out.push_str(&text);
                pos = start + consumed;
                last_word_end = pos;
                last_charset = charset;
                decoded_words += 1;
            }
            None => {
                // Leave the malformed candidate verbatim and resume after
                // its opening marker.
                out.push_str(&raw[pos..start + 2]);
                pos = start + 2;
            }
        }
    }
    out.push_str(&raw[pos..]);

    if decoded_words == 0 && candidates > 0 {
        return Err(Error::HeaderDecodeError(raw.to_string()));
    }
    Ok(out)
}

/// Parses one encoded-word at the start of `raw` (which begins with `=?`).
/// Returns the consumed length, the lowercased charset label and the decoded
/// text.
fn parse_encoded_word(raw: &str) -> Option<(usize, String, String)> {
    let inner = &raw[2..];
    let charset_end = inner.find('?')?;
    let mut charset = inner[..charset_end].to_ascii_lowercase();
    // RFC 2231 language suffix, e.g. "utf-8*en".
    if let Some(star) = charset.find('*') {
        charset.truncate(star);
    }
    if charset.is_empty() || charset.len() > 45 {
        return None;
    }

    let rest = &inner[charset_end + 1..];
    let mut rest_chars = rest.chars();
    let encoding = match rest_chars.next()? {
        enc @ ('b' | 'B' | 'q' | 'Q') => enc,
        _ => return None,
    };
    if rest_chars.next() != Some('?') {
        return None;
    }
    let text = &rest[2..];
    let text_end = text.find("?=")?;
    let payload = &text[..text_end];

    let bytes = match encoding {
        'b' | 'B' => decode_base64(payload.as_bytes())?,
        _ => decode_q(payload.as_bytes())?,
    };

    let decoded = decode_buffer(charset_encoding(&charset)?, &bytes);
    let consumed = 2 + charset_end + 1 + 2 + text_end + 2;
    Some((consumed, charset, decoded))
}

/// Decodes the Q encoding of RFC 2047 §4.2: `_` means space, `=XX` is a hex
/// escape, anything else is literal.
fn decode_q(bytes: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut iter = bytes.iter();
    while let Some(&ch) = iter.next() {
        match ch {
            b'_' => out.push(b' '),
            b'=' => {
                let hex1 = hex(*iter.next()?)?;
                let hex2 = hex(*iter.next()?)?;
                out.push((hex1 << 4) | hex2);
            }
            b'\r' | b'\n' => return None,
            _ => out.push(ch),
        }
    }
    Some(out)
}

fn hex(ch: u8) -> Option<u8> {
    (ch as char).to_digit(16).map(|d| d as u8)
}

#[cfg(test)]
mod tests {
    use super::decode_header;
    use crate::Error;

    #[test]
    fn decode_headers() {
        let inputs = [
            // No encoded-word syntax at all: unchanged.
            (
                "Some One <someone@example.com>",
                "Some One <someone@example.com>",
            ),
            (
                "=?utf-8?Q?Andreas_Birkeb=C3=A6k?=",
                "Andreas Birkebæk",
            ),
            (
                "=?ISO-8859-1?Q?Patrik_F=E4ltstr=F6m?= <paf@nada.kth.se>",
                "Patrik Fältström <paf@nada.kth.se>",
            ),
            (
                "=?ISO-8859-1?B?SWYgeW91IGNhbiByZWFkIHRoaXMgeW8=?= =?ISO-8859-1?B?dSB1bmRlcnN0YW5kLg==?=",
                "If you can read this you understand.",
            ),
            // Different charsets keep the separating space.
            (
                "=?utf-8?Q?a?= =?iso-8859-1?Q?b?=",
                "a b",
            ),
            (
                "(=?ISO-8859-1?Q?a?=)",
                "(a)",
            ),
            (
                "=?windows-1252?Q?smart_=93quotes=94?=",
                "smart \u{201c}quotes\u{201d}",
            ),
            // One word decodes, the stray marker stays verbatim.
            (
                "=?utf-8?Q?ok?= and 1 =? 2",
                "ok and 1 =? 2",
            ),
        ];

        for (raw, expected) in inputs {
            assert_eq!(decode_header(raw).unwrap(), expected, "failed for {raw:?}");
        }
    }

    #[test]
    fn malformed_words_fail() {
        for raw in [
            "=?utf-8?X?bm9wZQ==?=",
            "=?utf-8?Q?=ZZ?=",
            "=?utf-8?Q?unterminated",
            "=??Q?empty?=",
        ] {
            assert!(
                matches!(decode_header(raw), Err(Error::HeaderDecodeError(_))),
                "accepted {raw:?}"
            );
        }
    }
}
