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

/// Splits a multipart body at its `--boundary` delimiter lines (RFC 2046
/// §5.1.1) and returns the enclosed parts as raw slices.
///
/// The preamble before the first delimiter and the epilogue after the
/// closing `--boundary--` are discarded. The line break that precedes a
/// delimiter belongs to the delimiter and is stripped from the part. A body
/// with no delimiter at all yields no parts; a missing closing delimiter is
/// tolerated and ends the last part at the end of input.
pub fn split_parts<'x>(body: &'x [u8], boundary: &str) -> Vec<&'x [u8]> {
    let mut parts = Vec::new();
    let mut part_start: Option<usize> = None;
    let mut pos = 0;

    while pos <= body.len() {
        let line_end = body[pos..]
            .iter()
            .position(|&ch| ch == b'\n')
            .map_or(body.len(), |nl| pos + nl);
        let mut line = &body[pos..line_end];
        if let [head @ .., b'\r'] = line {
            line = head;
        }

        match classify_line(line, boundary) {
            Line::Delimiter | Line::Close => {
                if let Some(start) = part_start {
                    parts.push(strip_trailing_break(&body[start..pos]));
                }
                if matches!(classify_line(line, boundary), Line::Close) {
                    return parts;
                }
                part_start = Some(line_end + 1);
            }
            Line::Other => (),
        }

        if line_end == body.len() {
            break;
        }
        pos = line_end + 1;
    }

    if let Some(start) = part_start {
        parts.push(strip_trailing_break(&body[start.min(body.len())..]));
    }
    parts
}

enum Line {
    Delimiter,
    Close,
    Other,
}

fn classify_line(line: &[u8], boundary: &str) -> Line {
    let Some(rest) = line.strip_prefix(b"--") else {
        return Line::Other;
    };
    let Some(rest) = rest.strip_prefix(boundary.as_bytes()) else {
        return Line::Other;
    };
    // Trailing whitespace after the delimiter is allowed.
    match rest.strip_prefix(b"--") {
        Some(tail) if tail.iter().all(|&ch| ch == b' ' || ch == b'\t') => Line::Close,
        None if rest.iter().all(|&ch| ch == b' ' || ch == b'\t') => Line::Delimiter,
        _ => Line::Other,
    }
}

fn strip_trailing_break(part: &[u8]) -> &[u8] {
    let part = part.strip_suffix(b"\n").unwrap_or(part);
    part.strip_suffix(b"\r").unwrap_or(part)
}

#[cfg(test)]
mod tests {
    use super::split_parts;

    #[test]
    fn split_multipart_bodies() {
        let inputs: [(&[u8], &str, Vec<&[u8]>); 6] = [
            (
                b"preamble\r\n--b\r\nfirst\r\n--b\r\nsecond\r\n--b--\r\nepilogue",
                "b",
                vec![b"first", b"second"],
            ),
            (
                b"--b\nno carriage returns\n--b--\n",
                "b",
                vec![b"no carriage returns"],
            ),
            // Missing close delimiter: the last part runs to end of input.
            (b"--b\nunterminated part", "b", vec![b"unterminated part"]),
            // No delimiter at all.
            (b"just a flat body", "b", vec![]),
            // Empty part between two delimiters.
            (b"--b\r\n\r\n--b\r\nx\r\n--b--", "b", vec![b"", b"x"]),
            // A part line that merely starts with the boundary text is data.
            (
                b"--b\r\n--bogus line\r\n--b--",
                "b",
                vec![b"--bogus line"],
            ),
        ];

        for (body, boundary, expected) in inputs {
            assert_eq!(
                split_parts(body, boundary),
                expected,
                "failed for {:?}",
                String::from_utf8_lossy(body)
            );
        }
    }

    #[test]
    fn delimiter_tolerates_trailing_whitespace() {
        let body = b"--b  \t\r\npart\r\n--b--  \r\n";
        assert_eq!(split_parts(body, "b"), [b"part".as_slice()]);
    }
}
