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

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An ordered header multimap.
///
/// Preserves message order and duplicate fields; lookups by name are
/// case-insensitive.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HeaderMap {
    entries: Vec<(String, String)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        HeaderMap {
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Returns the first value of the named header.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns every value of the named header, in message order.
    pub fn get_all<'x>(&'x self, name: &'x str) -> impl Iterator<Item = &'x str> {
        self.entries
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Tokenizes the header block of `raw` and returns the headers plus the body
/// slice that follows the first empty line.
///
/// Folded continuation lines are unfolded with a single space. A field line
/// without a colon, or a continuation line before any field, fails with
/// [`Error::MalformedHeader`].
pub fn parse_headers(raw: &[u8]) -> Result<(HeaderMap, &[u8])> {
    let mut headers = HeaderMap::new();
    let mut field: Option<(String, String)> = None;
    let mut pos = 0;

    while pos < raw.len() {
        let line_end = raw[pos..]
            .iter()
            .position(|&ch| ch == b'\n')
            .map_or(raw.len(), |nl| pos + nl);
        let next_pos = line_end + 1;
        let mut line = &raw[pos..line_end];
        if let [head @ .., b'\r'] = line {
            line = head;
        }

        if line.is_empty() {
            if let Some((name, value)) = field.take() {
                headers.push(name, value);
            }
            let body = raw.get(next_pos..).unwrap_or_default();
            return Ok((headers, body));
        }

        if line[0] == b' ' || line[0] == b'\t' {
            let cont = String::from_utf8_lossy(line);
            match field.as_mut() {
                Some((_, value)) => {
                    if !value.is_empty() {
                        value.push(' ');
                    }
                    value.push_str(cont.trim());
                }
                None => {
                    return Err(Error::MalformedHeader(cont.trim().to_string()));
                }
            }
        } else {
            if let Some((name, value)) = field.take() {
                headers.push(name, value);
            }
            let colon = line.iter().position(|&ch| ch == b':').ok_or_else(|| {
                Error::MalformedHeader(String::from_utf8_lossy(line).into_owned())
            })?;
            let name = String::from_utf8_lossy(&line[..colon]).trim().to_string();
            if name.is_empty() {
                return Err(Error::MalformedHeader(
                    String::from_utf8_lossy(line).into_owned(),
                ));
            }
            let value = String::from_utf8_lossy(&line[colon + 1..])
                .trim()
                .to_string();
            field = Some((name, value));
        }

        pos = next_pos;
    }

    // Headers without a body.
    if let Some((name, value)) = field.take() {
        headers.push(name, value);
    }
    Ok((headers, &[][..]))
}
