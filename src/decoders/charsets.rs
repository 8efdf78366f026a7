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

use std::io::{self, Read};

use encoding_rs::{CoderResult, Decoder, Encoding};

/// Looks up a charset label.
///
/// Labels are matched through the WHATWG registry of `encoding_rs`. A label
/// with a `windows-` prefix that the registry rejects is retried as `cp*`,
/// covering a common mislabeling of Windows code-page charsets. `None` means
/// the caller must pass bytes through undecoded.
pub fn charset_encoding(label: &str) -> Option<&'static Encoding> {
    let label = label.trim().trim_matches('"');
    if label.is_empty() {
        return None;
    }
    Encoding::for_label(label.as_bytes()).or_else(|| {
        let lower = label.to_ascii_lowercase();
        let rest = lower.strip_prefix("windows-")?;
        Encoding::for_label(format!("cp{rest}").as_bytes())
    })
}

/// Decodes a whole buffer into UTF-8, replacing malformed sequences.
pub fn decode_buffer(encoding: &'static Encoding, bytes: &[u8]) -> String {
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

/// A streaming transcoder from the wrapped reader's charset to UTF-8.
///
/// Wraps an [`encoding_rs::Decoder`] so a charset stage can sit in the
/// middle of a decode pipeline without buffering the whole body.
pub struct CharsetReader<R: Read> {
    inner: R,
    decoder: Decoder,
    in_buf: Box<[u8]>,
    in_pos: usize,
    in_end: usize,
    // Decoded bytes that did not fit the caller's buffer.
    pending: Vec<u8>,
    pending_pos: usize,
    eof: bool,
    done: bool,
}

impl<R: Read> CharsetReader<R> {
    pub fn new(inner: R, encoding: &'static Encoding) -> Self {
        CharsetReader {
            inner,
            decoder: encoding.new_decoder(),
            in_buf: vec![0u8; 4096].into_boxed_slice(),
            in_pos: 0,
            in_end: 0,
            pending: Vec::new(),
            pending_pos: 0,
            eof: false,
            done: false,
        }
    }

    fn fill(&mut self) -> io::Result<()> {
        if self.in_pos == self.in_end && !self.eof {
            let n = self.inner.read(&mut self.in_buf)?;
            self.in_pos = 0;
            self.in_end = n;
            if n == 0 {
                self.eof = true;
            }
        }
        Ok(())
    }
}

impl<R: Read> Read for CharsetReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if self.pending_pos < self.pending.len() {
                let n = (self.pending.len() - self.pending_pos).min(buf.len());
                buf[..n].copy_from_slice(&self.pending[self.pending_pos..self.pending_pos + n]);
                self.pending_pos += n;
                return Ok(n);
            }
            if self.done {
                return Ok(0);
            }

            self.fill()?;
            let last = self.eof && self.in_pos == self.in_end;
            let src = &self.in_buf[self.in_pos..self.in_end];

            if buf.len() >= 16 {
                let (result, read, written, _) = self.decoder.decode_to_utf8(src, buf, last);
                self.in_pos += read;
                if last && result == CoderResult::InputEmpty {
                    self.done = true;
                }
                if written > 0 || self.done {
                    return Ok(written);
                }
            } else {
                // The caller's buffer may be too small to hold one scalar
                // value; decode into scratch space and drain it above.
                let mut scratch = [0u8; 64];
                let (result, read, written, _) = self.decoder.decode_to_utf8(src, &mut scratch, last);
                self.in_pos += read;
                if last && result == CoderResult::InputEmpty {
                    self.done = true;
                }
                if written > 0 {
                    self.pending.clear();
                    self.pending_pos = 0;
                    self.pending.extend_from_slice(&scratch[..written]);
                } else if self.done {
                    return Ok(0);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::{charset_encoding, CharsetReader};

    #[test]
    fn lookup_labels() {
        let inputs = [
            ("utf-8", Some("UTF-8")),
            ("UTF-8", Some("UTF-8")),
            (" \"ISO-8859-2\" ", Some("ISO-8859-2")),
            ("windows-1252", Some("windows-1252")),
            ("latin1", Some("windows-1252")),
            ("koi8-r", Some("KOI8-R")),
            ("", None),
            ("x-mystery-encoding", None),
        ];
        for (label, expected) in inputs {
            assert_eq!(
                charset_encoding(label).map(|e| e.name()),
                expected,
                "failed for {label:?}"
            );
        }
    }

    #[test]
    fn transcode_stream() {
        let inputs: [(&str, &[u8], &str); 3] = [
            ("iso-8859-1", b"\xe1\xe9\xed\xf3\xfa", "áéíóú"),
            (
                "iso-8859-2",
                b"Zelo rada grem v sla\xb9\xe8i\xe8arno",
                "Zelo rada grem v slaščičarno",
            ),
            ("windows-1251", b"\xcf\xf0\xe8\xe2\xe5\xf2", "Привет"),
        ];

        for (label, bytes, expected) in inputs {
            let encoding = charset_encoding(label).unwrap();
            let mut out = String::new();
            CharsetReader::new(bytes, encoding)
                .read_to_string(&mut out)
                .unwrap();
            assert_eq!(out, expected, "failed for {label}");
        }
    }

    #[test]
    fn transcode_with_tiny_buffer() {
        let encoding = charset_encoding("iso-8859-5").unwrap();
        let mut reader = CharsetReader::new(&b"\xbf\xe0\xd8\xd2\xd5\xe2"[..], encoding);
        let mut out = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match reader.read(&mut byte).unwrap() {
                0 => break,
                n => out.extend_from_slice(&byte[..n]),
            }
        }
        assert_eq!(String::from_utf8(out).unwrap(), "Привет");
    }
}
