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

#[derive(Debug, Clone, Copy, PartialEq)]
enum QuotedPrintableState {
    None,
    Eq,
    EqCr,
    Hex1(u8),
}

/// A streaming quoted-printable decoder (RFC 2045 §6.7).
///
/// `=XX` escapes are decoded, soft line breaks (`=\n` and `=\r\n`) are
/// removed, everything else passes through unchanged so hard CRLF line
/// breaks survive byte-exact. Escape sequences may straddle chunk
/// boundaries. An invalid or truncated escape fails the stream.
pub struct QuotedPrintableReader<R: Read> {
    inner: R,
    state: QuotedPrintableState,
    out: Vec<u8>,
    out_pos: usize,
    finished: bool,
}

impl<R: Read> QuotedPrintableReader<R> {
    pub fn new(inner: R) -> Self {
        QuotedPrintableReader {
            inner,
            state: QuotedPrintableState::None,
            out: Vec::new(),
            out_pos: 0,
            finished: false,
        }
    }
}

impl<R: Read> Read for QuotedPrintableReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if self.out_pos < self.out.len() {
                let n = (self.out.len() - self.out_pos).min(buf.len());
                buf[..n].copy_from_slice(&self.out[self.out_pos..self.out_pos + n]);
                self.out_pos += n;
                return Ok(n);
            }
            if self.finished {
                return Ok(0);
            }

            let mut chunk = [0u8; 1024];
            let n = self.inner.read(&mut chunk)?;
            self.out.clear();
            self.out_pos = 0;

            if n == 0 {
                self.finished = true;
                if self.state != QuotedPrintableState::None {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "truncated quoted-printable escape",
                    ));
                }
                continue;
            }

            for &ch in &chunk[..n] {
                match self.state {
                    QuotedPrintableState::None => {
                        if ch == b'=' {
                            self.state = QuotedPrintableState::Eq;
                        } else {
                            self.out.push(ch);
                        }
                    }
                    QuotedPrintableState::Eq => match ch {
                        b'\n' => self.state = QuotedPrintableState::None,
                        b'\r' => self.state = QuotedPrintableState::EqCr,
                        _ => match hex_digit(ch) {
                            Some(hex1) => self.state = QuotedPrintableState::Hex1(hex1),
                            None => return Err(invalid_escape(ch)),
                        },
                    },
                    QuotedPrintableState::EqCr => {
                        if ch == b'\n' {
                            self.state = QuotedPrintableState::None;
                        } else {
                            return Err(invalid_escape(ch));
                        }
                    }
                    QuotedPrintableState::Hex1(hex1) => match hex_digit(ch) {
                        Some(hex2) => {
                            self.out.push((hex1 << 4) | hex2);
                            self.state = QuotedPrintableState::None;
                        }
                        None => return Err(invalid_escape(ch)),
                    },
                }
            }
        }
    }
}

fn invalid_escape(ch: u8) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("invalid quoted-printable escape byte 0x{ch:02x}"),
    )
}

fn hex_digit(ch: u8) -> Option<u8> {
    match ch {
        b'0'..=b'9' => Some(ch - b'0'),
        b'A'..=b'F' => Some(ch - b'A' + 10),
        b'a'..=b'f' => Some(ch - b'a' + 10),
        _ => None,
    }
}
