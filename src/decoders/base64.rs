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

/// A streaming filter that turns standard (padded, line-wrapped) base64 into
/// the raw form a strict unpadded decoder accepts.
///
/// Every `\r`, `\n` and `=` byte is dropped by compacting each chunk in
/// place; the relative order of the retained bytes is preserved. A chunk that
/// filters down to nothing is discarded and the source is pulled again, so a
/// read never reports end-of-stream early: `Ok(0)` means the source itself is
/// exhausted. Works for arbitrarily chunked sources, this is not a
/// whole-buffer transform.
pub struct Base64Normalizer<R: Read> {
    inner: R,
}

impl<R: Read> Base64Normalizer<R> {
    pub fn new(inner: R) -> Self {
        Base64Normalizer { inner }
    }
}

impl<R: Read> Read for Base64Normalizer<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let n = self.inner.read(buf)?;
            if n == 0 {
                return Ok(0);
            }
            let mut kept = 0;
            for pos in 0..n {
                let ch = buf[pos];
                if !matches!(ch, b'\r' | b'\n' | b'=') {
                    buf[kept] = ch;
                    kept += 1;
                }
            }
            if kept > 0 {
                return Ok(kept);
            }
        }
    }
}

/// A strict streaming decoder for raw (unpadded, unwrapped) base64.
///
/// Any byte outside the base64 alphabet fails the stream, as does a final
/// group of a single character. Feed it wrapped or padded input through
/// [`Base64Normalizer`].
pub struct Base64Reader<R: Read> {
    inner: R,
    acc: u32,
    group_len: u8,
    out: Vec<u8>,
    out_pos: usize,
    finished: bool,
}

impl<R: Read> Base64Reader<R> {
    pub fn new(inner: R) -> Self {
        Base64Reader {
            inner,
            acc: 0,
            group_len: 0,
            out: Vec::new(),
            out_pos: 0,
            finished: false,
        }
    }
}

impl<R: Read> Read for Base64Reader<R> {
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
                match self.group_len {
                    0 => (),
                    2 => self.out.push((self.acc >> 4) as u8),
                    3 => {
                        self.out.push((self.acc >> 10) as u8);
                        self.out.push((self.acc >> 2) as u8);
                    }
                    _ => {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            "truncated base64 stream",
                        ));
                    }
                }
                continue;
            }

            for &ch in &chunk[..n] {
                let val = BASE64_MAP[ch as usize];
                if val == INVALID {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("invalid base64 byte 0x{ch:02x}"),
                    ));
                }
                self.acc = (self.acc << 6) | val as u32;
                self.group_len += 1;
                if self.group_len == 4 {
                    self.out.extend_from_slice(&[
                        (self.acc >> 16) as u8,
                        (self.acc >> 8) as u8,
                        self.acc as u8,
                    ]);
                    self.acc = 0;
                    self.group_len = 0;
                }
            }
        }
    }
}

/// Buffer-decodes standard base64, tolerating padding and whitespace wraps.
/// Used for the short payloads of RFC 2047 encoded-words.
pub fn decode_base64(bytes: &[u8]) -> Option<Vec<u8>> {
    let mut buf = Vec::with_capacity(bytes.len() / 4 * 3);
    let mut reader = Base64Reader::new(Base64Normalizer::new(bytes));
    reader.read_to_end(&mut buf).ok()?;
    Some(buf)
}

const INVALID: u8 = 0xff;

#[rustfmt::skip]
static BASE64_MAP: [u8; 256] = {
    let mut map = [INVALID; 256];
    let alphabet = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut pos = 0;
    while pos < alphabet.len() {
        map[alphabet[pos] as usize] = pos as u8;
        pos += 1;
    }
    map
};
