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

pub mod base64;
pub mod charsets;
pub mod encoded_word;
pub mod quoted_printable;

use std::io::Read;

use encoding_rs::UTF_8;

use crate::decoders::base64::{Base64Normalizer, Base64Reader};
use crate::decoders::charsets::{charset_encoding, CharsetReader};
use crate::decoders::quoted_printable::QuotedPrintableReader;
use crate::parsers::mime::{ContentInfo, TransferEncoding};

/// Builds the decode pipeline for a body part.
///
/// The transfer encoding stage comes first (base64 or quoted-printable,
/// identity for the 7bit/8bit/binary family), then a charset stage when the
/// part carries a known non-UTF-8 charset label. An unknown label passes the
/// transfer-decoded bytes through untouched. Decode errors surface lazily,
/// on the reads that hit them.
pub fn decode_content<'x>(body: &'x [u8], info: &ContentInfo) -> Box<dyn Read + 'x> {
    let transfer: Box<dyn Read + 'x> = match info.transfer_encoding {
        TransferEncoding::Base64 => Box::new(Base64Reader::new(Base64Normalizer::new(body))),
        TransferEncoding::QuotedPrintable => Box::new(QuotedPrintableReader::new(body)),
        TransferEncoding::SevenBit | TransferEncoding::EightBit | TransferEncoding::Binary => {
            Box::new(body)
        }
    };

    let encoding = info.encoding.or_else(|| {
        if info.charset.is_empty() {
            None
        } else {
            charset_encoding(&info.charset)
        }
    });
    match encoding {
        Some(encoding) if encoding != UTF_8 => Box::new(CharsetReader::new(transfer, encoding)),
        _ => transfer,
    }
}
