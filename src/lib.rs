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

//! # mail-extract
//!
//! _mail-extract_ is an e-mail parsing library that turns a raw RFC 822/5322
//! message (including its MIME structure, _RFC 2045 - 2049_) into a flat,
//! human-friendly [`Email`]: typed header fields, assembled plain/enriched/HTML
//! body text and an ordered list of [`File`] attachments.
//!
//! Parsing is strict where content metadata is concerned: an unknown
//! `Content-Transfer-Encoding`, a disposition outside `inline`/`attachment` or
//! a media type that violates the RFC 2045 grammar aborts the whole parse with
//! a single descriptive [`Error`] instead of returning a partially populated
//! result. Body decoding on the other hand is lenient, matching real-world
//! traffic: base64 bodies may be padded, line-wrapped or polluted with
//! whitespace, charset labels that cannot be resolved leave the bytes
//! untouched, and `windows-*` labels mislabeling Windows code pages are
//! retried as `cp*`.
//!
//! Transfer decoding (base64, quoted-printable) and charset transcoding are
//! composed as a chain of lazy [`std::io::Read`] stages, so a large attachment
//! is never buffered twice. Character sets are resolved through
//! [`encoding_rs`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mail_extract::Parser;
//!
//! let raw = concat!(
//!     "From: Art Vandelay <art@vandelay.com>\n",
//!     "Subject: =?utf-8?Q?Why_not_both=3F?=\n",
//!     "Content-Type: multipart/mixed; boundary=\"festivus\"\n\n",
//!     "--festivus\n",
//!     "Content-Type: text/plain; charset=\"us-ascii\"\n\n",
//!     "Importing AND exporting.\n",
//!     "--festivus\n",
//!     "Content-Disposition: attachment; filename=latex.txt\n\n",
//!     "chaps\n",
//!     "--festivus--\n",
//! );
//!
//! let email = Parser::new().parse(raw.as_bytes())?;
//! assert_eq!(email.subject, "Why not both?");
//! assert_eq!(email.text, "Importing AND exporting.");
//! assert_eq!(email.files[0].name, "latex.txt");
//! ```

pub mod decoders;
pub mod parsers;

mod error;

pub use error::{Error, Result};
pub use parsers::fields::date::DateTime;
pub use parsers::header::HeaderMap;
pub use parsers::mime::{ContentInfo, Disposition, TransferEncoding};
pub use parsers::{ProcessMode, Parser};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An RFC 5322 mailbox: display name plus address specification.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Addr {
    /// The display name, if any.
    pub name: Option<String>,
    /// The `local@domain` address specification.
    pub address: Option<String>,
}

impl Addr {
    pub fn new(name: Option<&str>, address: &str) -> Self {
        Addr {
            name: name.map(|n| n.to_string()),
            address: Some(address.to_string()),
        }
    }
}

/// The result of parsing one message.
///
/// Created empty when a parse begins, populated during that single parse
/// invocation and returned as an immutable value. Text parts of the same kind
/// are concatenated: `text/plain` parts with a blank-line separator,
/// `text/enriched` and `text/html` parts back to back.
#[derive(Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Email {
    pub sender: Option<Addr>,
    pub from: Vec<Addr>,
    pub reply_to: Vec<Addr>,
    pub to: Vec<Addr>,
    pub cc: Vec<Addr>,
    pub bcc: Vec<Addr>,

    pub resent_from: Vec<Addr>,
    pub resent_sender: Option<Addr>,
    pub resent_to: Vec<Addr>,
    pub resent_cc: Vec<Addr>,
    pub resent_bcc: Vec<Addr>,

    /// The Date header as an absolute timestamp with offset.
    pub date: Option<DateTime>,
    pub resent_date: Option<DateTime>,

    pub subject: String,
    pub comments: Vec<String>,
    pub keywords: Vec<String>,

    /// Message-ID trimmed of angle brackets.
    pub message_id: String,
    pub in_reply_to: Vec<String>,
    pub references: Vec<String>,
    /// Raw Received lines, in message order.
    pub received: Vec<String>,
    pub resent_message_id: String,

    /// Resolved content metadata of the top-level entity.
    pub content_info: ContentInfo,

    /// Every header not mapped to a typed field above, in message order.
    pub extra_headers: HeaderMap,

    /// Assembled `text/plain` body.
    pub text: String,
    /// Assembled `text/enriched` body.
    pub enriched_text: String,
    /// Assembled `text/html` body.
    pub html: String,

    /// Inline and attached files, in message order.
    pub files: Vec<File>,
}

/// An inline or attached file extracted from the message.
#[derive(Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct File {
    /// Sanitized base name: directory components and `.`/`..` segments are
    /// stripped, so the name is safe to join onto a target directory.
    pub name: String,
    pub disposition: Disposition,
    pub content_info: ContentInfo,
    /// Decoded content. Empty when a custom file consumer redirected the
    /// stream to external storage.
    pub data: Vec<u8>,
}
