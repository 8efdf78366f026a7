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

use thiserror::Error;

/// All errors produced while parsing a message.
///
/// Any fatal variant aborts the whole parse; a half-populated `Email` is
/// never returned. `EmptyAddress` and `EmptyDate` are "no value" sentinels
/// that the field-assembly layer catches locally, they never reach the
/// caller of [`crate::Parser::parse`].
#[derive(Error, Debug)]
pub enum Error {
    /// The message headers could not be tokenized.
    #[error("malformed header: {0}")]
    MalformedHeader(String),

    /// A Content-Type or Content-Disposition value violates the RFC 2045
    /// media-type grammar.
    #[error("malformed media type: {0}")]
    MalformedMediaType(String),

    /// A Content-Disposition value outside `attachment` / `inline`.
    #[error("unknown content disposition: {0}")]
    UnknownDisposition(String),

    /// A Content-Transfer-Encoding value outside the closed RFC 2045 set.
    #[error("unknown content transfer encoding: {0}")]
    UnknownTransferEncoding(String),

    /// A leaf part matched none of the classification rules. Carries the
    /// type of the enclosing multipart container.
    #[error("unknown content type inside {0} part")]
    UnknownContentType(String),

    /// An RFC 2047 encoded-word is present but undecodable. Carries the raw
    /// header value.
    #[error("cannot decode header value {0:?}")]
    HeaderDecodeError(String),

    /// A multipart media type without a boundary parameter.
    #[error("multipart media type without a boundary parameter")]
    MissingBoundary,

    /// An address field with no value. Sentinel, caught during assembly.
    #[error("empty address field")]
    EmptyAddress,

    /// A date field with no value. Sentinel, caught during assembly.
    #[error("empty date field")]
    EmptyDate,

    /// An I/O or decode-stream failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
