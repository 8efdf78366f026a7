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

pub mod fields;
pub mod header;
pub mod message;
pub mod mime;
pub mod multipart;

use std::io::{self, Read};

use crate::parsers::fields::date::DateTime;
use crate::{Addr, Result};

/// How much of the message to process.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ProcessMode {
    /// Headers, bodies and files.
    #[default]
    Full,
    /// Stop after the top-level header block.
    HeadersOnly,
    /// Bodies are assembled but parts classified as files are dropped.
    /// Parts with an explicit `attachment` disposition are still extracted.
    SkipAttachments,
}

/// A configured message parser.
///
/// Holds the processing mode and the pluggable field strategies. The
/// defaults cover RFC 5322 traffic; replace a strategy to adapt to a
/// source with its own conventions (an address parser for an LDAP-backed
/// gateway, a file consumer that spools to disk). Configuration is fixed
/// once parsing begins.
pub struct Parser {
    pub(crate) mode: ProcessMode,
    pub(crate) address_parser: Box<dyn Fn(&str) -> Result<Vec<Addr>>>,
    pub(crate) date_parser: Box<dyn Fn(&str) -> Result<DateTime>>,
    pub(crate) file_consumer: Box<dyn Fn(&mut dyn Read) -> io::Result<Vec<u8>>>,
}

impl Default for Parser {
    fn default() -> Self {
        Parser {
            mode: ProcessMode::Full,
            address_parser: Box::new(fields::address::parse_address_list),
            date_parser: Box::new(fields::date::parse_date),
            file_consumer: Box::new(|reader| {
                let mut data = Vec::new();
                reader.read_to_end(&mut data)?;
                Ok(data)
            }),
        }
    }
}

impl Parser {
    pub fn new() -> Self {
        Parser::default()
    }

    pub fn mode(mut self, mode: ProcessMode) -> Self {
        self.mode = mode;
        self
    }

    /// Replaces the address list parser used for From, To and the other
    /// mailbox-list fields.
    pub fn address_parser(
        mut self,
        parser: impl Fn(&str) -> Result<Vec<Addr>> + 'static,
    ) -> Self {
        self.address_parser = Box::new(parser);
        self
    }

    /// Replaces the Date and Resent-Date parser.
    pub fn date_parser(mut self, parser: impl Fn(&str) -> Result<DateTime> + 'static) -> Self {
        self.date_parser = Box::new(parser);
        self
    }

    /// Replaces the function that drains a file's decoded stream. Return an
    /// empty vector to store the content elsewhere and keep the [`crate::File`]
    /// entry as metadata only.
    pub fn file_consumer(
        mut self,
        consumer: impl Fn(&mut dyn Read) -> io::Result<Vec<u8>> + 'static,
    ) -> Self {
        self.file_consumer = Box::new(consumer);
        self
    }
}
