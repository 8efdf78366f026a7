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

pub mod address;
pub mod date;
pub mod id;

use crate::decoders::encoded_word::decode_header;
use crate::parsers::header::HeaderMap;
use crate::parsers::Parser;
use crate::{Email, Error, Result};

/// Maps the tokenized header block onto the typed [`Email`] fields.
///
/// Every value goes through RFC 2047 decoding first. Address and date
/// fields run the parser's pluggable strategies; their "no value" sentinels
/// ([`Error::EmptyAddress`], [`Error::EmptyDate`]) leave the field at its
/// default and are never surfaced. `Content-*` headers are resolved
/// separately and skipped here; any other unrecognized header lands in
/// `extra_headers` in message order.
pub fn assemble_headers(email: &mut Email, headers: &HeaderMap, parser: &Parser) -> Result<()> {
    for (name, raw_value) in headers.iter() {
        let lower = name.to_ascii_lowercase();
        if lower.starts_with("content-") {
            continue;
        }
        // Received carries date tokens that RFC 2047 never applies to.
        if lower == "received" {
            email.received.push(raw_value.to_string());
            continue;
        }
        let value = decode_header(raw_value)?;

        match lower.as_str() {
            "sender" => email.sender = single_address(parser, &value)?,
            "from" => address_list(parser, &value, &mut email.from)?,
            "reply-to" => address_list(parser, &value, &mut email.reply_to)?,
            "to" => address_list(parser, &value, &mut email.to)?,
            "cc" => address_list(parser, &value, &mut email.cc)?,
            "bcc" => address_list(parser, &value, &mut email.bcc)?,
            "resent-sender" => email.resent_sender = single_address(parser, &value)?,
            "resent-from" => address_list(parser, &value, &mut email.resent_from)?,
            "resent-to" => address_list(parser, &value, &mut email.resent_to)?,
            "resent-cc" => address_list(parser, &value, &mut email.resent_cc)?,
            "resent-bcc" => address_list(parser, &value, &mut email.resent_bcc)?,
            "date" => email.date = date_field(parser, &value)?,
            "resent-date" => email.resent_date = date_field(parser, &value)?,
            "subject" => email.subject = value.trim().to_string(),
            "comments" => email.comments.push(value.trim().to_string()),
            "keywords" => email.keywords.extend(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(str::to_string),
            ),
            "message-id" => {
                if let Some(id) = id::parse_message_id(&value) {
                    email.message_id = id;
                }
            }
            "resent-message-id" => {
                if let Some(id) = id::parse_message_id(&value) {
                    email.resent_message_id = id;
                }
            }
            "in-reply-to" => email.in_reply_to.extend(id::parse_id_list(&value)),
            "references" => email.references.extend(id::parse_id_list(&value)),
            _ => email.extra_headers.push(name, value),
        }
    }
    Ok(())
}

fn address_list(parser: &Parser, value: &str, target: &mut Vec<crate::Addr>) -> Result<()> {
    match (parser.address_parser)(value) {
        Ok(list) => {
            target.extend(list);
            Ok(())
        }
        Err(Error::EmptyAddress) => Ok(()),
        Err(err) => Err(err),
    }
}

fn single_address(parser: &Parser, value: &str) -> Result<Option<crate::Addr>> {
    match (parser.address_parser)(value) {
        Ok(list) => Ok(list.into_iter().next()),
        Err(Error::EmptyAddress) => Ok(None),
        Err(err) => Err(err),
    }
}

fn date_field(
    parser: &Parser,
    value: &str,
) -> Result<Option<crate::parsers::fields::date::DateTime>> {
    match (parser.date_parser)(value) {
        Ok(date) => Ok(Some(date)),
        Err(Error::EmptyDate) => Ok(None),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::assemble_headers;
    use crate::parsers::header::parse_headers;
    use crate::parsers::Parser;
    use crate::{Addr, Email, Error};

    fn assemble(raw: &str) -> crate::Result<Email> {
        let (headers, _) = parse_headers(raw.as_bytes())?;
        let mut email = Email::default();
        assemble_headers(&mut email, &headers, &Parser::new())?;
        Ok(email)
    }

    #[test]
    fn assemble_typed_fields() {
        let email = assemble(concat!(
            "From: =?utf-8?Q?Andreas_Birkeb=C3=A6k?= <ab@example.dk>\r\n",
            "To: Mary Smith <mary@example.net>, jdoe@example.org\r\n",
            "Subject: =?ISO-8859-1?Q?Hyv=E4=E4?= day\r\n",
            "Date: Fri, 21 Nov 1997 09:55:06 -0600\r\n",
            "Message-ID: <1234@local.machine.example>\r\n",
            "References: <a@b.c> <d@e.f>\r\n",
            "Keywords: alpha, beta,, gamma\r\n",
            "Received: from relay.example by mx.example;\r\n",
            "  Fri, 21 Nov 1997 09:55:07 -0600\r\n",
            "X-Queue: 7\r\n",
            "\r\n",
        ))
        .unwrap();

        assert_eq!(
            email.from,
            [Addr::new(Some("Andreas Birkebæk"), "ab@example.dk")]
        );
        assert_eq!(
            email.to,
            [
                Addr::new(Some("Mary Smith"), "mary@example.net"),
                Addr::new(None, "jdoe@example.org"),
            ]
        );
        assert_eq!(email.subject, "Hyvää day");
        assert_eq!(email.date.unwrap().to_iso8601(), "1997-11-21T09:55:06-06:00");
        assert_eq!(email.message_id, "1234@local.machine.example");
        assert_eq!(email.references, ["a@b.c", "d@e.f"]);
        assert_eq!(email.keywords, ["alpha", "beta", "gamma"]);
        assert_eq!(email.received.len(), 1);
        assert!(email.received[0].starts_with("from relay.example"));
        assert_eq!(email.extra_headers.get("x-queue"), Some("7"));
    }

    #[test]
    fn blank_fields_stay_unset() {
        let email = assemble("To:\r\nDate:  \r\nSubject:\r\n\r\n").unwrap();
        assert!(email.to.is_empty());
        assert!(email.date.is_none());
        assert_eq!(email.subject, "");
    }

    #[test]
    fn undecodable_header_is_fatal() {
        let result = assemble("Subject: =?utf-8?Q?=ZZ?=\r\n\r\n");
        assert!(matches!(result, Err(Error::HeaderDecodeError(_))));
    }

    #[test]
    fn custom_address_parser_is_used() {
        let (headers, _) = parse_headers(b"To: whatever\r\n\r\n").unwrap();
        let parser =
            Parser::new().address_parser(|_| Ok(vec![Addr::new(None, "fixed@example.com")]));
        let mut email = Email::default();
        assemble_headers(&mut email, &headers, &parser).unwrap();
        assert_eq!(email.to, [Addr::new(None, "fixed@example.com")]);
    }
}
