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

use crate::decoders::charsets::charset_encoding;
use crate::parsers::header::HeaderMap;
use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Validated RFC 2183 content disposition.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Disposition {
    #[default]
    None,
    Inline,
    Attachment,
}

impl Disposition {
    fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("inline") {
            Ok(Disposition::Inline)
        } else if value.eq_ignore_ascii_case("attachment") {
            Ok(Disposition::Attachment)
        } else {
            Err(Error::UnknownDisposition(value.to_string()))
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::None => "none",
            Disposition::Inline => "inline",
            Disposition::Attachment => "attachment",
        }
    }
}

impl std::fmt::Display for Disposition {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt.write_str(self.as_str())
    }
}

/// Validated RFC 2045 content transfer encoding.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TransferEncoding {
    #[default]
    SevenBit,
    EightBit,
    Binary,
    QuotedPrintable,
    Base64,
}

impl TransferEncoding {
    /// Parses a Content-Transfer-Encoding value. An absent or blank header
    /// defaults to `7bit`; anything outside the closed RFC 2045 vocabulary
    /// fails with [`Error::UnknownTransferEncoding`].
    pub fn parse(value: Option<&str>) -> Result<Self> {
        let value = match value {
            Some(value) if !value.trim().is_empty() => value.trim(),
            _ => return Ok(TransferEncoding::SevenBit),
        };
        match value.to_ascii_lowercase().as_str() {
            "7bit" => Ok(TransferEncoding::SevenBit),
            "8bit" => Ok(TransferEncoding::EightBit),
            "binary" => Ok(TransferEncoding::Binary),
            "quoted-printable" => Ok(TransferEncoding::QuotedPrintable),
            "base64" => Ok(TransferEncoding::Base64),
            other => Err(Error::UnknownTransferEncoding(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferEncoding::SevenBit => "7bit",
            TransferEncoding::EightBit => "8bit",
            TransferEncoding::Binary => "binary",
            TransferEncoding::QuotedPrintable => "quoted-printable",
            TransferEncoding::Base64 => "base64",
        }
    }
}

impl std::fmt::Display for TransferEncoding {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt.write_str(self.as_str())
    }
}

/// Resolved content metadata of one MIME node.
///
/// A child node may read but never mutates its parent's `ContentInfo`:
/// charset inheritance is a one-way fallback evaluated once in
/// [`ContentInfo::resolve`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContentInfo {
    /// Lowercased `type/subtype`, `text/plain` when the header is absent.
    pub ctype: String,
    /// Content-Type parameters in message order, keys lowercased. The
    /// `charset`, `micalg` and `protocol` values are lowercased as well;
    /// other values (file names in particular) keep their case.
    pub type_params: Vec<(String, String)>,
    pub disposition: Disposition,
    pub disposition_params: Vec<(String, String)>,
    pub transfer_encoding: TransferEncoding,
    /// Content-ID trimmed of angle brackets and whitespace.
    pub id: String,
    /// Own charset parameter, else the parent's resolved charset, else empty.
    pub charset: String,
    /// Decoder for `charset`, when the label is known. A present label with
    /// an absent decoder means "pass bytes through undecoded".
    #[cfg_attr(feature = "serde", serde(skip))]
    pub encoding: Option<&'static encoding_rs::Encoding>,
}

impl Default for ContentInfo {
    fn default() -> Self {
        ContentInfo {
            ctype: "text/plain".to_string(),
            type_params: Vec::new(),
            disposition: Disposition::None,
            disposition_params: Vec::new(),
            transfer_encoding: TransferEncoding::SevenBit,
            id: String::new(),
            charset: String::new(),
            encoding: None,
        }
    }
}

impl ContentInfo {
    /// Resolves the content metadata of a node from its headers, inheriting
    /// the charset from `parent` when the node declares none.
    pub fn resolve(headers: &HeaderMap, parent: Option<&ContentInfo>) -> Result<Self> {
        let (ctype, type_params) = extract_type(headers.get("Content-Type"))?;
        let (disposition, disposition_params) =
            extract_disposition(headers.get("Content-Disposition"))?;
        let transfer_encoding = TransferEncoding::parse(headers.get("Content-Transfer-Encoding"))?;
        let id = headers
            .get("Content-ID")
            .map(|v| {
                v.trim_matches(|ch: char| ch == '<' || ch == '>' || ch.is_whitespace())
                    .to_string()
            })
            .unwrap_or_default();

        let charset = param_of(&type_params, "charset")
            .map(|c| c.to_string())
            .or_else(|| {
                parent
                    .filter(|p| !p.charset.is_empty())
                    .map(|p| p.charset.clone())
            })
            .unwrap_or_default();
        let encoding = if charset.is_empty() {
            None
        } else {
            charset_encoding(&charset)
        };

        Ok(ContentInfo {
            ctype,
            type_params,
            disposition,
            disposition_params,
            transfer_encoding,
            id,
            charset,
            encoding,
        })
    }

    /// Returns a Content-Type parameter value.
    pub fn param(&self, name: &str) -> Option<&str> {
        param_of(&self.type_params, name)
    }

    /// Returns a Content-Disposition parameter value.
    pub fn disposition_param(&self, name: &str) -> Option<&str> {
        param_of(&self.disposition_params, name)
    }

    pub fn boundary(&self) -> Option<&str> {
        self.param("boundary")
    }

    pub fn is_multipart(&self) -> bool {
        self.ctype.starts_with("multipart/")
    }

    /// `true` for the three media types assembled into body text.
    pub fn is_body_type(&self) -> bool {
        matches!(
            self.ctype.as_str(),
            "text/plain" | "text/enriched" | "text/html"
        )
    }

    /// Classifies this node as an inline file: own `inline` disposition, or a
    /// non-body type inside `multipart/related`.
    pub fn is_inline(&self, parent: Option<&ContentInfo>) -> bool {
        if self.disposition == Disposition::Inline {
            return true;
        }
        if self.is_body_type() {
            return false;
        }
        matches!(parent, Some(p) if p.ctype == "multipart/related")
    }

    /// Classifies this node as an attached file: own `attachment`
    /// disposition, or a non-body type inside `multipart/mixed` or
    /// `multipart/parallel`.
    pub fn is_attached(&self, parent: Option<&ContentInfo>) -> bool {
        if self.disposition == Disposition::Attachment {
            return true;
        }
        if self.is_body_type() {
            return false;
        }
        matches!(parent, Some(p) if p.ctype == "multipart/mixed" || p.ctype == "multipart/parallel")
    }
}

fn param_of<'x>(params: &'x [(String, String)], name: &str) -> Option<&'x str> {
    params
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Parses a Content-Type value per the RFC 2045 media-type grammar. An
/// absent header defaults to `text/plain` with no parameters.
pub fn extract_type(value: Option<&str>) -> Result<(String, Vec<(String, String)>)> {
    let value = match value {
        Some(value) if !value.trim().is_empty() => value,
        _ => return Ok(("text/plain".to_string(), Vec::new())),
    };

    let mut lex = MediaTypeLexer::new(value);
    let main = lex.token()?.to_ascii_lowercase();
    lex.expect(b'/')?;
    let sub = lex.token()?.to_ascii_lowercase();
    let mut params = lex.params()?;
    for (name, param) in params.iter_mut() {
        if matches!(name.as_str(), "charset" | "micalg" | "protocol") {
            param.make_ascii_lowercase();
        }
    }

    Ok((format!("{main}/{sub}"), params))
}

/// Parses a Content-Disposition value. An absent header yields
/// [`Disposition::None`] without error; a present one must carry a known
/// disposition token.
pub fn extract_disposition(value: Option<&str>) -> Result<(Disposition, Vec<(String, String)>)> {
    let value = match value {
        Some(value) if !value.trim().is_empty() => value,
        _ => return Ok((Disposition::None, Vec::new())),
    };

    let mut lex = MediaTypeLexer::new(value);
    let disposition = Disposition::parse(&lex.token()?)?;
    let params = lex.params()?;

    Ok((disposition, params))
}

/// Shared lexer for the `token *(";" attribute "=" value)` shape of
/// Content-Type and Content-Disposition values.
struct MediaTypeLexer<'x> {
    raw: &'x str,
    bytes: &'x [u8],
    pos: usize,
}

// RFC 2045 tspecials plus space and controls terminate a token.
fn is_token_char(ch: u8) -> bool {
    ch.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?=".contains(&ch)
}

impl<'x> MediaTypeLexer<'x> {
    fn new(raw: &'x str) -> Self {
        MediaTypeLexer {
            raw,
            bytes: raw.as_bytes(),
            pos: 0,
        }
    }

    fn fail(&self) -> Error {
        Error::MalformedMediaType(self.raw.trim().to_string())
    }

    fn skip_ws(&mut self) {
        while matches!(self.bytes.get(self.pos), Some(b' ' | b'\t')) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, ch: u8) -> Result<()> {
        self.skip_ws();
        if self.bytes.get(self.pos) == Some(&ch) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.fail())
        }
    }

    fn token(&mut self) -> Result<String> {
        self.skip_ws();
        let start = self.pos;
        while self.bytes.get(self.pos).is_some_and(|&ch| is_token_char(ch)) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.fail());
        }
        Ok(self.raw[start..self.pos].to_string())
    }

    fn quoted_string(&mut self) -> Result<String> {
        // Opening quote already consumed.
        let mut value = String::new();
        loop {
            match self.bytes.get(self.pos) {
                Some(b'"') => {
                    self.pos += 1;
                    return Ok(value);
                }
                Some(b'\\') => {
                    // The escaped character may be multi-byte.
                    let quoted = self.raw[self.pos + 1..]
                        .chars()
                        .next()
                        .ok_or_else(|| self.fail())?;
                    value.push(quoted);
                    self.pos += 1 + quoted.len_utf8();
                }
                Some(_) => {
                    let ch = self.raw[self.pos..].chars().next().unwrap();
                    value.push(ch);
                    self.pos += ch.len_utf8();
                }
                None => return Err(self.fail()),
            }
        }
    }

    fn params(&mut self) -> Result<Vec<(String, String)>> {
        let mut params = Vec::new();
        loop {
            self.skip_ws();
            match self.bytes.get(self.pos) {
                None => return Ok(params),
                Some(b';') => self.pos += 1,
                Some(_) => return Err(self.fail()),
            }
            self.skip_ws();
            if self.pos == self.bytes.len() {
                // Tolerated trailing semicolon.
                return Ok(params);
            }
            let name = self.token()?.to_ascii_lowercase();
            self.expect(b'=')?;
            self.skip_ws();
            let value = if self.bytes.get(self.pos) == Some(&b'"') {
                self.pos += 1;
                self.quoted_string()?
            } else {
                self.token()?
            };
            params.push((name, value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{extract_disposition, extract_type, ContentInfo, Disposition, TransferEncoding};
    use crate::parsers::header::HeaderMap;
    use crate::Error;

    #[test]
    fn parse_media_types() {
        let inputs = [
            (
                "text/plain; charset=UTF-8",
                "text/plain",
                vec![("charset", "utf-8")],
            ),
            (
                "Multipart/Mixed; boundary=\"simple boundary\"",
                "multipart/mixed",
                vec![("boundary", "simple boundary")],
            ),
            (
                "application/octet-stream; Name=\"Pricing Q3.XLSX\"",
                "application/octet-stream",
                vec![("name", "Pricing Q3.XLSX")],
            ),
            (
                "multipart/signed; micalg=SHA-256; protocol=\"application/PGP-signature\"",
                "multipart/signed",
                vec![
                    ("micalg", "sha-256"),
                    ("protocol", "application/pgp-signature"),
                ],
            ),
            ("image/png;", "image/png", vec![]),
            // Escapes in quoted strings may cover multi-byte characters.
            (
                "application/pdf; name=\"a\\é \\\"quoted\\\".pdf\"",
                "application/pdf",
                vec![("name", "aé \"quoted\".pdf")],
            ),
            (
                "text/plain; charset = \"iso-8859-2\" ; format=flowed",
                "text/plain",
                vec![("charset", "iso-8859-2"), ("format", "flowed")],
            ),
        ];

        for (raw, ctype, params) in inputs {
            let (parsed_type, parsed_params) = extract_type(Some(raw)).unwrap();
            assert_eq!(parsed_type, ctype, "failed for {raw:?}");
            let parsed: Vec<(&str, &str)> = parsed_params
                .iter()
                .map(|(n, v)| (n.as_str(), v.as_str()))
                .collect();
            assert_eq!(parsed, params, "failed for {raw:?}");
        }
    }

    #[test]
    fn default_media_type() {
        assert_eq!(
            extract_type(None).unwrap(),
            ("text/plain".to_string(), Vec::new())
        );
        assert_eq!(
            extract_type(Some("  ")).unwrap(),
            ("text/plain".to_string(), Vec::new())
        );
    }

    #[test]
    fn reject_malformed_media_types() {
        for raw in [
            "text",
            "text/",
            "/plain",
            "text/plain; charset",
            "text/plain; =utf-8",
            "text/plain; charset=\"unterminated",
            "text/plain extra",
        ] {
            assert!(
                matches!(extract_type(Some(raw)), Err(Error::MalformedMediaType(_))),
                "accepted {raw:?}"
            );
        }
    }

    #[test]
    fn parse_dispositions() {
        assert_eq!(
            extract_disposition(None).unwrap(),
            (Disposition::None, Vec::new())
        );
        let (disposition, params) =
            extract_disposition(Some("Attachment; filename=x.txt")).unwrap();
        assert_eq!(disposition, Disposition::Attachment);
        assert_eq!(params, [("filename".to_string(), "x.txt".to_string())]);
        assert_eq!(
            extract_disposition(Some("INLINE")).unwrap().0,
            Disposition::Inline
        );
        assert!(matches!(
            extract_disposition(Some("invitation")),
            Err(Error::UnknownDisposition(_))
        ));
    }

    #[test]
    fn parse_transfer_encodings() {
        for (raw, expected) in [
            (None, TransferEncoding::SevenBit),
            (Some(""), TransferEncoding::SevenBit),
            (Some("7BIT"), TransferEncoding::SevenBit),
            (Some("8bit"), TransferEncoding::EightBit),
            (Some("binary"), TransferEncoding::Binary),
            (Some(" Quoted-Printable "), TransferEncoding::QuotedPrintable),
            (Some("Base64"), TransferEncoding::Base64),
        ] {
            assert_eq!(TransferEncoding::parse(raw).unwrap(), expected);
        }
        assert!(matches!(
            TransferEncoding::parse(Some("uuencode")),
            Err(Error::UnknownTransferEncoding(_))
        ));
    }

    fn resolved(content_type: &str, parent: Option<&ContentInfo>) -> ContentInfo {
        let mut headers = HeaderMap::new();
        headers.push("Content-Type", content_type);
        ContentInfo::resolve(&headers, parent).unwrap()
    }

    #[test]
    fn charset_parent_fallback() {
        let parent = resolved("multipart/alternative; charset=iso-8859-2; boundary=b", None);
        assert_eq!(parent.charset, "iso-8859-2");

        // No own charset: inherit.
        let child = resolved("text/plain", Some(&parent));
        assert_eq!(child.charset, "iso-8859-2");
        assert!(child.encoding.is_some());

        // Own charset: never inherit.
        let child = resolved("text/plain; charset=koi8-r", Some(&parent));
        assert_eq!(child.charset, "koi8-r");

        // Neither declares one: empty charset, no encoding, no error.
        let bare_parent = resolved("multipart/mixed; boundary=b", None);
        let child = resolved("application/pdf", Some(&bare_parent));
        assert_eq!(child.charset, "");
        assert!(child.encoding.is_none());
    }

    #[test]
    fn unknown_charset_label_is_not_fatal() {
        let info = resolved("text/plain; charset=x-mystery-encoding", None);
        assert_eq!(info.charset, "x-mystery-encoding");
        assert!(info.encoding.is_none());
    }

    #[test]
    fn content_id_is_trimmed() {
        let mut headers = HeaderMap::new();
        headers.push("Content-ID", " <part1.0001@example.com> ");
        let info = ContentInfo::resolve(&headers, None).unwrap();
        assert_eq!(info.id, "part1.0001@example.com");
    }

    #[test]
    fn classification_table() {
        // (disposition, type, parent type, inline, attached)
        let table = [
            ("inline", "text/plain", "multipart/mixed", true, false),
            ("inline", "image/png", "multipart/other", true, false),
            ("attachment", "text/plain", "multipart/related", false, true),
            ("attachment", "image/png", "multipart/other", false, true),
            ("", "text/plain", "multipart/related", false, false),
            ("", "text/enriched", "multipart/mixed", false, false),
            ("", "text/html", "multipart/parallel", false, false),
            ("", "image/png", "multipart/related", true, false),
            ("", "image/png", "multipart/mixed", false, true),
            ("", "image/png", "multipart/parallel", false, true),
            ("", "image/png", "multipart/alternative", false, false),
            ("", "text/calendar", "multipart/mixed", false, true),
        ];

        for (disposition, ctype, parent_type, inline, attached) in table {
            let parent = resolved(&format!("{parent_type}; boundary=b"), None);
            let mut headers = HeaderMap::new();
            headers.push("Content-Type", ctype);
            if !disposition.is_empty() {
                headers.push("Content-Disposition", disposition);
            }
            let info = ContentInfo::resolve(&headers, Some(&parent)).unwrap();
            assert_eq!(
                info.is_inline(Some(&parent)),
                inline,
                "inline mismatch for {disposition:?} {ctype} in {parent_type}"
            );
            assert_eq!(
                info.is_attached(Some(&parent)),
                attached,
                "attached mismatch for {disposition:?} {ctype} in {parent_type}"
            );
        }
    }
}
