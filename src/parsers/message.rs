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

use std::io::Read;

use tracing::{debug, trace};

use crate::decoders::charsets::{charset_encoding, decode_buffer};
use crate::decoders::decode_content;
use crate::parsers::fields::assemble_headers;
use crate::parsers::header::parse_headers;
use crate::parsers::mime::{ContentInfo, Disposition};
use crate::parsers::multipart::split_parts;
use crate::parsers::{Parser, ProcessMode};
use crate::{Email, Error, File, Result};

impl Parser {
    /// Parses one complete message from `input`.
    ///
    /// Returns a fully populated [`Email`] or the first fatal error; a
    /// partially parsed message is never returned.
    pub fn parse(&self, mut input: impl Read) -> Result<Email> {
        let mut raw = Vec::new();
        input.read_to_end(&mut raw)?;
        self.parse_bytes(&raw)
    }

    pub fn parse_bytes(&self, raw: &[u8]) -> Result<Email> {
        let (headers, body) = parse_headers(raw)?;
        trace!(headers = headers.len(), body = body.len(), "tokenized message");

        let mut email = Email::default();
        assemble_headers(&mut email, &headers, self)?;
        email.content_info = ContentInfo::resolve(&headers, None)?;

        if self.mode == ProcessMode::HeadersOnly {
            return Ok(email);
        }

        let info = email.content_info.clone();
        if info.is_body_type() {
            let text = decode_text(body, &info)?;
            match info.ctype.as_str() {
                "text/plain" => email.text = text,
                "text/enriched" => email.enriched_text = text,
                _ => email.html = text,
            }
        } else if info.is_multipart() {
            self.walk_multipart(&mut email, &info, body)?;
        } else {
            // A single-part message whose body is itself the file.
            let file = self.extract_file(email.files.len(), &info, body)?;
            email.files.push(file);
        }

        debug!(
            files = email.files.len(),
            text = !email.text.is_empty(),
            html = !email.html.is_empty(),
            "message parsed"
        );
        Ok(email)
    }

    /// Visits every part of a multipart body, depth first. `parent` is the
    /// enclosing multipart entity; each nesting level passes its own
    /// ContentInfo down, never the grandparent's.
    fn walk_multipart(&self, email: &mut Email, parent: &ContentInfo, body: &[u8]) -> Result<()> {
        let boundary = parent.boundary().ok_or(Error::MissingBoundary)?;

        for part in split_parts(body, boundary) {
            let (headers, part_body) = parse_headers(part)?;
            let info = ContentInfo::resolve(&headers, Some(parent))?;
            trace!(ctype = %info.ctype, disposition = %info.disposition, "visiting part");

            // An explicitly marked attachment is a file regardless of its
            // type, so this check precedes the text routing.
            if info.disposition == Disposition::Attachment {
                let file = self.extract_file(email.files.len(), &info, part_body)?;
                email.files.push(file);
                continue;
            }

            match info.ctype.as_str() {
                "text/plain" => {
                    let text = decode_text(part_body, &info)?;
                    if !email.text.is_empty() {
                        email.text.push_str("\n\n");
                    }
                    email.text.push_str(&text);
                }
                "text/enriched" => email.enriched_text.push_str(&decode_text(part_body, &info)?),
                "text/html" => email.html.push_str(&decode_text(part_body, &info)?),
                _ if info.is_multipart() => self.walk_multipart(email, &info, part_body)?,
                _ if info.is_inline(Some(parent)) || info.is_attached(Some(parent)) => {
                    if self.mode == ProcessMode::SkipAttachments {
                        debug!(ctype = %info.ctype, "skipping attachment part");
                        continue;
                    }
                    let file = self.extract_file(email.files.len(), &info, part_body)?;
                    email.files.push(file);
                }
                _ => return Err(Error::UnknownContentType(parent.ctype.clone())),
            }
        }
        Ok(())
    }

    /// Decodes one part into a [`File`], resolving its name and handing the
    /// decoded stream to the configured consumer.
    fn extract_file(&self, index: usize, info: &ContentInfo, body: &[u8]) -> Result<File> {
        let name = file_name(info)
            .unwrap_or_else(|| format!("attachment_{}_{}", index, info.disposition));
        debug!(name = %name, ctype = %info.ctype, "extracting file");

        let mut stream = decode_content(body, info);
        let data = (self.file_consumer)(&mut stream)?;

        Ok(File {
            name,
            disposition: info.disposition,
            content_info: info.clone(),
            data,
        })
    }
}

/// Decodes a text body part and normalizes it: `\r\n` becomes `\n` and
/// surrounding whitespace is trimmed.
fn decode_text(body: &[u8], info: &ContentInfo) -> Result<String> {
    let mut bytes = Vec::new();
    decode_content(body, info).read_to_end(&mut bytes)?;
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    };
    Ok(text.replace("\r\n", "\n").trim().to_string())
}

/// Resolves a file name from the part's parameters, in order: disposition
/// `filename`, its RFC 2231 `filename*` extended form, type `name`, then
/// `name*`. Each candidate is reduced to its final path component; a
/// candidate that reduces to nothing falls through to the next.
fn file_name(info: &ContentInfo) -> Option<String> {
    let candidates = [
        info.disposition_param("filename").map(str::to_string),
        info.disposition_param("filename*").and_then(decode_ext_value),
        info.param("name").map(str::to_string),
        info.param("name*").and_then(decode_ext_value),
    ];
    candidates
        .into_iter()
        .flatten()
        .find_map(|candidate| sanitize_name(&candidate))
}

/// Decodes an RFC 2231 extended parameter value, `charset'lang'percent-text`.
fn decode_ext_value(value: &str) -> Option<String> {
    let mut fields = value.splitn(3, '\'');
    let charset = fields.next()?;
    let _lang = fields.next()?;
    let encoded = fields.next()?;
    let bytes = urlencoding::decode_binary(encoded.as_bytes()).into_owned();
    Some(match charset_encoding(charset) {
        Some(encoding) => decode_buffer(encoding, &bytes),
        None => String::from_utf8_lossy(&bytes).into_owned(),
    })
}

/// Reduces a name to its final path component and rejects the `.`/`..`
/// segments, so the result is safe to join onto a target directory.
fn sanitize_name(raw: &str) -> Option<String> {
    let base = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(raw)
        .trim();
    match base {
        "" | "." | ".." => None,
        _ => Some(base.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::{file_name, sanitize_name};
    use crate::parsers::header::HeaderMap;
    use crate::parsers::mime::ContentInfo;

    fn info_for(headers: &[(&str, &str)]) -> ContentInfo {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.push(name.to_string(), value.to_string());
        }
        ContentInfo::resolve(&map, None).unwrap()
    }

    #[test]
    fn sanitize_names() {
        let inputs = [
            ("report.pdf", Some("report.pdf")),
            ("/etc/ssh/sshd_config", Some("sshd_config")),
            ("..\\..\\windows\\system32\\cmd.exe", Some("cmd.exe")),
            ("archive/../../secret", Some("secret")),
            ("trailing/", None),
            ("..", None),
            (".", None),
            ("  spaced name.txt  ", Some("spaced name.txt")),
        ];
        for (raw, expected) in inputs {
            assert_eq!(sanitize_name(raw).as_deref(), expected, "failed for {raw:?}");
        }
    }

    #[test]
    fn resolve_file_names() {
        let inputs: [(&[(&str, &str)], Option<&str>); 5] = [
            (
                &[("Content-Disposition", "attachment; filename=x.txt")],
                Some("x.txt"),
            ),
            // filename wins over name.
            (
                &[
                    ("Content-Disposition", "attachment; filename=first.bin"),
                    ("Content-Type", "application/octet-stream; name=second.bin"),
                ],
                Some("first.bin"),
            ),
            (
                &[("Content-Type", "application/pdf; name=report.pdf")],
                Some("report.pdf"),
            ),
            // RFC 2231 extended value.
            (
                &[(
                    "Content-Disposition",
                    "attachment; filename*=utf-8''caf%C3%A9%20menu.pdf",
                )],
                Some("café menu.pdf"),
            ),
            (&[("Content-Type", "application/pdf")], None),
        ];
        for (headers, expected) in inputs {
            assert_eq!(
                file_name(&info_for(headers)).as_deref(),
                expected,
                "failed for {headers:?}"
            );
        }
    }
}
