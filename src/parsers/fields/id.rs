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

/// Extracts a single message identifier, stripped of its angle brackets.
pub fn parse_message_id(value: &str) -> Option<String> {
    parse_id_list(value).into_iter().next()
}

/// Extracts every `<id>` token from a header such as References. Text
/// between identifiers (phrases, comments) is skipped.
pub fn parse_id_list(value: &str) -> Vec<String> {
    let mut ids = Vec::new();
    let mut rest = value;
    while let Some(open) = rest.find('<') {
        let after = &rest[open + 1..];
        match after.find('>') {
            Some(close) => {
                let id = after[..close].trim();
                if !id.is_empty() {
                    ids.push(id.to_string());
                }
                rest = &after[close + 1..];
            }
            None => break,
        }
    }
    if ids.is_empty() {
        // Bare id without brackets, the common sendmail legacy form.
        let bare = value.trim();
        if !bare.is_empty() && !bare.contains('<') {
            ids.push(bare.to_string());
        }
    }
    ids
}
