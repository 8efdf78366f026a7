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

use crate::{Addr, Error, Result};

/// Parses an RFC 5322 address list into [`Addr`] entries, in message order.
///
/// Accepts name-addr (`Name <a@b>`), quoted display names, bare addr-spec,
/// comments (used as the display name when no other is present) and group
/// syntax, whose members are flattened into the list. A blank value is
/// [`Error::EmptyAddress`].
pub fn parse_address_list(value: &str) -> Result<Vec<Addr>> {
    if value.trim().is_empty() {
        return Err(Error::EmptyAddress);
    }

    let mut list = Vec::new();
    for item in split_list(value) {
        if let Some(addr) = parse_mailbox(&item) {
            list.push(addr);
        }
    }
    Ok(list)
}

/// Splits on the commas and group delimiters that sit outside quoted
/// strings, comments and angle brackets.
fn split_list(value: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut item = String::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut comment_depth = 0u32;
    let mut in_angles = false;

    for ch in value.chars() {
        if escaped {
            item.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes => {
                item.push(ch);
                escaped = true;
            }
            '"' if comment_depth == 0 => {
                item.push(ch);
                in_quotes = !in_quotes;
            }
            '(' if !in_quotes => {
                comment_depth += 1;
                item.push(ch);
            }
            ')' if !in_quotes && comment_depth > 0 => {
                comment_depth -= 1;
                item.push(ch);
            }
            '<' if !in_quotes && comment_depth == 0 => {
                in_angles = true;
                item.push(ch);
            }
            '>' if !in_quotes && comment_depth == 0 => {
                in_angles = false;
                item.push(ch);
            }
            // Group syntax: the display name before ':' is dropped, ';'
            // closes the group.
            ',' | ';' if !in_quotes && comment_depth == 0 && !in_angles => {
                items.push(std::mem::take(&mut item));
            }
            ':' if !in_quotes && comment_depth == 0 && !in_angles => item.clear(),
            _ => item.push(ch),
        }
    }
    items.push(item);
    items.retain(|item| !item.trim().is_empty());
    items
}

fn parse_mailbox(item: &str) -> Option<Addr> {
    let item = item.trim();

    if let Some(open) = find_unquoted(item, '<') {
        let close = item[open + 1..].find('>').map(|p| open + 1 + p)?;
        let address = item[open + 1..close].trim();
        let name = clean_name(&item[..open]);
        return match (name, address.is_empty()) {
            (_, true) => None,
            (Some(name), false) => Some(Addr::new(Some(&name), address)),
            (None, false) => Some(Addr::new(None, address)),
        };
    }

    // Bare addr-spec, possibly followed by a comment acting as the name.
    let mut address = String::new();
    let mut name = String::new();
    let mut comment_depth = 0u32;
    for ch in item.chars() {
        match ch {
            '(' => comment_depth += 1,
            ')' if comment_depth > 0 => comment_depth -= 1,
            _ if comment_depth > 0 => name.push(ch),
            _ => address.push(ch),
        }
    }
    let address = address.trim();
    if address.is_empty() {
        return None;
    }
    let name = name.trim();
    if name.is_empty() {
        Some(Addr::new(None, address))
    } else {
        Some(Addr::new(Some(name), address))
    }
}

/// Position of `ch` outside double quotes, or `None`.
fn find_unquoted(value: &str, needle: char) -> Option<usize> {
    let mut in_quotes = false;
    let mut escaped = false;
    for (pos, ch) in value.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            _ if ch == needle && !in_quotes => return Some(pos),
            _ => (),
        }
    }
    None
}

/// Normalizes a display name: strips comments, outer quotes and backslash
/// escapes. An empty result means "no name".
fn clean_name(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut in_quotes = false;
    let mut escaped = false;
    let mut comment_depth = 0u32;
    for ch in raw.chars() {
        if escaped {
            out.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes => escaped = true,
            '"' if comment_depth == 0 => in_quotes = !in_quotes,
            '(' if !in_quotes => comment_depth += 1,
            ')' if !in_quotes && comment_depth > 0 => comment_depth -= 1,
            _ if comment_depth > 0 => (),
            _ => out.push(ch),
        }
    }
    let out = out.trim();
    if out.is_empty() {
        None
    } else {
        Some(out.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::parse_address_list;
    use crate::{Addr, Error};

    fn addr(name: Option<&str>, address: &str) -> Addr {
        Addr::new(name, address)
    }

    #[test]
    fn parse_addresses() {
        let inputs = [
            (
                "John Doe <jdoe@machine.example>",
                vec![addr(Some("John Doe"), "jdoe@machine.example")],
            ),
            (
                "Mary Smith <mary@example.net>, jdoe@example.org, Who? <one@y.test>",
                vec![
                    addr(Some("Mary Smith"), "mary@example.net"),
                    addr(None, "jdoe@example.org"),
                    addr(Some("Who?"), "one@y.test"),
                ],
            ),
            (
                "\"Joe Q. Public\" <john.q.public@example.com>",
                vec![addr(Some("Joe Q. Public"), "john.q.public@example.com")],
            ),
            (
                "\"Giant; \\\"Big\\\" Box\" <sysservices@example.net>",
                vec![addr(
                    Some("Giant; \"Big\" Box"),
                    "sysservices@example.net",
                )],
            ),
            ("<boss@nil.test>", vec![addr(None, "boss@nil.test")]),
            (
                "pete(his account)@silly.test",
                vec![addr(Some("his account"), "pete@silly.test")],
            ),
            (
                "A Group:Ed Jones <c@a.test>,joe@where.test,John <jdoe@one.test>;",
                vec![
                    addr(Some("Ed Jones"), "c@a.test"),
                    addr(None, "joe@where.test"),
                    addr(Some("John"), "jdoe@one.test"),
                ],
            ),
            ("Undisclosed recipients:;", vec![]),
            (
                "\"a, b\" <quoted.comma@example.com>",
                vec![addr(Some("a, b"), "quoted.comma@example.com")],
            ),
        ];

        for (raw, expected) in inputs {
            assert_eq!(
                parse_address_list(raw).unwrap(),
                expected,
                "failed for {raw:?}"
            );
        }
    }

    #[test]
    fn blank_list_is_empty_address() {
        for raw in ["", "   ", "\t"] {
            assert!(matches!(
                parse_address_list(raw),
                Err(Error::EmptyAddress)
            ));
        }
    }
}
