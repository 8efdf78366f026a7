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

use std::fmt;

use crate::{Error, Result};

/// An RFC 5322 date-time, kept as its calendar fields plus the UTC offset
/// the message declared.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub tz_before_gmt: bool,
    pub tz_hour: u8,
    pub tz_minute: u8,
}

impl DateTime {
    pub fn to_iso8601(&self) -> String {
        format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}{}{:02}:{:02}",
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
            if self.tz_before_gmt { "-" } else { "+" },
            self.tz_hour,
            self.tz_minute
        )
    }

    /// Seconds since the Unix epoch, offset applied. Dates before 1970
    /// yield negative values.
    pub fn to_timestamp(&self) -> i64 {
        // Days-from-civil, Howard Hinnant's algorithm.
        let year = self.year as i64 - i64::from(self.month <= 2);
        let era = if year >= 0 { year } else { year - 399 } / 400;
        let yoe = year - era * 400;
        let doy = (153 * (self.month as i64 + if self.month > 2 { -3 } else { 9 }) + 2) / 5
            + self.day as i64
            - 1;
        let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
        let days = era * 146097 + doe - 719468;

        let offset = (self.tz_hour as i64 * 3600 + self.tz_minute as i64 * 60)
            * if self.tz_before_gmt { 1 } else { -1 };
        days * 86400 + self.hour as i64 * 3600 + self.minute as i64 * 60 + self.second as i64
            + offset
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(&self.to_iso8601())
    }
}

/// Parses an RFC 5322 date-time such as `Fri, 21 Nov 1997 09:55:06 -0600`.
///
/// Tolerates the obsolete syntax: comments anywhere, folded whitespace,
/// two-digit years (mapped into 1900..=1999), missing seconds and named
/// zones (which resolve to their fixed offsets, unknown names to +0000).
/// A blank value is [`Error::EmptyDate`], a value that does not yield a
/// complete date is [`Error::MalformedHeader`].
pub fn parse_date(value: &str) -> Result<DateTime> {
    if value.trim().is_empty() {
        return Err(Error::EmptyDate);
    }

    let mut tokens = Vec::with_capacity(8);
    let mut token = String::new();
    let mut comment_depth = 0u32;
    for ch in value.chars() {
        match ch {
            '(' => {
                comment_depth += 1;
                if !token.is_empty() {
                    tokens.push(std::mem::take(&mut token));
                }
            }
            ')' if comment_depth > 0 => comment_depth -= 1,
            _ if comment_depth > 0 => (),
            ' ' | '\t' | '\r' | '\n' | ',' => {
                if !token.is_empty() {
                    tokens.push(std::mem::take(&mut token));
                }
            }
            _ => token.push(ch),
        }
    }
    if !token.is_empty() {
        tokens.push(token);
    }

    let mut iter = tokens.iter().map(String::as_str).peekable();

    // Optional day-of-week.
    if iter
        .peek()
        .is_some_and(|t| t.chars().all(char::is_alphabetic))
    {
        iter.next();
    }

    let malformed = || Error::MalformedHeader(value.to_string());
    let day: u8 = iter.next().and_then(|t| t.parse().ok()).ok_or_else(malformed)?;
    let month = iter.next().and_then(month_number).ok_or_else(malformed)?;
    let mut year: u16 = iter.next().and_then(|t| t.parse().ok()).ok_or_else(malformed)?;
    if (1..=99).contains(&year) {
        year += 1900;
    }

    let time = iter.next().ok_or_else(malformed)?;
    let mut time_iter = time.split(':');
    let hour: u8 = time_iter
        .next()
        .and_then(|t| t.parse().ok())
        .ok_or_else(malformed)?;
    let minute: u8 = time_iter
        .next()
        .and_then(|t| t.parse().ok())
        .ok_or_else(malformed)?;
    let second: u8 = match time_iter.next() {
        Some(t) => t.parse().map_err(|_| malformed())?,
        None => 0,
    };

    let (tz_before_gmt, tz_hour, tz_minute) = match iter.next() {
        Some(zone) => parse_zone(zone).ok_or_else(malformed)?,
        None => (false, 0, 0),
    };

    if day == 0 || day > 31 || hour > 23 || minute > 59 || second > 60 {
        return Err(malformed());
    }

    Ok(DateTime {
        year,
        month,
        day,
        hour,
        minute,
        second,
        tz_before_gmt,
        tz_hour,
        tz_minute,
    })
}

fn month_number(name: &str) -> Option<u8> {
    Some(match name.to_ascii_lowercase().as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    })
}

fn parse_zone(zone: &str) -> Option<(bool, u8, u8)> {
    let mut chars = zone.chars();
    match chars.next()? {
        sign @ ('+' | '-') => {
            let digits = chars.as_str();
            if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let hhmm: u16 = digits.parse().ok()?;
            Some((sign == '-', (hhmm / 100) as u8, (hhmm % 100) as u8))
        }
        _ => {
            // RFC 5322 §4.3 obsolete named zones. Single-letter military
            // zones and unknown names mean +0000.
            let offset: i8 = match zone.to_ascii_uppercase().as_str() {
                "EDT" => -4,
                "EST" | "CDT" => -5,
                "CST" | "MDT" => -6,
                "MST" | "PDT" => -7,
                "PST" => -8,
                _ => 0,
            };
            Some((offset < 0, offset.unsigned_abs(), 0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::parse_date;
    use crate::Error;

    #[test]
    fn parse_dates() {
        let inputs = [
            (
                "Fri, 21 Nov 1997 09:55:06 -0600",
                "1997-11-21T09:55:06-06:00",
            ),
            (
                "Tue, 1 Jul 2003 10:52:37 +0200",
                "2003-07-01T10:52:37+02:00",
            ),
            (
                "Thu, 13 Feb 1969 23:32:54 -0330",
                "1969-02-13T23:32:54-03:30",
            ),
            (
                "Thu,\r\n   13\r\n  Feb\r\n    1969\r\n  23:32\r\n  -0330 (Newfoundland Time)",
                "1969-02-13T23:32:00-03:30",
            ),
            (
                " 1 Jul 2003 (comment about date) 10:52:37 +0200",
                "2003-07-01T10:52:37+02:00",
            ),
            ("21 Nov 97 09:55:06 GMT", "1997-11-21T09:55:06+00:00"),
            (" Wed, 27 Jun 99 04:11 +0900 ", "1999-06-27T04:11:00+09:00"),
            ("27 Feb 2004 14:52:25 EST", "2004-02-27T14:52:25-05:00"),
            ("1 Jan 2000 00:00:00", "2000-01-01T00:00:00+00:00"),
        ];

        for (raw, expected) in inputs {
            assert_eq!(
                parse_date(raw).unwrap().to_iso8601(),
                expected,
                "failed for {raw:?}"
            );
        }
    }

    #[test]
    fn timestamps() {
        for (raw, expected) in [
            ("1 Jan 1970 00:00:00 +0000", 0),
            ("Fri, 21 Nov 1997 09:55:06 -0600", 880127706),
            ("Thu, 1 Jan 2026 00:00:00 +0000", 1767225600),
            ("Tue, 1 Jul 2003 10:52:37 +0200", 1057049557),
            ("Thu, 13 Feb 1969 23:32:54 -0330", -27723426),
        ] {
            assert_eq!(
                parse_date(raw).unwrap().to_timestamp(),
                expected,
                "failed for {raw:?}"
            );
        }
    }

    #[test]
    fn reject_invalid_dates() {
        assert!(matches!(parse_date("   "), Err(Error::EmptyDate)));
        for raw in [
            "not a date",
            "99 Nov 1997 09:55:06 -0600",
            "21 Brumaire 1997 09:55:06",
            "21 Nov 1997",
            "21 Nov 1997 09:55:06 -06",
        ] {
            assert!(
                matches!(parse_date(raw), Err(Error::MalformedHeader(_))),
                "accepted {raw:?}"
            );
        }
    }
}
