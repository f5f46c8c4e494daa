//! Publish date resolution and visibility rules.
//!
//! A page's date comes from its `date` front matter field, parsed with the
//! configured pattern, or else from a `YYYY-MM-DD-` file name prefix. Missing
//! time components default to noon in the configured timezone.

use std::sync::LazyLock;

use chrono::format::{Parsed, StrftimeItems};
use chrono::{
    DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc,
};
use regex::Regex;
use serde_json::Value;

use super::document::FrontMatter;

static FILE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})-(\d{2})-(\d{2})-(.+)$").expect("file date pattern is valid")
});

#[derive(thiserror::Error, Debug)]
pub enum DateError {
    #[error("unknown timezone '{0}' (expected UTC, local, or an offset like +02:00)")]
    Timezone(String),

    #[error("invalid date format pattern '{0}'")]
    Pattern(String),

    #[error("'{value}' does not match date format '{format}'")]
    Unparseable { value: String, format: String },

    #[error("date must be a string, found {0}")]
    NotAString(String),
}

/// Whether a parsed page is published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    /// `draft: true` and drafts are not enabled
    Draft,
    /// Dated after the build instant and future pages are not enabled
    Future,
}

/// Timezone that date-only values are placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Fixed(FixedOffset),
    /// System zone; the offset is looked up per date so DST is honored
    Local,
}

impl Zone {
    /// Place a wall-clock time in this zone. `None` inside a DST gap.
    pub fn localize(&self, naive: &NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self {
            Zone::Fixed(offset) => offset.from_local_datetime(naive).single(),
            Zone::Local => Local
                .from_local_datetime(naive)
                .earliest()
                .map(|date| date.fixed_offset()),
        }
    }
}

/// Resolves publish dates and visibility against one build instant.
#[derive(Debug, Clone)]
pub struct DateResolver {
    pattern: String,
    formats: Vec<String>,
    zone: Zone,
    now: DateTime<FixedOffset>,
    show_drafts: bool,
    show_future: bool,
}

impl DateResolver {
    pub fn new(pattern: &str, timezone: &str, now: DateTime<Utc>) -> Result<Self, DateError> {
        let zone = parse_timezone(timezone)?;
        let formats = expand_optional_sections(pattern)?;

        Ok(Self {
            pattern: pattern.to_string(),
            formats,
            zone,
            now: now.fixed_offset(),
            show_drafts: false,
            show_future: false,
        })
    }

    /// Include drafts and/or future-dated pages.
    pub fn with_visibility(mut self, drafts: bool, future: bool) -> Self {
        self.show_drafts = drafts;
        self.show_future = future;
        self
    }

    /// Parse a date string with the configured pattern (RFC 3339 also works).
    pub fn parse_date(&self, text: &str) -> Result<DateTime<FixedOffset>, DateError> {
        let text = text.trim();
        if let Ok(date) = DateTime::parse_from_rfc3339(text) {
            return Ok(date);
        }

        self.formats
            .iter()
            .find_map(|format| self.parse_with(text, format))
            .ok_or_else(|| DateError::Unparseable {
                value: text.to_string(),
                format: self.pattern.clone(),
            })
    }

    fn parse_with(&self, text: &str, format: &str) -> Option<DateTime<FixedOffset>> {
        let mut parsed = Parsed::new();
        chrono::format::parse(&mut parsed, text, StrftimeItems::new(format)).ok()?;

        let date = parsed.to_naive_date().ok()?;
        let time = parsed.to_naive_time().unwrap_or_else(|_| noon());
        let naive = NaiveDateTime::new(date, time);

        match parsed.to_fixed_offset() {
            Ok(offset) => offset.from_local_datetime(&naive).single(),
            Err(_) => self.zone.localize(&naive),
        }
    }

    /// Split a `YYYY-MM-DD-title` file stem into its date (at noon) and title.
    pub fn from_file_name<'a>(&self, stem: &'a str) -> Option<(DateTime<FixedOffset>, &'a str)> {
        let captures = FILE_DATE.captures(stem)?;
        let year = captures[1].parse().ok()?;
        let month = captures[2].parse().ok()?;
        let day = captures[3].parse().ok()?;
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        let rest = captures.get(4)?.as_str();

        let date = self.zone.localize(&NaiveDateTime::new(date, noon()))?;
        Some((date, rest))
    }

    /// Resolve the publish date: front matter `date` first, then the file name.
    pub fn resolve(
        &self,
        front_matter: &FrontMatter,
        stem: &str,
    ) -> Result<Option<DateTime<FixedOffset>>, DateError> {
        match front_matter.get("date") {
            Some(Value::String(s)) => return self.parse_date(s).map(Some),
            Some(Value::Null) | None => {}
            Some(other) => return Err(DateError::NotAString(other.to_string())),
        }

        Ok(self.from_file_name(stem).map(|(date, _)| date))
    }

    /// Apply draft and future rules.
    pub fn visibility(
        &self,
        front_matter: &FrontMatter,
        date: Option<&DateTime<FixedOffset>>,
    ) -> Visibility {
        let draft = match front_matter.get("draft") {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        };
        if draft && !self.show_drafts {
            return Visibility::Draft;
        }

        if let Some(date) = date
            && *date > self.now
            && !self.show_future
        {
            return Visibility::Future;
        }

        Visibility::Visible
    }
}

fn noon() -> NaiveTime {
    NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Parse `UTC`, `local`, `Z`, or `+HH:MM` / `-HHMM` offsets.
pub fn parse_timezone(timezone: &str) -> Result<Zone, DateError> {
    let tz = timezone.trim();
    if tz.eq_ignore_ascii_case("utc") || tz.eq_ignore_ascii_case("z") || tz.eq_ignore_ascii_case("gmt") {
        return Ok(Zone::Fixed(Utc.fix()));
    }
    if tz.eq_ignore_ascii_case("local") {
        return Ok(Zone::Local);
    }

    let offset = tz
        .strip_prefix("UTC")
        .or_else(|| tz.strip_prefix("GMT"))
        .unwrap_or(tz);
    let (sign, rest) = match offset.as_bytes().first() {
        Some(b'+') => (1, &offset[1..]),
        Some(b'-') => (-1, &offset[1..]),
        _ => return Err(DateError::Timezone(timezone.to_string())),
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !(digits.len() == 2 || digits.len() == 4) || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(DateError::Timezone(timezone.to_string()));
    }
    let hours: i32 = digits[..2].parse().map_err(|_| DateError::Timezone(timezone.to_string()))?;
    let minutes: i32 = if digits.len() == 4 {
        digits[2..].parse().map_err(|_| DateError::Timezone(timezone.to_string()))?
    } else {
        0
    };

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .map(Zone::Fixed)
        .ok_or_else(|| DateError::Timezone(timezone.to_string()))
}

/// Expand `[...]` optional sections into concrete formats, longest first.
///
/// `"%Y-%m-%d[ %H:%M][:%S]"` expands to
/// `["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%d:%S", "%Y-%m-%d"]`.
fn expand_optional_sections(pattern: &str) -> Result<Vec<String>, DateError> {
    let mut parts: Vec<(String, bool)> = Vec::new();
    let mut current = String::new();
    let mut optional = false;

    for c in pattern.chars() {
        match c {
            '[' if !optional => {
                if !current.is_empty() {
                    parts.push((std::mem::take(&mut current), false));
                }
                optional = true;
            }
            ']' if optional => {
                parts.push((std::mem::take(&mut current), true));
                optional = false;
            }
            '[' | ']' => return Err(DateError::Pattern(pattern.to_string())),
            _ => current.push(c),
        }
    }
    if optional {
        return Err(DateError::Pattern(pattern.to_string()));
    }
    if !current.is_empty() {
        parts.push((current, false));
    }

    let optional_count = parts.iter().filter(|(_, opt)| *opt).count();
    if optional_count > 8 {
        return Err(DateError::Pattern(pattern.to_string()));
    }

    let mut formats: Vec<String> = Vec::with_capacity(1 << optional_count);
    // Each bit of `mask` toggles one optional section; all-on comes first.
    for mask in (0..(1u32 << optional_count)).rev() {
        let mut format = String::new();
        let mut bit = 0;
        for (part, opt) in &parts {
            if *opt {
                if mask & (1 << (optional_count - 1 - bit)) != 0 {
                    format.push_str(part);
                }
                bit += 1;
            } else {
                format.push_str(part);
            }
        }
        if !formats.contains(&format) {
            formats.push(format);
        }
    }

    Ok(formats)
}
