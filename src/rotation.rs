//! Deciding which file an event belongs to.
//!
//! Files are named from a path template containing a `{Date}` token, e.g.
//! `logs/app-{Date}.json` resolves to `logs/app-2024-01-15.json`. When a size
//! limit splits one day into several files the later ones carry a sequence
//! number: `logs/app-2024-01-15_001.json`. Dates are always taken from the
//! event timestamp converted to UTC.

use crate::{Error, Event, Result};
use serde::{Deserialize, Deserializer, de};
use std::path::{Path, PathBuf};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, UtcOffset};

/// Placeholder replaced by the file date.
pub const DATE_TOKEN: &str = "{Date}";

/// Parse a size string with an optional unit (K/M/G, case-insensitive, binary
/// multiples). A bare number is a byte count.
pub fn parse_size(s: &str) -> std::result::Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty size string".to_string());
    }

    let (num_str, multiplier) = match s.char_indices().last() {
        Some((idx, unit)) if unit.is_ascii_alphabetic() => {
            let multiplier = match unit.to_ascii_uppercase() {
                'K' => 1024,
                'M' => 1024 * 1024,
                'G' => 1024 * 1024 * 1024,
                _ => return Err(format!("invalid unit: {}, supported: K/M/G", unit)),
            };
            (s[..idx].trim(), multiplier)
        }
        _ => (s, 1),
    };

    let num: u64 = num_str
        .parse()
        .map_err(|_| format!("invalid number: {}", num_str))?;

    num.checked_mul(multiplier)
        .ok_or_else(|| "size too large".to_string())
}

/// Size value that can be a number or string with units.
#[derive(Deserialize)]
#[serde(untagged)]
enum SizeValue {
    Number(u64),
    String(String),
}

impl SizeValue {
    fn to_limit(&self) -> std::result::Result<Option<u64>, String> {
        match self {
            SizeValue::Number(n) => Ok(Some(*n)),
            SizeValue::String(s) if s.trim().eq_ignore_ascii_case("unbounded") => Ok(None),
            SizeValue::String(s) => parse_size(s).map(Some),
        }
    }
}

/// Deserialize an optional size limit: a byte count, a string with units,
/// `"unbounded"` or null.
pub(crate) fn deserialize_size_limit<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<SizeValue>::deserialize(deserializer)? {
        None => Ok(None),
        Some(value) => value.to_limit().map_err(de::Error::custom),
    }
}

/// `yyyy-MM-dd`, the date part of every file name.
const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

fn format_date(date: Date) -> String {
    // A calendar date always has every component the description asks for.
    date.format(DATE_FORMAT).unwrap_or_else(|_| date.to_string())
}

/// A parsed path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    directory: PathBuf,
    prefix: String,
    suffix: String,
}

impl PathTemplate {
    /// Parse a template such as `logs/app-{Date}.json`.
    ///
    /// A template without `{Date}` gets `-{Date}` inserted before the file
    /// extension. The token may appear once, and only in the file name.
    pub fn parse(template: &str) -> Result<Self> {
        if template.trim().is_empty() {
            return Err(Error::Config("path template must not be empty".to_string()));
        }

        let path = Path::new(template);
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                Error::Config(format!("path template has no file name: {}", template))
            })?;
        let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();

        if directory.to_string_lossy().contains(DATE_TOKEN) {
            return Err(Error::Config(format!(
                "{} must be part of the file name: {}",
                DATE_TOKEN, template
            )));
        }

        let (prefix, suffix) = match file_name.matches(DATE_TOKEN).count() {
            0 => match file_name.rfind('.') {
                Some(idx) if idx > 0 => (
                    format!("{}-", &file_name[..idx]),
                    file_name[idx..].to_string(),
                ),
                _ => (format!("{}-", file_name), String::new()),
            },
            1 => {
                let (prefix, suffix) = file_name.split_once(DATE_TOKEN).unwrap_or((file_name, ""));
                (prefix.to_string(), suffix.to_string())
            }
            _ => {
                return Err(Error::Config(format!(
                    "path template may contain {} only once: {}",
                    DATE_TOKEN, template
                )));
            }
        };

        Ok(Self {
            directory,
            prefix,
            suffix,
        })
    }

    /// Directory holding the rolled files, `.` for a bare file name.
    pub fn directory(&self) -> &Path {
        if self.directory.as_os_str().is_empty() {
            Path::new(".")
        } else {
            &self.directory
        }
    }

    /// File path for `date` and size-epoch `sequence`.
    pub fn resolve(&self, date: Date, sequence: u32) -> PathBuf {
        let name = if sequence == 0 {
            format!("{}{}{}", self.prefix, format_date(date), self.suffix)
        } else {
            format!(
                "{}{}_{:03}{}",
                self.prefix,
                format_date(date),
                sequence,
                self.suffix
            )
        };
        self.directory.join(name)
    }

    /// Recover date and sequence from a file name produced by [`PathTemplate::resolve`].
    pub fn parse_file_name(&self, name: &str) -> Option<(Date, u32)> {
        let middle = name
            .strip_prefix(self.prefix.as_str())?
            .strip_suffix(self.suffix.as_str())?;
        let date = Date::parse(middle.get(..10)?, DATE_FORMAT).ok()?;

        let rest = middle.get(10..)?;
        if rest.is_empty() {
            return Some((date, 0));
        }

        let digits = rest.strip_prefix('_')?;
        if digits.len() < 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some((date, digits.parse().ok()?))
    }
}

/// The file an event should be written to.
///
/// Two identities are equal when they resolve to the same path.
#[derive(Debug, Clone)]
pub struct FileIdentity {
    date: Date,
    sequence: u32,
    path: PathBuf,
}

impl FileIdentity {
    pub fn new(template: &PathTemplate, date: Date, sequence: u32) -> Self {
        Self {
            date,
            sequence,
            path: template.resolve(date, sequence),
        }
    }

    pub fn date(&self) -> Date {
        self.date
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PartialEq for FileIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for FileIdentity {}

/// Outcome of [`RollingPolicy::decide`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Keep writing to the current file.
    Keep,
    /// Close the current file and continue in this one.
    RollTo(FileIdentity),
}

/// Date and size based rolling rules.
#[derive(Debug, Clone)]
pub struct RollingPolicy {
    template: PathTemplate,
    file_size_limit: Option<u64>,
}

impl RollingPolicy {
    pub fn new(template: PathTemplate, file_size_limit: Option<u64>) -> Self {
        Self {
            template,
            file_size_limit,
        }
    }

    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    pub fn file_size_limit(&self) -> Option<u64> {
        self.file_size_limit
    }

    /// First file for the event's UTC date.
    pub fn identity_for(&self, event: &Event) -> FileIdentity {
        let date = event.timestamp().to_offset(UtcOffset::UTC).date();
        FileIdentity::new(&self.template, date, 0)
    }

    /// Decide where a record of `next_record_len` bytes for `event` goes.
    ///
    /// A date change wins over the size limit and starts the new date at
    /// sequence 0. The size limit only rolls a file that already has content,
    /// so a record larger than the limit is still written, alone, to a fresh
    /// file.
    pub fn decide(
        &self,
        current: Option<&FileIdentity>,
        current_size: u64,
        next_record_len: u64,
        event: &Event,
    ) -> Decision {
        let dated = self.identity_for(event);
        let Some(current) = current else {
            return Decision::RollTo(dated);
        };

        if dated.date() != current.date() {
            return Decision::RollTo(dated);
        }

        if self.fits(current_size, next_record_len) {
            Decision::Keep
        } else {
            Decision::RollTo(FileIdentity::new(
                &self.template,
                current.date(),
                current.sequence() + 1,
            ))
        }
    }

    /// Whether a record of `next_record_len` bytes may go into a file of
    /// `current_size` bytes. An empty file takes any record.
    pub fn fits(&self, current_size: u64, next_record_len: u64) -> bool {
        match self.file_size_limit {
            Some(limit) => {
                current_size == 0 || current_size.saturating_add(next_record_len) <= limit
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Level;
    use time::macros::{date, datetime};

    fn event_at(ts: time::OffsetDateTime) -> Event {
        Event::new(Level::Information, "tick").at(ts)
    }

    #[test]
    fn test_parse_size_units() {
        assert_eq!(parse_size("10"), Ok(10));
        assert_eq!(parse_size("5K"), Ok(5 * 1024));
        assert_eq!(parse_size("2m"), Ok(2 * 1024 * 1024));
        assert_eq!(parse_size("1G"), Ok(1024 * 1024 * 1024));
        assert_eq!(parse_size("3 k"), Ok(3 * 1024));
        assert!(parse_size("").is_err());
        assert!(parse_size("4T").is_err());
        assert!(parse_size("abcK").is_err());
    }

    #[test]
    fn test_deserialize_size_limit() {
        #[derive(Deserialize)]
        struct Holder {
            #[serde(deserialize_with = "deserialize_size_limit")]
            limit: Option<u64>,
        }

        let holder: Holder = serde_yaml::from_str("limit: 2048").unwrap();
        assert_eq!(holder.limit, Some(2048));

        let holder: Holder = serde_yaml::from_str("limit: \"512K\"").unwrap();
        assert_eq!(holder.limit, Some(512 * 1024));

        let holder: Holder = serde_yaml::from_str("limit: unbounded").unwrap();
        assert_eq!(holder.limit, None);

        let holder: Holder = serde_yaml::from_str("limit: ~").unwrap();
        assert_eq!(holder.limit, None);

        assert!(serde_yaml::from_str::<Holder>("limit: \"7Q\"").is_err());
    }

    #[test]
    fn test_path_template_resolve() {
        let template = PathTemplate::parse("logs/app-{Date}.json").unwrap();

        assert_eq!(template.directory(), Path::new("logs"));
        assert_eq!(
            template.resolve(date!(2024-01-15), 0),
            PathBuf::from("logs/app-2024-01-15.json")
        );
        assert_eq!(
            template.resolve(date!(2024-01-15), 2),
            PathBuf::from("logs/app-2024-01-15_002.json")
        );
    }

    #[test]
    fn test_path_template_without_token() {
        let template = PathTemplate::parse("app.json").unwrap();
        assert_eq!(template.directory(), Path::new("."));
        assert_eq!(
            template.resolve(date!(2024-03-01), 0),
            PathBuf::from("app-2024-03-01.json")
        );

        let template = PathTemplate::parse("logs/app").unwrap();
        assert_eq!(
            template.resolve(date!(2024-03-01), 0),
            PathBuf::from("logs/app-2024-03-01")
        );
    }

    #[test]
    fn test_path_template_rejects_bad_templates() {
        assert!(PathTemplate::parse("").unwrap_err().is_config());
        assert!(PathTemplate::parse("   ").unwrap_err().is_config());
        assert!(
            PathTemplate::parse("logs/{Date}/app.json")
                .unwrap_err()
                .is_config()
        );
        assert!(
            PathTemplate::parse("app-{Date}-{Date}.json")
                .unwrap_err()
                .is_config()
        );
    }

    #[test]
    fn test_path_template_parse_file_name() {
        let template = PathTemplate::parse("logs/app-{Date}.json").unwrap();

        assert_eq!(
            template.parse_file_name("app-2024-01-15.json"),
            Some((date!(2024-01-15), 0))
        );
        assert_eq!(
            template.parse_file_name("app-2024-01-15_012.json"),
            Some((date!(2024-01-15), 12))
        );
        assert_eq!(template.parse_file_name("app-2024-01-15.log"), None);
        assert_eq!(template.parse_file_name("other-2024-01-15.json"), None);
        assert_eq!(template.parse_file_name("app-2024-13-15.json"), None);
        assert_eq!(template.parse_file_name("app-2024-01-15_1.json"), None);
        assert_eq!(template.parse_file_name("app-.json"), None);
    }

    #[test]
    fn test_identity_equality_by_path() {
        let template = PathTemplate::parse("app-{Date}.json").unwrap();
        let a = FileIdentity::new(&template, date!(2024-01-15), 0);
        let b = FileIdentity::new(&template, date!(2024-01-15), 0);
        let c = FileIdentity::new(&template, date!(2024-01-15), 1);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_decide_first_event_rolls() {
        let policy = RollingPolicy::new(PathTemplate::parse("app-{Date}.json").unwrap(), None);
        let event = event_at(datetime!(2024-01-15 23:59 UTC));

        match policy.decide(None, 0, 10, &event) {
            Decision::RollTo(identity) => {
                assert_eq!(identity.path(), Path::new("app-2024-01-15.json"));
                assert_eq!(identity.sequence(), 0);
            }
            Decision::Keep => panic!("first event must open a file"),
        }
    }

    #[test]
    fn test_decide_uses_utc_date() {
        let policy = RollingPolicy::new(PathTemplate::parse("app-{Date}.json").unwrap(), None);
        let event = event_at(datetime!(2024-01-15 23:30 -2));

        assert_eq!(policy.identity_for(&event).date(), date!(2024-01-16));
    }

    #[test]
    fn test_decide_keeps_same_date() {
        let policy = RollingPolicy::new(PathTemplate::parse("app-{Date}.json").unwrap(), None);
        let current = policy.identity_for(&event_at(datetime!(2024-01-15 08:00 UTC)));
        let event = event_at(datetime!(2024-01-15 20:00 UTC));

        assert_eq!(
            policy.decide(Some(&current), u64::MAX / 2, 10, &event),
            Decision::Keep
        );
    }

    #[test]
    fn test_decide_rolls_on_date_change() {
        let policy = RollingPolicy::new(PathTemplate::parse("app-{Date}.json").unwrap(), None);
        let current = policy.identity_for(&event_at(datetime!(2024-01-15 08:00 UTC)));
        let event = event_at(datetime!(2024-01-16 00:00 UTC));

        match policy.decide(Some(&current), 100, 10, &event) {
            Decision::RollTo(identity) => {
                assert_eq!(identity.path(), Path::new("app-2024-01-16.json"))
            }
            Decision::Keep => panic!("date change must roll"),
        }
    }

    #[test]
    fn test_decide_rolls_on_size() {
        let policy = RollingPolicy::new(
            PathTemplate::parse("app-{Date}.json").unwrap(),
            Some(100),
        );
        let current = policy.identity_for(&event_at(datetime!(2024-01-15 08:00 UTC)));
        let event = event_at(datetime!(2024-01-15 09:00 UTC));

        assert_eq!(policy.decide(Some(&current), 90, 10, &event), Decision::Keep);
        match policy.decide(Some(&current), 91, 10, &event) {
            Decision::RollTo(identity) => {
                assert_eq!(identity.path(), Path::new("app-2024-01-15_001.json"));
                assert_eq!(identity.sequence(), 1);
            }
            Decision::Keep => panic!("size limit must roll"),
        }
    }

    #[test]
    fn test_decide_oversized_record_into_empty_file() {
        let policy =
            RollingPolicy::new(PathTemplate::parse("app-{Date}.json").unwrap(), Some(10));
        let current = policy.identity_for(&event_at(datetime!(2024-01-15 08:00 UTC)));
        let event = event_at(datetime!(2024-01-15 09:00 UTC));

        assert_eq!(policy.decide(Some(&current), 0, 500, &event), Decision::Keep);
    }

    #[test]
    fn test_decide_date_wins_over_size() {
        let policy =
            RollingPolicy::new(PathTemplate::parse("app-{Date}.json").unwrap(), Some(100));
        let template = policy.template().clone();
        let current = FileIdentity::new(&template, date!(2024-01-15), 4);
        let event = event_at(datetime!(2024-01-16 00:01 UTC));

        match policy.decide(Some(&current), 1000, 10, &event) {
            Decision::RollTo(identity) => {
                assert_eq!(identity.date(), date!(2024-01-16));
                assert_eq!(identity.sequence(), 0);
            }
            Decision::Keep => panic!("date change must roll"),
        }
    }

    #[test]
    fn test_file_dates_are_zero_padded() {
        let template = PathTemplate::parse("app-{Date}.json").unwrap();
        let early = Date::from_calendar_date(987, time::Month::March, 5).unwrap();

        assert_eq!(template.resolve(early, 0), PathBuf::from("app-0987-03-05.json"));
        assert_eq!(
            template.parse_file_name("app-0987-03-05.json"),
            Some((early, 0))
        );
    }

    #[test]
    fn test_fits_checks_resumed_size() {
        let policy =
            RollingPolicy::new(PathTemplate::parse("app-{Date}.json").unwrap(), Some(100));

        assert!(policy.fits(0, 500));
        assert!(policy.fits(60, 40));
        assert!(!policy.fits(100, 1));
        assert!(!policy.fits(61, 40));

        let unbounded = RollingPolicy::new(PathTemplate::parse("app-{Date}.json").unwrap(), None);
        assert!(unbounded.fits(u64::MAX, 1));
    }
}
