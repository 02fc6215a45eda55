//! Archive naming conventions.
//!
//! This module is the single source of truth for archive filenames. All other
//! modules use these functions rather than constructing names directly, so
//! the remote-side and local-side references always agree.

use chrono::NaiveDate;
use rand::Rng;

/// Filename extension for device archives.
pub const ARCHIVE_SUFFIX: &str = ".ucs";

/// Inclusive lower bound of the random disambiguator.
pub const DISAMBIGUATOR_MIN: u32 = 100;

/// Exclusive upper bound of the random disambiguator.
pub const DISAMBIGUATOR_MAX: u32 = 300;

/// Name of one device archive.
///
/// Derived once at creation time and immutable afterwards; this is the join
/// key between the remote file, the local copy, and the checksum pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchiveName(String);

impl ArchiveName {
    /// Wrap an existing name, e.g. one taken from a remote listing or CLI
    /// argument.
    pub fn from_existing(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ArchiveName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive an archive name from the device hostname, a date, and a
/// disambiguator.
///
/// # Format
///
/// `{hostnameFirstLabel}_{YYYY-MM-DD}_{nnn}.ucs`
///
/// Only the first DNS label of the hostname is used, so `lb1.example.net`
/// and `lb1.other.net` both yield `lb1_...` names.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use ucsbackup::archive::derive_archive_name;
///
/// let date = NaiveDate::from_ymd_opt(2026, 8, 8).unwrap();
/// let name = derive_archive_name("lb1.example.net", date, 142);
/// assert_eq!(name.as_str(), "lb1_2026-08-08_142.ucs");
/// ```
pub fn derive_archive_name(hostname: &str, date: NaiveDate, disambiguator: u32) -> ArchiveName {
    let label = hostname.split('.').next().unwrap_or(hostname);
    ArchiveName(format!(
        "{}_{}_{}{}",
        label,
        date.format("%Y-%m-%d"),
        disambiguator,
        ARCHIVE_SUFFIX
    ))
}

/// Pick a random disambiguator in `[DISAMBIGUATOR_MIN, DISAMBIGUATOR_MAX)`.
///
/// Three digits keeps same-day archives from one device distinct without
/// making the name unwieldy.
pub fn random_disambiguator() -> u32 {
    rand::rng().random_range(DISAMBIGUATOR_MIN..DISAMBIGUATOR_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_derive_uses_first_label_only() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let name = derive_archive_name("edge-lb2.dmz.example.net", date, 250);
        assert_eq!(name.as_str(), "edge-lb2_2026-01-05_250.ucs");
    }

    #[test]
    fn test_derive_handles_bare_hostname() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let name = derive_archive_name("lb1", date, 100);
        assert_eq!(name.as_str(), "lb1_2026-01-05_100.ucs");
    }

    #[test]
    fn test_random_disambiguator_in_range() {
        for _ in 0..1000 {
            let n = random_disambiguator();
            assert!((DISAMBIGUATOR_MIN..DISAMBIGUATOR_MAX).contains(&n));
        }
    }

    proptest! {
        /// Names always match `{firstLabel}_{YYYY-MM-DD}_{3-digit}.ucs`.
        #[test]
        fn test_name_pattern(
            hostname in "[a-z][a-z0-9-]{0,15}(\\.[a-z0-9]{1,10}){0,3}",
            year in 2000i32..2100,
            month in 1u32..=12,
            day in 1u32..=28,
            disambiguator in DISAMBIGUATOR_MIN..DISAMBIGUATOR_MAX,
        ) {
            let date = NaiveDate::from_ymd_opt(year, month, day).unwrap();
            let name = derive_archive_name(&hostname, date, disambiguator);

            let stem = name.as_str().strip_suffix(ARCHIVE_SUFFIX).unwrap();
            let parts: Vec<&str> = stem.rsplitn(3, '_').collect();
            prop_assert_eq!(parts.len(), 3);

            // rsplitn yields parts in reverse order
            let (number, date_part, label) = (parts[0], parts[1], parts[2]);
            prop_assert_eq!(label, hostname.split('.').next().unwrap());
            prop_assert_eq!(date_part, date.format("%Y-%m-%d").to_string());
            prop_assert_eq!(number.len(), 3);
            let n: u32 = number.parse().unwrap();
            prop_assert!((DISAMBIGUATOR_MIN..DISAMBIGUATOR_MAX).contains(&n));
        }
    }
}
