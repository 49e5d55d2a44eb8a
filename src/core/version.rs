//! `name-version` comparison, per the design's install-status rule:
//! split on the last `-`; if names differ the port is absent; otherwise
//! compare versions by epoch, then revision, then dotted segments
//! (numeric when both sides parse as integers, lexicographic otherwise),
//! with the longer segment list winning a tied prefix.

use std::cmp::Ordering;

use crate::core::stage::InstallStatus;

/// A parsed `PORTVERSION[_REVISION][,EPOCH]` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    epoch: u64,
    revision: u64,
    segments: Vec<String>,
}

impl Version {
    pub fn parse(raw: &str) -> Version {
        let (rest, epoch) = match raw.split_once(',') {
            Some((rest, epoch)) => (rest, epoch.parse().unwrap_or(0)),
            None => (raw, 0),
        };
        let (base, revision) = match rest.split_once('_') {
            Some((base, revision)) => (base, revision.parse().unwrap_or(0)),
            None => (rest, 0),
        };
        let segments = base.split('.').map(str::to_string).collect();
        Version {
            epoch,
            revision,
            segments,
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| self.revision.cmp(&other.revision))
            .then_with(|| {
                for (a, b) in self.segments.iter().zip(other.segments.iter()) {
                    let ord = match (a.parse::<u64>(), b.parse::<u64>()) {
                        (Ok(a), Ok(b)) => a.cmp(&b),
                        _ => a.cmp(b),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                self.segments.len().cmp(&other.segments.len())
            })
    }
}

/// Splits a `name-version` string at the last `-`. A string with no `-`
/// is treated as a bare name with an empty version.
pub fn split_name_version(s: &str) -> (&str, &str) {
    match s.rsplit_once('-') {
        Some((name, version)) => (name, version),
        None => (s, ""),
    }
}

/// Compares an installed package name against a port's declared
/// `pkgname` and derives the install status, per the design's rule.
pub fn install_status(installed: Option<&str>, declared_pkgname: &str) -> InstallStatus {
    let Some(installed) = installed else {
        return InstallStatus::Absent;
    };
    let (installed_name, installed_version) = split_name_version(installed);
    let (declared_name, declared_version) = split_name_version(declared_pkgname);
    if installed_name != declared_name {
        return InstallStatus::Absent;
    }
    match Version::parse(installed_version).cmp(&Version::parse(declared_version)) {
        Ordering::Less => InstallStatus::Older,
        Ordering::Equal => InstallStatus::Current,
        Ordering::Greater => InstallStatus::Newer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_versions_compare_equal() {
        assert_eq!(Version::parse("1.2.3").cmp(&Version::parse("1.2.3")), Ordering::Equal);
    }

    #[test]
    fn epoch_dominates() {
        assert_eq!(Version::parse("9.9,1").cmp(&Version::parse("1.0,2")), Ordering::Less);
    }

    #[test]
    fn revision_breaks_ties_after_epoch() {
        assert_eq!(Version::parse("1.0_2").cmp(&Version::parse("1.0_1")), Ordering::Greater);
    }

    #[test]
    fn numeric_segments_compare_numerically() {
        assert!(Version::parse("1.9").cmp(&Version::parse("1.10")) == Ordering::Less);
    }

    #[test]
    fn longer_prefix_equal_list_wins() {
        assert!(Version::parse("1.2.0").cmp(&Version::parse("1.2")) == Ordering::Greater);
    }

    #[test]
    fn absent_when_names_differ() {
        assert_eq!(install_status(Some("bar-1.0"), "foo-1.0"), InstallStatus::Absent);
    }

    #[test]
    fn absent_when_not_installed() {
        assert_eq!(install_status(None, "foo-1.0"), InstallStatus::Absent);
    }

    #[test]
    fn current_when_versions_match() {
        assert_eq!(install_status(Some("foo-1.0"), "foo-1.0"), InstallStatus::Current);
    }

    #[test]
    fn older_when_installed_is_behind() {
        assert_eq!(install_status(Some("foo-1.0"), "foo-1.1"), InstallStatus::Older);
    }

    #[test]
    fn newer_when_installed_is_ahead() {
        assert_eq!(install_status(Some("foo-2.0"), "foo-1.1"), InstallStatus::Newer);
    }
}
