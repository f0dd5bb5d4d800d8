//! Hydration of Kubernetes objects into table rows.

mod node;
mod pod;

use std::collections::BTreeMap;

use k8s_openapi::{apimachinery::pkg::apis::meta::v1::ObjectMeta, jiff::Timestamp};
use kestrel_base::consts::{LABEL_ASSIGN, LABEL_SEPARATOR, UNKNOWN};

pub use self::{node::NodeRenderer, pod::PodRenderer};

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const YEAR: u64 = 365 * DAY;

/// Elapsed time since the object was created, relative to `now`. Objects
/// without a creation timestamp render as `<unknown>`.
fn age(meta: &ObjectMeta, now: Timestamp) -> String {
    meta.creation_timestamp.as_ref().map_or_else(
        || UNKNOWN.to_string(),
        |created| format_age(now.as_second() - created.0.as_second()),
    )
}

/// Formats elapsed seconds the way `kubectl` does: two units while the
/// coarser one is small, one unit after that.
fn format_age(seconds: i64) -> String {
    let s = u64::try_from(seconds).unwrap_or_default();
    match s {
        s if s < 2 * MINUTE => format!("{s}s"),
        s if s < 10 * MINUTE => with_remainder(s / MINUTE, "m", s % MINUTE, "s"),
        s if s < 3 * HOUR => format!("{}m", s / MINUTE),
        s if s < 8 * HOUR => with_remainder(s / HOUR, "h", s % HOUR / MINUTE, "m"),
        s if s < 2 * DAY => format!("{}h", s / HOUR),
        s if s < 8 * DAY => with_remainder(s / DAY, "d", s % DAY / HOUR, "h"),
        s if s < 2 * YEAR => format!("{}d", s / DAY),
        s if s < 8 * YEAR => with_remainder(s / YEAR, "y", s % YEAR / DAY, "d"),
        s => format!("{}y", s / YEAR),
    }
}

fn with_remainder(major: u64, major_unit: &str, minor: u64, minor_unit: &str) -> String {
    if minor == 0 { format!("{major}{major_unit}") } else { format!("{major}{major_unit}{minor}{minor_unit}") }
}

/// Joins labels into a single `k1=v1,k2=v2` cell.
fn labels_cell(labels: Option<&BTreeMap<String, String>>) -> String {
    labels
        .into_iter()
        .flatten()
        .map(|(key, value)| format!("{key}{LABEL_ASSIGN}{value}"))
        .collect::<Vec<_>>()
        .join(&LABEL_SEPARATOR.to_string())
}

#[cfg(test)]
mod tests {
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

    use super::*;

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(45), "45s");
        assert_eq!(format_age(5 * 60 + 30), "5m30s");
        assert_eq!(format_age(5 * 60), "5m");
        assert_eq!(format_age(42 * 60), "42m");
        assert_eq!(format_age(4 * 3600 + 12 * 60), "4h12m");
        assert_eq!(format_age(20 * 3600), "20h");
        assert_eq!(format_age(3 * 86400 + 4 * 3600), "3d4h");
        assert_eq!(format_age(40 * 86400), "40d");
        assert_eq!(format_age(3 * 365 * 86400), "3y");
        assert_eq!(format_age(-5), "0s");
    }

    #[test]
    fn test_age() {
        let created = Timestamp::from_second(1_704_067_200).expect("valid timestamp");
        let meta = ObjectMeta { creation_timestamp: Some(Time(created)), ..ObjectMeta::default() };
        let now = Timestamp::from_second(1_704_067_200 + 90).expect("valid timestamp");

        assert_eq!(age(&meta, now), "90s");
        assert_eq!(age(&ObjectMeta::default(), now), UNKNOWN);
    }

    #[test]
    fn test_labels_cell() {
        let labels = BTreeMap::from([
            ("tier".to_string(), "web".to_string()),
            ("app".to_string(), "nginx".to_string()),
        ]);
        assert_eq!(labels_cell(Some(&labels)), "app=nginx,tier=web");
        assert_eq!(labels_cell(None), "");
    }
}
