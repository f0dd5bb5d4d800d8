//! Role-aware cell comparison.

use std::{cmp::Ordering, time::Duration};

use crate::header::ColumnRole;

/// A sort request: the column to sort by and its direction. An empty name
/// means no explicit sort was requested.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct SortColumn {
    pub name: String,

    pub asc: bool,
}

impl SortColumn {
    pub fn new(name: impl Into<String>, asc: bool) -> Self { Self { name: name.into(), asc } }

    #[inline]
    pub fn is_set(&self) -> bool { !self.name.is_empty() }
}

/// Compares two cells of a column with the given role.
///
/// Values that cannot be parsed for their role order before every value
/// that can, and compare lexically among themselves.
pub fn compare_cells(role: ColumnRole, lhs: &str, rhs: &str) -> Ordering {
    match role {
        ColumnRole::Plain => lhs.cmp(rhs),
        ColumnRole::Time => compare_parsed(lhs, rhs, parse_duration),
        ColumnRole::Metric => compare_parsed(lhs, rhs, parse_metric),
        ColumnRole::Capacity => compare_parsed(lhs, rhs, parse_capacity),
    }
}

fn compare_parsed<T, F>(lhs: &str, rhs: &str, parse: F) -> Ordering
where
    T: PartialOrd,
    F: Fn(&str) -> Option<T>,
{
    match (parse(lhs), parse(rhs)) {
        (Some(l), Some(r)) => l.partial_cmp(&r).unwrap_or(Ordering::Equal),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => lhs.cmp(rhs),
    }
}

/// Parses a compact elapsed duration such as `2y3d`, `4h12m`, `45s` or
/// `250ms`.
pub(crate) fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            return None;
        }
        let value: u64 = rest[..digits].parse().ok()?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let unit = match &rest[..unit_len] {
            "y" => Duration::from_secs(365 * 24 * 3600),
            "d" => Duration::from_secs(24 * 3600),
            "h" => Duration::from_secs(3600),
            "m" => Duration::from_secs(60),
            "s" => Duration::from_secs(1),
            "ms" => Duration::from_millis(1),
            _ => return None,
        };
        rest = &rest[unit_len..];
        total = total.checked_add(unit.checked_mul(u32::try_from(value).ok()?)?)?;
    }
    Some(total)
}

/// Parses a metric cell. Accepts quantities (`250m`, `1.5`, `128Mi`) and
/// percentages (`12%`); trailing annotations such as `12 (3%)` are ignored.
pub(crate) fn parse_metric(s: &str) -> Option<f64> {
    let token = s.split_whitespace().next()?;
    let token = token.split('(').next().unwrap_or(token);
    if let Some(percent) = token.strip_suffix('%') {
        return percent.parse().ok();
    }
    parse_quantity(token)
}

/// Parses a byte-size cell such as `10Gi`, `512Mi`, `1G` or `2048`. A
/// trailing `B` is tolerated.
pub(crate) fn parse_capacity(s: &str) -> Option<f64> {
    let token = s.trim();
    let token = token.strip_suffix('B').unwrap_or(token);
    parse_quantity(token)
}

const SUFFIXES: [(&str, f64); 15] = [
    ("Ki", 1024.0),
    ("Mi", 1_048_576.0),
    ("Gi", 1_073_741_824.0),
    ("Ti", 1_099_511_627_776.0),
    ("Pi", 1_125_899_906_842_624.0),
    ("Ei", 1_152_921_504_606_846_976.0),
    ("n", 1e-9),
    ("u", 1e-6),
    ("m", 1e-3),
    ("k", 1e3),
    ("M", 1e6),
    ("G", 1e9),
    ("T", 1e12),
    ("P", 1e15),
    ("E", 1e18),
];

/// Parses a resource quantity into its base unit value.
fn parse_quantity(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(value) = s.parse::<f64>() {
        return value.is_finite().then_some(value);
    }
    let (number, scale) = SUFFIXES
        .iter()
        .find_map(|(suffix, scale)| s.strip_suffix(suffix).map(|number| (number, *scale)))?;
    let value = number.parse::<f64>().ok()?;
    value.is_finite().then_some(value * scale)
}
