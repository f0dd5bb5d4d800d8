//! Filter strategies applied to a table's rows.
//!
//! A filter string is parsed once into a [`FilterQuery`] and then dispatched
//! on. Every strategy builds a new [`RowEvents`]; none mutates its input.

use std::sync::LazyLock;

use kestrel_base::consts::columns;
use nucleo_matcher::{
    Config, Matcher, Utf32Str,
    pattern::{AtomKind, CaseMatching, Normalization, Pattern},
};
use regex::Regex;
use snafu::{ResultExt, Snafu};

use crate::{header::Header, row::RowEvent, row_events::RowEvents};

/// Joins the filterable cells of a row before matching a regex against them.
const SPACER: &str = " ";

/// Prefix marking an explicit label selector, e.g. `-l app=nginx`.
const LABEL_PREFIX: &str = "-l";

/// Prefix marking a fuzzy query, e.g. `-f ngx`.
const FUZZY_PREFIX: &str = "-f";

/// Leading marker inverting a regex filter, e.g. `!Running`.
const INVERSE_MARKER: char = '!';

static LABEL_REQUIREMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*[A-Za-z0-9][A-Za-z0-9_./-]*\s*(?:(?:==|!=|=)\s*[A-Za-z0-9_.-]*|\s+(?:in|notin)\s*\([^)]*\))\s*$",
    )
    .expect("label requirement pattern is valid")
});

/// How a table should be filtered.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FilterOpts {
    /// Keep only rows carrying a validation warning.
    pub toast: bool,

    pub filter: String,

    /// Keep rows that do *not* match a regex filter.
    pub invert: bool,
}

impl FilterOpts {
    pub fn new(filter: impl Into<String>) -> Self { Self { filter: filter.into(), ..Self::default() } }

    pub fn query(&self) -> FilterQuery { FilterQuery::parse(&self.filter, self.invert) }
}

/// A parsed filter string.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FilterQuery {
    /// No text filtering.
    Empty,

    /// A label selector. Resolved by the API server when fetching, so the
    /// table passes rows through untouched.
    LabelSelector(String),

    /// Ranked fuzzy match against row IDs.
    Fuzzy(String),

    /// Case-insensitive regex over the filterable cells.
    Regex { pattern: String, invert: bool },
}

impl FilterQuery {
    /// Parses a filter string. Precedence: empty, label selector, fuzzy,
    /// regex. A leading `!` on a regex, or `invert`, inverts the match.
    pub fn parse(filter: &str, invert: bool) -> Self {
        let trimmed = filter.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }
        if let Some(selector) = strip_flag(trimmed, LABEL_PREFIX) {
            return Self::LabelSelector(selector.to_string());
        }
        if is_label_selector(trimmed) {
            return Self::LabelSelector(trimmed.to_string());
        }
        if let Some(query) = strip_flag(trimmed, FUZZY_PREFIX) {
            return if query.is_empty() { Self::Empty } else { Self::Fuzzy(query.to_string()) };
        }
        match filter.strip_prefix(INVERSE_MARKER) {
            Some(pattern) => Self::Regex { pattern: pattern.to_string(), invert: true },
            None => Self::Regex { pattern: filter.to_string(), invert },
        }
    }
}

/// Strips a `-x` style flag followed by whitespace or the end of input.
fn strip_flag<'a>(s: &'a str, flag: &str) -> Option<&'a str> {
    let rest = s.strip_prefix(flag)?;
    (rest.is_empty() || rest.starts_with(char::is_whitespace)).then(|| rest.trim())
}

/// Returns `true` if `s` reads as a label selector: comma separated
/// requirements such as `app=nginx`, `tier!=web` or `env in (dev,qa)`.
fn is_label_selector(s: &str) -> bool {
    split_requirements(s).all(|requirement| LABEL_REQUIREMENT.is_match(requirement))
}

/// Splits on commas that are not inside a parenthesized value set.
fn split_requirements(s: &str) -> impl Iterator<Item = &str> {
    let mut depth = 0_usize;
    s.split(move |c: char| {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
        c == ',' && depth == 0
    })
}

/// A filter that could not be applied as requested. The table falls back to
/// the rows it had before text filtering.
#[derive(Clone, Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum FilterError {
    #[snafu(display("Invalid regex filter {pattern:?}, error: {source}"))]
    InvalidRegex { pattern: String, source: regex::Error },
}

/// Rows carrying a validation warning. Without a `VALID` column no row
/// qualifies.
pub(crate) fn toast_filter(header: &Header, rows: &RowEvents) -> RowEvents {
    let Some(idx) = header.index_of(columns::VALID, true) else {
        return RowEvents::default();
    };
    rows.iter().filter(|event| !event.row.field(idx).unwrap_or_default().is_empty()).cloned().collect()
}

/// Rows whose ID fuzzy-matches `query`, best match first. Equal scores keep
/// their original order.
pub(crate) fn fuzzy_filter(rows: &RowEvents, query: &str) -> RowEvents {
    let mut matcher = Matcher::new(Config::DEFAULT);
    let pattern = Pattern::new(query, CaseMatching::Smart, Normalization::Smart, AtomKind::Fuzzy);

    let mut buf = Vec::new();
    let mut matches = rows
        .iter()
        .filter_map(|event| {
            let haystack = Utf32Str::new(event.id(), &mut buf);
            pattern.score(haystack, &mut matcher).map(|score| (event, score))
        })
        .collect::<Vec<_>>();
    matches.sort_by(|(_, lhs), (_, rhs)| rhs.cmp(lhs));

    matches.into_iter().map(|(event, _)| event.clone()).collect()
}

/// Rows whose filterable cells match `pattern` case-insensitively, or do not
/// match it when `invert` is set.
///
/// A pattern holding whitespace is not compiled and every row passes; a
/// multi-word query is ambiguous as a regex.
pub(crate) fn rx_filter(
    header: &Header,
    rows: &RowEvents,
    namespace: &str,
    pattern: &str,
    invert: bool,
) -> Result<RowEvents, FilterError> {
    if pattern.contains(char::is_whitespace) {
        return Ok(rows.clone());
    }

    let rx = Regex::new(&format!("(?i)({pattern})")).context(InvalidRegexSnafu { pattern })?;
    let cols = header.filter_col_indices(namespace, true);
    let haystack = |event: &RowEvent| {
        event
            .row
            .fields
            .iter()
            .enumerate()
            .filter(|(idx, _)| cols.contains(idx))
            .map(|(_, field)| field.as_str())
            .collect::<Vec<_>>()
            .join(SPACER)
    };

    Ok(rows.iter().filter(|&event| rx.is_match(&haystack(event)) != invert).cloned().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        header::HeaderColumn,
        row::{EventKind, Row},
    };

    fn header() -> Header {
        Header::new(vec![
            HeaderColumn::new("NAMESPACE"),
            HeaderColumn::new("NAME"),
            HeaderColumn::new("STATUS"),
            HeaderColumn::new("VALID"),
            HeaderColumn::time("AGE"),
        ])
    }

    fn rows() -> RowEvents {
        [
            ("default/nginx", "nginx", "Running", "", "5m"),
            ("default/redis", "redis", "CrashLoopBackOff", "container restarts", "1h"),
            ("kube-system/dns", "dns", "Running", "", "3d"),
        ]
        .into_iter()
        .map(|(id, name, status, valid, age)| {
            let (ns, _) = id.split_once('/').unwrap_or_default();
            RowEvent::new(EventKind::Added, Row::new(id, [ns, name, status, valid, age]))
        })
        .collect()
    }

    fn ids(rows: &RowEvents) -> Vec<&str> { rows.ids().collect() }

    #[test]
    fn test_parse_query() {
        assert_eq!(FilterQuery::parse("", false), FilterQuery::Empty);
        assert_eq!(FilterQuery::parse("   ", true), FilterQuery::Empty);
        assert_eq!(
            FilterQuery::parse("app=nginx", false),
            FilterQuery::LabelSelector("app=nginx".to_string())
        );
        assert_eq!(
            FilterQuery::parse("-l app=nginx,tier!=web", false),
            FilterQuery::LabelSelector("app=nginx,tier!=web".to_string())
        );
        assert_eq!(
            FilterQuery::parse("env in (dev,qa),app=x", false),
            FilterQuery::LabelSelector("env in (dev,qa),app=x".to_string())
        );
        assert_eq!(FilterQuery::parse("-f ngx", false), FilterQuery::Fuzzy("ngx".to_string()));
        assert_eq!(FilterQuery::parse("-f", false), FilterQuery::Empty);
        assert_eq!(
            FilterQuery::parse("!Running", false),
            FilterQuery::Regex { pattern: "Running".to_string(), invert: true }
        );
        assert_eq!(
            FilterQuery::parse("Running", true),
            FilterQuery::Regex { pattern: "Running".to_string(), invert: true }
        );
        assert_eq!(
            FilterQuery::parse("-fancy", false),
            FilterQuery::Regex { pattern: "-fancy".to_string(), invert: false }
        );
    }

    #[test]
    fn test_toast() {
        let filtered = toast_filter(&header(), &rows());
        assert_eq!(ids(&filtered), vec!["default/redis"]);

        let no_valid = Header::new(vec![HeaderColumn::new("NAME")]);
        assert!(toast_filter(&no_valid, &rows()).is_empty());
    }

    #[test]
    fn test_regex_matches_filterable_cells() {
        let filtered = rx_filter(&header(), &rows(), "default", "running", false).expect("valid rx");
        assert_eq!(ids(&filtered), vec!["default/nginx", "kube-system/dns"]);

        let inverted = rx_filter(&header(), &rows(), "default", "running", true).expect("valid rx");
        assert_eq!(ids(&inverted), vec!["default/redis"]);
    }

    #[test]
    fn test_regex_skips_time_and_namespace_columns() {
        let filtered = rx_filter(&header(), &rows(), "default", "5m", false).expect("valid rx");
        assert!(filtered.is_empty());

        let namespaced = rx_filter(&header(), &rows(), "default", "kube-system", false).expect("valid");
        assert!(namespaced.is_empty());

        let all = rx_filter(&header(), &rows(), "", "kube-system", false).expect("valid rx");
        assert_eq!(ids(&all), vec!["kube-system/dns"]);
    }

    #[test]
    fn test_regex_whitespace_passes_through() {
        let filtered = rx_filter(&header(), &rows(), "", "nginx redis", false).expect("pass through");
        assert_eq!(filtered, rows());
    }

    #[test]
    fn test_regex_invalid() {
        let err = rx_filter(&header(), &rows(), "", "ngi(x", false).expect_err("invalid rx");
        assert!(matches!(err, FilterError::InvalidRegex { ref pattern, .. } if pattern == "ngi(x"));
    }

    #[test]
    fn test_fuzzy_ranks_matches() {
        let rows: RowEvents = ["apple", "banana", "apply"]
            .into_iter()
            .map(|id| RowEvent::new(EventKind::Added, Row::new(id, [id])))
            .collect();

        let filtered = fuzzy_filter(&rows, "appl");
        assert_eq!(ids(&filtered), vec!["apple", "apply"]);

        let ranked = fuzzy_filter(&rows, "ana");
        assert_eq!(ids(&ranked).first(), Some(&"banana"));
    }

    #[test]
    fn test_fuzzy_reorders_by_score() {
        let rows: RowEvents = ["xaxpxpxlx", "appl-0"]
            .into_iter()
            .map(|id| RowEvent::new(EventKind::Added, Row::new(id, [id])))
            .collect();

        let ranked = fuzzy_filter(&rows, "appl");
        assert_eq!(ids(&ranked), vec!["appl-0", "xaxpxpxlx"]);
    }
}
