//! Post-scan classification helpers.
//!
//! Bulk scans are usually run over generated name spaces (every four-letter
//! `.com`, say), so results are grouped by the character pattern of the name
//! and special-status lists are grouped by tag.

use crate::types::DomainResult;
use std::collections::{BTreeMap, HashMap};

/// Status assigned to special-status lines that carry no tag.
pub const STATUS_UNKNOWN: &str = "UNKNOWN";

/// Character pattern of a domain's first label.
///
/// Each distinct character is replaced by `A`, `B`, `C`, ... in order of
/// first appearance, so `"abab.com"` becomes `"ABAB"` and `"Noon.net"`
/// becomes `"ABBA"`.
pub fn domain_pattern(domain: &str) -> String {
    let label = domain.split('.').next().unwrap_or_default().to_lowercase();

    let mut mapping: HashMap<char, char> = HashMap::new();
    let mut next = 'A';
    label
        .chars()
        .map(|c| {
            *mapping.entry(c).or_insert_with(|| {
                let assigned = next;
                next = char::from_u32(next as u32 + 1).unwrap_or(next);
                assigned
            })
        })
        .collect()
}

/// Group domains by [`domain_pattern`]; each group is sorted.
pub fn group_by_pattern<I, S>(domains: I) -> BTreeMap<String, Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for domain in domains {
        let domain = domain.as_ref();
        groups
            .entry(domain_pattern(domain))
            .or_default()
            .push(domain.to_string());
    }
    for group in groups.values_mut() {
        group.sort();
    }
    groups
}

/// Parse one line of a special-status list.
///
/// Accepts `"domain STATUS [reason...]"` and bare `"domain"` lines, the
/// latter tagged [`STATUS_UNKNOWN`]. Blank and `#` comment lines yield `None`.
pub fn parse_status_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let mut parts = line.split_whitespace();
    let domain = parts.next()?.to_string();
    let status = parts
        .next()
        .map(str::to_uppercase)
        .unwrap_or_else(|| STATUS_UNKNOWN.to_string());
    Some((domain, status))
}

/// Group special-status lines by tag; each group is sorted.
pub fn group_by_status<I, S>(lines: I) -> BTreeMap<String, Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (domain, status) in lines
        .into_iter()
        .filter_map(|line| parse_status_line(line.as_ref()))
    {
        groups.entry(status).or_default().push(domain);
    }
    for group in groups.values_mut() {
        group.sort();
    }
    groups
}

/// Render `"domain STATUS"` lines for every result with a special status.
pub fn status_lines<'a, I>(results: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a DomainResult>,
{
    results
        .into_iter()
        .filter(|result| result.has_special_status())
        .map(|result| format!("{} {}", result.domain, result.special_status))
        .collect()
}
