//! Exact-match branch existence checks.
//!
//! `git branch --list <pattern>` already does glob matching, which is not
//! what an exact-match predicate wants (a branch `"xy"` must not satisfy a
//! check for `"x"`). Instead we list every branch and compare line by line,
//! which is also what lets us exclude `HEAD ->` alias lines uniformly for
//! both local and remote listings.

/// Parse `git branch --format=%(refname:short)` output (one name per line,
/// blank lines skipped) and check for an exact match.
pub fn exact_match(listing: &str, name: &str) -> bool {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .any(|line| line == name)
}

/// Parse `git branch -r --format=%(refname:short)` output, stripping the
/// `origin/` remote prefix and excluding symbolic `HEAD` pointer lines
/// (rendered by git as e.g. `origin/HEAD`), before checking for an exact
/// match against `name`.
pub fn exact_match_remote(listing: &str, remote: &str, name: &str) -> bool {
    let head_marker = format!("{remote}/HEAD");
    let prefix = format!("{remote}/");
    listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && *line != head_marker)
        .filter_map(|line| line.strip_prefix(&prefix))
        .any(|branch| branch == name)
}
