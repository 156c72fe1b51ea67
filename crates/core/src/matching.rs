//! Whitespace-tolerant substring search and fuzzy lookup.
//!
//! User-typed needles like `lhs3447` must match the system name `LHS 3447`.
//! The matcher therefore skips spaces in the haystack while comparing, and
//! lookups that want exactly one hit raise [`Error::NoMatch`] or
//! [`Error::MoreThanOneMatch`] accordingly.

use crate::error::{Error, Result};

/// Find the (start, end) byte indices of `seq` inside `line`.
///
/// When `skip_spaces` is set, spaces in both needle and haystack are ignored
/// while matching but the returned indices still point into the original
/// `line`. Case is respected; lowercase both sides first to ignore it.
pub fn substr_ind(seq: &str, line: &str, skip_spaces: bool) -> Option<(usize, usize)> {
    let needle: Vec<char> = if skip_spaces {
        seq.chars().filter(|c| *c != ' ').collect()
    } else {
        seq.chars().collect()
    };
    if needle.is_empty() {
        return None;
    }

    let hay: Vec<(usize, char)> = line
        .char_indices()
        .filter(|(_, c)| !(skip_spaces && *c == ' '))
        .collect();
    if hay.len() < needle.len() {
        return None;
    }

    for start in 0..=hay.len() - needle.len() {
        if (0..needle.len()).all(|k| hay[start + k].1 == needle[k]) {
            let (first, _) = hay[start];
            let (last, last_ch) = hay[start + needle.len() - 1];
            return Some((first, last + last_ch.len_utf8()));
        }
    }

    None
}

/// True when `seq` occurs in `line`, ignoring case and spaces.
pub fn substr_match(seq: &str, line: &str) -> bool {
    substr_ind(&seq.to_lowercase(), &line.to_lowercase(), true).is_some()
}

/// Wrap the matched portion of `line` in `__underline__` markers.
pub fn emphasize_match(seq: &str, line: &str) -> String {
    match substr_ind(&seq.to_lowercase(), &line.to_lowercase(), true) {
        Some((start, end)) => {
            let matched = &line[start..end];
            line.replacen(matched, &format!("__{matched}__"), 1)
        }
        None => line.to_string(),
    }
}

/// Search `stack` for items whose key contains `needle`; return the single hit.
///
/// Raises [`Error::NoMatch`] for zero hits and [`Error::MoreThanOneMatch`]
/// (listing all candidate keys) for several.
pub fn fuzzy_find<'a, T, F>(
    needle: &str,
    stack: impl IntoIterator<Item = &'a T>,
    key: F,
    kind: &'static str,
) -> Result<&'a T>
where
    F: Fn(&T) -> &str,
{
    let mut matches: Vec<&'a T> = Vec::new();
    for item in stack {
        if substr_match(needle, key(item)) {
            matches.push(item);
        }
    }

    match matches.len() {
        1 => Ok(matches[0]),
        0 => Err(Error::NoMatch { needle: needle.to_string(), kind }),
        _ => Err(Error::MoreThanOneMatch {
            needle: needle.to_string(),
            matches: matches.iter().map(|m| emphasize_match(needle, key(m))).collect(),
            kind,
        }),
    }
}
