/*
** This file is a part of Iksxml (streaming XML parser with DTD support)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Iksxml is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

//! SYSTEM identifier resolution.

use crate::error::description;

fn is_forbidden(c: char) -> bool {
    c.is_control()
        || matches!(
            c,
            ' ' | '<' | '>' | '"' | '{' | '}' | '|' | '\\' | '^' | '`'
        )
}

/// Length of the `scheme:` prefix, if the identifier has one.
fn scheme_len(id: &str) -> Option<usize> {
    let colon = id.find(':')?;
    let scheme = &id[..colon];
    let mut chars = scheme.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => (),
        _ => return None,
    }
    // a single letter is more likely a windows drive
    if scheme.len() < 2 {
        return None;
    }
    if chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        Some(colon + 1)
    } else {
        None
    }
}

/// Everything up to the path of an absolute identifier, e.g. `http://host`.
fn authority_prefix(base: &str) -> Option<&str> {
    let scheme = scheme_len(base)?;
    let rest = &base[scheme..];
    if let Some(after) = rest.strip_prefix("//") {
        let end = after.find('/').map_or(base.len(), |i| scheme + 2 + i);
        Some(&base[..end])
    } else {
        Some(&base[..scheme])
    }
}

fn remove_dot_segments(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut out: Vec<&str> = Vec::new();
    let segments: Vec<&str> = path.split('/').collect();
    let last = segments.len().saturating_sub(1);
    for (i, segment) in segments.iter().enumerate() {
        match *segment {
            "." => {
                if i == last {
                    out.push("");
                }
            }
            ".." => {
                if out.len() > usize::from(absolute) {
                    out.pop();
                }
                if i == last {
                    out.push("");
                }
            }
            s => out.push(s),
        }
    }
    out.join("/")
}

/// Checks `id` and resolves it against `base` when it is relative.
///
/// Identifiers cannot be empty, cannot carry a fragment and cannot
/// contain characters which are never valid in a URI.
pub(crate) fn resolve(base: Option<&str>, id: &str) -> Result<String, &'static str> {
    if id.is_empty() {
        return Err(description::URL_EMPTY);
    }
    if id.contains('#') {
        return Err(description::URL_FRAGMENT);
    }
    if id.chars().any(is_forbidden) {
        return Err(description::URL_BAD_CHAR);
    }
    if scheme_len(id).is_some() {
        return Ok(id.to_string());
    }
    let Some(base) = base else {
        return Ok(id.to_string());
    };

    if id.starts_with('/') {
        return Ok(match authority_prefix(base) {
            Some(prefix) => format!("{}{}", prefix, remove_dot_segments(id)),
            None => remove_dot_segments(id),
        });
    }

    let (prefix, path) = match authority_prefix(base) {
        Some(prefix) => (prefix, &base[prefix.len()..]),
        None => ("", base),
    };
    let dir = match path.rfind('/') {
        Some(i) => &path[..=i],
        None => "",
    };
    Ok(format!("{}{}", prefix, remove_dot_segments(&format!("{}{}", dir, id))))
}
