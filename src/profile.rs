//! Conan profile editing.
//!
//! Profiles are INI-like: `[section]` headers followed by `key=value` lines.
//! Edits are line based so comments, ordering and unrelated sections survive
//! untouched.

use std::path::Path;

use anyhow::Result;

use crate::env::lenient_version;
use crate::errors::BuildkitError;
use crate::util::fs::{read_to_string, write_atomic};

/// Oldest GCC the project descriptor accepts.
const MIN_GCC_MAJOR: u64 = 9;

/// Set `key` in `[section]` of the profile at `path`.
///
/// An existing key is rewritten in place. Otherwise the entry is inserted at
/// the end of the first matching section, or a new section is appended when
/// none exists. `None` writes a bare `key` line, as used by list-style
/// sections such as `[tool_requires]`.
pub fn update_profile(path: &Path, section: &str, key: &str, value: Option<&str>) -> Result<()> {
    if !path.is_file() {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        return Err(BuildkitError::not_found(format!("profile `{}`", name), path).into());
    }

    let contents = read_to_string(path)?;
    let updated = apply_update(&contents, section, key, value);
    write_atomic(path, &updated)?;

    tracing::info!(
        "profile {} updated: [{}] {}",
        path.display(),
        section,
        render_entry(key, value).trim_end()
    );
    Ok(())
}

fn render_entry(key: &str, value: Option<&str>) -> String {
    match value {
        Some(value) => format!("{}={}\n", key, value),
        None => format!("{}\n", key),
    }
}

fn is_header(stripped: &str) -> bool {
    stripped.starts_with('[')
}

fn header_matches(stripped: &str, section: &str) -> bool {
    stripped
        .strip_prefix('[')
        .and_then(|rest| rest.strip_prefix(section))
        .is_some_and(|rest| rest.starts_with(']'))
}

/// Whether a stripped profile line assigns `key` (`key=...` or a bare `key`).
fn line_has_key(stripped: &str, key: &str) -> bool {
    match stripped.split_once('=') {
        Some((name, _)) => name.trim() == key,
        None => stripped == key,
    }
}

/// Pure text transformation behind [`update_profile`].
///
/// A section runs from its header to the next header or blank line.
pub fn apply_update(contents: &str, section: &str, key: &str, value: Option<&str>) -> String {
    let entry = render_entry(key, value);
    let mut out = String::with_capacity(contents.len() + entry.len() + section.len() + 4);
    let mut in_section = false;
    let mut updated = false;

    for line in contents.split_inclusive('\n') {
        let stripped = line.trim();

        if header_matches(stripped, section) {
            in_section = true;
            out.push_str(line);
            continue;
        }

        if in_section && (stripped.is_empty() || is_header(stripped)) {
            if !updated {
                out.push_str(&entry);
                updated = true;
            }
            in_section = false;
        }

        if in_section && line_has_key(stripped, key) {
            out.push_str(&entry);
            updated = true;
        } else {
            out.push_str(line);
        }
    }

    if !updated {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        if !in_section {
            out.push_str(&format!("\n[{}]\n", section));
        }
        out.push_str(&entry);
    }

    out
}

/// Value of `key` in the first `[section]` of the profile, if set.
///
/// Bare keys read as an empty value.
pub fn read_profile_value(path: &Path, section: &str, key: &str) -> Result<Option<String>> {
    if !path.is_file() {
        return Err(BuildkitError::not_found("profile", path).into());
    }
    let contents = read_to_string(path)?;
    Ok(lookup(&contents, section, key))
}

fn lookup(contents: &str, section: &str, key: &str) -> Option<String> {
    let mut in_section = false;
    let mut seen_section = false;

    for line in contents.lines() {
        let stripped = line.trim();
        if is_header(stripped) {
            if seen_section {
                // Only the first matching section counts.
                in_section = false;
                if header_matches(stripped, section) {
                    break;
                }
                continue;
            }
            in_section = header_matches(stripped, section);
            seen_section = in_section;
            continue;
        }

        if in_section && line_has_key(stripped, key) {
            let value = stripped
                .split_once('=')
                .map(|(_, v)| v.trim().to_string())
                .unwrap_or_default();
            return Some(value);
        }
    }
    None
}

/// Check a detected profile against the compiler requirements of the
/// project: GCC 9 or newer and at least `min_cppstd`.
pub fn validate_profile(path: &Path, min_cppstd: &str) -> Result<()> {
    let compiler = read_profile_value(path, "settings", "compiler")?;
    let version = read_profile_value(path, "settings", "compiler.version")?;

    if compiler.as_deref() == Some("gcc") {
        if let Some(v) = version.as_deref().and_then(lenient_version) {
            if v.major < MIN_GCC_MAJOR {
                return Err(BuildkitError::ConfigurationInvalid(format!(
                    "GCC < {} is not supported (profile has gcc {})",
                    MIN_GCC_MAJOR, v
                ))
                .into());
            }
        }
    }

    if let Some(cppstd) = read_profile_value(path, "settings", "compiler.cppstd")? {
        let actual = cppstd_year(&cppstd);
        let required = cppstd_year(min_cppstd);
        if let (Some(actual), Some(required)) = (actual, required) {
            if actual < required {
                return Err(BuildkitError::ConfigurationInvalid(format!(
                    "compiler.cppstd={} is older than the required C++{}",
                    cppstd, min_cppstd
                ))
                .into());
            }
        }
    }

    Ok(())
}

/// Map a `compiler.cppstd` value (`17`, `gnu20`, `98`) to its year.
fn cppstd_year(value: &str) -> Option<u32> {
    let digits = value.trim().trim_start_matches("gnu");
    let n: u32 = digits.parse().ok()?;
    Some(if n >= 98 { 1900 + n } else { 2000 + n })
}
