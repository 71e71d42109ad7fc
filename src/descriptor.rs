//! Project descriptor (`conanfile.py`) attribute editing.

use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;

use crate::errors::BuildkitError;
use crate::util::fs::{read_to_string, write_atomic};

/// Replace the value of a class attribute such as `name = "EuroraConan"`.
///
/// The first line matching `<indent>attribute = <value>` is rewritten to
/// `<indent>attribute = '<new_value>'`, keeping its indentation, and the
/// result is written to `output` (or back to `path`). Returns the previous
/// right-hand side.
///
/// Adding attributes is not supported: when no assignment matches, nothing
/// is written and `Ok(None)` is returned.
pub fn update_descriptor_attribute(
    path: &Path,
    attribute: &str,
    new_value: &str,
    output: Option<&Path>,
) -> Result<Option<String>> {
    if !path.is_file() {
        return Err(BuildkitError::not_found("descriptor", path).into());
    }

    let content = read_to_string(path)?;
    let Some((updated, old_value)) = replace_attribute(&content, attribute, new_value)? else {
        tracing::warn!(
            "attribute `{}` does not exist in {}; nothing changed",
            attribute,
            path.display()
        );
        return Ok(None);
    };

    let target = output.unwrap_or(path);
    write_atomic(target, &updated)?;

    tracing::info!(
        "updated attribute `{}` from {} to {} in {}",
        attribute,
        old_value,
        python_repr(new_value),
        target.display()
    );
    Ok(Some(old_value))
}

/// Pure text transformation behind [`update_descriptor_attribute`].
fn replace_attribute(
    content: &str,
    attribute: &str,
    new_value: &str,
) -> Result<Option<(String, String)>> {
    let pattern = format!(r"(?mR)^([ \t]*){}[ \t]*=[ \t]*(.+)$", regex::escape(attribute));
    let re = Regex::new(&pattern)
        .with_context(|| format!("invalid attribute name: {}", attribute))?;

    let Some(caps) = re.captures(content) else {
        return Ok(None);
    };

    let whole = caps.get(0).map(|m| m.range()).unwrap_or_default();
    let indent = &caps[1];
    let old_value = caps[2].trim().to_string();

    let mut updated = String::with_capacity(content.len() + new_value.len());
    updated.push_str(&content[..whole.start]);
    updated.push_str(&format!(
        "{}{} = {}",
        indent,
        attribute,
        python_repr(new_value)
    ));
    updated.push_str(&content[whole.end..]);

    Ok(Some((updated, old_value)))
}

/// Render `value` as a Python string literal, the way `repr()` does.
pub fn python_repr(value: &str) -> String {
    let quote = if value.contains('\'') && !value.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut out = String::with_capacity(value.len() + 2);
    out.push(quote);
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if !is_printable(c) => {
                let code = c as u32;
                if code <= 0xff {
                    out.push_str(&format!("\\x{:02x}", code));
                } else if code <= 0xffff {
                    out.push_str(&format!("\\u{:04x}", code));
                } else {
                    out.push_str(&format!("\\U{:08x}", code));
                }
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Characters Python's `repr` leaves unescaped: everything except control
/// characters, format characters and separators other than the plain space.
fn is_printable(c: char) -> bool {
    !matches!(
        c as u32,
        0x00..=0x1f
            | 0x7f..=0xa0
            | 0xad
            | 0x0600..=0x0605
            | 0x061c
            | 0x06dd
            | 0x070f
            | 0x1680
            | 0x180e
            | 0x2000..=0x200f
            | 0x2028..=0x202f
            | 0x205f..=0x2064
            | 0x2066..=0x206f
            | 0x3000
            | 0xd800..=0xf8ff
            | 0xfeff
            | 0xfff9..=0xfffb
            | 0xe0001
            | 0xe0020..=0xe007f
            | 0xf0000..
    )
}
