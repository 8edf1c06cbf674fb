use std::collections::BTreeMap;
use std::path::Path;

/// Loads a `.dlindex.env` file (shell-style `KEY=value` format).
///
/// `.dlindex.env` holds secrets keyed by credential id or variable name.
/// Values are available via `${env:VAR}` interpolation in `Index.toml` and
/// resolve stage credential bindings.
pub fn load_env_file(path: &Path) -> miette::Result<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();
    if !path.is_file() {
        return Ok(map);
    }
    let content = std::fs::read_to_string(path).map_err(dlindex_util::errors::DlIndexError::Io)?;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
        if let Some((key, value)) = trimmed.split_once('=') {
            map.insert(key.trim().to_string(), unquote(value.trim()).to_string());
        }
    }
    Ok(map)
}

fn unquote(value: &str) -> &str {
    for q in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(q) && value.ends_with(q) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Interpolate `${env:VAR}` references in a string.
///
/// Looks up values first from `env_overrides` (populated from `.dlindex.env`),
/// then falls back to process environment variables. Unknown variables
/// become empty strings and are logged at warn level by name.
pub fn interpolate(input: &str, env_overrides: &BTreeMap<String, String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${env:") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let key = &rest[start + 6..start + len];
        let value = env_overrides
            .get(key)
            .cloned()
            .or_else(|| std::env::var(key).ok())
            .unwrap_or_else(|| {
                tracing::warn!("${{env:{key}}} is not set; using an empty value");
                String::new()
            });
        result.push_str(&rest[..start]);
        result.push_str(&value);
        rest = &rest[start + len + 1..];
    }
    result.push_str(rest);
    result
}
