//! Masking of secret values in text that leaves the process.

use std::borrow::Cow;

/// Placeholder written in place of a secret value.
pub const MASK: &str = "********";

/// Replaces known secret values with [`MASK`].
///
/// Longer secrets are replaced first so a secret that contains another one
/// is never left half-masked.
#[derive(Clone, Default)]
pub struct Redactor {
    secrets: Vec<String>,
}

impl Redactor {
    /// Build a redactor for the given values. Empty values are ignored.
    pub fn new(secrets: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut secrets: Vec<String> = secrets
            .into_iter()
            .map(Into::into)
            .filter(|s: &String| !s.is_empty())
            .collect();
        secrets.sort_by_key(|s| std::cmp::Reverse(s.len()));
        secrets.dedup();
        Self { secrets }
    }

    /// Whether this redactor masks anything at all.
    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }

    /// Mask every secret occurring in `line`.
    pub fn redact<'a>(&self, line: &'a str) -> Cow<'a, str> {
        if !self.secrets.iter().any(|s| line.contains(s.as_str())) {
            return Cow::Borrowed(line);
        }
        let mut out = line.to_string();
        for secret in &self.secrets {
            if out.contains(secret.as_str()) {
                out = out.replace(secret.as_str(), MASK);
            }
        }
        Cow::Owned(out)
    }
}

impl std::fmt::Debug for Redactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Redactor")
            .field("secrets", &self.secrets.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_clean_lines_borrowed() {
        let r = Redactor::new(["hunter2"]);
        assert!(matches!(r.redact("nothing here"), Cow::Borrowed(_)));
    }

    #[test]
    fn masks_every_occurrence() {
        let r = Redactor::new(["hunter2"]);
        assert_eq!(
            r.redact("key=hunter2 again hunter2"),
            "key=******** again ********"
        );
    }

    #[test]
    fn longer_secret_wins_over_its_prefix() {
        let r = Redactor::new(["abc", "abcdef"]);
        assert_eq!(r.redact("token abcdef"), "token ********");
    }

    #[test]
    fn empty_values_are_ignored() {
        let r = Redactor::new([""]);
        assert!(r.is_empty());
        assert_eq!(r.redact("plain"), "plain");
    }

    #[test]
    fn debug_does_not_print_values() {
        let r = Redactor::new(["s3cr3t"]);
        assert!(!format!("{r:?}").contains("s3cr3t"));
    }
}
