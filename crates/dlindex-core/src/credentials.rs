//! Scoped credential bindings.
//!
//! A stage declares which environment variables it needs and the credential
//! id that supplies each one:
//!
//! ```toml
//! [stage.credentials]
//! AWS_ACCESS_KEY_ID = "downloads-publish-key-id"
//! AWS_SECRET_ACCESS_KEY = "downloads-publish-secret"
//! ```
//!
//! Ids resolve against `.dlindex.env` first, then the process environment.
//! Bound values go to child processes and the S3 client only; they are never
//! exported into this process's own environment.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{compiler_fence, Ordering};

use dlindex_util::errors::DlIndexError;
use dlindex_util::redact::{Redactor, MASK};

pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const AWS_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";

/// An opaque secret value. Formatting never reveals it.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw value. Only call this where the value leaves for its consumer.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Overwrite the value with zeros, then empty it. The allocation is kept.
    fn wipe(&mut self) {
        // SAFETY: NUL bytes are valid UTF-8.
        let bytes = unsafe { self.0.as_mut_vec() };
        for byte in bytes.iter_mut() {
            unsafe { std::ptr::write_volatile(byte, 0) };
        }
        compiler_fence(Ordering::SeqCst);
        self.0.clear();
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(MASK)
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(MASK)
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.wipe();
    }
}

/// One environment variable bound to a credential.
#[derive(Debug, Clone)]
pub struct Binding {
    pub env_var: String,
    pub credential_id: String,
    pub value: Secret,
}

/// The set of credentials bound for the lifetime of one stage or command.
#[derive(Debug, Clone, Default)]
pub struct CredentialBinding {
    bindings: Vec<Binding>,
}

/// Borrowed view of the AWS key pair in a binding.
#[derive(Debug, Clone, Copy)]
pub struct AwsCredentials<'a> {
    pub access_key_id: &'a Secret,
    pub secret_access_key: &'a Secret,
    pub session_token: Option<&'a Secret>,
}

impl CredentialBinding {
    /// Resolve every `env var -> credential id` pair in `requested`.
    ///
    /// All missing ids are reported together; the error names ids, never values.
    pub fn resolve(
        requested: &BTreeMap<String, String>,
        secrets: &BTreeMap<String, String>,
    ) -> miette::Result<Self> {
        let mut bindings = Vec::with_capacity(requested.len());
        let mut missing = Vec::new();

        for (env_var, credential_id) in requested {
            let value = secrets
                .get(credential_id)
                .cloned()
                .or_else(|| std::env::var(credential_id).ok())
                .filter(|v| !v.is_empty());
            match value {
                Some(v) => bindings.push(Binding {
                    env_var: env_var.clone(),
                    credential_id: credential_id.clone(),
                    value: Secret::new(v),
                }),
                None => missing.push(format!("'{credential_id}' (for {env_var})")),
            }
        }

        if !missing.is_empty() {
            return Err(DlIndexError::Credential {
                message: format!("No value for credential {}", missing.join(", ")),
            }
            .into());
        }

        tracing::debug!(
            "Bound {} credential(s): {}",
            bindings.len(),
            bindings
                .iter()
                .map(|b| b.env_var.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(Self { bindings })
    }

    /// Bind the named variables from `.dlindex.env` or the process environment,
    /// skipping the ones that are not set.
    pub fn from_env(names: &[&str], secrets: &BTreeMap<String, String>) -> Self {
        let bindings = names
            .iter()
            .filter_map(|name| {
                let value = secrets
                    .get(*name)
                    .cloned()
                    .or_else(|| std::env::var(name).ok())
                    .filter(|v| !v.is_empty())?;
                Some(Binding {
                    env_var: name.to_string(),
                    credential_id: name.to_string(),
                    value: Secret::new(value),
                })
            })
            .collect();
        Self { bindings }
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter()
    }

    /// Value bound to `env_var`.
    pub fn get(&self, env_var: &str) -> Option<&Secret> {
        self.bindings
            .iter()
            .find(|b| b.env_var == env_var)
            .map(|b| &b.value)
    }

    /// `(name, value)` pairs for a child process environment.
    pub fn env_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings
            .iter()
            .map(|b| (b.env_var.as_str(), b.value.expose()))
    }

    /// A redactor that masks every bound value.
    pub fn redactor(&self) -> Redactor {
        Redactor::new(self.bindings.iter().map(|b| b.value.expose().to_string()))
    }

    /// The AWS key pair, when both halves are bound.
    pub fn aws(&self) -> Option<AwsCredentials<'_>> {
        Some(AwsCredentials {
            access_key_id: self.get(AWS_ACCESS_KEY_ID)?,
            secret_access_key: self.get(AWS_SECRET_ACCESS_KEY)?,
            session_token: self.get(AWS_SESSION_TOKEN),
        })
    }
}
