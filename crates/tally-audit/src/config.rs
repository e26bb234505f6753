//! Audit service settings.

use std::collections::HashSet;

use serde::Deserialize;

use crate::sanitize::SensitiveKeys;

/// Settings for [`AuditLogService`](crate::AuditLogService).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Keys whose values are replaced by `"[REDACTED]"`. Matched
    /// case-insensitively.
    pub sensitive_fields: Vec<String>,
    /// Keys left out of the computed field diff.
    pub ignored_fields: Vec<String>,
    pub default_page_size: u64,
    pub max_page_size: u64,
    /// Days of history kept by the retention cleanup.
    pub retention_days: u32,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            sensitive_fields: ["password", "token", "secret", "key", "authorization"]
                .map(String::from)
                .to_vec(),
            ignored_fields: ["updatedAt", "updated_at", "__v"].map(String::from).to_vec(),
            default_page_size: 20,
            max_page_size: 100,
            retention_days: 90,
        }
    }
}

impl AuditConfig {
    pub(crate) fn sensitive_keys(&self) -> SensitiveKeys {
        SensitiveKeys::new(&self.sensitive_fields)
    }

    pub(crate) fn ignored_set(&self) -> HashSet<String> {
        self.ignored_fields.iter().cloned().collect()
    }

    /// Apply the default and clamp to `1..=max_page_size`.
    pub(crate) fn page_size(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size.max(1))
    }
}
