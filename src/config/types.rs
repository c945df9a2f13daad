//! Configuration type definitions.

/// Decode caps applied to every variable-length wire field.
#[derive(Clone, Debug)]
pub struct Limits {
    pub max_string_bytes: usize,
    pub max_array_items: usize,
    pub max_rid_count: usize,
    pub max_logon_hours_bytes: usize,
    pub max_sid_subauths: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_string_bytes: 65536,
            max_array_items: 4096,
            max_rid_count: 4096,
            // 10080 minutes per week, one bit each
            max_logon_hours_bytes: 1260,
            max_sid_subauths: 15,
        }
    }
}

/// Session secrets supplied by the embedding environment.
#[derive(Clone, Debug, Default)]
pub struct Secret {
    /// Expected plaintext account password, consumed only by the
    /// credential-block decryption step. Absent means "do not decrypt".
    pub account_password: Option<String>,
}

/// Root configuration container.
#[derive(Clone, Debug, Default)]
pub struct Config {
    pub limits: Limits,
    pub secret: Secret,
}
