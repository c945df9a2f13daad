//! Configuration file parser.
//!
//! Parses `section.key = value` configuration files with a custom
//! lightweight parser.

use super::types::*;
use std::{fs, io};

/// Load configuration from a file path.
pub fn load_config(path: &str) -> io::Result<Config> {
    let s = fs::read_to_string(path)?;
    parse_config(&s)
}

/// Parse configuration from a string.
pub fn parse_config(s: &str) -> io::Result<Config> {
    let mut cfg = Config::default();

    for (lineno, line) in s.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((lhs, rhs)) = line.split_once('=') else {
            continue;
        };
        let lhs = lhs.trim();
        let mut val = rhs.trim();
        if let Some((head, _)) = val.split_once('#') {
            val = head.trim();
        }

        let (section, key) = if let Some((a, b)) = lhs.split_once('.') {
            (a.trim(), b.trim())
        } else {
            ("", lhs)
        };

        if section.is_empty() {
            continue;
        }

        set_config_value(section, key, val, &mut cfg).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("line {}: {}", lineno + 1, e),
            )
        })?;
    }

    Ok(cfg)
}

/// Set a configuration value based on section, key, and value strings.
fn set_config_value(section: &str, key: &str, val: &str, cfg: &mut Config) -> Result<(), String> {
    macro_rules! parse {
        (s) => {
            val.trim_matches('"').to_string()
        };
        (usize_) => {
            val.parse::<usize>().map_err(|e| e.to_string())?
        };
    }

    match (section, key) {
        ("limits", "max_string_bytes") => cfg.limits.max_string_bytes = parse!(usize_),
        ("limits", "max_array_items") => cfg.limits.max_array_items = parse!(usize_),
        ("limits", "max_rid_count") => cfg.limits.max_rid_count = parse!(usize_),
        ("limits", "max_logon_hours_bytes") => cfg.limits.max_logon_hours_bytes = parse!(usize_),
        ("limits", "max_sid_subauths") => cfg.limits.max_sid_subauths = parse!(usize_),

        ("secret", "account_password") => cfg.secret.account_password = Some(parse!(s)),

        _ => return Err(format!("unknown key {}.{}", section, key)),
    }

    Ok(())
}
