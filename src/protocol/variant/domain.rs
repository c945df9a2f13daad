//! Domain information levels 1-13 (10 is absent from the table).

use crate::common::error::CodecError;
use crate::protocol::codec::{get_counted_string, get_i64_le, get_nt_time, get_u16_le, get_u32_le, get_u64_le};
use crate::protocol::tree::Node;

use super::VariantCtx;

fn ustr(src: &mut &[u8], cx: &VariantCtx<'_>) -> Result<String, CodecError> {
    get_counted_string(src, 2, cx.limits.max_string_bytes)
}

/// General domain block shared by levels 2 and 11.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainGeneral {
    pub force_logoff: i64,
    pub comment: String,
    pub domain_name: String,
    pub primary_dc: String,
    pub sequence_number: u64,
    pub role: u32,
    pub num_users: u32,
    pub num_groups: u32,
    pub num_aliases: u32,
}

fn get_general(src: &mut &[u8], cx: &VariantCtx<'_>) -> Result<DomainGeneral, CodecError> {
    Ok(DomainGeneral {
        force_logoff: get_i64_le(src)?,
        comment: ustr(src, cx)?,
        domain_name: ustr(src, cx)?,
        primary_dc: ustr(src, cx)?,
        sequence_number: get_u64_le(src)?,
        role: get_u32_le(src)?,
        num_users: get_u32_le(src)?,
        num_groups: get_u32_le(src)?,
        num_aliases: get_u32_le(src)?,
    })
}

impl DomainGeneral {
    fn render(&self, n: &mut Node) {
        n.put_str("domain_name", self.domain_name.clone());
        n.put_str("comment", self.comment.clone());
        n.put_str("primary_dc", self.primary_dc.clone());
        n.put_str(
            "force_logoff",
            crate::common::time::render_rel_time(self.force_logoff),
        );
        n.put_u64("sequence_number", self.sequence_number);
        n.put_u32("role", self.role);
        n.put_u32("num_users", self.num_users);
        n.put_u32("num_groups", self.num_groups);
        n.put_u32("num_aliases", self.num_aliases);
    }
}

#[derive(Clone)]
pub enum DomainInfo {
    /// Level 1
    Password {
        min_password_length: u16,
        password_history_length: u16,
        password_properties: u32,
        max_password_age: i64,
        min_password_age: i64,
    },
    /// Level 2
    General(DomainGeneral),
    /// Level 3
    ForceLogoff { force_logoff: i64 },
    /// Level 4
    Oem { comment: String },
    /// Level 5
    Name { domain_name: String },
    /// Level 6
    Replication { replica_source: String },
    /// Level 7
    Role { role: u32 },
    /// Level 8
    Modified {
        sequence_number: u64,
        creation_time: u64,
    },
    /// Level 9
    State { state: u32 },
    /// Level 11
    General2 {
        general: DomainGeneral,
        lockout_duration: i64,
        lockout_window: i64,
        lockout_threshold: u16,
    },
    /// Level 12
    Lockout {
        lockout_duration: i64,
        lockout_window: i64,
        lockout_threshold: u16,
    },
    /// Level 13
    Modified2 {
        sequence_number: u64,
        creation_time: u64,
        modified_count_at_last_promotion: u64,
    },
    Unknown,
}

pub fn decode(level: u16, src: &mut &[u8], cx: &VariantCtx<'_>) -> Result<DomainInfo, CodecError> {
    let info = match level {
        1 => DomainInfo::Password {
            min_password_length: get_u16_le(src)?,
            password_history_length: get_u16_le(src)?,
            password_properties: get_u32_le(src)?,
            max_password_age: get_i64_le(src)?,
            min_password_age: get_i64_le(src)?,
        },
        2 => DomainInfo::General(get_general(src, cx)?),
        3 => DomainInfo::ForceLogoff {
            force_logoff: get_i64_le(src)?,
        },
        4 => DomainInfo::Oem {
            comment: ustr(src, cx)?,
        },
        5 => DomainInfo::Name {
            domain_name: ustr(src, cx)?,
        },
        6 => DomainInfo::Replication {
            replica_source: ustr(src, cx)?,
        },
        7 => DomainInfo::Role {
            role: get_u32_le(src)?,
        },
        8 => DomainInfo::Modified {
            sequence_number: get_u64_le(src)?,
            creation_time: get_nt_time(src)?,
        },
        9 => DomainInfo::State {
            state: get_u32_le(src)?,
        },
        11 => DomainInfo::General2 {
            general: get_general(src, cx)?,
            lockout_duration: get_i64_le(src)?,
            lockout_window: get_i64_le(src)?,
            lockout_threshold: get_u16_le(src)?,
        },
        12 => DomainInfo::Lockout {
            lockout_duration: get_i64_le(src)?,
            lockout_window: get_i64_le(src)?,
            lockout_threshold: get_u16_le(src)?,
        },
        13 => DomainInfo::Modified2 {
            sequence_number: get_u64_le(src)?,
            creation_time: get_nt_time(src)?,
            modified_count_at_last_promotion: get_u64_le(src)?,
        },
        _ => DomainInfo::Unknown,
    };
    Ok(info)
}

impl DomainInfo {
    pub fn render(&self, n: &mut Node) {
        use crate::common::time::render_rel_time;
        match self {
            DomainInfo::Password {
                min_password_length,
                password_history_length,
                password_properties,
                max_password_age,
                min_password_age,
            } => {
                n.put_u32("min_password_length", *min_password_length as u32);
                n.put_u32("password_history_length", *password_history_length as u32);
                n.put_u32("password_properties", *password_properties);
                n.put_str("max_password_age", render_rel_time(*max_password_age));
                n.put_str("min_password_age", render_rel_time(*min_password_age));
            }
            DomainInfo::General(g) => g.render(n),
            DomainInfo::ForceLogoff { force_logoff } => {
                n.put_str("force_logoff", render_rel_time(*force_logoff))
            }
            DomainInfo::Oem { comment } => n.put_str("comment", comment.clone()),
            DomainInfo::Name { domain_name } => n.put_str("domain_name", domain_name.clone()),
            DomainInfo::Replication { replica_source } => {
                n.put_str("replica_source", replica_source.clone())
            }
            DomainInfo::Role { role } => n.put_u32("role", *role),
            DomainInfo::Modified {
                sequence_number,
                creation_time,
            } => {
                n.put_u64("sequence_number", *sequence_number);
                n.put_time("creation_time", *creation_time);
            }
            DomainInfo::State { state } => n.put_u32("state", *state),
            DomainInfo::General2 {
                general,
                lockout_duration,
                lockout_window,
                lockout_threshold,
            } => {
                general.render(n);
                n.put_str("lockout_duration", render_rel_time(*lockout_duration));
                n.put_str("lockout_window", render_rel_time(*lockout_window));
                n.put_u32("lockout_threshold", *lockout_threshold as u32);
            }
            DomainInfo::Lockout {
                lockout_duration,
                lockout_window,
                lockout_threshold,
            } => {
                n.put_str("lockout_duration", render_rel_time(*lockout_duration));
                n.put_str("lockout_window", render_rel_time(*lockout_window));
                n.put_u32("lockout_threshold", *lockout_threshold as u32);
            }
            DomainInfo::Modified2 {
                sequence_number,
                creation_time,
                modified_count_at_last_promotion,
            } => {
                n.put_u64("sequence_number", *sequence_number);
                n.put_time("creation_time", *creation_time);
                n.put_u64(
                    "modified_count_at_last_promotion",
                    *modified_count_at_last_promotion,
                );
            }
            DomainInfo::Unknown => {}
        }
    }
}
