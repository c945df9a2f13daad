//! User information levels.
//!
//! Levels 1-25, minus 15/19/22 which are absent from the table. Levels
//! 23, 24 and 25 carry an encrypted credential block; 24 and 25 are
//! deliberately independent arms with non-overlapping field sets.

use crate::common::error::CodecError;
use crate::protocol::codec::{get_array, get_counted_string, get_fixed_16, get_nt_time, get_u16_le, get_u32_le, get_u8};
use crate::protocol::crypto::CryptBlock;
use crate::protocol::tree::Node;

use super::VariantCtx;

fn ustr(src: &mut &[u8], cx: &VariantCtx<'_>) -> Result<String, CodecError> {
    get_counted_string(src, 2, cx.limits.max_string_bytes)
}

/// Weekly logon window bitmap, shared by several levels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogonHours {
    pub units_per_week: u32,
    pub bits: Vec<u8>,
}

pub fn get_logon_hours(src: &mut &[u8], cx: &VariantCtx<'_>) -> Result<LogonHours, CodecError> {
    let units_per_week = get_u32_le(src)?;
    let bits = get_array(src, cx.limits.max_logon_hours_bytes, get_u8)?;
    Ok(LogonHours {
        units_per_week,
        bits,
    })
}

impl LogonHours {
    fn node(&self) -> Node {
        let mut n = Node::branch("logon_hours");
        n.put_u32("units_per_week", self.units_per_week);
        n.put_bytes("bitmap", self.bits.clone());
        n
    }
}

/// The all-fields identity block reused by levels 21, 23 and 25.
#[derive(Clone)]
pub struct UserAll {
    pub last_logon: u64,
    pub last_logoff: u64,
    pub password_last_set: u64,
    pub account_expiry: u64,
    pub password_can_change: u64,
    pub password_must_change: u64,
    pub account_name: String,
    pub full_name: String,
    pub home_directory: String,
    pub home_drive: String,
    pub logon_script: String,
    pub profile_path: String,
    pub description: String,
    pub workstations: String,
    pub comment: String,
    pub parameters: String,
    pub rid: u32,
    pub primary_gid: u32,
    pub account_flags: u32,
    pub fields_present: u32,
    pub logon_hours: LogonHours,
    pub bad_password_count: u16,
    pub logon_count: u16,
    pub country_code: u16,
    pub code_page: u16,
}

fn get_user_all(src: &mut &[u8], cx: &VariantCtx<'_>) -> Result<UserAll, CodecError> {
    Ok(UserAll {
        last_logon: get_nt_time(src)?,
        last_logoff: get_nt_time(src)?,
        password_last_set: get_nt_time(src)?,
        account_expiry: get_nt_time(src)?,
        password_can_change: get_nt_time(src)?,
        password_must_change: get_nt_time(src)?,
        account_name: ustr(src, cx)?,
        full_name: ustr(src, cx)?,
        home_directory: ustr(src, cx)?,
        home_drive: ustr(src, cx)?,
        logon_script: ustr(src, cx)?,
        profile_path: ustr(src, cx)?,
        description: ustr(src, cx)?,
        workstations: ustr(src, cx)?,
        comment: ustr(src, cx)?,
        parameters: ustr(src, cx)?,
        rid: get_u32_le(src)?,
        primary_gid: get_u32_le(src)?,
        account_flags: get_u32_le(src)?,
        fields_present: get_u32_le(src)?,
        logon_hours: get_logon_hours(src, cx)?,
        bad_password_count: get_u16_le(src)?,
        logon_count: get_u16_le(src)?,
        country_code: get_u16_le(src)?,
        code_page: get_u16_le(src)?,
    })
}

impl UserAll {
    fn render(&self, n: &mut Node) {
        n.put_str("account_name", self.account_name.clone());
        n.put_str("full_name", self.full_name.clone());
        n.put_u32("rid", self.rid);
        n.put_u32("primary_gid", self.primary_gid);
        n.put_str("home_directory", self.home_directory.clone());
        n.put_str("home_drive", self.home_drive.clone());
        n.put_str("logon_script", self.logon_script.clone());
        n.put_str("profile_path", self.profile_path.clone());
        n.put_str("description", self.description.clone());
        n.put_str("workstations", self.workstations.clone());
        n.put_str("comment", self.comment.clone());
        n.put_str("parameters", self.parameters.clone());
        n.put_time("last_logon", self.last_logon);
        n.put_time("last_logoff", self.last_logoff);
        n.put_time("password_last_set", self.password_last_set);
        n.put_time("account_expiry", self.account_expiry);
        n.put_time("password_can_change", self.password_can_change);
        n.put_time("password_must_change", self.password_must_change);
        n.put_u32("account_flags", self.account_flags);
        n.put_u32("fields_present", self.fields_present);
        n.push(self.logon_hours.node());
        n.put_u32("bad_password_count", self.bad_password_count as u32);
        n.put_u32("logon_count", self.logon_count as u32);
        n.put_u32("country_code", self.country_code as u32);
        n.put_u32("code_page", self.code_page as u32);
    }
}

/// One arm per supported level.
#[derive(Clone)]
pub enum UserInfo {
    /// Level 1
    Names {
        account_name: String,
        full_name: String,
        primary_gid: u32,
        description: String,
        comment: String,
    },
    /// Level 2
    Preferences {
        comment: String,
        country_code: u16,
        code_page: u16,
    },
    /// Level 3
    Logon {
        account_name: String,
        full_name: String,
        rid: u32,
        primary_gid: u32,
        home_directory: String,
        home_drive: String,
        logon_script: String,
        profile_path: String,
        workstations: String,
        last_logon: u64,
        last_logoff: u64,
        logon_hours: LogonHours,
        bad_password_count: u16,
        logon_count: u16,
        password_last_set: u64,
        password_can_change: u64,
        password_must_change: u64,
        account_flags: u32,
    },
    /// Level 4
    Hours { logon_hours: LogonHours },
    /// Level 5
    Account {
        account_name: String,
        full_name: String,
        rid: u32,
        primary_gid: u32,
        home_directory: String,
        home_drive: String,
        logon_script: String,
        profile_path: String,
        description: String,
        workstations: String,
        last_logon: u64,
        last_logoff: u64,
        logon_hours: LogonHours,
        bad_password_count: u16,
        logon_count: u16,
        password_last_set: u64,
        account_expiry: u64,
        account_flags: u32,
    },
    /// Level 6
    NamePair {
        account_name: String,
        full_name: String,
    },
    /// Level 7
    AccountName { account_name: String },
    /// Level 8
    FullName { full_name: String },
    /// Level 9
    PrimaryGroup { primary_gid: u32 },
    /// Level 10
    Home {
        home_directory: String,
        home_drive: String,
    },
    /// Level 11
    Script { logon_script: String },
    /// Level 12
    Profile { profile_path: String },
    /// Level 13
    Description { description: String },
    /// Level 14
    Workstations { workstations: String },
    /// Level 16
    Control { account_flags: u32 },
    /// Level 17
    Expiry { account_expiry: u64 },
    /// Level 18
    OwfHashes {
        lm_owf: [u8; 16],
        nt_owf: [u8; 16],
    },
    /// Level 20
    Parameters { parameters: String },
    /// Level 21
    All(UserAll),
    /// Level 23
    AllWithSecret { all: UserAll, secret: CryptBlock },
    /// Level 24
    SecretOnly { secret: CryptBlock, expired: u8 },
    /// Level 25
    AllWithSecretEx { all: UserAll, secret: CryptBlock },
    Unknown,
}

pub fn decode(level: u16, src: &mut &[u8], cx: &VariantCtx<'_>) -> Result<UserInfo, CodecError> {
    let info = match level {
        1 => UserInfo::Names {
            account_name: ustr(src, cx)?,
            full_name: ustr(src, cx)?,
            primary_gid: get_u32_le(src)?,
            description: ustr(src, cx)?,
            comment: ustr(src, cx)?,
        },
        2 => UserInfo::Preferences {
            comment: ustr(src, cx)?,
            country_code: get_u16_le(src)?,
            code_page: get_u16_le(src)?,
        },
        3 => UserInfo::Logon {
            account_name: ustr(src, cx)?,
            full_name: ustr(src, cx)?,
            rid: get_u32_le(src)?,
            primary_gid: get_u32_le(src)?,
            home_directory: ustr(src, cx)?,
            home_drive: ustr(src, cx)?,
            logon_script: ustr(src, cx)?,
            profile_path: ustr(src, cx)?,
            workstations: ustr(src, cx)?,
            last_logon: get_nt_time(src)?,
            last_logoff: get_nt_time(src)?,
            logon_hours: get_logon_hours(src, cx)?,
            bad_password_count: get_u16_le(src)?,
            logon_count: get_u16_le(src)?,
            password_last_set: get_nt_time(src)?,
            password_can_change: get_nt_time(src)?,
            password_must_change: get_nt_time(src)?,
            account_flags: get_u32_le(src)?,
        },
        4 => UserInfo::Hours {
            logon_hours: get_logon_hours(src, cx)?,
        },
        5 => UserInfo::Account {
            account_name: ustr(src, cx)?,
            full_name: ustr(src, cx)?,
            rid: get_u32_le(src)?,
            primary_gid: get_u32_le(src)?,
            home_directory: ustr(src, cx)?,
            home_drive: ustr(src, cx)?,
            logon_script: ustr(src, cx)?,
            profile_path: ustr(src, cx)?,
            description: ustr(src, cx)?,
            workstations: ustr(src, cx)?,
            last_logon: get_nt_time(src)?,
            last_logoff: get_nt_time(src)?,
            logon_hours: get_logon_hours(src, cx)?,
            bad_password_count: get_u16_le(src)?,
            logon_count: get_u16_le(src)?,
            password_last_set: get_nt_time(src)?,
            account_expiry: get_nt_time(src)?,
            account_flags: get_u32_le(src)?,
        },
        6 => UserInfo::NamePair {
            account_name: ustr(src, cx)?,
            full_name: ustr(src, cx)?,
        },
        7 => UserInfo::AccountName {
            account_name: ustr(src, cx)?,
        },
        8 => UserInfo::FullName {
            full_name: ustr(src, cx)?,
        },
        9 => UserInfo::PrimaryGroup {
            primary_gid: get_u32_le(src)?,
        },
        10 => UserInfo::Home {
            home_directory: ustr(src, cx)?,
            home_drive: ustr(src, cx)?,
        },
        11 => UserInfo::Script {
            logon_script: ustr(src, cx)?,
        },
        12 => UserInfo::Profile {
            profile_path: ustr(src, cx)?,
        },
        13 => UserInfo::Description {
            description: ustr(src, cx)?,
        },
        14 => UserInfo::Workstations {
            workstations: ustr(src, cx)?,
        },
        16 => UserInfo::Control {
            account_flags: get_u32_le(src)?,
        },
        17 => UserInfo::Expiry {
            account_expiry: get_nt_time(src)?,
        },
        18 => UserInfo::OwfHashes {
            lm_owf: get_fixed_16(src)?,
            nt_owf: get_fixed_16(src)?,
        },
        20 => UserInfo::Parameters {
            parameters: ustr(src, cx)?,
        },
        21 => UserInfo::All(get_user_all(src, cx)?),
        23 => UserInfo::AllWithSecret {
            all: get_user_all(src, cx)?,
            secret: CryptBlock::decode(src, cx.secret)?,
        },
        24 => UserInfo::SecretOnly {
            secret: CryptBlock::decode(src, cx.secret)?,
            expired: get_u8(src)?,
        },
        25 => UserInfo::AllWithSecretEx {
            all: get_user_all(src, cx)?,
            secret: CryptBlock::decode(src, cx.secret)?,
        },
        _ => UserInfo::Unknown,
    };
    Ok(info)
}

impl UserInfo {
    pub fn render(&self, n: &mut Node) {
        match self {
            UserInfo::Names {
                account_name,
                full_name,
                primary_gid,
                description,
                comment,
            } => {
                n.put_str("account_name", account_name.clone());
                n.put_str("full_name", full_name.clone());
                n.put_u32("primary_gid", *primary_gid);
                n.put_str("description", description.clone());
                n.put_str("comment", comment.clone());
            }
            UserInfo::Preferences {
                comment,
                country_code,
                code_page,
            } => {
                n.put_str("comment", comment.clone());
                n.put_u32("country_code", *country_code as u32);
                n.put_u32("code_page", *code_page as u32);
            }
            UserInfo::Logon {
                account_name,
                full_name,
                rid,
                primary_gid,
                home_directory,
                home_drive,
                logon_script,
                profile_path,
                workstations,
                last_logon,
                last_logoff,
                logon_hours,
                bad_password_count,
                logon_count,
                password_last_set,
                password_can_change,
                password_must_change,
                account_flags,
            } => {
                n.put_str("account_name", account_name.clone());
                n.put_str("full_name", full_name.clone());
                n.put_u32("rid", *rid);
                n.put_u32("primary_gid", *primary_gid);
                n.put_str("home_directory", home_directory.clone());
                n.put_str("home_drive", home_drive.clone());
                n.put_str("logon_script", logon_script.clone());
                n.put_str("profile_path", profile_path.clone());
                n.put_str("workstations", workstations.clone());
                n.put_time("last_logon", *last_logon);
                n.put_time("last_logoff", *last_logoff);
                n.push(logon_hours.node());
                n.put_u32("bad_password_count", *bad_password_count as u32);
                n.put_u32("logon_count", *logon_count as u32);
                n.put_time("password_last_set", *password_last_set);
                n.put_time("password_can_change", *password_can_change);
                n.put_time("password_must_change", *password_must_change);
                n.put_u32("account_flags", *account_flags);
            }
            UserInfo::Hours { logon_hours } => n.push(logon_hours.node()),
            UserInfo::Account {
                account_name,
                full_name,
                rid,
                primary_gid,
                home_directory,
                home_drive,
                logon_script,
                profile_path,
                description,
                workstations,
                last_logon,
                last_logoff,
                logon_hours,
                bad_password_count,
                logon_count,
                password_last_set,
                account_expiry,
                account_flags,
            } => {
                n.put_str("account_name", account_name.clone());
                n.put_str("full_name", full_name.clone());
                n.put_u32("rid", *rid);
                n.put_u32("primary_gid", *primary_gid);
                n.put_str("home_directory", home_directory.clone());
                n.put_str("home_drive", home_drive.clone());
                n.put_str("logon_script", logon_script.clone());
                n.put_str("profile_path", profile_path.clone());
                n.put_str("description", description.clone());
                n.put_str("workstations", workstations.clone());
                n.put_time("last_logon", *last_logon);
                n.put_time("last_logoff", *last_logoff);
                n.push(logon_hours.node());
                n.put_u32("bad_password_count", *bad_password_count as u32);
                n.put_u32("logon_count", *logon_count as u32);
                n.put_time("password_last_set", *password_last_set);
                n.put_time("account_expiry", *account_expiry);
                n.put_u32("account_flags", *account_flags);
            }
            UserInfo::NamePair {
                account_name,
                full_name,
            } => {
                n.put_str("account_name", account_name.clone());
                n.put_str("full_name", full_name.clone());
            }
            UserInfo::AccountName { account_name } => n.put_str("account_name", account_name.clone()),
            UserInfo::FullName { full_name } => n.put_str("full_name", full_name.clone()),
            UserInfo::PrimaryGroup { primary_gid } => n.put_u32("primary_gid", *primary_gid),
            UserInfo::Home {
                home_directory,
                home_drive,
            } => {
                n.put_str("home_directory", home_directory.clone());
                n.put_str("home_drive", home_drive.clone());
            }
            UserInfo::Script { logon_script } => n.put_str("logon_script", logon_script.clone()),
            UserInfo::Profile { profile_path } => n.put_str("profile_path", profile_path.clone()),
            UserInfo::Description { description } => n.put_str("description", description.clone()),
            UserInfo::Workstations { workstations } => {
                n.put_str("workstations", workstations.clone())
            }
            UserInfo::Control { account_flags } => n.put_u32("account_flags", *account_flags),
            UserInfo::Expiry { account_expiry } => n.put_time("account_expiry", *account_expiry),
            UserInfo::OwfHashes { lm_owf, nt_owf } => {
                n.put_bytes("lm_owf", lm_owf.to_vec());
                n.put_bytes("nt_owf", nt_owf.to_vec());
            }
            UserInfo::Parameters { parameters } => n.put_str("parameters", parameters.clone()),
            UserInfo::All(all) => all.render(n),
            UserInfo::AllWithSecret { all, secret } => {
                all.render(n);
                n.push(secret.node("crypt_password"));
            }
            UserInfo::SecretOnly { secret, expired } => {
                n.push(secret.node("crypt_password"));
                n.put_u32("password_expired", *expired as u32);
            }
            UserInfo::AllWithSecretEx { all, secret } => {
                all.render(n);
                n.push(secret.node("crypt_password"));
            }
            UserInfo::Unknown => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Limits;
    use bytes::{BufMut, BytesMut};

    fn cx(limits: &Limits) -> VariantCtx<'_> {
        VariantCtx {
            limits,
            secret: None,
        }
    }

    fn put_ustr(buf: &mut BytesMut, s: &str) {
        let units: Vec<u16> = s.encode_utf16().collect();
        buf.put_u32_le((units.len() * 2) as u32);
        for u in units {
            buf.put_u16_le(u);
        }
    }

    #[test]
    fn test_level_7_account_name() {
        let mut buf = BytesMut::new();
        put_ustr(&mut buf, "svc-backup");
        let limits = Limits::default();
        let mut p = &buf[..];
        let info = decode(7, &mut p, &cx(&limits)).unwrap();
        match info {
            UserInfo::AccountName { account_name } => assert_eq!(account_name, "svc-backup"),
            _ => panic!("wrong arm"),
        }
        assert!(p.is_empty());
    }

    #[test]
    fn test_level_1_names() {
        let mut buf = BytesMut::new();
        put_ustr(&mut buf, "bob");
        put_ustr(&mut buf, "Bob B.");
        buf.put_u32_le(513);
        put_ustr(&mut buf, "desc");
        put_ustr(&mut buf, "");
        let limits = Limits::default();
        let mut p = &buf[..];
        let info = decode(1, &mut p, &cx(&limits)).unwrap();
        match info {
            UserInfo::Names {
                account_name,
                primary_gid,
                ..
            } => {
                assert_eq!(account_name, "bob");
                assert_eq!(primary_gid, 513);
            }
            _ => panic!("wrong arm"),
        }
    }

    #[test]
    fn test_level_18_hashes() {
        let mut buf = BytesMut::new();
        buf.put_slice(&[0x11; 16]);
        buf.put_slice(&[0x22; 16]);
        let limits = Limits::default();
        let mut p = &buf[..];
        match decode(18, &mut p, &cx(&limits)).unwrap() {
            UserInfo::OwfHashes { lm_owf, nt_owf } => {
                assert_eq!(lm_owf, [0x11; 16]);
                assert_eq!(nt_owf, [0x22; 16]);
            }
            _ => panic!("wrong arm"),
        }
    }

    #[test]
    fn test_level_24_independent_of_25() {
        // Level 24 is a credential block plus one expiry byte and nothing
        // else; it must not try to read the all-fields block.
        let mut buf = BytesMut::new();
        buf.put_slice(&[0u8; 516]);
        buf.put_u8(1);
        let limits = Limits::default();
        let mut p = &buf[..];
        match decode(24, &mut p, &cx(&limits)).unwrap() {
            UserInfo::SecretOnly { expired, .. } => assert_eq!(expired, 1),
            _ => panic!("wrong arm"),
        }
        assert!(p.is_empty());
    }

    #[test]
    fn test_truncated_string_is_short() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(8);
        buf.put_slice(&[0x61, 0x00]); // 2 of 8 declared bytes
        let limits = Limits::default();
        let mut p = &buf[..];
        assert!(matches!(
            decode(7, &mut p, &cx(&limits)),
            Err(CodecError::Short)
        ));
    }
}
