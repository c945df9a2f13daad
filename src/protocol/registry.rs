//! Opcode schema registry.
//!
//! Maps an opcode to its name and request/reply field decoders. The table
//! is built exactly once at first use and is read-only afterwards; opcodes
//! absent from it are unsupported operations, not decode errors.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::common::error::CodecError;
use crate::config::Limits;
use crate::protocol::ops;
use crate::protocol::tree::Node;
use crate::session::CallContextStore;

// Operation numbers
pub const OP_CONNECT: u16 = 0;
pub const OP_CLOSE_HANDLE: u16 = 1;
pub const OP_QUERY_SECURITY: u16 = 3;
pub const OP_LOOKUP_DOMAIN: u16 = 5;
pub const OP_ENUM_DOMAINS: u16 = 6;
pub const OP_OPEN_DOMAIN: u16 = 7;
pub const OP_QUERY_DOMAIN_INFO: u16 = 8;
pub const OP_SET_DOMAIN_INFO: u16 = 9;
pub const OP_CREATE_GROUP: u16 = 10;
pub const OP_ENUM_DOMAIN_GROUPS: u16 = 11;
pub const OP_CREATE_USER: u16 = 12;
pub const OP_ENUM_DOMAIN_USERS: u16 = 13;
pub const OP_CREATE_ALIAS: u16 = 14;
pub const OP_ENUM_DOMAIN_ALIASES: u16 = 15;
pub const OP_LOOKUP_NAMES: u16 = 17;
pub const OP_LOOKUP_RIDS: u16 = 18;
pub const OP_OPEN_GROUP: u16 = 19;
pub const OP_QUERY_GROUP_INFO: u16 = 20;
pub const OP_SET_GROUP_INFO: u16 = 21;
pub const OP_OPEN_ALIAS: u16 = 27;
pub const OP_QUERY_ALIAS_INFO: u16 = 28;
pub const OP_SET_ALIAS_INFO: u16 = 29;
pub const OP_OPEN_USER: u16 = 34;
pub const OP_DELETE_USER: u16 = 35;
pub const OP_QUERY_USER_INFO: u16 = 36;
pub const OP_SET_USER_INFO: u16 = 37;
pub const OP_QUERY_DISPLAY_INFO: u16 = 40;
pub const OP_OEM_CHANGE_PASSWORD: u16 = 54;
pub const OP_UNICODE_CHANGE_PASSWORD: u16 = 55;
pub const OP_GET_DOMAIN_PASSWORD_INFO: u16 = 56;
pub const OP_CONNECT2: u16 = 57;
pub const OP_CONNECT4: u16 = 62;
pub const OP_CONNECT5: u16 = 64;
pub const OP_RID_TO_SID: u16 = 65;

/// Everything a field decoder needs besides the cursor and output node.
pub struct DecodeCtx<'a> {
    /// Request/reply pairing token supplied by the outer RPC layer.
    pub call_id: u64,
    pub store: &'a mut CallContextStore,
    pub limits: &'a Limits,
    /// Expected account password for credential-block decryption.
    pub secret: Option<&'a str>,
}

pub type DecodeFn = fn(&mut &[u8], &mut Node, &mut DecodeCtx<'_>) -> Result<(), CodecError>;

/// One operation's schema.
pub struct CallSchema {
    pub name: &'static str,
    pub decode_request: DecodeFn,
    pub decode_reply: Option<DecodeFn>,
}

static REGISTRY: Lazy<HashMap<u16, CallSchema>> = Lazy::new(build);

/// Look up the schema for an opcode.
pub fn lookup(opcode: u16) -> Option<&'static CallSchema> {
    REGISTRY.get(&opcode)
}

/// All registered opcodes, for sweep-style tests and tooling.
pub fn opcodes() -> impl Iterator<Item = u16> {
    let mut v: Vec<u16> = REGISTRY.keys().copied().collect();
    v.sort_unstable();
    v.into_iter()
}

fn build() -> HashMap<u16, CallSchema> {
    let mut m = HashMap::new();
    let mut put = |op: u16, name: &'static str, req: DecodeFn, rep: Option<DecodeFn>| {
        m.insert(
            op,
            CallSchema {
                name,
                decode_request: req,
                decode_reply: rep,
            },
        );
    };

    put(
        OP_CONNECT,
        "connect",
        ops::connect_req,
        Some(ops::connect_reply),
    );
    put(
        OP_CLOSE_HANDLE,
        "close_handle",
        ops::close_req,
        Some(ops::close_reply),
    );
    put(
        OP_QUERY_SECURITY,
        "query_security",
        ops::query_security_req,
        Some(ops::query_security_reply),
    );
    put(
        OP_LOOKUP_DOMAIN,
        "lookup_domain",
        ops::lookup_domain_req,
        Some(ops::lookup_domain_reply),
    );
    put(
        OP_ENUM_DOMAINS,
        "enum_domains",
        ops::enum_req,
        Some(ops::enum_reply),
    );
    put(
        OP_OPEN_DOMAIN,
        "open_domain",
        ops::open_domain_req,
        Some(ops::open_domain_reply),
    );
    put(
        OP_QUERY_DOMAIN_INFO,
        "query_domain_info",
        ops::query_info_req,
        Some(ops::query_domain_info_reply),
    );
    put(
        OP_SET_DOMAIN_INFO,
        "set_domain_info",
        ops::set_domain_info_req,
        Some(ops::status_only_reply),
    );
    put(
        OP_CREATE_GROUP,
        "create_group",
        ops::create_named_req,
        Some(ops::create_group_reply),
    );
    put(
        OP_ENUM_DOMAIN_GROUPS,
        "enum_domain_groups",
        ops::enum_req,
        Some(ops::enum_reply),
    );
    put(
        OP_CREATE_USER,
        "create_user",
        ops::create_named_req,
        Some(ops::create_user_reply),
    );
    put(
        OP_ENUM_DOMAIN_USERS,
        "enum_domain_users",
        ops::enum_users_req,
        Some(ops::enum_reply),
    );
    put(
        OP_CREATE_ALIAS,
        "create_alias",
        ops::create_named_req,
        Some(ops::create_alias_reply),
    );
    put(
        OP_ENUM_DOMAIN_ALIASES,
        "enum_domain_aliases",
        ops::enum_req,
        Some(ops::enum_reply),
    );
    put(
        OP_LOOKUP_NAMES,
        "lookup_names",
        ops::lookup_names_req,
        Some(ops::lookup_names_reply),
    );
    put(
        OP_LOOKUP_RIDS,
        "lookup_rids",
        ops::lookup_rids_req,
        Some(ops::lookup_rids_reply),
    );
    put(
        OP_OPEN_GROUP,
        "open_group",
        ops::open_by_rid_req,
        Some(ops::open_group_reply),
    );
    put(
        OP_QUERY_GROUP_INFO,
        "query_group_info",
        ops::query_info_req,
        Some(ops::query_group_info_reply),
    );
    put(
        OP_SET_GROUP_INFO,
        "set_group_info",
        ops::set_group_info_req,
        Some(ops::status_only_reply),
    );
    put(
        OP_OPEN_ALIAS,
        "open_alias",
        ops::open_by_rid_req,
        Some(ops::open_alias_reply),
    );
    put(
        OP_QUERY_ALIAS_INFO,
        "query_alias_info",
        ops::query_info_req,
        Some(ops::query_alias_info_reply),
    );
    put(
        OP_SET_ALIAS_INFO,
        "set_alias_info",
        ops::set_alias_info_req,
        Some(ops::status_only_reply),
    );
    put(
        OP_OPEN_USER,
        "open_user",
        ops::open_by_rid_req,
        Some(ops::open_user_reply),
    );
    put(
        OP_DELETE_USER,
        "delete_user",
        ops::close_req,
        Some(ops::close_reply),
    );
    put(
        OP_QUERY_USER_INFO,
        "query_user_info",
        ops::query_info_req,
        Some(ops::query_user_info_reply),
    );
    put(
        OP_SET_USER_INFO,
        "set_user_info",
        ops::set_user_info_req,
        Some(ops::status_only_reply),
    );
    put(
        OP_QUERY_DISPLAY_INFO,
        "query_display_info",
        ops::query_display_info_req,
        Some(ops::query_display_info_reply),
    );
    put(
        OP_OEM_CHANGE_PASSWORD,
        "oem_change_password",
        ops::oem_change_password_req,
        Some(ops::status_only_reply),
    );
    put(
        OP_UNICODE_CHANGE_PASSWORD,
        "unicode_change_password",
        ops::unicode_change_password_req,
        Some(ops::status_only_reply),
    );
    put(
        OP_GET_DOMAIN_PASSWORD_INFO,
        "get_domain_password_info",
        ops::get_domain_password_info_req,
        Some(ops::get_domain_password_info_reply),
    );
    put(
        OP_CONNECT2,
        "connect2",
        ops::connect_req,
        Some(ops::connect_reply),
    );
    put(
        OP_CONNECT4,
        "connect4",
        ops::connect4_req,
        Some(ops::connect_reply),
    );
    put(
        OP_CONNECT5,
        "connect5",
        ops::connect5_req,
        Some(ops::connect_reply),
    );
    put(
        OP_RID_TO_SID,
        "rid_to_sid",
        ops::rid_to_sid_req,
        Some(ops::rid_to_sid_reply),
    );

    m
}
