//! Per-operation field decoders.
//!
//! Request decoders read the call's fields into the output node and, where
//! the schema says so, stash a correlation fact for the matching reply.
//! Reply decoders read the result fields and, on a success status, turn
//! the stashed fact into a label for any newly produced handle.

use crate::common::error::CodecError;
use crate::metrics::METRICS;
use crate::protocol::codec::{
    get_array, get_counted_string, get_fixed_16, get_handle, get_pointer, get_u16_le, get_u32_le,
    get_u8, Handle,
};
use crate::protocol::crypto::CryptBlock;
use crate::protocol::registry::DecodeCtx;
use crate::protocol::sid::get_sid;
use crate::protocol::tree::{Node, Value};
use crate::protocol::variant::{decode_variant, VariantCtx, VariantFamily};
use crate::session::Fact;

pub const STATUS_SUCCESS: u32 = 0;

type DecodeResult = Result<(), CodecError>;

fn ustr(src: &mut &[u8], cx: &DecodeCtx<'_>) -> Result<String, CodecError> {
    get_counted_string(src, 2, cx.limits.max_string_bytes)
}

fn oemstr(src: &mut &[u8], cx: &DecodeCtx<'_>) -> Result<String, CodecError> {
    get_counted_string(src, 1, cx.limits.max_string_bytes)
}

fn vcx<'a>(cx: &'a DecodeCtx<'_>) -> VariantCtx<'a> {
    VariantCtx {
        limits: cx.limits,
        secret: cx.secret,
    }
}

/// Read a handle field, annotating it with its registered label if the
/// session has seen it opened.
fn read_handle_field(
    name: &'static str,
    src: &mut &[u8],
    out: &mut Node,
    cx: &DecodeCtx<'_>,
) -> Result<Handle, CodecError> {
    let h = get_handle(src)?;
    let mut n = Node::leaf(name, Value::Str(h.to_string()));
    if let Some(label) = cx.store.lookup_handle_label(&h) {
        n.push(Node::leaf("opened_as", Value::Str(label.to_string())));
    }
    out.push(n);
    Ok(h)
}

fn read_status(src: &mut &[u8], out: &mut Node) -> Result<u32, CodecError> {
    let status = get_u32_le(src)?;
    out.put_u32("status", status);
    Ok(status)
}

/// Synthesize a handle label from the request-time fact, falling back to a
/// generic label when the request was never observed.
fn synth_label(kind: &'static str, fact: Option<&Fact>) -> String {
    match fact {
        Some(Fact::Rid(rid)) => format!("{}(rid=0x{:x})", kind, rid),
        Some(Fact::Name(name)) => format!("{}({})", kind, name),
        Some(Fact::Handle(_)) | None => format!("{}(unknown)", kind),
    }
}

/// Shared reply shape: new handle followed by a status code.
fn open_handle_reply(
    kind: &'static str,
    src: &mut &[u8],
    out: &mut Node,
    cx: &mut DecodeCtx<'_>,
) -> DecodeResult {
    let handle = get_handle(src)?;
    let hidx = out.children.len();
    out.push(Node::leaf("handle", Value::Str(handle.to_string())));
    let status = read_status(src, out)?;
    if status == STATUS_SUCCESS {
        let label = synth_label(kind, cx.store.take_label_source(cx.call_id));
        out.children[hidx].push(Node::leaf("opened_as", Value::Str(label.clone())));
        cx.store.register_handle(handle, label);
        METRICS.inc_handles_registered();
    }
    Ok(())
}

// ---- connect family ----

pub fn connect_req(src: &mut &[u8], out: &mut Node, cx: &mut DecodeCtx<'_>) -> DecodeResult {
    let server = get_pointer(src, |p| ustr(p, cx))?;
    if let Some(server) = &server {
        out.put_str("server", server.clone());
        cx.store.stash(cx.call_id, Fact::Name(server.clone()));
    }
    let access = get_u32_le(src)?;
    out.put_u32("access_mask", access);
    Ok(())
}

pub fn connect4_req(src: &mut &[u8], out: &mut Node, cx: &mut DecodeCtx<'_>) -> DecodeResult {
    let server = get_pointer(src, |p| ustr(p, cx))?;
    if let Some(server) = &server {
        out.put_str("server", server.clone());
        cx.store.stash(cx.call_id, Fact::Name(server.clone()));
    }
    out.put_u32("client_version", get_u32_le(src)?);
    out.put_u32("access_mask", get_u32_le(src)?);
    Ok(())
}

pub fn connect5_req(src: &mut &[u8], out: &mut Node, cx: &mut DecodeCtx<'_>) -> DecodeResult {
    let server = get_pointer(src, |p| ustr(p, cx))?;
    if let Some(server) = &server {
        out.put_str("server", server.clone());
        cx.store.stash(cx.call_id, Fact::Name(server.clone()));
    }
    out.put_u32("access_mask", get_u32_le(src)?);
    out.put_u32("level_in", get_u32_le(src)?);
    Ok(())
}

pub fn connect_reply(src: &mut &[u8], out: &mut Node, cx: &mut DecodeCtx<'_>) -> DecodeResult {
    open_handle_reply("connect", src, out, cx)
}

// ---- close / delete ----

pub fn close_req(src: &mut &[u8], out: &mut Node, cx: &mut DecodeCtx<'_>) -> DecodeResult {
    let h = read_handle_field("handle", src, out, cx)?;
    cx.store.stash(cx.call_id, Fact::Handle(h));
    Ok(())
}

pub fn close_reply(src: &mut &[u8], out: &mut Node, cx: &mut DecodeCtx<'_>) -> DecodeResult {
    let h = get_handle(src)?;
    out.push(Node::leaf("handle", Value::Str(h.to_string())));
    let status = read_status(src, out)?;
    if status == STATUS_SUCCESS {
        let fact = cx.store.take_label_source(cx.call_id).cloned();
        if let Some(Fact::Handle(orig)) = fact {
            cx.store.forget_handle(&orig);
        }
    }
    Ok(())
}

// ---- security ----

pub fn query_security_req(src: &mut &[u8], out: &mut Node, cx: &mut DecodeCtx<'_>) -> DecodeResult {
    read_handle_field("handle", src, out, cx)?;
    out.put_u32("security_info", get_u32_le(src)?);
    Ok(())
}

pub fn query_security_reply(
    src: &mut &[u8],
    out: &mut Node,
    cx: &mut DecodeCtx<'_>,
) -> DecodeResult {
    let sd = get_pointer(src, |p| get_array(p, cx.limits.max_string_bytes, get_u8))?;
    if let Some(sd) = sd {
        out.put_bytes("security_descriptor", sd);
    }
    read_status(src, out)?;
    Ok(())
}

// ---- domain ----

pub fn lookup_domain_req(src: &mut &[u8], out: &mut Node, cx: &mut DecodeCtx<'_>) -> DecodeResult {
    read_handle_field("handle", src, out, cx)?;
    let name = ustr(src, cx)?;
    out.put_str("domain_name", name.clone());
    cx.store.stash(cx.call_id, Fact::Name(name));
    Ok(())
}

pub fn lookup_domain_reply(
    src: &mut &[u8],
    out: &mut Node,
    cx: &mut DecodeCtx<'_>,
) -> DecodeResult {
    let sid = get_pointer(src, |p| get_sid(p, cx.limits.max_sid_subauths))?;
    if let Some(sid) = sid {
        out.put_str("sid", sid.to_string());
    }
    read_status(src, out)?;
    Ok(())
}

pub fn open_domain_req(src: &mut &[u8], out: &mut Node, cx: &mut DecodeCtx<'_>) -> DecodeResult {
    read_handle_field("handle", src, out, cx)?;
    out.put_u32("access_mask", get_u32_le(src)?);
    let sid = get_sid(src, cx.limits.max_sid_subauths)?;
    out.put_str("sid", sid.to_string());
    cx.store.stash(cx.call_id, Fact::Name(sid.to_string()));
    Ok(())
}

pub fn open_domain_reply(src: &mut &[u8], out: &mut Node, cx: &mut DecodeCtx<'_>) -> DecodeResult {
    open_handle_reply("domain", src, out, cx)
}

pub fn set_domain_info_req(
    src: &mut &[u8],
    out: &mut Node,
    cx: &mut DecodeCtx<'_>,
) -> DecodeResult {
    read_handle_field("handle", src, out, cx)?;
    let rec = decode_variant(VariantFamily::Domain, src, &vcx(cx))?;
    out.push(rec.node("info"));
    Ok(())
}

pub fn query_domain_info_reply(
    src: &mut &[u8],
    out: &mut Node,
    cx: &mut DecodeCtx<'_>,
) -> DecodeResult {
    let rec = get_pointer(src, |p| decode_variant(VariantFamily::Domain, p, &vcx(cx)))?;
    if let Some(rec) = rec {
        out.push(rec.node("info"));
    }
    read_status(src, out)?;
    Ok(())
}

// ---- enumeration ----

pub fn enum_req(src: &mut &[u8], out: &mut Node, cx: &mut DecodeCtx<'_>) -> DecodeResult {
    read_handle_field("handle", src, out, cx)?;
    out.put_u32("resume_handle", get_u32_le(src)?);
    out.put_u32("max_size", get_u32_le(src)?);
    Ok(())
}

pub fn enum_users_req(src: &mut &[u8], out: &mut Node, cx: &mut DecodeCtx<'_>) -> DecodeResult {
    read_handle_field("handle", src, out, cx)?;
    out.put_u32("resume_handle", get_u32_le(src)?);
    out.put_u32("account_flags", get_u32_le(src)?);
    out.put_u32("max_size", get_u32_le(src)?);
    Ok(())
}

pub fn enum_reply(src: &mut &[u8], out: &mut Node, cx: &mut DecodeCtx<'_>) -> DecodeResult {
    out.put_u32("resume_handle", get_u32_le(src)?);
    let entries = get_pointer(src, |p| {
        get_array(p, cx.limits.max_array_items, |q| {
            let rid = get_u32_le(q)?;
            let name = ustr(q, cx)?;
            Ok((rid, name))
        })
    })?;
    if let Some(entries) = entries {
        out.put_u32("num_entries", entries.len() as u32);
        for (rid, name) in entries {
            let mut e = Node::branch("entry");
            e.put_u32("rid", rid);
            e.put_str("name", name);
            out.push(e);
        }
    }
    read_status(src, out)?;
    Ok(())
}

// ---- create ----

/// Shared request shape: handle, new object name, access mask.
pub fn create_named_req(src: &mut &[u8], out: &mut Node, cx: &mut DecodeCtx<'_>) -> DecodeResult {
    read_handle_field("handle", src, out, cx)?;
    let name = ustr(src, cx)?;
    out.put_str("name", name.clone());
    cx.store.stash(cx.call_id, Fact::Name(name));
    out.put_u32("access_mask", get_u32_le(src)?);
    Ok(())
}

fn create_reply(
    kind: &'static str,
    with_access_granted: bool,
    src: &mut &[u8],
    out: &mut Node,
    cx: &mut DecodeCtx<'_>,
) -> DecodeResult {
    let handle = get_handle(src)?;
    let hidx = out.children.len();
    out.push(Node::leaf("handle", Value::Str(handle.to_string())));
    if with_access_granted {
        out.put_u32("access_granted", get_u32_le(src)?);
    }
    let rid = get_u32_le(src)?;
    out.put_u32("rid", rid);
    let status = read_status(src, out)?;
    if status == STATUS_SUCCESS {
        // Prefer the request-side name; a mid-capture reply still gets a
        // usable label from its own rid field.
        let label = match cx.store.take_label_source(cx.call_id) {
            Some(Fact::Name(name)) => format!("{}({})", kind, name),
            _ => format!("{}(rid=0x{:x})", kind, rid),
        };
        out.children[hidx].push(Node::leaf("opened_as", Value::Str(label.clone())));
        cx.store.register_handle(handle, label);
        METRICS.inc_handles_registered();
    }
    Ok(())
}

pub fn create_user_reply(src: &mut &[u8], out: &mut Node, cx: &mut DecodeCtx<'_>) -> DecodeResult {
    create_reply("user", true, src, out, cx)
}

pub fn create_group_reply(src: &mut &[u8], out: &mut Node, cx: &mut DecodeCtx<'_>) -> DecodeResult {
    create_reply("group", false, src, out, cx)
}

pub fn create_alias_reply(src: &mut &[u8], out: &mut Node, cx: &mut DecodeCtx<'_>) -> DecodeResult {
    create_reply("alias", false, src, out, cx)
}

// ---- name/rid translation ----

pub fn lookup_names_req(src: &mut &[u8], out: &mut Node, cx: &mut DecodeCtx<'_>) -> DecodeResult {
    read_handle_field("handle", src, out, cx)?;
    let names = get_array(src, cx.limits.max_rid_count, |p| ustr(p, cx))?;
    out.put_u32("num_names", names.len() as u32);
    for name in names {
        out.put_str("name", name);
    }
    Ok(())
}

pub fn lookup_names_reply(src: &mut &[u8], out: &mut Node, cx: &mut DecodeCtx<'_>) -> DecodeResult {
    let rids = get_array(src, cx.limits.max_rid_count, get_u32_le)?;
    let types = get_array(src, cx.limits.max_rid_count, get_u32_le)?;
    for (rid, ty) in rids.iter().zip(types.iter()) {
        let mut e = Node::branch("entry");
        e.put_u32("rid", *rid);
        e.put_u32("type", *ty);
        out.push(e);
    }
    read_status(src, out)?;
    Ok(())
}

pub fn lookup_rids_req(src: &mut &[u8], out: &mut Node, cx: &mut DecodeCtx<'_>) -> DecodeResult {
    read_handle_field("handle", src, out, cx)?;
    let rids = get_array(src, cx.limits.max_rid_count, get_u32_le)?;
    out.put_u32("num_rids", rids.len() as u32);
    for rid in rids {
        out.put_u32("rid", rid);
    }
    Ok(())
}

pub fn lookup_rids_reply(src: &mut &[u8], out: &mut Node, cx: &mut DecodeCtx<'_>) -> DecodeResult {
    let names = get_array(src, cx.limits.max_rid_count, |p| ustr(p, cx))?;
    let types = get_array(src, cx.limits.max_rid_count, get_u32_le)?;
    for (name, ty) in names.iter().zip(types.iter()) {
        let mut e = Node::branch("entry");
        e.put_str("name", name.clone());
        e.put_u32("type", *ty);
        out.push(e);
    }
    read_status(src, out)?;
    Ok(())
}

// ---- open-by-rid family ----

/// Shared request shape for open_user / open_group / open_alias.
pub fn open_by_rid_req(src: &mut &[u8], out: &mut Node, cx: &mut DecodeCtx<'_>) -> DecodeResult {
    read_handle_field("handle", src, out, cx)?;
    out.put_u32("access_mask", get_u32_le(src)?);
    let rid = get_u32_le(src)?;
    out.put_u32("rid", rid);
    cx.store.stash(cx.call_id, Fact::Rid(rid));
    Ok(())
}

pub fn open_user_reply(src: &mut &[u8], out: &mut Node, cx: &mut DecodeCtx<'_>) -> DecodeResult {
    open_handle_reply("user", src, out, cx)
}

pub fn open_group_reply(src: &mut &[u8], out: &mut Node, cx: &mut DecodeCtx<'_>) -> DecodeResult {
    open_handle_reply("group", src, out, cx)
}

pub fn open_alias_reply(src: &mut &[u8], out: &mut Node, cx: &mut DecodeCtx<'_>) -> DecodeResult {
    open_handle_reply("alias", src, out, cx)
}

// ---- info queries and updates ----

/// Shared request shape: handle plus a 16-bit level selector.
pub fn query_info_req(src: &mut &[u8], out: &mut Node, cx: &mut DecodeCtx<'_>) -> DecodeResult {
    read_handle_field("handle", src, out, cx)?;
    out.put_u32("level", get_u16_le(src)? as u32);
    Ok(())
}

pub fn query_user_info_reply(
    src: &mut &[u8],
    out: &mut Node,
    cx: &mut DecodeCtx<'_>,
) -> DecodeResult {
    let rec = get_pointer(src, |p| decode_variant(VariantFamily::User, p, &vcx(cx)))?;
    if let Some(rec) = rec {
        out.push(rec.node("info"));
    }
    read_status(src, out)?;
    Ok(())
}

pub fn query_group_info_reply(
    src: &mut &[u8],
    out: &mut Node,
    cx: &mut DecodeCtx<'_>,
) -> DecodeResult {
    let rec = get_pointer(src, |p| decode_variant(VariantFamily::Group, p, &vcx(cx)))?;
    if let Some(rec) = rec {
        out.push(rec.node("info"));
    }
    read_status(src, out)?;
    Ok(())
}

pub fn query_alias_info_reply(
    src: &mut &[u8],
    out: &mut Node,
    cx: &mut DecodeCtx<'_>,
) -> DecodeResult {
    let rec = get_pointer(src, |p| decode_variant(VariantFamily::Alias, p, &vcx(cx)))?;
    if let Some(rec) = rec {
        out.push(rec.node("info"));
    }
    read_status(src, out)?;
    Ok(())
}

pub fn set_user_info_req(src: &mut &[u8], out: &mut Node, cx: &mut DecodeCtx<'_>) -> DecodeResult {
    read_handle_field("handle", src, out, cx)?;
    let rec = decode_variant(VariantFamily::User, src, &vcx(cx))?;
    out.push(rec.node("info"));
    Ok(())
}

pub fn set_group_info_req(src: &mut &[u8], out: &mut Node, cx: &mut DecodeCtx<'_>) -> DecodeResult {
    read_handle_field("handle", src, out, cx)?;
    let rec = decode_variant(VariantFamily::Group, src, &vcx(cx))?;
    out.push(rec.node("info"));
    Ok(())
}

pub fn set_alias_info_req(src: &mut &[u8], out: &mut Node, cx: &mut DecodeCtx<'_>) -> DecodeResult {
    read_handle_field("handle", src, out, cx)?;
    let rec = decode_variant(VariantFamily::Alias, src, &vcx(cx))?;
    out.push(rec.node("info"));
    Ok(())
}

pub fn status_only_reply(src: &mut &[u8], out: &mut Node, _cx: &mut DecodeCtx<'_>) -> DecodeResult {
    read_status(src, out)?;
    Ok(())
}

// ---- display enumeration ----

pub fn query_display_info_req(
    src: &mut &[u8],
    out: &mut Node,
    cx: &mut DecodeCtx<'_>,
) -> DecodeResult {
    read_handle_field("handle", src, out, cx)?;
    out.put_u32("level", get_u16_le(src)? as u32);
    out.put_u32("start_index", get_u32_le(src)?);
    out.put_u32("max_entries", get_u32_le(src)?);
    out.put_u32("buffer_size", get_u32_le(src)?);
    Ok(())
}

pub fn query_display_info_reply(
    src: &mut &[u8],
    out: &mut Node,
    cx: &mut DecodeCtx<'_>,
) -> DecodeResult {
    out.put_u32("total_size", get_u32_le(src)?);
    out.put_u32("returned_size", get_u32_le(src)?);
    let rec = decode_variant(VariantFamily::Display, src, &vcx(cx))?;
    out.push(rec.node("info"));
    read_status(src, out)?;
    Ok(())
}

// ---- password changes ----

pub fn oem_change_password_req(
    src: &mut &[u8],
    out: &mut Node,
    cx: &mut DecodeCtx<'_>,
) -> DecodeResult {
    let server = get_pointer(src, |p| oemstr(p, cx))?;
    if let Some(server) = server {
        out.put_str("server", server);
    }
    out.put_str("account", oemstr(src, cx)?);
    let block = CryptBlock::decode(src, cx.secret)?;
    out.push(block.node("crypt_password"));
    out.put_bytes("verifier", get_fixed_16(src)?.to_vec());
    Ok(())
}

pub fn unicode_change_password_req(
    src: &mut &[u8],
    out: &mut Node,
    cx: &mut DecodeCtx<'_>,
) -> DecodeResult {
    let server = get_pointer(src, |p| ustr(p, cx))?;
    if let Some(server) = server {
        out.put_str("server", server);
    }
    out.put_str("account", ustr(src, cx)?);
    let block = CryptBlock::decode(src, cx.secret)?;
    out.push(block.node("crypt_password"));
    out.put_bytes("verifier", get_fixed_16(src)?.to_vec());
    Ok(())
}

pub fn get_domain_password_info_req(
    src: &mut &[u8],
    out: &mut Node,
    cx: &mut DecodeCtx<'_>,
) -> DecodeResult {
    let server = get_pointer(src, |p| ustr(p, cx))?;
    if let Some(server) = server {
        out.put_str("server", server);
    }
    Ok(())
}

pub fn get_domain_password_info_reply(
    src: &mut &[u8],
    out: &mut Node,
    _cx: &mut DecodeCtx<'_>,
) -> DecodeResult {
    out.put_u32("min_password_length", get_u16_le(src)? as u32);
    out.put_u32("password_properties", get_u32_le(src)?);
    read_status(src, out)?;
    Ok(())
}

// ---- rid translation ----

pub fn rid_to_sid_req(src: &mut &[u8], out: &mut Node, cx: &mut DecodeCtx<'_>) -> DecodeResult {
    read_handle_field("handle", src, out, cx)?;
    let rid = get_u32_le(src)?;
    out.put_u32("rid", rid);
    cx.store.stash(cx.call_id, Fact::Rid(rid));
    Ok(())
}

pub fn rid_to_sid_reply(src: &mut &[u8], out: &mut Node, cx: &mut DecodeCtx<'_>) -> DecodeResult {
    let sid = get_pointer(src, |p| get_sid(p, cx.limits.max_sid_subauths))?;
    if let Some(sid) = sid {
        out.put_str("sid", sid.to_string());
    }
    read_status(src, out)?;
    Ok(())
}
