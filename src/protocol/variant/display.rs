//! Display-enumeration levels 1-5.
//!
//! Each level is an array of fixed-shape rows; levels 4 and 5 carry
//! single-byte text instead of UTF-16.

use crate::common::error::CodecError;
use crate::protocol::codec::{get_array, get_counted_string, get_u32_le};
use crate::protocol::tree::Node;

use super::VariantCtx;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayUser {
    pub index: u32,
    pub rid: u32,
    pub account_flags: u32,
    pub account_name: String,
    pub description: String,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayMachine {
    pub index: u32,
    pub rid: u32,
    pub account_flags: u32,
    pub account_name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayGroup {
    pub index: u32,
    pub rid: u32,
    pub attributes: u32,
    pub group_name: String,
    pub description: String,
}

/// Single-byte-text row used by the OEM levels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayOemEntry {
    pub index: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayInfo {
    /// Level 1
    Users(Vec<DisplayUser>),
    /// Level 2
    Machines(Vec<DisplayMachine>),
    /// Level 3
    Groups(Vec<DisplayGroup>),
    /// Level 4
    OemUsers(Vec<DisplayOemEntry>),
    /// Level 5
    OemGroups(Vec<DisplayOemEntry>),
    Unknown,
}

pub fn decode(level: u16, src: &mut &[u8], cx: &VariantCtx<'_>) -> Result<DisplayInfo, CodecError> {
    let max = cx.limits.max_array_items;
    let smax = cx.limits.max_string_bytes;
    let info = match level {
        1 => DisplayInfo::Users(get_array(src, max, |p| {
            Ok(DisplayUser {
                index: get_u32_le(p)?,
                rid: get_u32_le(p)?,
                account_flags: get_u32_le(p)?,
                account_name: get_counted_string(p, 2, smax)?,
                description: get_counted_string(p, 2, smax)?,
                full_name: get_counted_string(p, 2, smax)?,
            })
        })?),
        2 => DisplayInfo::Machines(get_array(src, max, |p| {
            Ok(DisplayMachine {
                index: get_u32_le(p)?,
                rid: get_u32_le(p)?,
                account_flags: get_u32_le(p)?,
                account_name: get_counted_string(p, 2, smax)?,
                description: get_counted_string(p, 2, smax)?,
            })
        })?),
        3 => DisplayInfo::Groups(get_array(src, max, |p| {
            Ok(DisplayGroup {
                index: get_u32_le(p)?,
                rid: get_u32_le(p)?,
                attributes: get_u32_le(p)?,
                group_name: get_counted_string(p, 2, smax)?,
                description: get_counted_string(p, 2, smax)?,
            })
        })?),
        4 => DisplayInfo::OemUsers(get_oem_entries(src, cx)?),
        5 => DisplayInfo::OemGroups(get_oem_entries(src, cx)?),
        _ => DisplayInfo::Unknown,
    };
    Ok(info)
}

fn get_oem_entries(
    src: &mut &[u8],
    cx: &VariantCtx<'_>,
) -> Result<Vec<DisplayOemEntry>, CodecError> {
    get_array(src, cx.limits.max_array_items, |p| {
        Ok(DisplayOemEntry {
            index: get_u32_le(p)?,
            name: get_counted_string(p, 1, cx.limits.max_string_bytes)?,
        })
    })
}

impl DisplayInfo {
    pub fn render(&self, n: &mut Node) {
        match self {
            DisplayInfo::Users(rows) => {
                n.put_u32("num_entries", rows.len() as u32);
                for r in rows {
                    let mut e = Node::branch("entry");
                    e.put_u32("index", r.index);
                    e.put_u32("rid", r.rid);
                    e.put_u32("account_flags", r.account_flags);
                    e.put_str("account_name", r.account_name.clone());
                    e.put_str("description", r.description.clone());
                    e.put_str("full_name", r.full_name.clone());
                    n.push(e);
                }
            }
            DisplayInfo::Machines(rows) => {
                n.put_u32("num_entries", rows.len() as u32);
                for r in rows {
                    let mut e = Node::branch("entry");
                    e.put_u32("index", r.index);
                    e.put_u32("rid", r.rid);
                    e.put_u32("account_flags", r.account_flags);
                    e.put_str("account_name", r.account_name.clone());
                    e.put_str("description", r.description.clone());
                    n.push(e);
                }
            }
            DisplayInfo::Groups(rows) => {
                n.put_u32("num_entries", rows.len() as u32);
                for r in rows {
                    let mut e = Node::branch("entry");
                    e.put_u32("index", r.index);
                    e.put_u32("rid", r.rid);
                    e.put_u32("attributes", r.attributes);
                    e.put_str("group_name", r.group_name.clone());
                    e.put_str("description", r.description.clone());
                    n.push(e);
                }
            }
            DisplayInfo::OemUsers(rows) | DisplayInfo::OemGroups(rows) => {
                n.put_u32("num_entries", rows.len() as u32);
                for r in rows {
                    let mut e = Node::branch("entry");
                    e.put_u32("index", r.index);
                    e.put_str("name", r.name.clone());
                    n.push(e);
                }
            }
            DisplayInfo::Unknown => {}
        }
    }
}
