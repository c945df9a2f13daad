//! Group information levels 1-5 and alias information levels 1-3.

use crate::common::error::CodecError;
use crate::protocol::codec::{get_counted_string, get_u32_le};
use crate::protocol::tree::Node;

use super::VariantCtx;

fn ustr(src: &mut &[u8], cx: &VariantCtx<'_>) -> Result<String, CodecError> {
    get_counted_string(src, 2, cx.limits.max_string_bytes)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupInfo {
    /// Level 1
    All {
        group_name: String,
        attributes: u32,
        num_members: u32,
        description: String,
    },
    /// Level 2
    Name { group_name: String },
    /// Level 3
    Attributes { attributes: u32 },
    /// Level 4
    Description { description: String },
    /// Level 5: like All but without the member count
    All2 {
        group_name: String,
        attributes: u32,
        description: String,
    },
    Unknown,
}

pub fn decode_group(
    level: u16,
    src: &mut &[u8],
    cx: &VariantCtx<'_>,
) -> Result<GroupInfo, CodecError> {
    let info = match level {
        1 => GroupInfo::All {
            group_name: ustr(src, cx)?,
            attributes: get_u32_le(src)?,
            num_members: get_u32_le(src)?,
            description: ustr(src, cx)?,
        },
        2 => GroupInfo::Name {
            group_name: ustr(src, cx)?,
        },
        3 => GroupInfo::Attributes {
            attributes: get_u32_le(src)?,
        },
        4 => GroupInfo::Description {
            description: ustr(src, cx)?,
        },
        5 => GroupInfo::All2 {
            group_name: ustr(src, cx)?,
            attributes: get_u32_le(src)?,
            description: ustr(src, cx)?,
        },
        _ => GroupInfo::Unknown,
    };
    Ok(info)
}

impl GroupInfo {
    pub fn render(&self, n: &mut Node) {
        match self {
            GroupInfo::All {
                group_name,
                attributes,
                num_members,
                description,
            } => {
                n.put_str("group_name", group_name.clone());
                n.put_u32("attributes", *attributes);
                n.put_u32("num_members", *num_members);
                n.put_str("description", description.clone());
            }
            GroupInfo::Name { group_name } => n.put_str("group_name", group_name.clone()),
            GroupInfo::Attributes { attributes } => n.put_u32("attributes", *attributes),
            GroupInfo::Description { description } => n.put_str("description", description.clone()),
            GroupInfo::All2 {
                group_name,
                attributes,
                description,
            } => {
                n.put_str("group_name", group_name.clone());
                n.put_u32("attributes", *attributes);
                n.put_str("description", description.clone());
            }
            GroupInfo::Unknown => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasInfo {
    /// Level 1
    All {
        alias_name: String,
        num_members: u32,
        description: String,
    },
    /// Level 2
    Name { alias_name: String },
    /// Level 3
    Description { description: String },
    Unknown,
}

pub fn decode_alias(
    level: u16,
    src: &mut &[u8],
    cx: &VariantCtx<'_>,
) -> Result<AliasInfo, CodecError> {
    let info = match level {
        1 => AliasInfo::All {
            alias_name: ustr(src, cx)?,
            num_members: get_u32_le(src)?,
            description: ustr(src, cx)?,
        },
        2 => AliasInfo::Name {
            alias_name: ustr(src, cx)?,
        },
        3 => AliasInfo::Description {
            description: ustr(src, cx)?,
        },
        _ => AliasInfo::Unknown,
    };
    Ok(info)
}

impl AliasInfo {
    pub fn render(&self, n: &mut Node) {
        match self {
            AliasInfo::All {
                alias_name,
                num_members,
                description,
            } => {
                n.put_str("alias_name", alias_name.clone());
                n.put_u32("num_members", *num_members);
                n.put_str("description", description.clone());
            }
            AliasInfo::Name { alias_name } => n.put_str("alias_name", alias_name.clone()),
            AliasInfo::Description { description } => n.put_str("description", description.clone()),
            AliasInfo::Unknown => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Limits;
    use bytes::{BufMut, BytesMut};

    fn put_ustr(buf: &mut BytesMut, s: &str) {
        let units: Vec<u16> = s.encode_utf16().collect();
        buf.put_u32_le((units.len() * 2) as u32);
        for u in units {
            buf.put_u16_le(u);
        }
    }

    #[test]
    fn test_group_all() {
        let mut buf = BytesMut::new();
        put_ustr(&mut buf, "Domain Admins");
        buf.put_u32_le(7);
        buf.put_u32_le(3);
        put_ustr(&mut buf, "admins");
        let limits = Limits::default();
        let cx = VariantCtx {
            limits: &limits,
            secret: None,
        };
        let mut p = &buf[..];
        assert_eq!(
            decode_group(1, &mut p, &cx).unwrap(),
            GroupInfo::All {
                group_name: "Domain Admins".into(),
                attributes: 7,
                num_members: 3,
                description: "admins".into(),
            }
        );
    }

    #[test]
    fn test_alias_name() {
        let mut buf = BytesMut::new();
        put_ustr(&mut buf, "Backup Operators");
        let limits = Limits::default();
        let cx = VariantCtx {
            limits: &limits,
            secret: None,
        };
        let mut p = &buf[..];
        assert_eq!(
            decode_alias(2, &mut p, &cx).unwrap(),
            AliasInfo::Name {
                alias_name: "Backup Operators".into()
            }
        );
    }
}
