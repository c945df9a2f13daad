//! Level-tagged discriminated union decoding.
//!
//! Several operations carry "information" payloads whose shape is chosen
//! by a 16-bit level selector read first. Each family is a closed enum
//! with one arm per supported level plus an `Unknown` arm; a level absent
//! from the table is not an error and consumes nothing past the selector.

pub mod display;
pub mod domain;
pub mod group;
pub mod user;

use log::debug;

use crate::common::error::CodecError;
use crate::config::Limits;
use crate::protocol::codec::get_u16_le;
use crate::protocol::tree::Node;

pub use display::DisplayInfo;
pub use domain::DomainInfo;
pub use group::{AliasInfo, GroupInfo};
pub use user::UserInfo;

/// Which discriminated-union family a field belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantFamily {
    User,
    Domain,
    Group,
    Alias,
    Display,
}

/// Decoded union body, one arm per family.
#[derive(Clone)]
pub enum Variant {
    User(UserInfo),
    Domain(DomainInfo),
    Group(GroupInfo),
    Alias(AliasInfo),
    Display(DisplayInfo),
}

/// A decoded level-tagged record.
#[derive(Clone)]
pub struct VariantRecord {
    pub level: u16,
    pub fields: Variant,
}

/// Everything a variant decoder needs besides the cursor.
pub struct VariantCtx<'a> {
    pub limits: &'a Limits,
    /// Expected account password, for credential-set levels only.
    pub secret: Option<&'a str>,
}

/// Decode one level-tagged record of the given family.
pub fn decode_variant(
    family: VariantFamily,
    src: &mut &[u8],
    cx: &VariantCtx<'_>,
) -> Result<VariantRecord, CodecError> {
    let level = get_u16_le(src)?;
    debug!("decoding {:?} info level {}", family, level);
    let fields = match family {
        VariantFamily::User => Variant::User(user::decode(level, src, cx)?),
        VariantFamily::Domain => Variant::Domain(domain::decode(level, src, cx)?),
        VariantFamily::Group => Variant::Group(group::decode_group(level, src, cx)?),
        VariantFamily::Alias => Variant::Alias(group::decode_alias(level, src, cx)?),
        VariantFamily::Display => Variant::Display(display::decode(level, src, cx)?),
    };
    Ok(VariantRecord { level, fields })
}

impl VariantRecord {
    /// True when the level was absent from the family's table.
    pub fn is_unknown(&self) -> bool {
        match &self.fields {
            Variant::User(u) => matches!(u, UserInfo::Unknown),
            Variant::Domain(d) => matches!(d, DomainInfo::Unknown),
            Variant::Group(g) => matches!(g, GroupInfo::Unknown),
            Variant::Alias(a) => matches!(a, AliasInfo::Unknown),
            Variant::Display(d) => matches!(d, DisplayInfo::Unknown),
        }
    }

    /// Render the record into a field tree node.
    pub fn node(&self, name: &'static str) -> Node {
        let mut n = Node::branch(name);
        n.put_u32("level", self.level as u32);
        if self.is_unknown() {
            n.put_str("note", "level not in table, no fields decoded");
            return n;
        }
        match &self.fields {
            Variant::User(u) => u.render(&mut n),
            Variant::Domain(d) => d.render(&mut n),
            Variant::Group(g) => g.render(&mut n),
            Variant::Alias(a) => a.render(&mut n),
            Variant::Display(d) => d.render(&mut n),
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Limits;

    /// Any unrecognized level must consume exactly the 2 selector bytes,
    /// for every family.
    #[test]
    fn test_unknown_level_consumes_only_selector() {
        let limits = Limits::default();
        let cx = VariantCtx {
            limits: &limits,
            secret: None,
        };
        let families = [
            VariantFamily::User,
            VariantFamily::Domain,
            VariantFamily::Group,
            VariantFamily::Alias,
            VariantFamily::Display,
        ];
        // 0 and absent mid-table levels, plus far-out ones
        for level in [0u16, 15, 19, 22, 99, 0x7fff, 0xffff] {
            for family in families {
                let mut buf = level.to_le_bytes().to_vec();
                buf.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
                let mut p = &buf[..];
                let rec = decode_variant(family, &mut p, &cx).unwrap();
                if rec.is_unknown() {
                    assert_eq!(
                        p.len(),
                        4,
                        "family {:?} level {} over/under-read",
                        family,
                        level
                    );
                    assert_eq!(rec.level, level);
                }
            }
        }
    }

    #[test]
    fn test_truncated_selector() {
        let limits = Limits::default();
        let cx = VariantCtx {
            limits: &limits,
            secret: None,
        };
        let mut p: &[u8] = &[0x01];
        assert!(matches!(
            decode_variant(VariantFamily::User, &mut p, &cx),
            Err(CodecError::Short)
        ));
    }
}
