//! Labeled field tree produced by the decoders.
//!
//! The embedding UI/export layer walks this tree; nothing here prescribes
//! how it is displayed beyond a plain-text renderer used by the CLI.

use std::fmt;

use crate::common::time::render_abs_time;

/// A decoded field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Branch-only node, no scalar payload
    Empty,
    U32(u32),
    U64(u64),
    Str(String),
    Bytes(Vec<u8>),
    /// Absolute wire timestamp (100ns ticks since 1601)
    Time(u64),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::U32(v) => write!(f, "0x{:x} ({})", v, v),
            Value::U64(v) => write!(f, "0x{:x} ({})", v, v),
            Value::Str(s) => write!(f, "{}", s),
            Value::Bytes(b) => {
                const PREVIEW: usize = 16;
                for byte in b.iter().take(PREVIEW) {
                    write!(f, "{:02x}", byte)?;
                }
                if b.len() > PREVIEW {
                    write!(f, "... ({} bytes)", b.len())?;
                }
                Ok(())
            }
            Value::Time(t) => write!(f, "{}", render_abs_time(*t)),
        }
    }
}

/// One node of the decoded field tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: &'static str,
    pub value: Value,
    pub children: Vec<Node>,
}

impl Node {
    pub fn branch(name: &'static str) -> Self {
        Self {
            name,
            value: Value::Empty,
            children: Vec::new(),
        }
    }

    pub fn leaf(name: &'static str, value: Value) -> Self {
        Self {
            name,
            value,
            children: Vec::new(),
        }
    }

    pub fn push(&mut self, child: Node) {
        self.children.push(child);
    }

    pub fn put_u32(&mut self, name: &'static str, v: u32) {
        self.push(Node::leaf(name, Value::U32(v)));
    }

    pub fn put_u64(&mut self, name: &'static str, v: u64) {
        self.push(Node::leaf(name, Value::U64(v)));
    }

    pub fn put_str(&mut self, name: &'static str, s: impl Into<String>) {
        self.push(Node::leaf(name, Value::Str(s.into())));
    }

    pub fn put_bytes(&mut self, name: &'static str, b: impl Into<Vec<u8>>) {
        self.push(Node::leaf(name, Value::Bytes(b.into())));
    }

    pub fn put_time(&mut self, name: &'static str, t: u64) {
        self.push(Node::leaf(name, Value::Time(t)));
    }

    /// Find a direct child by name.
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Find a node anywhere in the subtree by name, depth-first.
    pub fn find(&self, name: &str) -> Option<&Node> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    /// Render the subtree as indented plain text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        for _ in 0..depth {
            out.push_str("  ");
        }
        out.push_str(self.name);
        if self.value != Value::Empty {
            out.push_str(": ");
            out.push_str(&self.value.to_string());
        }
        out.push('\n');
        for c in &self.children {
            c.render_into(out, depth + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_descends() {
        let mut root = Node::branch("root");
        let mut mid = Node::branch("mid");
        mid.put_u32("rid", 0x1f4);
        root.push(mid);

        assert_eq!(root.find("rid").unwrap().value, Value::U32(0x1f4));
        assert!(root.find("missing").is_none());
    }

    #[test]
    fn test_render_indents() {
        let mut root = Node::branch("msg");
        root.put_str("name", "alice");
        let r = root.render();
        assert!(r.starts_with("msg\n"));
        assert!(r.contains("  name: alice\n"));
    }

    #[test]
    fn test_bytes_preview_truncates() {
        let v = Value::Bytes(vec![0xab; 20]);
        let s = v.to_string();
        assert!(s.ends_with("... (20 bytes)"));
    }
}
