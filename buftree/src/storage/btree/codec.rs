//! Node record encoding.
//!
//! Nodes are stored as protobuf messages:
//!
//! ```text
//! message NodeRecord {
//!   oneof kind {
//!     LeafRecord leaf = 1;
//!     BufferRecord buffer = 2;
//!     BranchRecord internal = 3;
//!   }
//! }
//! ```
//!
//! Leaves carry their entries, buffers their separators, child ids and
//! pending queue in FIFO order. `BranchRecord` is only written by trees built
//! without buffering.
//!
//! # Invariants
//!
//! - A record without a recognised `kind` cannot be turned into a node; the
//!   caller decides whether that is fatal
//! - `decode(encode(node)) == node`

use std::collections::VecDeque;

use prost::Message;

use crate::storage::btree::node::{Branch, Entry, Node, NodeKind};

#[derive(Clone, PartialEq, Message)]
pub struct KeyValue {
    #[prost(uint64, tag = "1")]
    pub key: u64,
    #[prost(uint64, tag = "2")]
    pub value: u64,
}

#[derive(Clone, PartialEq, Message)]
pub struct LeafRecord {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(uint64, optional, tag = "2")]
    pub parent_id: Option<u64>,
    #[prost(uint64, tag = "3")]
    pub level: u64,
    #[prost(message, repeated, tag = "4")]
    pub values: Vec<KeyValue>,
}

#[derive(Clone, PartialEq, Message)]
pub struct BufferRecord {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(uint64, optional, tag = "2")]
    pub parent_id: Option<u64>,
    #[prost(uint64, tag = "3")]
    pub level: u64,
    #[prost(uint64, repeated, tag = "4")]
    pub keys: Vec<u64>,
    #[prost(uint64, repeated, tag = "5")]
    pub children: Vec<u64>,
    #[prost(message, repeated, tag = "6")]
    pub pending: Vec<KeyValue>,
}

#[derive(Clone, PartialEq, Message)]
pub struct BranchRecord {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(uint64, optional, tag = "2")]
    pub parent_id: Option<u64>,
    #[prost(uint64, tag = "3")]
    pub level: u64,
    #[prost(uint64, repeated, tag = "4")]
    pub keys: Vec<u64>,
    #[prost(uint64, repeated, tag = "5")]
    pub children: Vec<u64>,
}

#[derive(Clone, PartialEq, Message)]
pub struct NodeRecord {
    #[prost(oneof = "node_record::Kind", tags = "1, 2, 3")]
    pub kind: Option<node_record::Kind>,
}

pub mod node_record {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Kind {
        #[prost(message, tag = "1")]
        Leaf(super::LeafRecord),
        #[prost(message, tag = "2")]
        Buffer(super::BufferRecord),
        #[prost(message, tag = "3")]
        Internal(super::BranchRecord),
    }
}

/// Errors from decoding a node record.
#[derive(Debug)]
pub enum CodecError {
    /// The bytes are not a valid record.
    Malformed(prost::DecodeError),
    /// There are no bytes at all.
    Empty,
    /// The record has no node kind this build understands.
    UnknownKind,
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(e) => write!(f, "malformed node record: {e}"),
            Self::Empty => write!(f, "node record is empty"),
            Self::UnknownKind => write!(f, "node record has an unknown kind"),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Malformed(e) => Some(e),
            Self::Empty | Self::UnknownKind => None,
        }
    }
}

impl From<prost::DecodeError> for CodecError {
    fn from(e: prost::DecodeError) -> Self {
        Self::Malformed(e)
    }
}

fn to_key_values<'a>(entries: impl IntoIterator<Item = &'a Entry>) -> Vec<KeyValue> {
    entries
        .into_iter()
        .map(|&(key, value)| KeyValue { key, value })
        .collect()
}

fn from_key_values<B: FromIterator<Entry>>(values: Vec<KeyValue>) -> B {
    values.into_iter().map(|kv| (kv.key, kv.value)).collect()
}

/// Serialize a node.
#[must_use]
pub fn encode(node: &Node) -> Vec<u8> {
    let kind = match &node.kind {
        NodeKind::Leaf(entries) => node_record::Kind::Leaf(LeafRecord {
            id: node.id,
            parent_id: node.parent,
            level: node.level,
            values: to_key_values(entries),
        }),
        NodeKind::Buffer { branch, pending } => node_record::Kind::Buffer(BufferRecord {
            id: node.id,
            parent_id: node.parent,
            level: node.level,
            keys: branch.keys.to_vec(),
            children: branch.children.to_vec(),
            pending: to_key_values(pending),
        }),
        NodeKind::Internal(branch) => node_record::Kind::Internal(BranchRecord {
            id: node.id,
            parent_id: node.parent,
            level: node.level,
            keys: branch.keys.to_vec(),
            children: branch.children.to_vec(),
        }),
    };
    NodeRecord { kind: Some(kind) }.encode_to_vec()
}

/// Deserialize a node.
pub fn decode(bytes: &[u8]) -> Result<Node, CodecError> {
    // An empty message decodes to a record without a kind.
    if bytes.is_empty() {
        return Err(CodecError::Empty);
    }
    let record = NodeRecord::decode(bytes)?;
    let node = match record.kind.ok_or(CodecError::UnknownKind)? {
        node_record::Kind::Leaf(leaf) => Node {
            id: leaf.id,
            parent: leaf.parent_id,
            level: leaf.level,
            kind: NodeKind::Leaf(from_key_values(leaf.values)),
        },
        node_record::Kind::Buffer(buffer) => Node {
            id: buffer.id,
            parent: buffer.parent_id,
            level: buffer.level,
            kind: NodeKind::Buffer {
                branch: Branch {
                    keys: buffer.keys,
                    children: buffer.children,
                },
                pending: from_key_values::<VecDeque<Entry>>(buffer.pending),
            },
        },
        node_record::Kind::Internal(internal) => Node {
            id: internal.id,
            parent: internal.parent_id,
            level: internal.level,
            kind: NodeKind::Internal(Branch {
                keys: internal.keys,
                children: internal.children,
            }),
        },
    };
    Ok(node)
}
