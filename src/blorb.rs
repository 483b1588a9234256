use crate::blocks::{Chunk, ChunkId};
use indexmap::IndexSet;
use std::collections::BTreeMap;

pub type ResourceId = u32;

pub const FORM: ChunkId = *b"FORM";
pub const IFRS: ChunkId = *b"IFRS";
pub const RIDX: ChunkId = *b"RIdx";

pub const USAGE_PICT: ChunkId = *b"Pict";
pub const USAGE_EXEC: ChunkId = *b"Exec";

pub const APAL: ChunkId = *b"APal";
pub const BPAL: ChunkId = *b"BPal";
pub const PNG: ChunkId = *b"PNG ";
pub const RECT: ChunkId = *b"Rect";
pub const ZCOD: ChunkId = *b"ZCOD";

/// Chunks copied through to the output unchanged.
pub const PASSTHROUGH: [ChunkId; 7] = [
    *b"IFhd", *b"SNam", *b"(c) ", *b"AUTH", *b"RelN", *b"Reso", APAL,
];

/// Generated images are numbered from here up, or from one past the largest
/// existing id if that is higher.
pub const FIRST_GENERATED_ID: ResourceId = 1000;

#[derive(Debug, Default)]
pub struct Document {
    pub metadata: Vec<Chunk>,
    pub images: BTreeMap<ResourceId, Chunk>,
    /// Reference palettes, in the order the `APal` chunk lists them.
    pub palettes: IndexSet<ResourceId>,
    pub max_id: Option<ResourceId>,
    pub exec: Option<Vec<u8>>,
    pub substitutions: Vec<Substitution>,
}

/// One `BPal` entry: while `palette` is active, show `resolved` in place of
/// `requested`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Substitution {
    pub palette: ResourceId,
    pub requested: ResourceId,
    pub resolved: ResourceId,
}

pub fn is_image(id: ChunkId) -> bool {
    id == PNG || id == RECT
}
