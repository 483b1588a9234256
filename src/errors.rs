use crate::{blocks::ChunkId, blorb::ResourceId};
use std::{fmt, io, path::PathBuf, process::ExitStatus};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Compression(#[from] CompressionError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("error processing {}: {source}", path.display())]
    ReadExec {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("bad config: {0}")]
    Config(String),
}

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("not a blorb")]
    NotBlorb,
    #[error("truncated chunk at offset {offset:#x}")]
    Truncated { offset: u64 },
    #[error("RIdx mismatch: {declared} bytes declared for {count} entries")]
    IndexSizeMismatch { declared: u32, count: u32 },
    #[error("unknown resource usage: {}", Tag(*usage))]
    UnsupportedUsage { usage: ChunkId },
    #[error("duplicate offset {offset:#x} for id {id} (already used by id {existing})")]
    DuplicateOffset {
        offset: u32,
        id: ResourceId,
        existing: ResourceId,
    },
    #[error("found {} chunk at offset {offset:#x}, but no RIdx entries reference it", Tag(*id))]
    UnreferencedImage { id: ChunkId, offset: u64 },
    #[error("more than one RIdx entry for image {id}")]
    DuplicateId { id: ResourceId },
    #[error("RIdx entry for image {id} points at offset {offset:#x}, where no image chunk starts")]
    DanglingIndexEntry { id: ResourceId, offset: u32 },
    #[error("this file already has a BPal chunk (at offset {offset:#x})")]
    AlreadySubstituted { offset: u64 },
    #[error("unknown chunk: {} @{offset:#x}", Tag(*id))]
    UnknownChunk { id: ChunkId, offset: u64 },
    #[error("no APal chunk found")]
    MissingPaletteList,
    #[error("more than one APal chunk found")]
    DuplicatePaletteList,
    #[error("invalid APal size: {len}")]
    MalformedPaletteList { len: usize },
    #[error("APal references image {id}, which does not exist")]
    DanglingPaletteReference { id: ResourceId },
    #[error("no APal images found")]
    NoPaletteImages,
    #[error("BPal chunk is empty")]
    EmptySubstitutionTable,
    #[error("invalid BPal size: {len}")]
    MalformedSubstitutionTable { len: usize },
    #[error("chunk too large: {len} bytes")]
    ChunkTooLarge { len: usize },
    #[error("no resource ids left to allocate")]
    IdsExhausted,
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unable to load PNG: {0}")]
    Decode(#[from] png::DecodingError),
    #[error("unable to store image as PNG: {0}")]
    Encode(#[from] png::EncodingError),
    #[error("indexed PNG has no palette")]
    MissingPalette,
    #[error("palette source {id} not indexed")]
    NonIndexedPalette { id: ResourceId },
    #[error("image {id} not indexed")]
    NonIndexedImage { id: ResourceId },
}

#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("unable to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{program} exited with {status}")]
    Exit { program: String, status: ExitStatus },
    #[error("{program} produced no output")]
    EmptyOutput { program: String },
    #[error("unable to compress image: {0}")]
    Library(#[from] oxipng::PngError),
}

/// Formats a chunk id as printable text plus its hex value, e.g. `PNG  (504e4720)`.
pub struct Tag(pub ChunkId);

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            let ch = if b.is_ascii_graphic() || b == b' ' {
                char::from(b)
            } else {
                ' '
            };
            fmt::Write::write_char(f, ch)?;
        }
        write!(f, " ({:08x})", u32::from_be_bytes(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_shows_text_and_hex() {
        assert_eq!(Tag(*b"PNG ").to_string(), "PNG  (504e4720)");
        assert_eq!(Tag([b'A', 0, 0x7f, b'z']).to_string(), "A  z (41007f7a)");
    }

    #[test]
    fn messages_carry_context() {
        let e = Error::from(FormatError::UnknownChunk {
            id: *b"JUNK",
            offset: 0x40,
        });
        assert_eq!(e.to_string(), "unknown chunk: JUNK (4a554e4b) @0x40");
    }
}
