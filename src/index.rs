use crate::{
    blocks::{read_id, u32_len, write_placeholder, ChunkId},
    blorb::{ResourceId, USAGE_PICT},
    errors::{Error, FormatError},
};
use byteordered::byteorder::{ReadBytesExt, WriteBytesExt, BE};
use std::{
    collections::{btree_map::Entry, BTreeMap},
    fmt,
    io::{Read, Seek, Write},
};

const ENTRY_SIZE: u32 = 12;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexEntry {
    pub usage: ChunkId,
    pub number: ResourceId,
    pub offset: u32,
}

/// The `Pict` entries of an `RIdx` chunk, keyed by the offset of the chunk
/// each one describes.
#[derive(Debug, Default)]
pub struct ResourceIndex {
    pub offsets: BTreeMap<u32, ResourceId>,
    pub max_id: Option<ResourceId>,
}

impl ResourceIndex {
    pub fn from_entries(entries: &[IndexEntry]) -> Result<Self, FormatError> {
        let mut result = Self::default();
        for entry in entries {
            if entry.usage != USAGE_PICT {
                return Err(FormatError::UnsupportedUsage { usage: entry.usage });
            }
            result.max_id = result.max_id.max(Some(entry.number));
            // This is legal Blorb, but no known file with APal does it.
            match result.offsets.entry(entry.offset) {
                Entry::Vacant(e) => {
                    e.insert(entry.number);
                }
                Entry::Occupied(e) => {
                    return Err(FormatError::DuplicateOffset {
                        offset: entry.offset,
                        id: entry.number,
                        existing: *e.get(),
                    });
                }
            }
        }
        Ok(result)
    }
}

/// Reads the body of an `RIdx` chunk. The stream must be positioned just past
/// the `RIdx` id.
pub fn read_entries(r: &mut impl Read) -> Result<Vec<IndexEntry>, Error> {
    let declared = r.read_u32::<BE>()?;
    let count = r.read_u32::<BE>()?;
    if u64::from(declared) != 4 + u64::from(ENTRY_SIZE) * u64::from(count) {
        return Err(FormatError::IndexSizeMismatch { declared, count }.into());
    }

    let count: usize = count.try_into().map_err(|_| FormatError::IndexSizeMismatch {
        declared,
        count,
    })?;
    let mut entries = Vec::with_capacity(count.min(1 << 12));
    for _ in 0..count {
        entries.push(IndexEntry {
            usage: read_id(r)?,
            number: r.read_u32::<BE>()?,
            offset: r.read_u32::<BE>()?,
        });
    }
    Ok(entries)
}

/// Writes the `RIdx` size, count, and one entry per `(usage, number)` with a
/// zero offset. Returns the position of each offset field, in order.
pub fn write_placeholders(
    w: &mut (impl Write + Seek),
    entries: &[(ChunkId, ResourceId)],
) -> Result<Vec<u64>, Error> {
    let count = u32_len(entries.len())?;
    let size = count
        .checked_mul(ENTRY_SIZE)
        .and_then(|n| n.checked_add(4))
        .ok_or(FormatError::ChunkTooLarge { len: entries.len() })?;
    w.write_u32::<BE>(size)?;
    w.write_u32::<BE>(count)?;

    let mut positions = Vec::with_capacity(entries.len());
    for &(usage, number) in entries {
        w.write_all(&usage)?;
        w.write_u32::<BE>(number)?;
        positions.push(write_placeholder(w)?);
    }
    Ok(positions)
}

pub fn dump_entries(w: &mut impl fmt::Write, entries: &[IndexEntry]) -> fmt::Result {
    w.write_str("index:\n")?;
    for entry in entries {
        writeln!(
            w,
            "\t{}\t{}\t{:#x}",
            String::from_utf8_lossy(&entry.usage),
            entry.number,
            entry.offset,
        )?;
    }
    Ok(())
}
