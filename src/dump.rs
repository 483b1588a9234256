use crate::{
    blocks::{ChunkId, ChunkScanner},
    blorb::{Substitution, BPAL},
    errors::{Error, FormatError, Tag},
    extract::read_header,
    index::{dump_entries, IndexEntry},
};
use std::{
    fmt,
    io::{BufReader, Read, Seek},
};

/// Where each chunk of a Blorb file sits, without interpreting most of them.
pub struct Listing {
    pub entries: Vec<IndexEntry>,
    pub chunks: Vec<ChunkInfo>,
    pub substitutions: Vec<Substitution>,
}

pub struct ChunkInfo {
    pub id: ChunkId,
    pub offset: u64,
    pub len: u32,
}

/// Lists any Blorb file, including ones that already carry a `BPal` chunk or
/// use resource kinds other than pictures.
pub fn read_listing(s: &mut (impl Read + Seek)) -> Result<Listing, Error> {
    let mut s = BufReader::new(s);
    let (entries, form_end) = read_header(&mut s)?;

    let mut chunks = Vec::new();
    let mut substitutions = Vec::new();
    let mut scan = ChunkScanner::new(form_end);
    while let Some((offset, chunk)) = scan.read_chunk(&mut s)? {
        if chunk.id == BPAL {
            substitutions.extend(decode_bpal(&chunk.data)?);
        }
        chunks.push(ChunkInfo {
            id: chunk.id,
            offset,
            len: chunk.data.len().try_into().unwrap_or(u32::MAX),
        });
    }
    scan.finish(&mut s)?;

    Ok(Listing {
        entries,
        chunks,
        substitutions,
    })
}

fn decode_bpal(bpal_raw: &[u8]) -> Result<Vec<Substitution>, FormatError> {
    if bpal_raw.len() % 12 != 0 {
        return Err(FormatError::MalformedSubstitutionTable {
            len: bpal_raw.len(),
        });
    }
    let field = |raw: &[u8], i: usize| u32::from_be_bytes(raw[i..i + 4].try_into().unwrap());
    Ok(bpal_raw
        .chunks_exact(12)
        .map(|raw| Substitution {
            palette: field(raw, 0),
            requested: field(raw, 4),
            resolved: field(raw, 8),
        })
        .collect())
}

pub fn dump_listing(w: &mut impl fmt::Write, listing: &Listing) -> fmt::Result {
    dump_entries(w, &listing.entries)?;
    w.write_str("chunks:\n")?;
    for chunk in &listing.chunks {
        writeln!(w, "\t{}\t{:#x}\t{}", Tag(chunk.id), chunk.offset, chunk.len)?;
    }
    if !listing.substitutions.is_empty() {
        w.write_str("substitutions:\n")?;
        for s in &listing.substitutions {
            writeln!(w, "\t{}\t{}\t{}", s.palette, s.requested, s.resolved)?;
        }
    }
    Ok(())
}
