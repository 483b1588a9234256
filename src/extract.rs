use crate::{
    blocks::{read_id, stream_len, ChunkScanner, CHUNK_HEADER_SIZE},
    blorb::{is_image, Document, BPAL, FORM, IFRS, PASSTHROUGH, RIDX},
    errors::{Error, FormatError, Tag},
    index::{read_entries, IndexEntry, ResourceIndex},
    resource::apal,
};
use byteordered::byteorder::{ReadBytesExt, BE};
use std::{
    io,
    io::{BufReader, Read, Seek},
};
use tracing::{debug, info, info_span};

/// Reads the outer `FORM` header and the `RIdx` entries that follow it.
/// Returns the entries and the position where the `FORM` ends.
pub fn read_header(s: &mut (impl Read + Seek)) -> Result<(Vec<IndexEntry>, u64), Error> {
    let len = stream_len(s)?;
    s.rewind()?;
    if len < 24 {
        return Err(FormatError::NotBlorb.into());
    }

    if read_id(s)? != FORM {
        return Err(FormatError::NotBlorb.into());
    }
    let form_len = s.read_u32::<BE>()?;
    if read_id(s)? != IFRS || read_id(s)? != RIDX {
        return Err(FormatError::NotBlorb.into());
    }
    let form_end = CHUNK_HEADER_SIZE + u64::from(form_len);
    if form_end > len {
        return Err(FormatError::Truncated { offset: 0 }.into());
    }

    let mut body = s.by_ref().take(form_end.saturating_sub(16));
    let entries = read_entries(&mut body).map_err(|e| match e {
        Error::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            FormatError::Truncated { offset: 12 }.into()
        }
        e => e,
    })?;
    Ok((entries, form_end))
}

pub fn read_blorb(s: &mut (impl Read + Seek)) -> Result<Document, Error> {
    let _span = info_span!("read").entered();
    let mut s = BufReader::new(s);

    let (entries, form_end) = read_header(&mut s)?;
    let index = ResourceIndex::from_entries(&entries)?;

    let mut doc = Document {
        max_id: index.max_id,
        ..Document::default()
    };

    let mut unmatched = index.offsets.clone();
    let mut scan = ChunkScanner::new(form_end);
    while let Some((offset, chunk)) = scan.read_chunk(&mut s)? {
        debug!(id = %Tag(chunk.id), offset, len = chunk.data.len(), "chunk");
        if PASSTHROUGH.contains(&chunk.id) {
            doc.metadata.push(chunk);
        } else if is_image(chunk.id) {
            let number = u32::try_from(offset)
                .ok()
                .and_then(|offset| unmatched.remove(&offset))
                .ok_or(FormatError::UnreferencedImage {
                    id: chunk.id,
                    offset,
                })?;
            if doc.images.insert(number, chunk).is_some() {
                return Err(FormatError::DuplicateId { id: number }.into());
            }
        } else if chunk.id == BPAL {
            return Err(FormatError::AlreadySubstituted { offset }.into());
        } else {
            return Err(FormatError::UnknownChunk {
                id: chunk.id,
                offset,
            }
            .into());
        }
    }
    scan.finish(&mut s)?;

    if let Some((&offset, &id)) = unmatched.iter().next() {
        return Err(FormatError::DanglingIndexEntry { id, offset }.into());
    }

    doc.palettes = apal::find_palettes(&doc.metadata)?;
    if let Some(&id) = doc.palettes.iter().find(|id| !doc.images.contains_key(id)) {
        return Err(FormatError::DanglingPaletteReference { id }.into());
    }
    if doc.palettes.is_empty() {
        return Err(FormatError::NoPaletteImages.into());
    }

    info!(
        chunks = doc.metadata.len(),
        images = doc.images.len(),
        palettes = doc.palettes.len(),
        "read blorb"
    );
    Ok(doc)
}
