use crate::{
    blocks::{apply_fixups, u32_len, write_chunk, write_placeholder, ChunkId, Fixup},
    blorb::{Document, ResourceId, BPAL, FORM, IFRS, RIDX, USAGE_EXEC, USAGE_PICT, ZCOD},
    errors::{Error, FormatError},
    index::write_placeholders,
};
use byteordered::byteorder::{WriteBytesExt, BE};
use std::io::{BufWriter, Seek, Write};
use tracing::{info, info_span};

/// Writes `doc` as a complete Blorb file with a trailing `BPal` chunk.
///
/// `out` must be positioned at its start. Chunk offsets in the `RIdx` and the
/// `FORM` length are patched in once everything else has been written.
pub fn write_blorb(out: &mut (impl Write + Seek), doc: &Document) -> Result<(), Error> {
    let _span = info_span!("write").entered();
    if doc.substitutions.is_empty() {
        return Err(FormatError::EmptySubstitutionTable.into());
    }

    let mut out = BufWriter::new(out);
    let mut fixups = Vec::with_capacity(doc.images.len() + 2);

    out.write_all(&FORM)?;
    let form_len = write_placeholder(&mut out)?;
    out.write_all(&IFRS)?;
    out.write_all(&RIDX)?;

    let mut entries: Vec<(ChunkId, ResourceId)> =
        doc.images.keys().map(|&id| (USAGE_PICT, id)).collect();
    if doc.exec.is_some() {
        entries.push((USAGE_EXEC, 0));
    }
    let mut offset_fields = write_placeholders(&mut out, &entries)?.into_iter();

    for chunk in &doc.metadata {
        write_chunk(&mut out, chunk.id, &chunk.data)?;
    }

    for (chunk, position) in doc.images.values().zip(offset_fields.by_ref()) {
        fixups.push(Fixup {
            position,
            value: current_offset(&mut out)?,
        });
        write_chunk(&mut out, chunk.id, &chunk.data)?;
    }

    if let (Some(exec), Some(position)) = (&doc.exec, offset_fields.next()) {
        fixups.push(Fixup {
            position,
            value: current_offset(&mut out)?,
        });
        write_chunk(&mut out, ZCOD, exec)?;
    }

    let len = u32_len(doc.substitutions.len() * 12)?;
    out.write_all(&BPAL)?;
    out.write_u32::<BE>(len)?;
    for entry in &doc.substitutions {
        out.write_u32::<BE>(entry.palette)?;
        out.write_u32::<BE>(entry.requested)?;
        out.write_u32::<BE>(entry.resolved)?;
    }

    let end = current_offset(&mut out)?;
    fixups.push(Fixup {
        position: form_len,
        value: end - 8,
    });
    apply_fixups(&mut out, &fixups)?;
    out.flush()?;

    info!(
        images = doc.images.len(),
        entries = doc.substitutions.len(),
        size = end,
        "wrote blorb"
    );
    Ok(())
}

fn current_offset(out: &mut impl Seek) -> Result<u32, Error> {
    let pos = out.stream_position()?;
    pos.try_into().map_err(|_| {
        FormatError::ChunkTooLarge {
            len: usize::try_from(pos).unwrap_or(usize::MAX),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{blocks::Chunk, blorb::Substitution, dump::read_listing};
    use std::io::Cursor;

    fn doc() -> Document {
        Document {
            metadata: vec![Chunk::new(*b"SNam", b"Zork".to_vec())],
            images: [
                (7, Chunk::new(*b"PNG ", b"seven".to_vec())),
                (3, Chunk::new(*b"Rect", vec![0; 8])),
            ]
            .into_iter()
            .collect(),
            substitutions: vec![Substitution {
                palette: 3,
                requested: 7,
                resolved: 1000,
            }],
            ..Document::default()
        }
    }

    #[test]
    fn writes_patched_offsets_and_length() -> Result<(), Error> {
        let mut out = Cursor::new(Vec::new());
        write_blorb(&mut out, &doc())?;
        let bytes = out.into_inner();

        assert_eq!(&bytes[..4], b"FORM");
        let form_len = u32::from_be_bytes(bytes[4..8].try_into().unwrap());
        assert_eq!(usize::try_from(form_len).unwrap(), bytes.len() - 8);
        assert_eq!(&bytes[8..16], b"IFRSRIdx");

        let listing = read_listing(&mut Cursor::new(&bytes))?;
        assert_eq!(listing.entries.len(), 2);
        assert_eq!(listing.entries[0].number, 3);
        assert_eq!(listing.entries[1].number, 7);
        for entry in &listing.entries {
            let at = usize::try_from(entry.offset).unwrap();
            let chunk = listing
                .chunks
                .iter()
                .find(|c| c.offset == u64::from(entry.offset))
                .unwrap();
            assert_eq!(&bytes[at..at + 4], &chunk.id);
        }
        assert_eq!(listing.substitutions, doc().substitutions);
        Ok(())
    }

    #[test]
    fn exec_goes_after_images() -> Result<(), Error> {
        let mut doc = doc();
        doc.exec = Some(b"story".to_vec());
        let mut out = Cursor::new(Vec::new());
        write_blorb(&mut out, &doc)?;
        let bytes = out.into_inner();

        let listing = read_listing(&mut Cursor::new(&bytes))?;
        let exec = listing.entries.last().unwrap();
        assert_eq!(&exec.usage, b"Exec");
        assert_eq!(exec.number, 0);
        let ids: Vec<_> = listing.chunks.iter().map(|c| c.id).collect();
        assert_eq!(ids, [*b"SNam", *b"Rect", *b"PNG ", *b"ZCOD", *b"BPal"]);
        let zcod = &listing.chunks[3];
        assert_eq!(zcod.offset, u64::from(exec.offset));
        Ok(())
    }

    #[test]
    fn empty_table_is_rejected_before_writing() {
        let mut doc = doc();
        doc.substitutions.clear();
        let mut out = Cursor::new(Vec::new());
        assert!(matches!(
            write_blorb(&mut out, &doc),
            Err(Error::Format(FormatError::EmptySubstitutionTable))
        ));
        assert!(out.into_inner().is_empty());
    }
}
