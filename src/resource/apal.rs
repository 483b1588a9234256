use crate::{
    blocks::Chunk,
    blorb::{ResourceId, APAL},
    errors::FormatError,
};
use indexmap::IndexSet;

/// Finds the single `APal` chunk and returns the palette image ids it lists,
/// in declaration order. Repeated ids keep their first position.
pub fn find_palettes(chunks: &[Chunk]) -> Result<IndexSet<ResourceId>, FormatError> {
    let mut apals = chunks.iter().filter(|chunk| chunk.id == APAL);
    let apal = apals.next().ok_or(FormatError::MissingPaletteList)?;
    if apals.next().is_some() {
        return Err(FormatError::DuplicatePaletteList);
    }
    decode(&apal.data)
}

pub fn decode(apal_raw: &[u8]) -> Result<IndexSet<ResourceId>, FormatError> {
    if apal_raw.len() % 4 != 0 {
        return Err(FormatError::MalformedPaletteList {
            len: apal_raw.len(),
        });
    }
    Ok(apal_raw
        .chunks_exact(4)
        .map(|id| u32::from_be_bytes(id.try_into().unwrap()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_declaration_order() -> Result<(), FormatError> {
        let ids = decode(&[0, 0, 0, 9, 0, 0, 0, 2, 0, 0, 0, 9, 0, 0, 1, 0])?;
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), [9, 2, 256]);
        Ok(())
    }

    #[test]
    fn length_must_be_multiple_of_four() {
        assert!(matches!(
            decode(&[0, 0, 1]),
            Err(FormatError::MalformedPaletteList { len: 3 })
        ));
    }

    #[test]
    fn exactly_one_apal() {
        let snam = Chunk::new(*b"SNam", b"Arthur".to_vec());
        assert!(matches!(
            find_palettes(&[snam.clone()]),
            Err(FormatError::MissingPaletteList)
        ));
        let apal = Chunk::new(APAL, vec![0, 0, 0, 1]);
        assert!(matches!(
            find_palettes(&[apal.clone(), snam, apal]),
            Err(FormatError::DuplicatePaletteList)
        ));
    }
}
