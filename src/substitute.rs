use crate::{
    blocks::Chunk,
    blorb::{Document, ResourceId, Substitution, FIRST_GENERATED_ID, PNG},
    errors::{CodecError, Error, FormatError},
    resource::pict::{self, IndexedImage},
};
use png::BitDepth;
use rayon::prelude::*;
use std::collections::{hash_map::Entry, HashMap};
use tracing::{debug, info, info_span};

/// Content-addressed store for converted images. Ids are handed out
/// consecutively from `first_id`, so `images[i]` has id `first_id + i`.
struct Generated {
    first_id: ResourceId,
    images: Vec<Vec<u8>>,
    cache: HashMap<Vec<u8>, ResourceId>,
}

impl Generated {
    fn new(first_id: ResourceId) -> Self {
        Self {
            first_id,
            images: Vec::new(),
            cache: HashMap::new(),
        }
    }

    /// Returns the id already assigned to `data`, or assigns the next one.
    fn intern(&mut self, data: Vec<u8>) -> Result<ResourceId, FormatError> {
        match self.cache.entry(data) {
            Entry::Occupied(e) => Ok(*e.get()),
            Entry::Vacant(e) => {
                let next = u32::try_from(self.images.len())
                    .ok()
                    .and_then(|n| self.first_id.checked_add(n))
                    .ok_or(FormatError::IdsExhausted)?;
                self.images.push(e.key().clone());
                e.insert(next);
                Ok(next)
            }
        }
    }
}

pub fn first_generated_id(max_id: Option<ResourceId>) -> Result<ResourceId, FormatError> {
    match max_id {
        None => Ok(FIRST_GENERATED_ID),
        Some(max_id) => max_id
            .checked_add(1)
            .map(|id| id.max(FIRST_GENERATED_ID))
            .ok_or(FormatError::IdsExhausted),
    }
}

/// Adds one recoloured copy of every eligible image per reference palette,
/// and a `BPal` entry for every (image, palette) pair.
///
/// Eligible images are the `PNG ` images that are not themselves reference
/// palettes, visited in ascending id order; palettes are visited in `APal`
/// order. Every new image is passed through `recompress` before it is added
/// to the document.
pub fn substitute(
    doc: &mut Document,
    recompress: impl Fn(&[u8]) -> Result<Vec<u8>, Error> + Sync,
) -> Result<(), Error> {
    let palettes = decode_palettes(doc)?;
    let mut generated = Generated::new(first_generated_id(doc.max_id)?);

    {
        let _span = info_span!("convert").entered();
        info!("converting images");
        for (&id, chunk) in &doc.images {
            if chunk.id != PNG || doc.palettes.contains(&id) {
                continue;
            }
            let source = pict::decode(&chunk.data)?.ok_or(CodecError::NonIndexedImage { id })?;
            for (palette_id, palette) in &palettes {
                let converted = pict::encode(&source.with_palette_from(palette))?;
                let resolved = generated.intern(converted)?;
                debug!(image = id, palette = palette_id, resolved, "converted");
                doc.substitutions.push(Substitution {
                    palette: *palette_id,
                    requested: id,
                    resolved,
                });
            }
        }
    }

    let compressed = {
        let _span = info_span!("compress").entered();
        info!(count = generated.images.len(), "compressing images");
        generated
            .images
            .par_iter()
            .map(|data| recompress(data.as_slice()))
            .collect::<Result<Vec<_>, _>>()?
    };
    for (id, data) in (generated.first_id..).zip(compressed) {
        doc.images.insert(id, Chunk::new(PNG, data));
    }

    info!(
        generated = generated.images.len(),
        entries = doc.substitutions.len(),
        "substituted palettes"
    );
    Ok(())
}

fn decode_palettes(doc: &Document) -> Result<Vec<(ResourceId, IndexedImage)>, Error> {
    doc.palettes
        .iter()
        .map(|&id| -> Result<_, Error> {
            let chunk = doc
                .images
                .get(&id)
                .ok_or(FormatError::DanglingPaletteReference { id })?;
            if chunk.id != PNG {
                return Err(CodecError::NonIndexedPalette { id }.into());
            }
            match pict::decode(&chunk.data)? {
                Some(image) if image.depth == BitDepth::Eight => Ok((id, image)),
                _ => Err(CodecError::NonIndexedPalette { id }.into()),
            }
        })
        .collect()
}
