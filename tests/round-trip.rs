use bpal::{read_listing, transcode, Error, ResourceId};
use std::{
    collections::{BTreeMap, HashSet},
    error::Error as _,
    io::Cursor,
};

const PALETTES: [ResourceId; 2] = [40, 30];
const SOURCES: [ResourceId; 3] = [1, 2, 7];

#[test]
fn round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let input = sample_blorb();
    let output = transcode(&mut Cursor::new(&input), Some(b"\x06zcode".to_vec()), identity)?;

    // Same input, same bytes.
    let again = transcode(&mut Cursor::new(&input), Some(b"\x06zcode".to_vec()), identity)?;
    assert!(output == again);

    let form_len = u32::from_be_bytes(output[4..8].try_into()?);
    assert_eq!(usize::try_from(form_len)?, output.len() - 8);

    let listing = read_listing(&mut Cursor::new(&output))?;
    let mut images = BTreeMap::new();
    for entry in &listing.entries {
        let at = usize::try_from(entry.offset)?;
        let len = usize::try_from(u32::from_be_bytes(output[at + 4..at + 8].try_into()?))?;
        let chunk_id = &output[at..at + 4];
        if &entry.usage == b"Exec" {
            assert_eq!(chunk_id, b"ZCOD");
            assert_eq!(&output[at + 8..at + 8 + len], b"\x06zcode");
        } else {
            assert_eq!(chunk_id, b"PNG ");
            images.insert(entry.number, output[at + 8..at + 8 + len].to_vec());
        }
    }

    // Metadata comes through untouched and in order.
    let metadata: Vec<_> = listing
        .chunks
        .iter()
        .filter(|c| !listing.entries.iter().any(|e| u64::from(e.offset) == c.offset))
        .map(|c| c.id)
        .collect();
    assert_eq!(metadata, [*b"SNam", *b"APal", *b"AUTH", *b"BPal"]);

    // One entry per source image and palette, sources ascending, palettes in
    // APal order.
    let pairs: Vec<_> = listing
        .substitutions
        .iter()
        .map(|s| (s.requested, s.palette))
        .collect();
    let expected: Vec<_> = SOURCES
        .iter()
        .flat_map(|&source| PALETTES.iter().map(move |&palette| (source, palette)))
        .collect();
    assert_eq!(pairs, expected);

    let mut seen = HashSet::new();
    for s in &listing.substitutions {
        assert!(s.resolved >= 1000);
        let source = decode(&images[&s.requested])?;
        let palette = decode(&images[&s.palette])?;
        let resolved = decode(&images[&s.resolved])?;
        assert_eq!(resolved.pixels, source.pixels);
        assert_eq!(resolved.palette[..6], source.palette[..6]);
        assert_eq!(resolved.palette[6..], palette.palette[6..]);
        seen.insert(s.resolved);
    }

    // Sources 1 and 2 only differ in entries the palettes overwrite.
    assert_eq!(seen.len(), 4);
    assert_eq!(images.len(), SOURCES.len() + PALETTES.len() + 4);
    Ok(())
}

#[test]
fn errors_name_the_problem() {
    let mut input = sample_blorb();
    input[8..12].copy_from_slice(b"AIFF");
    let err = transcode(&mut Cursor::new(&input), None, identity).unwrap_err();
    assert_eq!(err.to_string(), "not a blorb");
    assert!(err.source().is_none());
}

fn identity(data: &[u8]) -> Result<Vec<u8>, Error> {
    Ok(data.to_vec())
}

fn sample_blorb() -> Vec<u8> {
    let rgb = |i: u8, tint: u8| [i, tint, 0xff - i];
    let colors = |tint: u8| -> Vec<[u8; 3]> { (0..6).map(|i| rgb(i, tint)).collect() };

    let mut source2 = colors(0);
    source2[4] = [9, 9, 9];
    let images: [(ResourceId, Vec<u8>); 5] = [
        (1, indexed_png(&colors(0), &[0, 1, 2, 3, 4, 5])),
        (2, indexed_png(&source2, &[0, 1, 2, 3, 4, 5])),
        (7, indexed_png(&colors(7), &[5, 5, 1, 0])),
        (30, indexed_png(&colors(30), &[0])),
        (40, indexed_png(&colors(40), &[0])),
    ];
    let apal: Vec<u8> = PALETTES.iter().flat_map(|id| id.to_be_bytes()).collect();
    let metadata: [(&[u8; 4], &[u8]); 3] = [(b"SNam", b"Sample"), (b"APal", &apal), (b"AUTH", b"Anon")];

    let header_len = 24 + 12 * images.len();
    let mut body = Vec::new();
    for (id, data) in metadata {
        push_chunk(&mut body, id, data);
    }
    let mut index = Vec::new();
    for (number, data) in &images {
        index.extend(b"Pict");
        index.extend(number.to_be_bytes());
        index.extend(u32::try_from(header_len + body.len()).unwrap().to_be_bytes());
        push_chunk(&mut body, b"PNG ", data);
    }

    let mut out = Vec::new();
    out.extend(b"FORM");
    out.extend(u32::try_from(header_len + body.len() - 8).unwrap().to_be_bytes());
    out.extend(b"IFRSRIdx");
    out.extend(u32::try_from(4 + index.len()).unwrap().to_be_bytes());
    out.extend(u32::try_from(images.len()).unwrap().to_be_bytes());
    out.extend(index);
    out.extend(body);
    out
}

fn push_chunk(out: &mut Vec<u8>, id: &[u8; 4], data: &[u8]) {
    out.extend(id);
    out.extend(u32::try_from(data.len()).unwrap().to_be_bytes());
    out.extend(data);
    if data.len() % 2 == 1 {
        out.push(0);
    }
}

fn indexed_png(palette: &[[u8; 3]], pixels: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let width = u32::try_from(pixels.len()).unwrap();
        let mut encoder = png::Encoder::new(&mut out, width, 1);
        encoder.set_color(png::ColorType::Indexed);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_palette(palette.concat());
        let mut writer = encoder.write_header().unwrap();
        writer.write_image_data(pixels).unwrap();
    }
    out
}

struct Decoded {
    palette: Vec<u8>,
    pixels: Vec<u8>,
}

fn decode(data: &[u8]) -> Result<Decoded, png::DecodingError> {
    let mut decoder = png::Decoder::new(data);
    decoder.set_transformations(png::Transformations::IDENTITY);
    let mut reader = decoder.read_info()?;
    let mut pixels = vec![0; reader.output_buffer_size()];
    let frame = reader.next_frame(&mut pixels)?;
    pixels.truncate(frame.buffer_size());
    let palette = reader.info().palette.as_deref().unwrap_or_default().to_vec();
    Ok(Decoded { palette, pixels })
}
