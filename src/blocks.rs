use crate::errors::{Error, FormatError};
use byteordered::byteorder::{ReadBytesExt, WriteBytesExt, BE};
use std::{
    io,
    io::{Read, Seek, SeekFrom, Write},
};

pub type ChunkId = [u8; 4];

pub const CHUNK_HEADER_SIZE: u64 = 8;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub id: ChunkId,
    pub data: Vec<u8>,
}

impl Chunk {
    pub fn new(id: ChunkId, data: Vec<u8>) -> Self {
        Self { id, data }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ChunkHeader {
    pub id: ChunkId,
    /// Payload length, not counting the header or the pad byte.
    pub len: u32,
    /// Position of the chunk id within the stream.
    pub offset: u64,
}

impl ChunkHeader {
    /// Position just past the payload and its pad byte.
    pub fn end(&self) -> u64 {
        self.offset + CHUNK_HEADER_SIZE + padded_len(self.len)
    }
}

/// Walks the chunks of one parent extent, e.g. the body of a `FORM`.
pub struct ChunkScanner {
    parent_end: u64,
    cur_chunk_end: Option<u64>,
}

impl ChunkScanner {
    pub fn new(parent_end: u64) -> Self {
        Self {
            parent_end,
            cur_chunk_end: None,
        }
    }

    pub fn next_chunk(
        &mut self,
        s: &mut (impl Read + Seek),
    ) -> Result<Option<ChunkHeader>, Error> {
        let pos = s.stream_position()?;
        // For all chunks but the first, the previous payload must have been fully consumed.
        if let Some(cur_chunk_end) = self.cur_chunk_end {
            if pos != cur_chunk_end {
                return Err(FormatError::Truncated { offset: pos }.into());
            }
        }
        if pos == self.parent_end {
            return Ok(None);
        }
        if pos + CHUNK_HEADER_SIZE > self.parent_end {
            return Err(FormatError::Truncated { offset: pos }.into());
        }

        let id = read_id(s).map_err(|e| truncated(e, pos))?;
        let len = s.read_u32::<BE>().map_err(|e| truncated(e, pos))?;
        let header = ChunkHeader {
            id,
            len,
            offset: pos,
        };
        if header.end() > self.parent_end {
            return Err(FormatError::Truncated { offset: pos }.into());
        }
        self.cur_chunk_end = Some(header.end());
        Ok(Some(header))
    }

    /// Reads the next chunk's payload and consumes its pad byte.
    pub fn read_chunk(
        &mut self,
        s: &mut (impl Read + Seek),
    ) -> Result<Option<(u64, Chunk)>, Error> {
        let header = match self.next_chunk(s)? {
            Some(header) => header,
            None => return Ok(None),
        };
        let data = read_payload(s, &header)?;
        Ok(Some((header.offset, Chunk::new(header.id, data))))
    }

    pub fn finish(&mut self, s: &mut impl Seek) -> Result<(), Error> {
        let pos = s.stream_position()?;
        if pos != self.parent_end {
            return Err(FormatError::Truncated { offset: pos }.into());
        }
        Ok(())
    }
}

fn read_payload(s: &mut impl Read, header: &ChunkHeader) -> Result<Vec<u8>, Error> {
    let len: usize = header
        .len
        .try_into()
        .map_err(|_| FormatError::Truncated {
            offset: header.offset,
        })?;
    let mut data = vec![0; len];
    s.read_exact(&mut data).map_err(|e| truncated(e, header.offset))?;
    if header.len % 2 == 1 {
        s.read_u8().map_err(|e| truncated(e, header.offset))?;
    }
    Ok(data)
}

fn truncated(e: io::Error, offset: u64) -> Error {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        FormatError::Truncated { offset }.into()
    } else {
        e.into()
    }
}

pub fn padded_len(len: u32) -> u64 {
    u64::from(len) + u64::from(len % 2)
}

/// Length of the whole stream, leaving the position where it was.
pub fn stream_len(s: &mut impl Seek) -> io::Result<u64> {
    let pos = s.stream_position()?;
    let len = s.seek(SeekFrom::End(0))?;
    s.seek(SeekFrom::Start(pos))?;
    Ok(len)
}

pub fn read_id(s: &mut impl Read) -> io::Result<ChunkId> {
    let mut id = [0; 4];
    s.read_exact(&mut id)?;
    Ok(id)
}

pub fn u32_len(len: usize) -> Result<u32, FormatError> {
    len.try_into().map_err(|_| FormatError::ChunkTooLarge { len })
}

pub fn write_chunk(out: &mut impl Write, id: ChunkId, data: &[u8]) -> Result<(), Error> {
    let len = u32_len(data.len())?;
    out.write_all(&id)?;
    out.write_u32::<BE>(len)?;
    out.write_all(data)?;
    if len % 2 == 1 {
        out.write_u8(0)?;
    }
    Ok(())
}

/// A value to be stored at an absolute stream position once it is known.
#[derive(Clone, Copy, Debug)]
pub struct Fixup {
    pub position: u64,
    pub value: u32,
}

/// Writes a zero placeholder and returns its position, to be patched later.
pub fn write_placeholder(out: &mut (impl Write + Seek)) -> io::Result<u64> {
    let position = out.stream_position()?;
    out.write_u32::<BE>(0)?;
    Ok(position)
}

pub fn apply_fixups(out: &mut (impl Write + Seek), fixups: &[Fixup]) -> io::Result<()> {
    let end = out.stream_position()?;
    for fixup in fixups {
        out.seek(SeekFrom::Start(fixup.position))?;
        out.write_u32::<BE>(fixup.value)?;
    }
    out.seek(SeekFrom::Start(end))?;
    Ok(())
}
