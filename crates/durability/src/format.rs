//! Snapshot file format
//!
//! One file holds any number of named maps. All integers are little-endian.
//!
//! ```text
//! +------------------+
//! | magic (8)        |  "CHRNMAP\0"
//! | version (4)      |
//! | map count (4)    |
//! +------------------+
//! | name len (4)     |  repeated per map, maps sorted by name
//! | name (N)         |
//! | entry count (8)  |
//! |   key len (4)    |  repeated per entry, entries sorted by key bytes
//! |   key (K)        |
//! |   value len (4)  |
//! |   value (V)      |
//! +------------------+
//! | crc32 (4)        |  over every preceding byte
//! +------------------+
//! ```

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chronmap_core::{Error, Result};
use std::collections::BTreeMap;
use std::io::{Cursor, Read};

/// File magic
pub const MAGIC: &[u8; 8] = b"CHRNMAP\0";

/// Current format version
pub const FORMAT_VERSION: u32 = 1;

const HEADER_SIZE: usize = 8 + 4 + 4;
const CRC_SIZE: usize = 4;

/// Encoded entries of one map, ordered by key bytes
pub type RawMap = BTreeMap<Vec<u8>, Vec<u8>>;

/// Encode maps into a complete file image.
///
/// `maps` must be sorted by name and free of duplicates.
pub fn encode(maps: &[(&str, &RawMap)]) -> Result<Vec<u8>> {
    let payload: usize = maps
        .iter()
        .map(|(name, map)| {
            4 + name.len()
                + 8
                + map
                    .iter()
                    .map(|(k, v)| 8 + k.len() + v.len())
                    .sum::<usize>()
        })
        .sum();
    let mut buf = Vec::with_capacity(HEADER_SIZE + payload + CRC_SIZE);

    buf.extend_from_slice(MAGIC);
    buf.write_u32::<LittleEndian>(FORMAT_VERSION)?;
    buf.write_u32::<LittleEndian>(len_u32(maps.len(), "map count")?)?;

    for (name, map) in maps {
        write_bytes(&mut buf, name.as_bytes(), "map name")?;
        buf.write_u64::<LittleEndian>(map.len() as u64)?;
        for (key, value) in map.iter() {
            write_bytes(&mut buf, key, "key")?;
            write_bytes(&mut buf, value, "value")?;
        }
    }

    let crc = crc32fast::hash(&buf);
    buf.write_u32::<LittleEndian>(crc)?;
    Ok(buf)
}

/// Decode a complete file image.
///
/// Any structural problem (bad magic, unknown version, checksum mismatch,
/// truncation, trailing bytes) is reported as [`Error::Corruption`].
pub fn decode(bytes: &[u8]) -> Result<BTreeMap<String, RawMap>> {
    if bytes.len() < HEADER_SIZE + CRC_SIZE {
        return Err(Error::corruption(format!(
            "snapshot file too short: {} bytes",
            bytes.len()
        )));
    }
    if &bytes[..MAGIC.len()] != MAGIC {
        return Err(Error::corruption("bad magic, not a snapshot file"));
    }

    let (body, trailer) = bytes.split_at(bytes.len() - CRC_SIZE);
    let stored = Cursor::new(trailer).read_u32::<LittleEndian>()?;
    let computed = crc32fast::hash(body);
    if stored != computed {
        return Err(Error::corruption(format!(
            "checksum mismatch: stored {:08x}, computed {:08x}",
            stored, computed
        )));
    }

    let mut cur = Cursor::new(&body[MAGIC.len()..]);
    let version = read_u32(&mut cur)?;
    if version != FORMAT_VERSION {
        return Err(Error::corruption(format!(
            "unsupported format version {}",
            version
        )));
    }

    let map_count = read_u32(&mut cur)?;
    let mut maps = BTreeMap::new();
    for _ in 0..map_count {
        let name = String::from_utf8(read_bytes(&mut cur)?)
            .map_err(|_| Error::corruption("map name is not valid UTF-8"))?;
        let entries = read_u64(&mut cur)?;
        let mut map = RawMap::new();
        for _ in 0..entries {
            let key = read_bytes(&mut cur)?;
            let value = read_bytes(&mut cur)?;
            map.insert(key, value);
        }
        if maps.insert(name.clone(), map).is_some() {
            return Err(Error::corruption(format!("duplicate map '{}'", name)));
        }
    }

    if (cur.position() as usize) != cur.get_ref().len() {
        return Err(Error::corruption("trailing bytes after last map"));
    }
    Ok(maps)
}

fn len_u32(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len)
        .map_err(|_| Error::serialization(format!("{} too large: {} bytes", what, len)))
}

fn write_bytes(buf: &mut Vec<u8>, bytes: &[u8], what: &str) -> Result<()> {
    buf.write_u32::<LittleEndian>(len_u32(bytes.len(), what)?)?;
    buf.extend_from_slice(bytes);
    Ok(())
}

fn truncated() -> Error {
    Error::corruption("snapshot file truncated")
}

fn read_u32(cur: &mut Cursor<&[u8]>) -> Result<u32> {
    cur.read_u32::<LittleEndian>().map_err(|_| truncated())
}

fn read_u64(cur: &mut Cursor<&[u8]>) -> Result<u64> {
    cur.read_u64::<LittleEndian>().map_err(|_| truncated())
}

fn read_bytes(cur: &mut Cursor<&[u8]>) -> Result<Vec<u8>> {
    let len = read_u32(cur)? as usize;
    let remaining = cur.get_ref().len() - cur.position() as usize;
    if len > remaining {
        return Err(truncated());
    }
    let mut out = vec![0u8; len];
    cur.read_exact(&mut out).map_err(|_| truncated())?;
    Ok(out)
}
