use serde::Serialize;

use crate::cursor::ByteCursor;
use crate::lumps::{
    lump_name, FileHeader, LUMP_BRUSHSIDES, LUMP_TEXDATA, LUMP_TEXDATA_STRING_DATA,
    LUMP_TEXDATA_STRING_TABLE, LUMP_TEXINFO,
};
use crate::{ObfuscatorError, Result};

/// A fixed-size record stored in one lump.
pub trait LumpRecord: Sized {
    const SIZE: usize;
    const LUMP: usize;

    fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self>;
}

/// Decodes every record of `T`'s lump, in file order.
pub fn decode_lump<T: LumpRecord>(data: &[u8], header: &FileHeader) -> Result<Vec<T>> {
    let lump = header.lump(T::LUMP);
    if lump.length as usize % T::SIZE != 0 {
        return Err(ObfuscatorError::CorruptLump {
            lump: lump_name(T::LUMP),
            length: lump.length,
            record_size: T::SIZE,
        });
    }
    let range = lump.range(data.len())?;
    let count = lump.length as usize / T::SIZE;

    let mut cursor = ByteCursor::new(data);
    cursor.seek(range.start)?;
    let mut records = Vec::with_capacity(count);
    for _ in 0..count {
        records.push(T::decode(&mut cursor)?);
    }
    Ok(records)
}

#[derive(Debug, Clone, PartialEq)]
pub struct TexInfo {
    pub texture_vecs: [[f32; 4]; 2],
    pub lightmap_vecs: [[f32; 4]; 2],
    pub flags: i32,
    pub tex_data: i32,
}

fn read_vecs(cursor: &mut ByteCursor<'_>) -> Result<[[f32; 4]; 2]> {
    let mut vecs = [[0f32; 4]; 2];
    for row in vecs.iter_mut() {
        for v in row.iter_mut() {
            *v = cursor.read_f32()?;
        }
    }
    Ok(vecs)
}

impl LumpRecord for TexInfo {
    const SIZE: usize = 72;
    const LUMP: usize = LUMP_TEXINFO;

    fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(Self {
            texture_vecs: read_vecs(cursor)?,
            lightmap_vecs: read_vecs(cursor)?,
            flags: cursor.read_i32()?,
            tex_data: cursor.read_i32()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TexData {
    pub reflectivity: [f32; 3],
    pub name_string_table_id: i32,
    pub width: i32,
    pub height: i32,
    pub view_width: i32,
    pub view_height: i32,
}

impl LumpRecord for TexData {
    const SIZE: usize = 32;
    const LUMP: usize = LUMP_TEXDATA;

    fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(Self {
            reflectivity: [cursor.read_f32()?, cursor.read_f32()?, cursor.read_f32()?],
            name_string_table_id: cursor.read_i32()?,
            width: cursor.read_i32()?,
            height: cursor.read_i32()?,
            view_width: cursor.read_i32()?,
            view_height: cursor.read_i32()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BrushSide {
    pub plane_num: u16,
    pub tex_info: i16,
    pub disp_info: i16,
    pub bevel: i16,
}

impl BrushSide {
    /// Byte offset of `tex_info` inside the record.
    pub const TEX_INFO_OFFSET: usize = 2;
}

impl LumpRecord for BrushSide {
    const SIZE: usize = 8;
    const LUMP: usize = LUMP_BRUSHSIDES;

    fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(Self {
            plane_num: cursor.read_u16()?,
            tex_info: cursor.read_i16()?,
            disp_info: cursor.read_i16()?,
            bevel: cursor.read_i16()?,
        })
    }
}

struct StringOffset(i32);

impl LumpRecord for StringOffset {
    const SIZE: usize = 4;
    const LUMP: usize = LUMP_TEXDATA_STRING_TABLE;

    fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(Self(cursor.read_i32()?))
    }
}

/// Texture names: a blob of NUL-terminated strings plus the offset table
/// that `TexData::name_string_table_id` indexes.
#[derive(Debug, Clone, Default)]
pub struct StringTable {
    blob: Vec<u8>,
    offsets: Vec<i32>,
}

impl StringTable {
    pub fn decode(data: &[u8], header: &FileHeader) -> Result<Self> {
        let blob_range = header.lump(LUMP_TEXDATA_STRING_DATA).range(data.len())?;
        let offsets = decode_lump::<StringOffset>(data, header)?
            .into_iter()
            .map(|o| o.0)
            .collect();
        Ok(Self {
            blob: data[blob_range].to_vec(),
            offsets,
        })
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn string_at(&self, id: i32) -> Result<String> {
        let offset = usize::try_from(id)
            .ok()
            .and_then(|i| self.offsets.get(i))
            .copied()
            .ok_or(ObfuscatorError::CorruptReference {
                what: "texdata string table id",
                index: id as i64,
                len: self.offsets.len(),
            })?;

        let start = usize::try_from(offset)
            .ok()
            .filter(|&start| start < self.blob.len())
            .ok_or(ObfuscatorError::CorruptReference {
                what: "texdata string data offset",
                index: offset as i64,
                len: self.blob.len(),
            })?;

        let tail = &self.blob[start..];
        let nul_pos = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
        Ok(String::from_utf8_lossy(&tail[..nul_pos]).into_owned())
    }
}
