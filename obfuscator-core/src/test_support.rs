//! Synthetic VBSP files for unit tests.

use crate::lumps::{
    HEADER_LUMPS, HEADER_SIZE, LUMP_BRUSHSIDES, LUMP_DESCRIPTOR_SIZE, LUMP_TEXDATA,
    LUMP_TEXDATA_STRING_DATA, LUMP_TEXDATA_STRING_TABLE, LUMP_TEXINFO, VBSP_IDENT,
};

struct PendingLump {
    index: usize,
    offset: Option<usize>,
    data: Vec<u8>,
}

pub(crate) struct MapBuilder {
    version: i32,
    lumps: Vec<PendingLump>,
}

impl MapBuilder {
    pub(crate) fn new() -> Self {
        Self {
            version: 20,
            lumps: Vec::new(),
        }
    }

    pub(crate) fn version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    pub(crate) fn raw_lump(mut self, index: usize, data: Vec<u8>) -> Self {
        self.lumps.push(PendingLump {
            index,
            offset: None,
            data,
        });
        self
    }

    /// Places a lump at a fixed offset. Written after everything else, so it
    /// may overlap the header or other lumps.
    pub(crate) fn raw_lump_at(mut self, index: usize, offset: usize, data: Vec<u8>) -> Self {
        self.lumps.push(PendingLump {
            index,
            offset: Some(offset),
            data,
        });
        self
    }

    /// `(flags, texdata)` per record; the vectors carry recognisable filler.
    pub(crate) fn tex_infos(self, records: &[(i32, i32)]) -> Self {
        let mut data = Vec::new();
        for (i, &(flags, tex_data)) in records.iter().enumerate() {
            for v in 0..16 {
                data.extend_from_slice(&((i * 16 + v) as f32).to_le_bytes());
            }
            data.extend_from_slice(&flags.to_le_bytes());
            data.extend_from_slice(&tex_data.to_le_bytes());
        }
        self.raw_lump(LUMP_TEXINFO, data)
    }

    pub(crate) fn tex_datas(self, name_ids: &[i32]) -> Self {
        let mut data = Vec::new();
        for &name_id in name_ids {
            for c in [0.25f32, 0.5, 0.75] {
                data.extend_from_slice(&c.to_le_bytes());
            }
            data.extend_from_slice(&name_id.to_le_bytes());
            for dim in [64i32, 64, 64, 64] {
                data.extend_from_slice(&dim.to_le_bytes());
            }
        }
        self.raw_lump(LUMP_TEXDATA, data)
    }

    pub(crate) fn strings(self, names: &[&str]) -> Self {
        let mut blob = Vec::new();
        let mut table = Vec::new();
        for name in names {
            table.extend_from_slice(&(blob.len() as i32).to_le_bytes());
            blob.extend_from_slice(name.as_bytes());
            blob.push(0);
        }
        self.raw_lump(LUMP_TEXDATA_STRING_DATA, blob)
            .raw_lump(LUMP_TEXDATA_STRING_TABLE, table)
    }

    pub(crate) fn brush_sides(self, records: &[(u16, i16, i16, i16)]) -> Self {
        self.raw_lump(LUMP_BRUSHSIDES, encode_brush_sides(records))
    }

    pub(crate) fn brush_sides_at(self, offset: usize, records: &[(u16, i16, i16, i16)]) -> Self {
        self.raw_lump_at(LUMP_BRUSHSIDES, offset, encode_brush_sides(records))
    }

    pub(crate) fn build(self) -> Vec<u8> {
        let mut out = vec![0u8; HEADER_SIZE];
        out[0..4].copy_from_slice(&VBSP_IDENT.to_le_bytes());
        out[4..8].copy_from_slice(&self.version.to_le_bytes());
        out[HEADER_SIZE - 4..].copy_from_slice(&7i32.to_le_bytes());

        let mut placed = Vec::new();
        for lump in self.lumps.iter().filter(|l| l.offset.is_none()) {
            // Unmodelled padding between lumps must survive a rewrite too.
            while out.len() % 4 != 0 {
                out.push(0xCD);
            }
            placed.push((lump.index, out.len(), &lump.data));
            out.extend_from_slice(&lump.data);
        }
        out.extend_from_slice(b"TRAILER");

        for (index, offset, data) in &placed {
            write_descriptor(&mut out, *index, *offset, data.len());
        }
        for lump in self.lumps.iter().filter(|l| l.offset.is_some()) {
            let offset = lump.offset.unwrap_or_default();
            write_descriptor(&mut out, lump.index, offset, lump.data.len());
            let end = offset + lump.data.len();
            if out.len() < end {
                out.resize(end, 0xEE);
            }
            out[offset..end].copy_from_slice(&lump.data);
        }
        out
    }
}

fn write_descriptor(out: &mut [u8], index: usize, offset: usize, length: usize) {
    assert!(index < HEADER_LUMPS);
    let base = 8 + index * LUMP_DESCRIPTOR_SIZE;
    out[base..base + 4].copy_from_slice(&(offset as u32).to_le_bytes());
    out[base + 4..base + 8].copy_from_slice(&(length as u32).to_le_bytes());
    out[base + 8..base + 12].copy_from_slice(&0i32.to_le_bytes());
    out[base + 12..base + 16].copy_from_slice(&[0u8; 4]);
}

pub(crate) fn encode_brush_sides(records: &[(u16, i16, i16, i16)]) -> Vec<u8> {
    let mut data = Vec::new();
    for &(plane, tex, disp, bevel) in records {
        data.extend_from_slice(&plane.to_le_bytes());
        data.extend_from_slice(&tex.to_le_bytes());
        data.extend_from_slice(&disp.to_le_bytes());
        data.extend_from_slice(&bevel.to_le_bytes());
    }
    data
}

/// Two texture groups sharing flags, plus a NODRAW surface at index 0.
///
/// texinfo: 0 NODRAW(0x80) -> "TOOLS/NODRAW", 1 0x0 -> "BRICK", 2 0x0 -> "CONCRETE",
/// 3 TRANS(0x10) -> "GLASS", 4 0x0 -> "BRICK" (duplicate name), 5 TRANS -> "METAL".
pub(crate) fn sample_map() -> Vec<u8> {
    MapBuilder::new()
        .strings(&["TOOLS/NODRAW", "BRICK", "CONCRETE", "GLASS", "METAL"])
        .tex_datas(&[0, 1, 2, 3, 4])
        .tex_infos(&[(0x80, 0), (0, 1), (0, 2), (0x10, 3), (0, 1), (0x10, 4)])
        .raw_lump(40, b"PK\x05\x06 not modelled".to_vec())
        .brush_sides(&[
            (10, 0, -1, 0),
            (11, 1, -1, 1),
            (12, 2, 3, 0),
            (13, 3, -1, 0),
            (14, 4, -1, 0),
            (15, 5, 7, 1),
        ])
        .build()
}
