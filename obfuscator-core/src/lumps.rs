use std::ops::Range;

use serde::Serialize;

use crate::cursor::ByteCursor;
use crate::{ObfuscatorError, Result};

/// "VBSP" read as a little-endian u32.
pub const VBSP_IDENT: u32 = u32::from_le_bytes(*b"VBSP");
pub const SUPPORTED_VERSIONS: [i32; 3] = [19, 20, 21];

pub const HEADER_LUMPS: usize = 64;
pub const LUMP_DESCRIPTOR_SIZE: usize = 16;
pub const HEADER_SIZE: usize = 4 + 4 + HEADER_LUMPS * LUMP_DESCRIPTOR_SIZE + 4;

pub const LUMP_TEXDATA: usize = 2;
pub const LUMP_TEXINFO: usize = 6;
pub const LUMP_BRUSHSIDES: usize = 19;
pub const LUMP_TEXDATA_STRING_DATA: usize = 43;
pub const LUMP_TEXDATA_STRING_TABLE: usize = 44;

const LUMP_NAMES: [&str; HEADER_LUMPS] = [
    "ENTITIES",
    "PLANES",
    "TEXDATA",
    "VERTEXES",
    "VISIBILITY",
    "NODES",
    "TEXINFO",
    "FACES",
    "LIGHTING",
    "OCCLUSION",
    "LEAFS",
    "FACEIDS",
    "EDGES",
    "SURFEDGES",
    "MODELS",
    "WORLDLIGHTS",
    "LEAFFACES",
    "LEAFBRUSHES",
    "BRUSHES",
    "BRUSHSIDES",
    "AREAS",
    "AREAPORTALS",
    "PORTALS",
    "CLUSTERS",
    "PORTALVERTS",
    "CLUSTERPORTALS",
    "DISPINFO",
    "ORIGINALFACES",
    "PHYSDISP",
    "PHYSCOLLIDE",
    "VERTNORMALS",
    "VERTNORMALINDICES",
    "DISP_LIGHTMAP_ALPHAS",
    "DISP_VERTS",
    "DISP_LIGHTMAP_SAMPLE_POSITIONS",
    "GAME_LUMP",
    "LEAFWATERDATA",
    "PRIMITIVES",
    "PRIMVERTS",
    "PRIMINDICES",
    "PAKFILE",
    "CLIPPORTALVERTS",
    "CUBEMAPS",
    "TEXDATA_STRING_DATA",
    "TEXDATA_STRING_TABLE",
    "OVERLAYS",
    "LEAFMINDISTTOWATER",
    "FACE_MACRO_TEXTURE_INFO",
    "DISP_TRIS",
    "PHYSCOLLIDESURFACE",
    "WATEROVERLAYS",
    "LEAF_AMBIENT_INDEX_HDR",
    "LEAF_AMBIENT_INDEX",
    "LIGHTING_HDR",
    "WORLDLIGHTS_HDR",
    "LEAF_AMBIENT_LIGHTING_HDR",
    "LEAF_AMBIENT_LIGHTING",
    "XZIPPAKFILE",
    "FACES_HDR",
    "MAP_FLAGS",
    "OVERLAY_FADES",
    "OVERLAY_SYSTEM_LEVELS",
    "PHYSLEVEL",
    "DISP_MULTIBLEND",
];

pub fn lump_name(index: usize) -> &'static str {
    LUMP_NAMES.get(index).copied().unwrap_or("UNKNOWN")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LumpDescriptor {
    pub offset: u32,
    pub length: u32,
    pub version: i32,
    pub four_cc: [u8; 4],
}

impl LumpDescriptor {
    /// Byte range of the lump inside a file of `file_size` bytes.
    pub fn range(&self, file_size: usize) -> Result<Range<usize>> {
        let start = self.offset as usize;
        let end = start + self.length as usize;
        if end > file_size {
            return Err(ObfuscatorError::Truncated {
                offset: start,
                needed: self.length as usize,
                size: file_size,
            });
        }
        Ok(start..end)
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

#[derive(Debug, Clone)]
pub struct FileHeader {
    pub ident: u32,
    pub version: i32,
    pub lumps: [LumpDescriptor; HEADER_LUMPS],
    pub map_revision: i32,
}

impl FileHeader {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(data);

        let ident = cursor.read_u32()?;
        let version = cursor.read_i32()?;
        if ident != VBSP_IDENT || !SUPPORTED_VERSIONS.contains(&version) {
            return Err(ObfuscatorError::UnsupportedFormat { ident, version });
        }

        let mut lumps = [LumpDescriptor::default(); HEADER_LUMPS];
        for lump in lumps.iter_mut() {
            *lump = LumpDescriptor {
                offset: cursor.read_u32()?,
                length: cursor.read_u32()?,
                version: cursor.read_i32()?,
                four_cc: cursor.read_bytes()?,
            };
        }
        let map_revision = cursor.read_i32()?;

        Ok(Self {
            ident,
            version,
            lumps,
            map_revision,
        })
    }

    pub fn lump(&self, index: usize) -> &LumpDescriptor {
        &self.lumps[index]
    }

    pub fn brush_sides(&self) -> &LumpDescriptor {
        self.lump(LUMP_BRUSHSIDES)
    }
}
