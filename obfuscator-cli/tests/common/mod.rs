#![allow(dead_code)]

use std::path::{Path, PathBuf};

const HEADER_SIZE: usize = 4 + 4 + 64 * 16 + 4;

pub const BRUSHSIDES: usize = 19;

fn put_lump(out: &mut Vec<u8>, index: usize, data: &[u8]) {
    let offset = out.len();
    let base = 8 + index * 16;
    out[base..base + 4].copy_from_slice(&(offset as u32).to_le_bytes());
    out[base + 4..base + 8].copy_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(data);
}

/// texinfo 0 NODRAW, 1/2 plain BRICK/CONCRETE, 3 TRANS GLASS, 4 TRANS METAL.
/// Brush sides reference texinfo 0..=4 in order.
pub fn sample_map() -> Vec<u8> {
    let names = ["TOOLS/NODRAW", "BRICK", "CONCRETE", "GLASS", "METAL"];
    let tex_infos: [(i32, i32); 5] = [(0x80, 0), (0, 1), (0, 2), (0x10, 3), (0x10, 4)];

    let mut out = vec![0u8; HEADER_SIZE];
    out[0..4].copy_from_slice(b"VBSP");
    out[4..8].copy_from_slice(&20i32.to_le_bytes());

    let mut blob = Vec::new();
    let mut table = Vec::new();
    for name in names {
        table.extend_from_slice(&(blob.len() as i32).to_le_bytes());
        blob.extend_from_slice(name.as_bytes());
        blob.push(0);
    }
    put_lump(&mut out, 43, &blob);
    put_lump(&mut out, 44, &table);

    let mut tex_data = Vec::new();
    for id in 0..names.len() as i32 {
        tex_data.extend_from_slice(&[0u8; 12]);
        tex_data.extend_from_slice(&id.to_le_bytes());
        tex_data.extend_from_slice(&[0x40u8; 16]);
    }
    put_lump(&mut out, 2, &tex_data);

    let mut tex_info = Vec::new();
    for (flags, data) in tex_infos {
        tex_info.extend_from_slice(&[0x11u8; 64]);
        tex_info.extend_from_slice(&flags.to_le_bytes());
        tex_info.extend_from_slice(&data.to_le_bytes());
    }
    put_lump(&mut out, 6, &tex_info);

    let mut sides = Vec::new();
    for i in 0..tex_infos.len() as i16 {
        sides.extend_from_slice(&(100 + i as u16).to_le_bytes());
        sides.extend_from_slice(&i.to_le_bytes());
        sides.extend_from_slice(&(-1i16).to_le_bytes());
        sides.extend_from_slice(&(i % 2).to_le_bytes());
    }
    put_lump(&mut out, BRUSHSIDES, &sides);
    out.extend_from_slice(b"unmodelled trailing bytes");
    out
}

pub fn write_map(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, data).expect("write map");
    path
}

/// `(plane, texinfo, dispinfo, bevel)` for every brush side.
pub fn brush_sides(data: &[u8]) -> Vec<(u16, i16, i16, i16)> {
    let base = 8 + BRUSHSIDES * 16;
    let offset = u32::from_le_bytes(data[base..base + 4].try_into().unwrap()) as usize;
    let length = u32::from_le_bytes(data[base + 4..base + 8].try_into().unwrap()) as usize;
    data[offset..offset + length]
        .chunks_exact(8)
        .map(|r| {
            (
                u16::from_le_bytes([r[0], r[1]]),
                i16::from_le_bytes([r[2], r[3]]),
                i16::from_le_bytes([r[4], r[5]]),
                i16::from_le_bytes([r[6], r[7]]),
            )
        })
        .collect()
}
