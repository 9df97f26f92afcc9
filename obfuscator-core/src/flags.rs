use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::records::TexInfo;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
pub enum SurfaceFlag {
    Light,
    Sky2d,
    Sky,
    Warp,
    Trans,
    NoPortal,
    Trigger,
    NoDraw,
    Hint,
    Skip,
    NoLight,
    BumpLight,
    NoShadows,
    NoDecals,
    NoChop,
    Hitbox,
}

// Bits 16 and up are engine-private; they are left unnamed.
const SURFACE_FLAG_BITS: [(u32, SurfaceFlag); 16] = [
    (0x0001, SurfaceFlag::Light),
    (0x0002, SurfaceFlag::Sky2d),
    (0x0004, SurfaceFlag::Sky),
    (0x0008, SurfaceFlag::Warp),
    (0x0010, SurfaceFlag::Trans),
    (0x0020, SurfaceFlag::NoPortal),
    (0x0040, SurfaceFlag::Trigger),
    (0x0080, SurfaceFlag::NoDraw),
    (0x0100, SurfaceFlag::Hint),
    (0x0200, SurfaceFlag::Skip),
    (0x0400, SurfaceFlag::NoLight),
    (0x0800, SurfaceFlag::BumpLight),
    (0x1000, SurfaceFlag::NoShadows),
    (0x2000, SurfaceFlag::NoDecals),
    (0x4000, SurfaceFlag::NoChop),
    (0x8000, SurfaceFlag::Hitbox),
];

impl SurfaceFlag {
    pub fn name(self) -> &'static str {
        match self {
            SurfaceFlag::Light => "LIGHT",
            SurfaceFlag::Sky2d => "SKY2D",
            SurfaceFlag::Sky => "SKY",
            SurfaceFlag::Warp => "WARP",
            SurfaceFlag::Trans => "TRANS",
            SurfaceFlag::NoPortal => "NOPORTAL",
            SurfaceFlag::Trigger => "TRIGGER",
            SurfaceFlag::NoDraw => "NODRAW",
            SurfaceFlag::Hint => "HINT",
            SurfaceFlag::Skip => "SKIP",
            SurfaceFlag::NoLight => "NOLIGHT",
            SurfaceFlag::BumpLight => "BUMPLIGHT",
            SurfaceFlag::NoShadows => "NOSHADOWS",
            SurfaceFlag::NoDecals => "NODECALS",
            SurfaceFlag::NoChop => "NOCHOP",
            SurfaceFlag::Hitbox => "HITBOX",
        }
    }

    pub fn bit(self) -> u32 {
        SURFACE_FLAG_BITS
            .iter()
            .find(|(_, flag)| *flag == self)
            .map(|(bit, _)| *bit)
            .unwrap_or(0)
    }
}

impl fmt::Display for SurfaceFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Named flags set in `bitmask`, in bit order. Unassigned bits are ignored.
pub fn classify(bitmask: i32) -> Vec<SurfaceFlag> {
    let bits = bitmask as u32;
    SURFACE_FLAG_BITS
        .iter()
        .filter(|(bit, _)| bits & bit != 0)
        .map(|(_, flag)| *flag)
        .collect()
}

/// Human label for a flag set, e.g. `TRANS | NODRAW`.
pub fn describe(flags: &[SurfaceFlag]) -> String {
    if flags.is_empty() {
        return "none".to_string();
    }
    flags
        .iter()
        .map(|f| f.name())
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Texinfo records sharing one exact `flags` value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagGroup {
    pub flags: i32,
    pub tex_infos: Vec<usize>,
}

impl FlagGroup {
    pub fn label(&self) -> Vec<SurfaceFlag> {
        classify(self.flags)
    }
}

/// Groups texinfo indices by exact bitmask. Groups come out in order of the
/// first texinfo carrying each bitmask; members keep array order.
pub fn group_indices_by_flag(tex_infos: &[TexInfo]) -> Vec<FlagGroup> {
    let mut slot_for_flags: HashMap<i32, usize> = HashMap::new();
    let mut groups: Vec<FlagGroup> = Vec::new();

    for (index, info) in tex_infos.iter().enumerate() {
        let slot = *slot_for_flags.entry(info.flags).or_insert_with(|| {
            groups.push(FlagGroup {
                flags: info.flags,
                tex_infos: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].tex_infos.push(index);
    }

    groups
}
