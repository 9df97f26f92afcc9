use std::collections::{HashMap, HashSet};
use std::fs::{self, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::flags::{classify, describe, group_indices_by_flag, FlagGroup};
use crate::lumps::LumpDescriptor;
use crate::map::BspMap;
use crate::policy::{Candidate, InvalidSelection, SelectionPolicy, TextureChoice};
use crate::records::{BrushSide, LumpRecord};
use crate::{ObfuscatorError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// One representative texture per distinct flags value.
    FlagGrouped,
    /// Every brush side points at a single chosen texture.
    ForcedTexture,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupChoice {
    pub flags: i32,
    pub label: String,
    pub tex_info: usize,
    pub texture: String,
    pub candidates: usize,
}

/// New `tex_info` value for every brush side, in lump order.
#[derive(Debug, Clone, Serialize)]
pub struct RemapPlan {
    pub strategy: Strategy,
    pub new_tex_info: Vec<i16>,
    pub choices: Vec<GroupChoice>,
}

fn to_field(index: usize) -> Result<i16> {
    i16::try_from(index).map_err(|_| ObfuscatorError::CorruptReference {
        what: "texinfo index for brush side field",
        index: index as i64,
        len: i16::MAX as usize + 1,
    })
}

/// Members of `group` with distinct texture names, first occurrence first.
pub fn group_candidates(map: &BspMap, group: &FlagGroup) -> Result<Vec<Candidate>> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    for &tex_info in &group.tex_infos {
        let (name_id, name) = map.texture_name(tex_info)?;
        if !seen.insert(name_id) {
            continue;
        }
        candidates.push(Candidate {
            display_index: candidates.len(),
            tex_info,
            name_id,
            name,
        });
    }
    Ok(candidates)
}

/// Distinct names in the string table, each under its first id.
pub fn texture_choices(map: &BspMap) -> Result<Vec<TextureChoice>> {
    let mut seen = HashSet::new();
    let mut choices = Vec::new();
    for id in 0..map.strings.len() {
        let name = map.strings.string_at(id as i32)?;
        if seen.insert(name.clone()) {
            choices.push(TextureChoice { id: id as u32, name });
        }
    }
    Ok(choices)
}

fn request_representative<'c, P: SelectionPolicy + ?Sized>(
    policy: &mut P,
    group: &FlagGroup,
    candidates: &'c [Candidate],
) -> Result<&'c Candidate> {
    let label = group.label();
    loop {
        let answer = policy.choose_representative(&label, group.flags, candidates)?;
        if let Some(candidate) = candidates.iter().find(|c| c.display_index == answer) {
            return Ok(candidate);
        }
        let err = InvalidSelection {
            value: answer,
            allowed: candidates.len(),
        };
        log::warn!("{err}, asking again");
        policy.rejected(&err);
    }
}

fn request_texture<'c, P: SelectionPolicy + ?Sized>(
    policy: &mut P,
    choices: &'c [TextureChoice],
) -> Result<&'c TextureChoice> {
    loop {
        let answer = policy.choose_texture(choices)?;
        if let Some(choice) = choices.iter().find(|c| c.id == answer) {
            return Ok(choice);
        }
        let err = InvalidSelection {
            value: answer as usize,
            allowed: choices.len(),
        };
        log::warn!("{err}, asking again");
        policy.rejected(&err);
    }
}

/// Strategy A: every brush side takes the representative chosen for the
/// flags of the texinfo it currently references.
pub fn plan_flag_grouped<P: SelectionPolicy + ?Sized>(
    map: &BspMap,
    policy: &mut P,
) -> Result<RemapPlan> {
    // Dangling references are fatal; find them before anyone is asked anything.
    for side in &map.brush_sides {
        if side.tex_info == -1 {
            return Err(ObfuscatorError::CorruptReference {
                what: "texinfo index (-1 marks a bevel or surfaceless brush side)",
                index: -1,
                len: map.tex_infos.len(),
            });
        }
        map.tex_info(side.tex_info as i64)?;
    }

    let groups = group_indices_by_flag(&map.tex_infos);
    let mut rep_for_flags: HashMap<i32, i16> = HashMap::with_capacity(groups.len());
    let mut choices = Vec::with_capacity(groups.len());

    for group in &groups {
        let candidates = group_candidates(map, group)?;
        let chosen = request_representative(policy, group, &candidates)?;
        let label = describe(&group.label());
        log::debug!(
            "flags {:#x} ({label}): {} -> texinfo {}",
            group.flags,
            chosen.name,
            chosen.tex_info
        );

        rep_for_flags.insert(group.flags, to_field(chosen.tex_info)?);
        choices.push(GroupChoice {
            flags: group.flags,
            label,
            tex_info: chosen.tex_info,
            texture: chosen.name.clone(),
            candidates: candidates.len(),
        });
    }

    let mut new_tex_info = Vec::with_capacity(map.brush_sides.len());
    for side in &map.brush_sides {
        let flags = map.tex_info(side.tex_info as i64)?.flags;
        // Every texinfo belongs to exactly one group.
        let value = rep_for_flags.get(&flags).copied().ok_or_else(|| {
            ObfuscatorError::Config(format!("no representative for flags {flags:#x}"))
        })?;
        new_tex_info.push(value);
    }

    Ok(RemapPlan {
        strategy: Strategy::FlagGrouped,
        new_tex_info,
        choices,
    })
}

/// Strategy B: every brush side points at the first texinfo whose texture
/// carries the chosen name.
pub fn plan_forced_texture<P: SelectionPolicy + ?Sized>(
    map: &BspMap,
    policy: &mut P,
) -> Result<RemapPlan> {
    let choices = texture_choices(map)?;
    let chosen = request_texture(policy, &choices)?;

    // Matched by name: the same name may sit under several string ids.
    let mut fixed = None;
    for index in 0..map.tex_infos.len() {
        if map.texture_name(index)?.1 == chosen.name {
            fixed = Some(index);
            break;
        }
    }
    let fixed = fixed.ok_or_else(|| ObfuscatorError::NoMatchingTexInfo {
        id: chosen.id,
        name: chosen.name.clone(),
    })?;
    log::debug!("forcing every brush side to texinfo {fixed} ({})", chosen.name);

    let info = &map.tex_infos[fixed];
    let value = to_field(fixed)?;
    Ok(RemapPlan {
        strategy: Strategy::ForcedTexture,
        new_tex_info: vec![value; map.brush_sides.len()],
        choices: vec![GroupChoice {
            flags: info.flags,
            label: describe(&classify(info.flags)),
            tex_info: fixed,
            texture: chosen.name.clone(),
            candidates: choices.len(),
        }],
    })
}

pub fn plan<P: SelectionPolicy + ?Sized>(
    map: &BspMap,
    strategy: Strategy,
    policy: &mut P,
) -> Result<RemapPlan> {
    match strategy {
        Strategy::FlagGrouped => plan_flag_grouped(map, policy),
        Strategy::ForcedTexture => plan_forced_texture(map, policy),
    }
}

/// Overwrites only the `tex_info` field of each brush side in `out`, which
/// must already hold a full copy of the source file.
pub fn apply_plan<W: Write + Seek>(
    out: &mut W,
    brush_lump: &LumpDescriptor,
    plan: &RemapPlan,
) -> Result<()> {
    let count = brush_lump.length as usize / BrushSide::SIZE;
    if count != plan.new_tex_info.len() {
        return Err(ObfuscatorError::Config(format!(
            "remap covers {} brush sides but the lump holds {count}",
            plan.new_tex_info.len()
        )));
    }

    for (i, value) in plan.new_tex_info.iter().enumerate() {
        let pos = brush_lump.offset as u64
            + (i * BrushSide::SIZE + BrushSide::TEX_INFO_OFFSET) as u64;
        out.seek(SeekFrom::Start(pos))?;
        out.write_all(&value.to_le_bytes())?;
    }
    out.flush()?;
    Ok(())
}

/// Writes a fresh copy of `source` to `output`, then patches it in place.
pub fn write_obfuscated(
    source: &[u8],
    brush_lump: &LumpDescriptor,
    plan: &RemapPlan,
    output: &Path,
) -> Result<()> {
    fs::write(output, source)?;
    let mut file = OpenOptions::new().write(true).open(output)?;
    apply_plan(&mut file, brush_lump, plan)?;
    file.sync_all()?;
    Ok(())
}

/// True when `output` differs from `original` only inside the `tex_info`
/// fields of the brush-side lump.
pub fn verify_untouched(original: &[u8], output: &[u8], brush_lump: &LumpDescriptor) -> bool {
    if original.len() != output.len() {
        return false;
    }
    let start = brush_lump.offset as usize;
    let end = start + brush_lump.length as usize;
    let tex_field = BrushSide::TEX_INFO_OFFSET..BrushSide::TEX_INFO_OFFSET + 2;

    original
        .iter()
        .zip(output)
        .enumerate()
        .all(|(pos, (a, b))| {
            let patchable = (start..end).contains(&pos)
                && tex_field.contains(&((pos - start) % BrushSide::SIZE));
            patchable || a == b
        })
}
