use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::flags::SurfaceFlag;
use crate::{ObfuscatorError, Result};

/// One texture offered as the representative of a flag group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    /// Position in the menu; this is what a policy answers with.
    pub display_index: usize,
    pub tex_info: usize,
    pub name_id: i32,
    pub name: String,
}

/// One distinct texture name from the string table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextureChoice {
    pub id: u32,
    pub name: String,
}

/// A policy answered with something outside the offered set.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("selection {value} is not one of the {allowed} offered choices")]
pub struct InvalidSelection {
    pub value: usize,
    pub allowed: usize,
}

/// Decides which texture stands in for a group (or for the whole map).
///
/// Answers outside the candidate set are re-requested by the caller after
/// a call to [`SelectionPolicy::rejected`].
pub trait SelectionPolicy {
    fn choose_representative(
        &mut self,
        label: &[SurfaceFlag],
        flags: i32,
        candidates: &[Candidate],
    ) -> Result<usize>;

    fn choose_texture(&mut self, candidates: &[TextureChoice]) -> Result<u32>;

    fn rejected(&mut self, _err: &InvalidSelection) {}
}

/// Choices loaded from a JSON file.
///
/// ```json
/// { "groups": { "16": "METAL", "0": "BRICK" }, "forced_texture": "TOOLS/NODRAW" }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionScript {
    /// Flags value -> texture name.
    #[serde(default)]
    pub groups: BTreeMap<i32, String>,
    #[serde(default)]
    pub forced_texture: Option<String>,
}

impl SelectionScript {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Answers from a [`SelectionScript`]. Groups the script does not mention
/// take their first candidate.
pub struct ScriptedPolicy {
    script: SelectionScript,
}

impl ScriptedPolicy {
    pub fn new(script: SelectionScript) -> Self {
        Self { script }
    }
}

impl SelectionPolicy for ScriptedPolicy {
    fn choose_representative(
        &mut self,
        _label: &[SurfaceFlag],
        flags: i32,
        candidates: &[Candidate],
    ) -> Result<usize> {
        let Some(wanted) = self.script.groups.get(&flags) else {
            log::debug!("script has no entry for flags {flags:#x}, taking first candidate");
            return Ok(0);
        };
        candidates
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(wanted))
            .map(|c| c.display_index)
            .ok_or_else(|| {
                ObfuscatorError::Config(format!(
                    "script texture {wanted:?} is not used by any surface with flags {flags:#x}"
                ))
            })
    }

    fn choose_texture(&mut self, candidates: &[TextureChoice]) -> Result<u32> {
        let wanted = self.script.forced_texture.as_deref().ok_or_else(|| {
            ObfuscatorError::Config("script has no forced_texture entry".to_string())
        })?;
        candidates
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(wanted))
            .map(|c| c.id)
            .ok_or_else(|| {
                ObfuscatorError::Config(format!(
                    "script texture {wanted:?} is not in the map's string table"
                ))
            })
    }
}

/// Uniform random picks, reproducible from a seed.
pub struct RandomPolicy {
    rng: StdRng,
}

impl RandomPolicy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed ^ 0xB5B5_0B5F_u64),
        }
    }
}

impl SelectionPolicy for RandomPolicy {
    fn choose_representative(
        &mut self,
        _label: &[SurfaceFlag],
        _flags: i32,
        candidates: &[Candidate],
    ) -> Result<usize> {
        if candidates.is_empty() {
            return Err(ObfuscatorError::Config("no candidates to choose from".to_string()));
        }
        Ok(candidates[self.rng.gen_range(0..candidates.len())].display_index)
    }

    fn choose_texture(&mut self, candidates: &[TextureChoice]) -> Result<u32> {
        if candidates.is_empty() {
            return Err(ObfuscatorError::Config("map has no texture names".to_string()));
        }
        Ok(candidates[self.rng.gen_range(0..candidates.len())].id)
    }
}
