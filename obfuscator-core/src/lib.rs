use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

pub mod cursor;
pub mod flags;
pub mod lumps;
pub mod map;
pub mod policy;
pub mod records;
pub mod rewrite;

#[cfg(test)]
mod test_support;

pub use map::BspMap;
pub use policy::{
    Candidate, InvalidSelection, RandomPolicy, ScriptedPolicy, SelectionPolicy, SelectionScript,
    TextureChoice,
};
pub use rewrite::{GroupChoice, RemapPlan, Strategy};

use flags::{describe, group_indices_by_flag};
use lumps::{lump_name, HEADER_LUMPS};

/// Appended to the input file stem to name the rewritten copy.
pub const OUTPUT_SUFFIX: &str = "_obfuscated";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    Interactive,
    Random,
    Script,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObfuscatorSettings {
    pub input_path: PathBuf,
    pub output_path: Option<PathBuf>,
    pub strategy: Strategy,
    pub policy: PolicyKind,
    pub seed: u64,
    pub script_path: Option<PathBuf>,
    pub verify: bool,
    pub debug: bool,
}

#[derive(Debug, Error)]
pub enum ObfuscatorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported format: ident {ident:#010x}, version {version}")]
    UnsupportedFormat { ident: u32, version: i32 },
    #[error("truncated input: {needed} bytes at offset {offset} exceed file size {size}")]
    Truncated {
        offset: usize,
        needed: usize,
        size: usize,
    },
    #[error("corrupt lump {lump}: length {length} is not a multiple of record size {record_size}")]
    CorruptLump {
        lump: &'static str,
        length: u32,
        record_size: usize,
    },
    #[error("corrupt reference: {what} {index} out of range (0..{len})")]
    CorruptReference {
        what: &'static str,
        index: i64,
        len: usize,
    },
    #[error("no texinfo uses texture {name:?} (string id {id})")]
    NoMatchingTexInfo { id: u32, name: String },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

pub type Result<T> = std::result::Result<T, ObfuscatorError>;

/// `maps/de_foo.bsp` -> `maps/de_foo_obfuscated.bsp`.
pub fn derive_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match input.extension() {
        Some(ext) => format!("{stem}{OUTPUT_SUFFIX}.{}", ext.to_string_lossy()),
        None => format!("{stem}{OUTPUT_SUFFIX}"),
    };
    input.with_file_name(name)
}

fn is_map_file(path: &Path) -> bool {
    path.extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("bsp"))
}

/// True when `output` names the file at `input`, however it is spelled.
fn is_same_file(input: &Path, output: &Path) -> Result<bool> {
    let input = fs::canonicalize(input)?;
    if output.exists() {
        return Ok(fs::canonicalize(output)? == input);
    }
    let parent = output.parent().filter(|p| !p.as_os_str().is_empty());
    let parent = match parent {
        Some(parent) if parent.exists() => fs::canonicalize(parent)?,
        Some(_) => return Ok(false),
        None => std::env::current_dir()?,
    };
    Ok(output
        .file_name()
        .map_or(false, |name| parent.join(name) == input))
}

fn is_obfuscated_output(path: &Path) -> bool {
    path.file_stem()
        .map_or(false, |stem| stem.to_string_lossy().ends_with(OUTPUT_SUFFIX))
}

/// Input/output pairs for one run. A directory input expands to every map
/// file below it.
pub fn collect_jobs(settings: &ObfuscatorSettings) -> Result<Vec<(PathBuf, PathBuf)>> {
    let input = &settings.input_path;
    if !input.exists() {
        return Err(ObfuscatorError::Config(format!(
            "Input path does not exist: {}",
            input.display()
        )));
    }

    if input.is_file() {
        let output = match &settings.output_path {
            Some(out) if out.is_dir() => out.join(
                derive_output_path(input)
                    .file_name()
                    .unwrap_or_default(),
            ),
            Some(out) => out.clone(),
            None => derive_output_path(input),
        };
        return Ok(vec![(input.clone(), output)]);
    }

    let mut jobs = Vec::new();
    for entry in WalkDir::new(input).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() || !is_map_file(path) || is_obfuscated_output(path) {
            continue;
        }
        let output = match &settings.output_path {
            Some(out_root) => {
                let relative = path.strip_prefix(input).unwrap_or(path);
                derive_output_path(&out_root.join(relative))
            }
            None => derive_output_path(path),
        };
        jobs.push((path.to_path_buf(), output));
    }

    if jobs.is_empty() {
        log::warn!("no .bsp files found under {}", input.display());
    }
    Ok(jobs)
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub strategy: Strategy,
    pub brush_sides_patched: usize,
    pub choices: Vec<GroupChoice>,
    /// `None` when verification was not requested.
    pub untouched_bytes_identical: Option<bool>,
}

/// Rewrites one map. Nothing is written unless the input parses and every
/// selection has been made.
pub fn obfuscate_file(
    input: &Path,
    output: &Path,
    strategy: Strategy,
    policy: &mut dyn SelectionPolicy,
    verify: bool,
) -> Result<RunReport> {
    if is_same_file(input, output)? {
        return Err(ObfuscatorError::Config(format!(
            "refusing to overwrite the input file {}",
            input.display()
        )));
    }

    let source = fs::read(input)?;
    let map = BspMap::parse(&source)?;
    let plan = rewrite::plan(&map, strategy, policy)?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let brush_lump = map.header.brush_sides();
    rewrite::write_obfuscated(&source, brush_lump, &plan, output)?;

    let untouched_bytes_identical = if verify {
        let written = fs::read(output)?;
        let identical = rewrite::verify_untouched(&source, &written, brush_lump);
        if !identical {
            log::error!(
                "{}: bytes outside the brush side texinfo fields changed",
                output.display()
            );
        }
        Some(identical)
    } else {
        None
    };

    log::info!(
        "{} -> {} ({} brush sides patched)",
        input.display(),
        output.display(),
        plan.new_tex_info.len()
    );

    Ok(RunReport {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        strategy,
        brush_sides_patched: plan.new_tex_info.len(),
        choices: plan.choices,
        untouched_bytes_identical,
    })
}

/// Runs every job with a caller-supplied policy (e.g. a console prompt).
pub fn run_with_policy(
    settings: &ObfuscatorSettings,
    policy: &mut dyn SelectionPolicy,
) -> Result<Vec<RunReport>> {
    let mut reports = Vec::new();
    for (input, output) in collect_jobs(settings)? {
        let report = obfuscate_file(&input, &output, settings.strategy, policy, settings.verify)?;

        if settings.debug {
            let mut report_path = output.clone().into_os_string();
            report_path.push(".report.json");
            fs::write(&report_path, serde_json::to_string_pretty(&report)?)?;
        }
        reports.push(report);
    }
    Ok(reports)
}

/// Runs with one of the non-interactive policies named in `settings`.
pub fn run(settings: &ObfuscatorSettings) -> Result<Vec<RunReport>> {
    match settings.policy {
        PolicyKind::Random => run_with_policy(settings, &mut RandomPolicy::new(settings.seed)),
        PolicyKind::Script => {
            let path = settings.script_path.as_ref().ok_or_else(|| {
                ObfuscatorError::Config("script policy needs a script path".to_string())
            })?;
            let script = SelectionScript::load(path)?;
            run_with_policy(settings, &mut ScriptedPolicy::new(script))
        }
        PolicyKind::Interactive => Err(ObfuscatorError::Config(
            "interactive selection needs a console policy; use run_with_policy".to_string(),
        )),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LumpSummary {
    pub index: usize,
    pub name: &'static str,
    pub offset: u32,
    pub length: u32,
    pub version: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    pub flags: i32,
    pub label: String,
    pub tex_infos: usize,
    pub brush_sides: usize,
    pub textures: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapSummary {
    pub path: PathBuf,
    pub file_size: usize,
    pub version: i32,
    pub map_revision: i32,
    pub lumps: Vec<LumpSummary>,
    pub tex_infos: usize,
    pub tex_datas: usize,
    pub strings: usize,
    pub brush_sides: usize,
    pub groups: Vec<GroupSummary>,
}

/// Reads a map and describes its lump directory and surface groups.
pub fn inspect(path: &Path) -> Result<MapSummary> {
    let data = fs::read(path)?;
    let map = BspMap::parse(&data)?;

    let lumps = (0..HEADER_LUMPS)
        .filter(|&i| !map.header.lump(i).is_empty())
        .map(|i| {
            let lump = map.header.lump(i);
            LumpSummary {
                index: i,
                name: lump_name(i),
                offset: lump.offset,
                length: lump.length,
                version: lump.version,
            }
        })
        .collect();

    let mut groups = Vec::new();
    for group in group_indices_by_flag(&map.tex_infos) {
        let textures = rewrite::group_candidates(&map, &group)?
            .into_iter()
            .map(|c| c.name)
            .collect();
        let brush_sides = map
            .brush_sides
            .iter()
            .filter(|s| usize::try_from(s.tex_info).map_or(false, |i| group.tex_infos.contains(&i)))
            .count();
        groups.push(GroupSummary {
            flags: group.flags,
            label: describe(&group.label()),
            tex_infos: group.tex_infos.len(),
            brush_sides,
            textures,
        });
    }

    Ok(MapSummary {
        path: path.to_path_buf(),
        file_size: data.len(),
        version: map.header.version,
        map_revision: map.header.map_revision,
        lumps,
        tex_infos: map.tex_infos.len(),
        tex_datas: map.tex_datas.len(),
        strings: map.strings.len(),
        brush_sides: map.brush_sides.len(),
        groups,
    })
}
