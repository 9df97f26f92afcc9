use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use obfuscator_core::{
    inspect, run, run_with_policy, ObfuscatorSettings, PolicyKind, RunReport, Strategy,
};

mod console;

use console::ConsolePolicy;

#[derive(Debug, Parser)]
#[command(name = "bsp-obfuscator", version, about = "Relabels brush side textures in Source BSP maps")]
struct Cli {
    /// Only print warnings and errors.
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Print every group choice.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write an obfuscated copy of a map (or of every map under a directory).
    Obfuscate(ObfuscateArgs),
    /// Print the lump directory and surface flag groups of a map.
    Inspect(InspectArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    /// One texture per distinct surface-flags value.
    Flags,
    /// One texture for every brush side.
    Forced,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    Interactive,
    Random,
    Script,
}

#[derive(Debug, clap::Args)]
struct ObfuscateArgs {
    #[arg(long)]
    input: PathBuf,

    /// Defaults to `<stem>_obfuscated.bsp` next to the input.
    #[arg(long)]
    output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = StrategyArg::Flags)]
    strategy: StrategyArg,

    #[arg(long, value_enum, default_value_t = PolicyArg::Interactive)]
    policy: PolicyArg,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// JSON selection script, required by `--policy script`.
    #[arg(long, required_if_eq("policy", "script"))]
    script: Option<PathBuf>,

    /// Skip re-reading the output to check untouched bytes.
    #[arg(long, default_value_t = false)]
    no_verify: bool,

    /// Also write `<output>.report.json`.
    #[arg(long, default_value_t = false)]
    debug: bool,
}

#[derive(Debug, clap::Args)]
struct InspectArgs {
    #[arg(long)]
    input: PathBuf,

    #[arg(long, default_value_t = false)]
    json: bool,
}

fn init_logging(cli: &Cli) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();
}

fn obfuscate(args: ObfuscateArgs) -> obfuscator_core::Result<Vec<RunReport>> {
    let settings = ObfuscatorSettings {
        input_path: args.input,
        output_path: args.output,
        strategy: match args.strategy {
            StrategyArg::Flags => Strategy::FlagGrouped,
            StrategyArg::Forced => Strategy::ForcedTexture,
        },
        policy: match args.policy {
            PolicyArg::Interactive => PolicyKind::Interactive,
            PolicyArg::Random => PolicyKind::Random,
            PolicyArg::Script => PolicyKind::Script,
        },
        seed: args.seed,
        script_path: args.script,
        verify: !args.no_verify,
        debug: args.debug,
    };

    match settings.policy {
        PolicyKind::Interactive => run_with_policy(&settings, &mut ConsolePolicy::stdio()),
        _ => run(&settings),
    }
}

fn print_summary(args: &InspectArgs) -> obfuscator_core::Result<()> {
    let summary = inspect(&args.input)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!(
        "{}: VBSP v{} rev {} ({} bytes)",
        summary.path.display(),
        summary.version,
        summary.map_revision,
        summary.file_size
    );
    println!("lumps:");
    for lump in &summary.lumps {
        println!(
            "  {:2} {:<32} offset 0x{:08X} length {}",
            lump.index, lump.name, lump.offset, lump.length
        );
    }
    println!(
        "texinfo: {}, texdata: {}, names: {}, brush sides: {}",
        summary.tex_infos, summary.tex_datas, summary.strings, summary.brush_sides
    );
    println!("surface groups:");
    for group in &summary.groups {
        println!(
            "  flags 0x{:08X} ({}) texinfo: {}, brush sides: {}",
            group.flags, group.label, group.tex_infos, group.brush_sides
        );
        for texture in &group.textures {
            println!("    {texture}");
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    let result = match cli.command {
        Command::Obfuscate(args) => obfuscate(args).map(|reports| {
            for report in reports {
                println!("Wrote {}", report.output.display());
            }
        }),
        Command::Inspect(args) => print_summary(&args),
    };

    if let Err(err) = result {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
