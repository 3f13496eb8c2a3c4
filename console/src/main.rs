//! `jvmcore-console`: the spec's only permitted CLI surface (spec.md §6) — a
//! debug console that loads a memory image into a registered engine variant,
//! runs it for a cycle budget or until every core halts, and dumps each
//! core's exception register and stack top.

mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use jvmcore_variants::{MemoryImage, registry};

use config::Config;

#[derive(Parser, Debug)]
#[command(name = "jvmcore-console", about = "Cycle-level debug console for the jvmcore engine")]
struct Cli {
    /// Registered engine variant to run (see --list-variants)
    variant: Option<String>,

    /// Path to a raw big-endian memory image
    image: Option<PathBuf>,

    /// Maximum cycles to run; overrides the config file's cycle_budget
    #[arg(long)]
    cycles: Option<u64>,

    /// TOML config file with persisted defaults (cycle_budget, log_level)
    #[arg(long, default_value = "jvmcore-console.toml")]
    config: PathBuf,

    /// Print a snapshot every N cycles instead of only at the end
    #[arg(long)]
    trace_every: Option<u64>,

    /// List registered variants and exit
    #[arg(long)]
    list_variants: bool,
}

fn print_variants() {
    for entry in registry::all() {
        println!("{:<16} {}", entry.name, entry.description);
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = Config::load(&cli.config);

    // SAFETY: called once, before any other thread exists (still in main's
    // single-threaded setup phase, ahead of env_logger::init()).
    if std::env::var("RUST_LOG").is_err() {
        unsafe { std::env::set_var("RUST_LOG", &config.log_level) };
    }
    env_logger::init();

    if cli.list_variants {
        print_variants();
        return ExitCode::SUCCESS;
    }

    let Some(variant_name) = cli.variant else {
        eprintln!("usage: jvmcore-console <variant> <image> [--cycles N]");
        eprintln!("       jvmcore-console --list-variants");
        return ExitCode::FAILURE;
    };
    let Some(image_path) = cli.image else {
        eprintln!("image path required");
        return ExitCode::FAILURE;
    };

    let Some(entry) = registry::find(&variant_name) else {
        eprintln!("unknown variant: {variant_name}");
        eprintln!("available:");
        print_variants();
        return ExitCode::FAILURE;
    };

    let image = match MemoryImage::from_file(&image_path) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("failed to load image {}: {e}", image_path.display());
            return ExitCode::FAILURE;
        }
    };

    let mut system = (entry.create)(image);
    let cycle_budget = cli.cycles.unwrap_or(config.cycle_budget);

    log::info!("running variant '{variant_name}' for up to {cycle_budget} cycles");

    let mut cycles_run = 0u64;
    while cycles_run < cycle_budget {
        let halted = system.step();
        cycles_run += 1;

        if let Some(every) = cli.trace_every
            && every > 0
            && cycles_run % every == 0
        {
            log::debug!("cycle {cycles_run}: {}", dump_snapshots(system.as_ref()));
        }

        if halted {
            log::info!("halted after {cycles_run} cycles");
            break;
        }
    }

    println!("--- final state after {cycles_run} cycles ---");
    println!("{}", dump_snapshots(system.as_ref()));

    ExitCode::SUCCESS
}

fn dump_snapshots(system: &dyn jvmcore_variants::System) -> String {
    (0..system.core_count())
        .map(|core| {
            let s = system.snapshot(core);
            format!(
                "core {}: halted={} exception={:?} sp={:#04x} stack_top={:#010x}",
                s.core_id, s.halted, s.exception, s.sp, s.stack_top
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
