//! burnish — polishes mechanically translated code.
//!
//! Rewrites the source files of the named packages in place. If every
//! argument ends in `.go`, the arguments form a single ad-hoc package.
//! With `-diff`, nothing is written; a unified diff goes to stdout.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use burnish_core::{default_pipeline, diff, Context, Package};
use clap::Parser;

#[derive(Parser)]
#[command(
    name = "burnish",
    about = "Polish mechanically translated code",
    arg_required_else_help = true
)]
struct Cli {
    /// Print diffs instead of rewriting files.
    #[arg(long = "diff", short = 'd')]
    diff: bool,

    /// Verbose diagnostics.
    #[arg(short = 'v')]
    verbose: bool,

    /// Package paths, or a list of source files forming one package.
    #[arg(required = true)]
    targets: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let pipeline = default_pipeline();
    let mut ctxt = Context::new();

    if cli.targets.iter().all(|t| t.ends_with(".go")) {
        let files: Vec<PathBuf> = cli.targets.iter().map(PathBuf::from).collect();
        if let Some(pkg) = pipeline.run_files(&mut ctxt, &files) {
            emit(&mut ctxt, &pkg, cli.diff);
        }
    } else {
        for target in &cli.targets {
            if let Some(pkg) = pipeline.run_package(&mut ctxt, target) {
                emit(&mut ctxt, &pkg, cli.diff);
            }
        }
    }

    if ctxt.errors {
        std::process::exit(1);
    }
    Ok(())
}

fn emit(ctxt: &mut Context, pkg: &Package, print_diff: bool) {
    for name in &pkg.filenames {
        if !pkg.modified(name) {
            continue;
        }

        if print_diff {
            let text = diff::unified(
                &name.display().to_string(),
                pkg.orig_src(name),
                pkg.src(name),
            );
            let mut stdout = std::io::stdout().lock();
            let _ = stdout.write_all(text.as_bytes());
            continue;
        }

        if let Err(err) = std::fs::write(name, pkg.src(name)) {
            ctxt.error(format!("{}: {}", name.display(), err));
            continue;
        }
        eprintln!("{}: rewrote", name.display());
    }
}
