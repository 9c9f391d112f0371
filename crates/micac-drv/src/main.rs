//! micac - CLI entry point.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use micac_drv::{compile, Config, Options};

/// Compiler for the Mica language
///
/// Compiles a source file to a 32-bit x86 executable via NASM and the
/// system linker.
#[derive(Parser, Debug)]
#[command(name = "micac")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compiler for the Mica language", long_about = None)]
struct Cli {
    /// Input source file to compile
    input_file: PathBuf,

    /// Output executable name
    #[arg(short, long, default_value = "program")]
    output: String,

    /// Disable optimization
    #[arg(long)]
    no_optimize: bool,

    /// Print tokens
    #[arg(long)]
    print_tokens: bool,

    /// Print the AST
    #[arg(long)]
    print_ast: bool,

    /// Print TAC
    #[arg(long)]
    print_tac: bool,

    /// Print optimized TAC
    #[arg(long)]
    print_optimized_tac: bool,

    /// Save the assembly file under this name (default: don't save)
    #[arg(long, value_name = "NAME")]
    save_asm: Option<String>,
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config {
        input: cli.input_file.clone(),
        output: cli.output,
        save_asm: cli.save_asm,
        options: Options {
            optimize: !cli.no_optimize,
            print_tokens: cli.print_tokens,
            print_ast: cli.print_ast,
            print_tac: cli.print_tac,
            print_optimized_tac: cli.print_optimized_tac,
        },
    };
    compile(&config)
        .with_context(|| format!("failed to compile '{}'", cli.input_file.display()))?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
}
