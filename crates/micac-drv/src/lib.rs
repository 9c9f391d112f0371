//! micac-drv - Compiler Driver
//!
//! Orchestrates the pipeline:
//!
//! ```text
//! source text
//!     │
//!     ▼
//! [micac-lex]  token stream      --print-tokens
//!     │
//!     ▼
//! [micac-par]  AST               --print-ast
//!     │
//!     ▼
//! [micac-sem]  annotated AST
//!     │
//!     ▼
//! [micac-tac]  TAC               --print-tac
//!     │
//!     ▼
//! [micac-tac]  optimized TAC     --print-optimized-tac (skipped by --no-optimize)
//!     │
//!     ▼
//! [micac-gen]  assembly text     --save-asm
//!     │
//!     ▼
//! nasm + ld    executable        -o NAME
//! ```
//!
//! Every stage is pure text-in/value-out; the driver owns all file I/O
//! and the external tool invocations, so the whole pipeline up to
//! assembly is testable without touching the filesystem.

pub mod error;

use std::fs;
use std::path::PathBuf;

pub use error::{CompileError, Result};
use micac_lex::language_tokenizer;
use micac_par::dump_program;

/// Pipeline behavior flags.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub optimize: bool,
    pub print_tokens: bool,
    pub print_ast: bool,
    pub print_tac: bool,
    pub print_optimized_tac: bool,
}

impl Options {
    /// Optimization on, all dumps off.
    pub fn optimized() -> Self {
        Self {
            optimize: true,
            ..Self::default()
        }
    }
}

/// Full driver configuration: pipeline flags plus file handling.
#[derive(Debug, Clone)]
pub struct Config {
    /// Source file to compile
    pub input: PathBuf,
    /// Output executable name
    pub output: String,
    /// Keep the assembly under this name (`.asm` appended when missing)
    pub save_asm: Option<String>,
    pub options: Options,
}

/// The runtime assembly shipped with the compiler, merged into every
/// emitted file.
pub const RUNTIME_ASM: &str = include_str!("../runtime.asm");

/// Run the pipeline from source text to assembly text.
pub fn compile_to_asm(source: &str, options: &Options) -> Result<String> {
    let tokenizer = language_tokenizer()?;
    let tokens = tokenizer.tokenize(source)?;
    if options.print_tokens {
        for token in &tokens {
            println!("{token}");
        }
    }

    let mut program = micac_par::parse(tokens)?;
    if options.print_ast {
        print!("{}", dump_program(&program));
    }

    micac_sem::analyze(&mut program)?;

    let mut tac = micac_tac::generate(&program)?;
    if options.print_tac {
        print!("{}", tac.dump());
    }

    if options.optimize {
        micac_tac::optimize(&mut tac)?;
        if options.print_optimized_tac {
            println!("After optimization:");
            print!("{}", tac.dump());
        }
    }

    Ok(micac_gen::generate(&tac, RUNTIME_ASM)?)
}

/// Compile a source file all the way to an executable.
///
/// The assembly file is kept only under `--save-asm`; the object file is
/// removed after a successful link.
pub fn compile(config: &Config) -> Result<()> {
    let source = fs::read_to_string(&config.input).map_err(|source| CompileError::Io {
        path: config.input.clone(),
        source,
    })?;
    if source.trim().is_empty() {
        return Err(CompileError::EmptyInput {
            path: config.input.clone(),
        });
    }

    let assembly = compile_to_asm(&source, &config.options)?;

    let tools = micac_gen::host_tools();
    let asm_path = match &config.save_asm {
        Some(name) => {
            let mut name = name.clone();
            if !name.ends_with(".asm") {
                name.push_str(".asm");
            }
            PathBuf::from(name)
        }
        None => PathBuf::from(format!("{}.asm", config.output)),
    };
    let object_path = PathBuf::from(format!("{}{}", config.output, tools.object_ext));
    let executable_path = PathBuf::from(format!("{}{}", config.output, tools.executable_ext));

    fs::write(&asm_path, &assembly).map_err(|source| CompileError::Io {
        path: asm_path.clone(),
        source,
    })?;

    let toolchain_result = micac_gen::assemble(&tools, &asm_path, &object_path)
        .and_then(|()| micac_gen::link(&tools, &object_path, &executable_path));

    if config.save_asm.is_none() {
        let _ = fs::remove_file(&asm_path);
    }
    let _ = fs::remove_file(&object_path);

    toolchain_result?;
    Ok(())
}
