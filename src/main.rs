use std::{fs, io, path::Path, path::PathBuf};

use clap::{CommandFactory, Parser};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt};

use stackvm::bytecode::ProgramImage;
use stackvm::bytecode::disasm::print_bc;
use stackvm::frontend::lexer::Lexer;
use stackvm::frontend::token_dumper::TokenDumper;
use stackvm::frontend::{AsmLimits, Assembler};
use stackvm::runtime::{NoTrace, TracePrinter, Vm, VmConfig};

/// Assemble a stack machine listing and run it with a per-step trace
#[derive(Parser, Debug)]
#[command(name = "stackvm", version)]
#[command(about = "Assemble and run a stack machine program", long_about = None)]
struct Cli {
    /// Assembly source file (a program image with --image)
    path: Option<PathBuf>,

    /// Do not print the per-step execution trace
    #[arg(long)]
    no_trace: bool,

    /// Show tokens only
    #[arg(long)]
    tokens: bool,

    /// Disable ANSI colors in --tokens output
    #[arg(long)]
    no_color: bool,

    /// Print a disassembly listing instead of running
    #[arg(long)]
    disasm: bool,

    /// Write the assembled program image to FILE instead of running
    #[arg(long, value_name = "FILE")]
    emit: Option<PathBuf>,

    /// Treat PATH as a program image written by --emit
    #[arg(long)]
    image: bool,

    /// Maximum operand stack depth
    #[arg(long, default_value_t = VmConfig::default().max_stack_size)]
    stack_size: usize,

    /// Maximum call stack depth
    #[arg(long, default_value_t = VmConfig::default().max_call_depth)]
    call_depth: usize,

    /// Number of integer memory cells
    #[arg(long, default_value_t = VmConfig::default().memory_size)]
    memory_size: usize,

    /// Abort after this many instructions (unlimited by default)
    #[arg(long)]
    max_steps: Option<usize>,
}

impl Cli {
    fn vm_config(&self) -> VmConfig {
        VmConfig {
            max_stack_size: self.stack_size,
            max_call_depth: self.call_depth,
            memory_size: self.memory_size,
            max_steps: self.max_steps,
        }
    }
}

fn main() {
    // RUST_LOG controls library logging; stdout stays reserved for the trace
    // and program output.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let Some(path) = cli.path.as_deref() else {
        print_usage();
        return;
    };

    if cli.tokens {
        let source = read_source(path);
        dump_tokens(&source, cli.no_color);
        return;
    }

    let code = if cli.image {
        load_image(path)
    } else {
        assemble_file(path)
    };

    if let Some(out_path) = &cli.emit {
        write_image(out_path, code);
        return;
    }

    if cli.disasm {
        print_bc(&path.display().to_string(), &code);
        return;
    }

    run_program(&code, cli.vm_config(), !cli.no_trace);
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{}", message);
    std::process::exit(1);
}

fn print_usage() {
    let mut cmd = Cli::command();
    if let Err(e) = cmd.print_help() {
        fail(format!("Failed to print help: {}", e));
    }
    println!();
    println!("Integer sample: demos/sample_int.asm");
    println!("Float sample:   demos/sample_float.asm");
}

fn read_source(path: &Path) -> String {
    fs::read_to_string(path)
        .unwrap_or_else(|e| fail(format!("Failed to open '{}': {}", path.display(), e)))
}

fn dump_tokens(source: &str, no_color: bool) {
    let lines = match Lexer::new(source).tokenize() {
        Ok(lines) => lines,
        Err(e) => fail(e),
    };

    let mut dumper = TokenDumper::new();
    if no_color {
        dumper = dumper.no_color();
    }
    if let Err(e) = dumper.dump(&lines) {
        fail(format!("Failed to write tokens: {}", e));
    }
}

fn assemble_file(path: &Path) -> Vec<u8> {
    let source = read_source(path);
    let code = match Assembler::with_limits(AsmLimits::default()).assemble(&source) {
        Ok(code) => code,
        Err(e) => fail(e),
    };
    println!("Assembled {} bytes.", code.len());
    code
}

fn load_image(path: &Path) -> Vec<u8> {
    let bytes = fs::read(path)
        .unwrap_or_else(|e| fail(format!("Failed to open '{}': {}", path.display(), e)));
    let image = match ProgramImage::from_bytes(&bytes) {
        Ok(image) => image,
        Err(e) => fail(format!("'{}': {}", path.display(), e)),
    };
    debug!(path = %path.display(), bytes = image.code.len(), "image loaded");
    println!("Loaded {} bytes.", image.code.len());
    image.code
}

fn write_image(path: &Path, code: Vec<u8>) {
    let bytes = match ProgramImage::new(code).to_bytes() {
        Ok(bytes) => bytes,
        Err(e) => fail(e),
    };
    if let Err(e) = fs::write(path, &bytes) {
        fail(format!("Failed to write '{}': {}", path.display(), e));
    }
    println!("Wrote image '{}' ({} bytes).", path.display(), bytes.len());
}

fn run_program(code: &[u8], config: VmConfig, trace: bool) {
    let mut vm = Vm::with_config(config);
    let mut out = io::stdout();

    let result = if trace {
        vm.run_traced(code, &mut out, &mut TracePrinter::new(io::stdout()))
    } else {
        vm.run_traced(code, &mut out, &mut NoTrace)
    };

    match result {
        Ok(exit) => debug!(?exit, steps = vm.steps(), "program finished"),
        Err(e) => fail(e),
    }
}
