//! Library entry point: CLI option parsing and the `compile_and_run` pipeline
//! that wires the lexer/parser/codegen/VM phases together. Grounded on the
//! teacher's `lib.rs` (`Configuration`/`Emulator::run` split between "binary
//! assembles the inputs" and "library owns the run loop") and `cc.c`'s own
//! argv walk for recognizing `-s`/`-t`/`-D`/`-h`.

pub mod ast;
pub mod bytecode;
pub mod codegen;
pub mod defines;
pub mod error;
pub mod expr;
pub mod host;
pub mod lexer;
pub mod parse;
pub mod segment;
pub mod stmt;
pub mod symtab;
pub mod token;
pub mod types;
pub mod value;
pub mod vm;

use std::path::Path;

use error::{CcError, CcResult};
use host::Host;
use parse::Parser;
use vm::{TraceMode, Vm};

/// Size of the data segment (string literals, globals, argv table). Large
/// enough for the kind of programs this core targets; tune per deployment.
const DATA_BOUND: usize = 64 * 1024;
/// Size of the VM's operand/call stack, in bytes.
const STACK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum HelpRequest {
    General,
    Library(String),
}

/// Parsed command line, per SPEC_FULL §6: `[-s] [-t|-ti] [-D name[=value]]*
/// [-h [lib]] <source> [program args...]`.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub disassemble_only: bool,
    pub trace: TraceModeOpt,
    pub defines: Vec<(String, i32)>,
    pub help: Option<HelpRequest>,
    pub source_path: Option<String>,
    pub program_args: Vec<String>,
}

/// A `Default`-able mirror of `vm::TraceMode` (which deliberately isn't
/// `Default` itself, since "off" is a meaningful choice only a caller
/// should spell out).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraceModeOpt {
    #[default]
    Off,
    Instructions,
    SingleStep,
}

impl From<TraceModeOpt> for TraceMode {
    fn from(t: TraceModeOpt) -> TraceMode {
        match t {
            TraceModeOpt::Off => TraceMode::Off,
            TraceModeOpt::Instructions => TraceMode::Instructions,
            TraceModeOpt::SingleStep => TraceMode::SingleStep,
        }
    }
}

impl Options {
    pub fn parse(argv: &[String]) -> CcResult<Options> {
        let mut opts = Options::default();
        let mut it = argv.iter().peekable();
        while let Some(arg) = it.peek() {
            if arg.as_str() == "-s" {
                opts.disassemble_only = true;
                it.next();
            } else if arg.as_str() == "-ti" {
                opts.trace = TraceModeOpt::SingleStep;
                it.next();
            } else if arg.as_str() == "-t" {
                opts.trace = TraceModeOpt::Instructions;
                it.next();
            } else if arg.as_str() == "-h" {
                it.next();
                opts.help = Some(match it.peek() {
                    Some(next) if !next.starts_with('-') => {
                        let lib = (*it.next().unwrap()).clone();
                        HelpRequest::Library(lib)
                    }
                    _ => HelpRequest::General,
                });
            } else if let Some(rest) = arg.strip_prefix("-D") {
                it.next();
                let spec = if rest.is_empty() {
                    it.next().cloned().ok_or_else(|| cli_error("-D requires a name[=value] argument"))?
                } else {
                    rest.to_string()
                };
                opts.defines.push(parse_define(&spec)?);
            } else {
                break;
            }
        }
        if opts.help.is_some() {
            return Ok(opts);
        }
        opts.source_path = it.next().cloned();
        opts.program_args = it.cloned().collect();
        Ok(opts)
    }
}

fn parse_define(spec: &str) -> CcResult<(String, i32)> {
    match spec.split_once('=') {
        Some((name, value)) => {
            let v: i32 = value
                .parse()
                .map_err(|_| cli_error(format!("-D {}: value must be an integer", spec)))?;
            Ok((name.to_string(), v))
        }
        None => Ok((spec.to_string(), 1)),
    }
}

fn cli_error(msg: impl Into<String>) -> CcError {
    CcError::syntax(error::SourceLoc { line: 0, text: String::new() }, msg)
}

fn source_path_with_extension(path: &str) -> String {
    if Path::new(path).extension().is_some() {
        path.to_string()
    } else {
        format!("{}.c", path)
    }
}

fn general_help() -> String {
    "usage: mcc [-s] [-t|-ti] [-D name[=value]]... [-h [function]] <source.c> [args...]\n\
     \n\
     -s           compile, print disassembly, and stop\n\
     -t           trace every executed instruction\n\
     -ti          trace every instruction plus accumulator/sp/bp\n\
     -D name[=v]  define name as the integer constant v (default 1)\n\
     -h [fn]      print this help, or the signature of host function fn"
        .to_string()
}

fn library_help(catalog: &host::HostCatalog, name: &str) -> String {
    match catalog.lookup(name) {
        Some(idx) => {
            let e = catalog.get(idx);
            format!(
                "{}: {} parameter(s), returns {}",
                e.name,
                e.sig.param_count(),
                if e.returns_float { "float" } else { "int" }
            )
        }
        None => format!("no such host function: {}", name),
    }
}

/// Writes the compiled program's own `argv` (program name plus any trailing
/// CLI arguments) into the data segment as NUL-terminated C strings plus a
/// pointer table, returning `(argc, argv_ptr)` ready to feed `main`.
fn layout_program_argv(data: &mut segment::DataSegment, program_name: &str, args: &[String]) -> CcResult<(i32, i32)> {
    let mut ptrs = Vec::with_capacity(args.len() + 1);
    for s in std::iter::once(program_name).chain(args.iter().map(String::as_str)) {
        let bytes = s.as_bytes();
        let at = data.alloc(bytes.len() + 1, true)?;
        data.write_bytes(at, bytes);
        data.write_u8(at + bytes.len(), 0);
        ptrs.push(at as i32);
    }
    let table_at = data.alloc(ptrs.len() * 4, true)?;
    for (i, p) in ptrs.iter().enumerate() {
        data.write_i32(table_at + i * 4, *p);
    }
    Ok((ptrs.len() as i32, table_at as i32))
}

/// The single entry point described in SPEC_FULL §6: parses `argv` (not
/// including the program's own `argv[0]`), compiles the named source file,
/// and either prints a disassembly (`-s`) or runs it on the VM. Returns the
/// process exit code.
pub fn compile_and_run(argv: &[String], mut host: Host) -> i32 {
    match run(argv, &mut host) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e.report());
            1
        }
    }
}

fn run(argv: &[String], host: &mut Host) -> CcResult<i32> {
    let opts = Options::parse(argv)?;

    if let Some(req) = &opts.help {
        let catalog = host::HostCatalog::standard();
        match req {
            HelpRequest::General => println!("{}", general_help()),
            HelpRequest::Library(name) => println!("{}", library_help(&catalog, name)),
        }
        return Ok(0);
    }

    let source_path = opts
        .source_path
        .as_ref()
        .ok_or_else(|| cli_error("missing source filename"))?;
    let full_path = source_path_with_extension(source_path);
    let src = std::fs::read_to_string(&full_path)?;

    let mut parser = Parser::new(&src, DATA_BOUND)?;
    for (name, value) in &opts.defines {
        parser.defines.insert(name.clone(), *value);
    }
    parser.compile_unit()?;

    let (argc, argv_ptr) = layout_program_argv(&mut parser.data, source_path, &opts.program_args)?;
    let program = codegen::generate(&parser, Some((argc, argv_ptr)))?;

    if opts.disassemble_only {
        println!("{}", vm::disassemble(&program.code));
        return Ok(0);
    }

    let catalog = parser.host;
    let mut data = parser.data;
    data.reserve_stack(STACK_SIZE);
    let mut vm = Vm::new(program.code, program.entry, data, &catalog, host, STACK_SIZE, opts.trace.into());
    vm.run()
}
