//! Thin CLI wrapper: assembles a real `Host` and hands off to the library's
//! `compile_and_run`. Grounded on the teacher's own `main.rs`
//! (`Emulator::new().run(...)`) — all the substantive work lives in the lib.

use std::process::ExitCode;

use microc::host::{Host, OsFileSystem, TermTerminal};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let host = Host { fs: Box::new(OsFileSystem::new()), term: Box::new(TermTerminal::new()) };
    let code = microc::compile_and_run(&args, host);
    ExitCode::from(code as u8)
}
