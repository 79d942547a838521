//! Host interface (SPEC_FULL §4.6): `FileSystem`/`Terminal` collaborator
//! traits plus a sorted, binary-searchable catalog of host functions,
//! grounded on the teacher's `Device` trait (`devices.rs`) and its concrete
//! devices (`Floppy` -> `FileSystem`, raw terminal handling -> `Terminal`).
//! The catalog carries a representative cross-section of each functional
//! group rather than the original's full RP2040 SDK surface (see DESIGN.md).

use crate::defines;
use crate::error::CcError;
use crate::segment::DataSegment;
use crate::types::FuncSig;
use crate::value::Value;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};

/// The flash/littlefs collaborator. Implementations outside this crate back
/// it with a real filesystem or an in-memory fixture for tests.
pub trait FileSystem {
    fn open(&mut self, path: &str, flags: i32) -> Result<i32, String>;
    fn close(&mut self, fd: i32) -> Result<(), String>;
    fn read(&mut self, fd: i32, buf: &mut [u8]) -> Result<usize, String>;
    fn write(&mut self, fd: i32, buf: &[u8]) -> Result<usize, String>;
    fn seek(&mut self, fd: i32, offset: i64, whence: i32) -> Result<i64, String>;
    fn rewind(&mut self, fd: i32) -> Result<(), String> {
        self.seek(fd, 0, 0).map(|_| ())
    }
    fn remove(&mut self, path: &str) -> Result<(), String>;
    fn rename(&mut self, from: &str, to: &str) -> Result<(), String>;
}

/// The terminal collaborator: raw getchar/putchar and screen geometry.
pub trait Terminal {
    fn getchar(&mut self) -> Option<u8>;
    fn putchar(&mut self, b: u8);
    fn flush(&mut self);
    fn screen_size(&self) -> (u16, u16);
}

/// Everything the VM's syscall dispatcher needs from the outside world.
pub struct Host {
    pub fs: Box<dyn FileSystem>,
    pub term: Box<dyn Terminal>,
}

/// Real host backing used by the CLI binary: the process's actual
/// filesystem and a raw terminal.
pub struct OsFileSystem {
    handles: HashMap<i32, File>,
    next_fd: i32,
}

impl OsFileSystem {
    pub fn new() -> Self {
        OsFileSystem { handles: HashMap::new(), next_fd: 3 }
    }
}

impl Default for OsFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for OsFileSystem {
    fn open(&mut self, path: &str, flags: i32) -> Result<i32, String> {
        let mut opts = OpenOptions::new();
        if flags & 0x3 == 1 {
            opts.write(true).read(false);
        } else if flags & 0x3 == 2 {
            opts.read(true).write(true);
        } else {
            opts.read(true);
        }
        if flags & 0x0100 != 0 {
            opts.create(true);
        }
        if flags & 0x0200 != 0 {
            opts.append(true);
        }
        if flags & 0x0400 != 0 {
            opts.truncate(true);
        }
        let f = opts.open(path).map_err(|e| e.to_string())?;
        let fd = self.next_fd;
        self.next_fd += 1;
        self.handles.insert(fd, f);
        Ok(fd)
    }
    fn close(&mut self, fd: i32) -> Result<(), String> {
        self.handles.remove(&fd).map(|_| ()).ok_or_else(|| "bad fd".into())
    }
    fn read(&mut self, fd: i32, buf: &mut [u8]) -> Result<usize, String> {
        self.handles.get_mut(&fd).ok_or("bad fd")?.read(buf).map_err(|e| e.to_string())
    }
    fn write(&mut self, fd: i32, buf: &[u8]) -> Result<usize, String> {
        self.handles.get_mut(&fd).ok_or("bad fd")?.write(buf).map_err(|e| e.to_string())
    }
    fn seek(&mut self, fd: i32, offset: i64, whence: i32) -> Result<i64, String> {
        let from = match whence {
            1 => SeekFrom::Current(offset),
            2 => SeekFrom::End(offset),
            _ => SeekFrom::Start(offset as u64),
        };
        self.handles.get_mut(&fd).ok_or("bad fd")?.seek(from).map(|p| p as i64).map_err(|e| e.to_string())
    }
    fn remove(&mut self, path: &str) -> Result<(), String> {
        std::fs::remove_file(path).map_err(|e| e.to_string())
    }
    fn rename(&mut self, from: &str, to: &str) -> Result<(), String> {
        std::fs::rename(from, to).map_err(|e| e.to_string())
    }
}

/// Raw-mode terminal, reusing `termion` the way the teacher's `processor.rs`
/// `Display` impl already depends on it for cursor/color control.
pub struct TermTerminal {
    stdout: Option<termion::raw::RawTerminal<std::io::Stdout>>,
}

impl TermTerminal {
    pub fn new() -> Self {
        use termion::raw::IntoRawMode;
        let stdout = std::io::stdout().into_raw_mode().ok();
        TermTerminal { stdout }
    }
}

impl Default for TermTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Terminal for TermTerminal {
    fn getchar(&mut self) -> Option<u8> {
        let mut buf = [0u8; 1];
        std::io::stdin().read_exact(&mut buf).ok()?;
        Some(buf[0])
    }
    fn putchar(&mut self, b: u8) {
        if let Some(out) = self.stdout.as_mut() {
            let _ = out.write_all(&[b]);
        } else {
            print!("{}", b as char);
        }
    }
    fn flush(&mut self) {
        if let Some(out) = self.stdout.as_mut() {
            let _ = out.flush();
        } else {
            let _ = std::io::stdout().flush();
        }
    }
    fn screen_size(&self) -> (u16, u16) {
        termion::terminal_size().unwrap_or((80, 24))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HostEntry {
    pub name: &'static str,
    pub sig: FuncSig,
    pub returns_float: bool,
    pub is_printf: bool,
    pub is_sprintf: bool,
}

/// Sorted-by-name catalog, looked up by binary search (SPEC_FULL §4.6).
pub struct HostCatalog {
    entries: Vec<HostEntry>,
}

fn entry(name: &'static str, params: u32, float_mask: u32, float_count: u32, returns_float: bool) -> HostEntry {
    HostEntry {
        name,
        sig: FuncSig::new(float_mask, float_count, params).expect("param count within cap"),
        returns_float,
        is_printf: name == "printf",
        is_sprintf: name == "sprintf",
    }
}

impl HostCatalog {
    /// Representative subset spanning file I/O, stdio, string/mem, stdlib,
    /// math, terminal, and one GPIO/PWM/clock/IRQ sample each (DESIGN.md).
    pub fn standard() -> Self {
        let mut entries = vec![
            entry("open", 2, 0, 0, false),
            entry("close", 1, 0, 0, false),
            entry("read", 3, 0, 0, false),
            entry("write", 3, 0, 0, false),
            entry("lseek", 3, 0, 0, false),
            entry("remove", 1, 0, 0, false),
            entry("rename", 2, 0, 0, false),
            entry("putchar", 1, 0, 0, false),
            entry("getchar", 0, 0, 0, false),
            entry("printf", 1, 0, 0, false),
            entry("sprintf", 2, 0, 0, false),
            entry("strlen", 1, 0, 0, false),
            entry("strcpy", 2, 0, 0, false),
            entry("strcmp", 2, 0, 0, false),
            entry("memcpy", 3, 0, 0, false),
            entry("memset", 3, 0, 0, false),
            entry("abs", 1, 0, 0, false),
            entry("rand", 0, 0, 0, false),
            entry("sqrtf", 1, 0b1, 1, true),
            entry("sinf", 1, 0b1, 1, true),
            entry("cosf", 1, 0b1, 1, true),
            entry("gpio_init", 1, 0, 0, false),
            entry("gpio_set_dir", 2, 0, 0, false),
            entry("gpio_put", 2, 0, 0, false),
            entry("pwm_set_enabled", 2, 0, 0, false),
            entry("clock_get_hz", 1, 0, 0, false),
            entry("irq_set_enabled", 2, 0, 0, false),
        ];
        entries.sort_by_key(|e| e.name);
        HostCatalog { entries }
    }

    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.entries.binary_search_by_key(&name, |e| e.name).ok()
    }

    pub fn get(&self, idx: usize) -> &HostEntry {
        &self.entries[idx]
    }

    /// Dispatches a syscall by catalog index. `args` are already in the
    /// order they were pushed (left-to-right); `printf`/`sprintf` decode
    /// their own format string out of `args[0]`.
    pub fn call(
        &self,
        idx: usize,
        args: &[Value],
        data: &mut DataSegment,
        host: &mut Host,
    ) -> Result<Value, CcError> {
        let name = self.entries[idx].name;
        match name {
            "putchar" => {
                host.term.putchar(args[0].as_i32() as u8);
                Ok(Value::Int(args[0].as_i32()))
            }
            "getchar" => Ok(Value::Int(host.term.getchar().map(|b| b as i32).unwrap_or(-1))),
            "printf" => {
                let fmt_addr = args[0].as_i32() as usize;
                let out = format_c(data, fmt_addr, &args[1..]);
                for b in out.as_bytes() {
                    host.term.putchar(*b);
                }
                host.term.flush();
                Ok(Value::Int(out.len() as i32))
            }
            "sprintf" => {
                let dst = args[0].as_i32() as usize;
                let fmt_addr = args[1].as_i32() as usize;
                let out = format_c(data, fmt_addr, &args[2..]);
                data.write_bytes(dst, out.as_bytes());
                data.write_u8(dst + out.len(), 0);
                Ok(Value::Int(out.len() as i32))
            }
            "strlen" => {
                let addr = args[0].as_i32() as usize;
                Ok(Value::Int(data.read_cstr(addr).len() as i32))
            }
            "strcpy" => {
                let dst = args[0].as_i32() as usize;
                let src = args[1].as_i32() as usize;
                let bytes = data.read_cstr(src).to_vec();
                data.write_bytes(dst, &bytes);
                data.write_u8(dst + bytes.len(), 0);
                Ok(args[0])
            }
            "strcmp" => {
                let a = data.read_cstr(args[0].as_i32() as usize).to_vec();
                let b = data.read_cstr(args[1].as_i32() as usize).to_vec();
                Ok(Value::Int(match a.cmp(&b) {
                    std::cmp::Ordering::Less => -1,
                    std::cmp::Ordering::Equal => 0,
                    std::cmp::Ordering::Greater => 1,
                }))
            }
            "memcpy" => {
                let dst = args[0].as_i32() as usize;
                let src = args[1].as_i32() as usize;
                let n = args[2].as_i32() as usize;
                let bytes: Vec<u8> = (0..n).map(|i| data.read_u8(src + i)).collect();
                data.write_bytes(dst, &bytes);
                Ok(args[0])
            }
            "memset" => {
                let dst = args[0].as_i32() as usize;
                let val = args[1].as_i32() as u8;
                let n = args[2].as_i32() as usize;
                for i in 0..n {
                    data.write_u8(dst + i, val);
                }
                Ok(args[0])
            }
            "abs" => Ok(Value::Int(args[0].as_i32().abs())),
            "rand" => Ok(Value::Int(simple_rand())),
            "sqrtf" => Ok(Value::Float(args[0].as_f32().sqrt())),
            "sinf" => Ok(Value::Float(args[0].as_f32().sin())),
            "cosf" => Ok(Value::Float(args[0].as_f32().cos())),
            "open" => {
                let path = cstr_to_string(data, args[0].as_i32() as usize);
                host.fs.open(&path, args[1].as_i32()).map(Value::Int).map_err(CcError::Host)
            }
            "close" => host.fs.close(args[0].as_i32()).map(|_| Value::Int(0)).map_err(CcError::Host),
            "read" => {
                let fd = args[0].as_i32();
                let addr = args[1].as_i32() as usize;
                let n = args[2].as_i32() as usize;
                let mut buf = vec![0u8; n];
                let got = host.fs.read(fd, &mut buf).map_err(CcError::Host)?;
                data.write_bytes(addr, &buf[..got]);
                Ok(Value::Int(got as i32))
            }
            "write" => {
                let fd = args[0].as_i32();
                let addr = args[1].as_i32() as usize;
                let n = args[2].as_i32() as usize;
                let buf: Vec<u8> = (0..n).map(|i| data.read_u8(addr + i)).collect();
                host.fs.write(fd, &buf).map(|w| Value::Int(w as i32)).map_err(CcError::Host)
            }
            "lseek" => host
                .fs
                .seek(args[0].as_i32(), args[1].as_i32() as i64, args[2].as_i32())
                .map(|p| Value::Int(p as i32))
                .map_err(CcError::Host),
            "remove" => {
                let path = cstr_to_string(data, args[0].as_i32() as usize);
                host.fs.remove(&path).map(|_| Value::Int(0)).map_err(CcError::Host)
            }
            "rename" => {
                let from = cstr_to_string(data, args[0].as_i32() as usize);
                let to = cstr_to_string(data, args[1].as_i32() as usize);
                host.fs.rename(&from, &to).map(|_| Value::Int(0)).map_err(CcError::Host)
            }
            "gpio_init" | "gpio_set_dir" | "gpio_put" | "pwm_set_enabled" | "irq_set_enabled" => {
                tracing::debug!(function = name, "host peripheral stub invoked");
                Ok(Value::Int(0))
            }
            "clock_get_hz" => Ok(Value::Int(125_000_000)),
            other => Err(CcError::Host(format!("unimplemented host function {}", other))),
        }
    }
}

fn cstr_to_string(data: &DataSegment, addr: usize) -> String {
    String::from_utf8_lossy(data.read_cstr(addr)).into_owned()
}

/// A minimal `printf`/`sprintf` formatter: `%d %u %x %f %c %s %%`.
fn format_c(data: &DataSegment, fmt_addr: usize, args: &[Value]) -> String {
    let fmt = cstr_to_string(data, fmt_addr);
    let mut out = String::new();
    let mut chars = fmt.chars().peekable();
    let mut arg_idx = 0;
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('d') => {
                out.push_str(&args.get(arg_idx).map(|v| v.as_i32()).unwrap_or(0).to_string());
                arg_idx += 1;
            }
            Some('u') => {
                out.push_str(&(args.get(arg_idx).map(|v| v.as_i32()).unwrap_or(0) as u32).to_string());
                arg_idx += 1;
            }
            Some('x') => {
                out.push_str(&format!("{:x}", args.get(arg_idx).map(|v| v.as_i32()).unwrap_or(0)));
                arg_idx += 1;
            }
            Some('f') => {
                out.push_str(&format!("{:.6}", args.get(arg_idx).map(|v| v.as_f32()).unwrap_or(0.0)));
                arg_idx += 1;
            }
            Some('c') => {
                out.push(args.get(arg_idx).map(|v| v.as_i32()).unwrap_or(0) as u8 as char);
                arg_idx += 1;
            }
            Some('s') => {
                let addr = args.get(arg_idx).map(|v| v.as_i32()).unwrap_or(0) as usize;
                out.push_str(&cstr_to_string(data, addr));
                arg_idx += 1;
            }
            Some('%') => out.push('%'),
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    out
}

fn simple_rand() -> i32 {
    use std::cell::Cell;
    thread_local! {
        static STATE: Cell<u32> = Cell::new(0x2545F491);
    }
    STATE.with(|s| {
        let mut x = s.get();
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        s.set(x);
        (x & 0x7fff_ffff) as i32
    })
}

/// Seeds the named `#define` groups (SPEC_FULL §4.6/§6) into the symbol
/// table before parsing begins.
pub fn seed_defines(symtab: &mut crate::symtab::Symtab, defines: &mut HashMap<String, i32>) {
    for (name, value) in defines::all_groups() {
        defines.insert(name.to_string(), value);
        let idx = symtab.intern(name);
        let sym = symtab.get_mut(idx);
        sym.class = crate::symtab::Class::EnumConst;
        sym.value = crate::symtab::SymValue::Int(value);
    }
}
