//! End-to-end scenarios, each compiling a small C source through the real
//! `compile_and_run` pipeline and checking what it prints. Grounded on the
//! teacher's `tests/tests.rs` (single integration test driving the whole
//! emulator against an in-memory fixture device) — here the fixture is an
//! in-memory `FileSystem`/`Terminal` pair instead of a bus device.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;

use microc::host::{FileSystem, Host, Terminal};

/// A tiny in-memory filesystem keyed by path, so tests can seed an input
/// fixture or check what a program wrote without touching the real disk.
struct MemFs {
    files: HashMap<String, Vec<u8>>,
    handles: HashMap<i32, (String, usize)>,
    next_fd: i32,
}

impl MemFs {
    fn new() -> Self {
        MemFs { files: HashMap::new(), handles: HashMap::new(), next_fd: 3 }
    }

    fn seed(&mut self, path: &str, content: &[u8]) {
        self.files.insert(path.to_string(), content.to_vec());
    }
}

impl FileSystem for MemFs {
    fn open(&mut self, path: &str, flags: i32) -> Result<i32, String> {
        if flags & 0x0100 != 0 {
            self.files.entry(path.to_string()).or_default();
        }
        if !self.files.contains_key(path) {
            return Err(format!("no such file: {}", path));
        }
        let fd = self.next_fd;
        self.next_fd += 1;
        self.handles.insert(fd, (path.to_string(), 0));
        Ok(fd)
    }

    fn close(&mut self, fd: i32) -> Result<(), String> {
        self.handles.remove(&fd).map(|_| ()).ok_or_else(|| "bad fd".to_string())
    }

    fn read(&mut self, fd: i32, buf: &mut [u8]) -> Result<usize, String> {
        let (path, pos) = self.handles.get_mut(&fd).ok_or("bad fd")?;
        let data = self.files.get(path).ok_or("bad fd")?;
        let n = buf.len().min(data.len().saturating_sub(*pos));
        buf[..n].copy_from_slice(&data[*pos..*pos + n]);
        *pos += n;
        Ok(n)
    }

    fn write(&mut self, fd: i32, buf: &[u8]) -> Result<usize, String> {
        let (path, pos) = self.handles.get_mut(&fd).ok_or("bad fd")?;
        let data = self.files.entry(path.clone()).or_default();
        if *pos + buf.len() > data.len() {
            data.resize(*pos + buf.len(), 0);
        }
        data[*pos..*pos + buf.len()].copy_from_slice(buf);
        *pos += buf.len();
        Ok(buf.len())
    }

    fn seek(&mut self, fd: i32, offset: i64, whence: i32) -> Result<i64, String> {
        let (path, pos) = self.handles.get_mut(&fd).ok_or("bad fd")?;
        let len = self.files.get(path).map(|d| d.len()).unwrap_or(0) as i64;
        let base = match whence {
            1 => *pos as i64,
            2 => len,
            _ => 0,
        };
        let new_pos = (base + offset).max(0) as usize;
        *pos = new_pos;
        Ok(new_pos as i64)
    }

    fn remove(&mut self, path: &str) -> Result<(), String> {
        self.files.remove(path).map(|_| ()).ok_or_else(|| "no such file".to_string())
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), String> {
        let data = self.files.remove(from).ok_or("no such file")?;
        self.files.insert(to.to_string(), data);
        Ok(())
    }
}

thread_local! {
    static TMP_COUNTER: RefCell<u32> = RefCell::new(0);
}

fn write_temp_source(name: &str, src: &str) -> std::path::PathBuf {
    let n = TMP_COUNTER.with(|c| {
        let mut c = c.borrow_mut();
        *c += 1;
        *c
    });
    let path = std::env::temp_dir().join(format!("microc_test_{}_{}.c", name, n));
    let mut f = std::fs::File::create(&path).expect("create temp source file");
    f.write_all(src.as_bytes()).expect("write temp source file");
    path
}

/// Terminal backed by a `Rc<RefCell<Vec<u8>>>` so the test can read what was
/// printed after `compile_and_run` has consumed the `Host`.
struct SharedTerm {
    buf: std::rc::Rc<RefCell<Vec<u8>>>,
}

impl Terminal for SharedTerm {
    fn getchar(&mut self) -> Option<u8> {
        None
    }
    fn putchar(&mut self, b: u8) {
        self.buf.borrow_mut().push(b);
    }
    fn flush(&mut self) {}
    fn screen_size(&self) -> (u16, u16) {
        (80, 24)
    }
}

fn run_source_capturing(name: &str, src: &str, fs: MemFs, program_args: &[&str]) -> (i32, String) {
    let path = write_temp_source(name, src);
    let buf = std::rc::Rc::new(RefCell::new(Vec::new()));
    let term = SharedTerm { buf: buf.clone() };
    let host = Host { fs: Box::new(fs), term: Box::new(term) };

    let mut args = vec![path.to_str().unwrap().to_string()];
    args.extend(program_args.iter().map(|s| s.to_string()));

    let code = microc::compile_and_run(&args, host);
    let out = String::from_utf8(buf.borrow().clone()).expect("program output is valid UTF-8");
    let _ = std::fs::remove_file(&path);
    (code, out)
}

#[test]
fn scenario_1_printf_arithmetic() {
    let src = r#"
        int main() {
            printf("%d\n", 2 + 3 * 4);
        }
    "#;
    let (code, out) = run_source_capturing("printf_arith", src, MemFs::new(), &[]);
    assert_eq!(code, 0);
    assert_eq!(out, "14\n");
}

#[test]
fn scenario_2_pi_approximation_via_recursive_float() {
    let src = r#"
        float F(int i) {
            if (i > 20) return 1.0;
            return 1.0 + (float)i / (2.0 * (float)i + 1.0) * F(i + 1);
        }
        int main() {
            printf("%f\n", 2.0 * F(1));
        }
    "#;
    let (code, out) = run_source_capturing("pi_approx", src, MemFs::new(), &[]);
    assert_eq!(code, 0);
    let printed: f32 = out.trim().parse().expect("printf %f output parses as a float");
    assert!((printed - std::f32::consts::PI).abs() < 0.01, "got {}", printed);
}

#[test]
fn scenario_5_recursive_factorial() {
    let src = r#"
        int f(int n) { return n < 2 ? 1 : n * f(n - 1); }
        int main() {
            printf("%d\n", f(10));
        }
    "#;
    let (code, out) = run_source_capturing("factorial", src, MemFs::new(), &[]);
    assert_eq!(code, 0);
    assert_eq!(out, "3628800\n");
}

#[test]
fn scenario_4_quicksort_fixed_array() {
    let src = r#"
        void swap(int *a, int *b) {
            int t;
            t = *a;
            *a = *b;
            *b = t;
        }
        void quicksort(int *arr, int lo, int hi) {
            int pivot;
            int i;
            int j;
            if (lo >= hi) return;
            pivot = arr[(lo + hi) / 2];
            i = lo;
            j = hi;
            while (i <= j) {
                while (arr[i] < pivot) i = i + 1;
                while (arr[j] > pivot) j = j - 1;
                if (i <= j) {
                    swap(&arr[i], &arr[j]);
                    i = i + 1;
                    j = j - 1;
                }
            }
            quicksort(arr, lo, j);
            quicksort(arr, i, hi);
        }
        int main() {
            int a[30];
            int i;
            int seed;
            seed = 12345;
            i = 0;
            while (i < 30) {
                seed = seed * 1103515245 + 12345;
                a[i] = seed % 1000;
                if (a[i] < 0) a[i] = -a[i];
                i = i + 1;
            }
            quicksort(a, 0, 29);
            i = 0;
            while (i < 30) {
                printf("%d\n", a[i]);
                i = i + 1;
            }
        }
    "#;
    let (code, out) = run_source_capturing("quicksort", src, MemFs::new(), &[]);
    assert_eq!(code, 0);
    let values: Vec<i32> = out.lines().map(|l| l.parse().expect("each line is an int")).collect();
    assert_eq!(values.len(), 30);
    let mut sorted = values.clone();
    sorted.sort();
    assert_eq!(values, sorted, "quicksort must leave the array in non-decreasing order");
}

#[test]
fn scenario_6_disassembly_mode_has_expected_mnemonics_and_width() {
    let src = r#"
        int f(int n) { return n < 2 ? 1 : n * f(n - 1); }
        int main() {
            printf("%d\n", f(10));
        }
    "#;
    let path = write_temp_source("disasm", src);
    let buf = std::rc::Rc::new(RefCell::new(Vec::new()));
    let term = SharedTerm { buf: buf.clone() };
    let host = Host { fs: Box::new(MemFs::new()), term: Box::new(term) };
    let args = vec!["-s".to_string(), path.to_str().unwrap().to_string()];
    let code = microc::compile_and_run(&args, host);
    let out = String::from_utf8(buf.borrow().clone()).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(code, 0);
    for mnemonic in ["ENT", "LEA", "LI", "BZ", "IMM 1", "JSR", "MUL", "LEV", "EXIT"] {
        assert!(out.contains(mnemonic), "disassembly missing {}: {}", mnemonic, out);
    }
    for line in out.lines() {
        assert!(line.len() <= 80, "disassembly line exceeds 80 characters: {:?}", line);
    }
}

#[test]
fn file_write_then_read_back_round_trips() {
    let src = r#"
        int main() {
            int fd;
            char buf[16];
            fd = open("roundtrip.txt", 0x101);
            write(fd, "hello", 5);
            close(fd);
            fd = open("roundtrip.txt", 0);
            read(fd, buf, 5);
            close(fd);
            buf[5] = 0;
            printf("%s\n", buf);
        }
    "#;
    let (code, out) = run_source_capturing("file_roundtrip", src, MemFs::new(), &[]);
    assert_eq!(code, 0);
    assert_eq!(out, "hello\n");
}

#[test]
fn two_dimensional_array_subscript_addresses_each_row() {
    let src = r#"
        int main() {
            int a[3][4];
            int i;
            int j;
            i = 0;
            while (i < 3) {
                j = 0;
                while (j < 4) {
                    a[i][j] = i * 10 + j;
                    j = j + 1;
                }
                i = i + 1;
            }
            printf("%d %d %d\n", a[0][0], a[1][2], a[2][3]);
        }
    "#;
    let (code, out) = run_source_capturing("array2d", src, MemFs::new(), &[]);
    assert_eq!(code, 0);
    assert_eq!(out, "0 12 23\n");
}

#[test]
fn three_dimensional_array_subscript_addresses_each_cell() {
    let src = r#"
        int main() {
            int a[2][2][2];
            a[0][0][0] = 1;
            a[0][0][1] = 2;
            a[0][1][0] = 3;
            a[1][1][1] = 4;
            printf("%d %d %d %d\n", a[0][0][0], a[0][0][1], a[0][1][0], a[1][1][1]);
        }
    "#;
    let (code, out) = run_source_capturing("array3d", src, MemFs::new(), &[]);
    assert_eq!(code, 0);
    assert_eq!(out, "1 2 3 4\n");
}

#[test]
fn sizeof_array_identifier_reports_total_byte_size() {
    let src = r#"
        int main() {
            int a[10];
            char c[5];
            printf("%d %d\n", sizeof(a), sizeof(c));
        }
    "#;
    let (code, out) = run_source_capturing("sizeof_ident", src, MemFs::new(), &[]);
    assert_eq!(code, 0);
    assert_eq!(out, "40 5\n");
}

#[test]
fn nested_brace_initializer_fills_a_2d_array() {
    let src = r#"
        int a[2][2] = {{1, 2}, {3, 4}};
        int main() {
            printf("%d %d %d %d\n", a[0][0], a[0][1], a[1][0], a[1][1]);
        }
    "#;
    let (code, out) = run_source_capturing("nested_init", src, MemFs::new(), &[]);
    assert_eq!(code, 0);
    assert_eq!(out, "1 2 3 4\n");
}

#[test]
fn taken_ifdef_branch_compiles_and_matching_endif_does_not_abort() {
    let src = "
        #define FOO 1
        #ifdef FOO
        int x;
        #endif
        int main() {
            x = 7;
            printf(\"%d\\n\", x);
        }
    ";
    let (code, out) = run_source_capturing("taken_ifdef", src, MemFs::new(), &[]);
    assert_eq!(code, 0);
    assert_eq!(out, "7\n");
}
