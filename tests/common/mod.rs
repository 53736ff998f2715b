//! Shared helpers: a shell script standing in for the compiler under test, and fixture trees.
#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Fake compiler. Fixture lines of the form
///   `<mode>: <text>`       are echoed to stderr when run with `--<mode>`,
///   `<mode> exit=<n>`      set the exit code for `--<mode>`,
///   `<mode> sleep=<n>`     make `--<mode>` hang for n seconds in a forked `sleep`.
const FAKE_COMPILER: &str = r#"#!/bin/sh
mode="${1#--}"
input=$(cat)
printf '%s\n' "$input" | sed -n "s/^$mode: //p" >&2
delay=$(printf '%s\n' "$input" | sed -n "s/^$mode sleep=\([0-9][0-9]*\)\$/\1/p" | head -n 1)
if [ -n "$delay" ]; then
    sleep "$delay"
    exit 0
fi
code=$(printf '%s\n' "$input" | sed -n "s/^$mode exit=\([0-9][0-9]*\)\$/\1/p" | head -n 1)
exit "${code:-0}"
"#;

/// Fake instrumentation tool: drops its own `--flags` and runs the rest.
const FAKE_INSTRUMENTATION: &str = r#"#!/bin/sh
while [ $# -gt 0 ]; do
    case "$1" in
        --*) shift ;;
        *) break ;;
    esac
done
exec "$@"
"#;

pub struct Tools {
    pub compiler: PathBuf,
    pub instrumentation: PathBuf,
}

/// Install the fake tools once per test binary, before any test spawns a process.
pub fn tools() -> &'static Tools {
    static TOOLS: OnceLock<Tools> = OnceLock::new();
    TOOLS.get_or_init(|| {
        let dir = Path::new(env!("CARGO_TARGET_TMPDIR")).join(format!("tpcheck-tools-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        Tools {
            compiler: install(&dir, "fake-tpcas", FAKE_COMPILER),
            instrumentation: install(&dir, "fake-valgrind", FAKE_INSTRUMENTATION),
        }
    })
}

fn install(dir: &Path, name: &str, body: &str) -> PathBuf {
    // Write under a temporary name and rename, so no writable descriptor to the final path ever exists.
    let staging = dir.join(format!(".{name}.staging"));
    fs::write(&staging, body).unwrap();
    fs::set_permissions(&staging, fs::Permissions::from_mode(0o755)).unwrap();
    let path = dir.join(name);
    fs::rename(&staging, &path).unwrap();
    path
}

pub const CLEAN: &str = "// nb_warnings=0\n// nb_errors=0\nint main(void) { return 0; }\n";

pub const MISSING_SEMI: &str = "only-tree exit=1\nonly-tree: 1:6: error: expected ';'\nint x\n";

pub const UNDECLARED: &str = "// nb_errors=2\n\
only-semantic exit=2\n\
only-semantic: 2:1: error: undeclared identifier a\n\
only-semantic: 3:1: error: undeclared identifier b\n";

pub const UNUSED: &str = "// nb_warnings=1\n// nb_errors=0\n\
only-semantic: 1:5: warning: unused variable x\n\
only-semantic: 2:5: warning: unused variable y\n";

/// Write `files` (relative path, content) under `root`.
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (rel, content) in files {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
}

/// One fixture per directory; every category passes except `semantic-warning`, whose counts are off.
pub fn standard_tree(root: &Path) {
    write_tree(
        root,
        &[
            ("good/clean.c", CLEAN),
            ("syn-err/missing_semi.c", MISSING_SEMI),
            ("sem-err/undeclared.c", UNDECLARED),
            ("warn/unused.c", UNUSED),
        ],
    );
}
