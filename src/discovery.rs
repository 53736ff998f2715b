//! Fixture discovery.
//!
//! The driver only needs "given a root and a pattern, list the fixture files". That contract is the
//! [`FixtureDiscovery`] trait; [`FsDiscovery`] implements it over the local file system.
//!
//! Patterns are `<relative dir>/<file glob>`, e.g. `syn-err/*` or `good/*.tpc`. The glob applies to file names
//! only and supports `*` and `?`. Discovery does not recurse.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that occur while listing fixtures
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("fixture directory `{}` does not exist", .0.display())]
    MissingDir(PathBuf),

    #[error("invalid fixture pattern `{0}`: wildcards are only allowed in the file name")]
    InvalidPattern(String),

    #[error("failed to read `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// List the fixture files matching a pattern.
///
/// Implementations return a finite, sorted list; calling `discover` again with the same arguments on an
/// unchanged tree yields the same list.
pub trait FixtureDiscovery {
    fn discover(&self, root: &Path, pattern: &str) -> Result<Vec<PathBuf>, DiscoveryError>;
}

/// File-system discovery (non-recursive, hidden files skipped).
#[derive(Debug, Clone, Copy, Default)]
pub struct FsDiscovery;

impl FixtureDiscovery for FsDiscovery {
    fn discover(&self, root: &Path, pattern: &str) -> Result<Vec<PathBuf>, DiscoveryError> {
        let (dir, glob) = split_pattern(pattern)?;
        let dir_path = if dir.is_empty() { root.to_path_buf() } else { root.join(dir) };

        if !dir_path.is_dir() {
            return Err(DiscoveryError::MissingDir(dir_path));
        }

        let io_err = |source: io::Error| DiscoveryError::Io {
            path: dir_path.clone(),
            source,
        };

        let mut files = Vec::new();
        for entry in fs::read_dir(&dir_path).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if !path.is_file() {
                continue;
            }
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if name.is_empty() || name.starts_with('.') {
                continue;
            }
            if wildcard_match(glob, name) {
                files.push(path);
            }
        }

        files.sort();
        tracing::debug!(dir = %dir_path.display(), glob, count = files.len(), "discovered fixtures");
        Ok(files)
    }
}

fn split_pattern(pattern: &str) -> Result<(&str, &str), DiscoveryError> {
    let (dir, glob) = pattern.rsplit_once('/').unwrap_or(("", pattern));
    if glob.is_empty() || dir.contains(['*', '?']) || Path::new(dir).is_absolute() {
        return Err(DiscoveryError::InvalidPattern(pattern.to_string()));
    }
    Ok((dir, glob))
}

/// Match a file name against a glob with `*` (any run) and `?` (any one character).
pub fn wildcard_match(glob: &str, name: &str) -> bool {
    let glob: Vec<char> = glob.chars().collect();
    let name: Vec<char> = name.chars().collect();

    let (mut g, mut n) = (0, 0);
    // Position of the last `*` in the glob and the name index it is currently absorbing up to.
    let mut backtrack: Option<(usize, usize)> = None;

    while n < name.len() {
        match glob.get(g) {
            Some('*') => {
                backtrack = Some((g, n));
                g += 1;
            }
            Some(&c) if c == '?' || c == name[n] => {
                g += 1;
                n += 1;
            }
            _ => match backtrack {
                Some((star, absorbed)) => {
                    g = star + 1;
                    n = absorbed + 1;
                    backtrack = Some((star, absorbed + 1));
                }
                None => return false,
            },
        }
    }

    glob[g..].iter().all(|&c| c == '*')
}
