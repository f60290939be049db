//! Parser configuration options.
//!
//! A [`ParseOptions`] value is built once and shared (immutably) by every
//! parser instance a parse spawns, including the recursive instances created
//! for included files. The filesystem is reached only through the two
//! injectable capabilities, so tests and embedders can parse fully in
//! memory.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Capability used to expand an include pattern into matching paths.
pub type GlobFn = dyn Fn(&str) -> io::Result<Vec<PathBuf>>;

/// Capability used to open a configuration file for reading.
pub type OpenFn = dyn Fn(&Path) -> io::Result<Box<dyn Read>>;

/// Options controlling a parse.
///
/// ```
/// use ngx_conf::ParseOptions;
///
/// let options = ParseOptions::new().root("/etc/nginx");
/// ```
pub struct ParseOptions {
    single_file: bool,
    root: Option<PathBuf>,
    glob: Box<GlobFn>,
    open: Box<OpenFn>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            single_file: false,
            root: None,
            glob: Box::new(default_glob),
            open: Box::new(default_open),
        }
    }
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, `include` directives are kept verbatim (pattern arguments,
    /// empty block) instead of being expanded.
    pub fn single_file(mut self, single_file: bool) -> Self {
        self.single_file = single_file;
        self
    }

    /// Base directory prepended to relative include patterns.
    ///
    /// Relative patterns without a configured root make the parse fail.
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Replace the glob capability used to expand include patterns.
    pub fn glob_with<F>(mut self, glob: F) -> Self
    where
        F: Fn(&str) -> io::Result<Vec<PathBuf>> + 'static,
    {
        self.glob = Box::new(glob);
        self
    }

    /// Replace the open capability used to read configuration files.
    pub fn open_with<F>(mut self, open: F) -> Self
    where
        F: Fn(&Path) -> io::Result<Box<dyn Read>> + 'static,
    {
        self.open = Box::new(open);
        self
    }

    pub(crate) fn is_single_file(&self) -> bool {
        self.single_file
    }

    pub(crate) fn root_dir(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub(crate) fn glob(&self, pattern: &str) -> io::Result<Vec<PathBuf>> {
        (self.glob)(pattern)
    }

    pub(crate) fn open(&self, path: &Path) -> io::Result<Box<dyn Read>> {
        (self.open)(path)
    }
}

impl fmt::Debug for ParseOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseOptions")
            .field("single_file", &self.single_file)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

/// Filesystem glob, matches returned in alphabetical order.
fn default_glob(pattern: &str) -> io::Result<Vec<PathBuf>> {
    let entries =
        glob::glob(pattern).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let mut paths = Vec::new();
    for entry in entries {
        paths.push(entry.map_err(glob::GlobError::into_error)?);
    }
    Ok(paths)
}

fn default_open(path: &Path) -> io::Result<Box<dyn Read>> {
    Ok(Box::new(File::open(path)?))
}
