//! Versioned output directories.
//!
//! Every formula or preset run gets its own directory named after a fixed
//! prefix and a zero-padded ordinal (`wave001`, `wave002`, ...). The next
//! ordinal is always one more than the largest ordinal already present, so
//! directories removed by hand leave gaps that are never refilled.
//!
//! # Example
//!
//! ```no_run
//! use wavelab::versioning::allocate_next_directory;
//!
//! let directory = allocate_next_directory(".")?;
//! println!("writing into {}", directory.path().display());
//! # Ok::<(), wavelab::WavelabError>(())
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::WavelabError;

/// Default directory name prefix.
pub const DEFAULT_PREFIX: &str = "wave";

/// Default minimum number of digits after the prefix.
pub const DEFAULT_WIDTH: usize = 3;

/// Naming scheme for versioned directories.
///
/// The width is a minimum: ordinals that need more digits than `width` are
/// written out in full (`wave1000`) and still recognised when scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionScheme {
    prefix: String,
    width: usize,
}

impl Default for VersionScheme {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            width: DEFAULT_WIDTH,
        }
    }
}

impl VersionScheme {
    /// Create a scheme with a custom prefix and minimum digit count.
    ///
    /// A width of zero is clamped to one.
    pub fn new(prefix: impl Into<String>, width: usize) -> Self {
        Self {
            prefix: prefix.into(),
            width: width.max(1),
        }
    }

    /// The directory name prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The minimum number of digits after the prefix.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Extract the ordinal from an entry name, if it follows the scheme.
    ///
    /// The suffix must be all ASCII digits and at least `width` long, so
    /// `wave7` and `wave01a` are ignored while `wave007` and `wave1000`
    /// are not.
    pub fn parse_ordinal(&self, name: &str) -> Option<u32> {
        let suffix = name.strip_prefix(self.prefix.as_str())?;
        if suffix.len() < self.width || !suffix.bytes().all(|byte| byte.is_ascii_digit()) {
            return None;
        }
        suffix.parse().ok()
    }

    /// Render the directory name for an ordinal.
    pub fn directory_name(&self, ordinal: u32) -> String {
        format!("{}{:0width$}", self.prefix, ordinal, width = self.width)
    }

    /// Compute the ordinal the next allocation under `base` will use.
    ///
    /// Returns `1` when nothing matches, otherwise the largest matching
    /// ordinal plus one.
    pub fn next_ordinal<P: AsRef<Path>>(&self, base: P) -> Result<u32, WavelabError> {
        let mut highest: Option<u32> = None;
        for entry in fs::read_dir(base.as_ref())? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if let Some(ordinal) = self.parse_ordinal(&name) {
                highest = Some(highest.map_or(ordinal, |current| current.max(ordinal)));
            }
        }

        match highest {
            None => Ok(1),
            Some(ordinal) => ordinal.checked_add(1).ok_or_else(|| {
                WavelabError::InvalidArgument(format!(
                    "no ordinal left after {}",
                    self.directory_name(ordinal)
                ))
            }),
        }
    }

    /// Create the next versioned directory under `base`.
    ///
    /// The directory is created non-recursively, so a concurrent run that
    /// grabbed the same ordinal first makes this call fail instead of
    /// silently sharing the directory.
    pub fn allocate<P: AsRef<Path>>(&self, base: P) -> Result<VersionedDirectory, WavelabError> {
        let base = base.as_ref();
        let ordinal = self.next_ordinal(base)?;
        let path = base.join(self.directory_name(ordinal));

        fs::create_dir(&path).map_err(|source| WavelabError::DirectoryCreate {
            path: path.clone(),
            source,
        })?;
        log::debug!("Allocated versioned directory {}", path.display());

        Ok(VersionedDirectory { ordinal, path })
    }
}

/// A freshly allocated versioned directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedDirectory {
    ordinal: u32,
    path: PathBuf,
}

impl VersionedDirectory {
    /// The ordinal this directory was allocated with.
    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    /// Full path of the directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The directory's own name (e.g. `wave004`).
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Recursively delete the directory and everything in it.
    pub fn discard(self) -> Result<(), WavelabError> {
        log::debug!("Discarding versioned directory {}", self.path.display());
        fs::remove_dir_all(&self.path)?;
        Ok(())
    }
}

/// Allocate the next `waveNNN` directory under `base` using the default scheme.
pub fn allocate_next_directory<P: AsRef<Path>>(base: P) -> Result<VersionedDirectory, WavelabError> {
    VersionScheme::default().allocate(base)
}
