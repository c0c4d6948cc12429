//! The record source boundary.
//!
//! A [`RecordSource`] answers lookups and steps an enumeration, but keeps no
//! per-channel state: the enumeration position lives in a [`Cursor`] the
//! caller owns. One physical source can therefore back any number of
//! channels, each walking it independently.

use std::fs;
use std::path::{Path, PathBuf};

use capwd_lattice::{Passwd, Uid};
use tracing::debug;

use crate::error::{CapwdError, Result};

/// A channel-owned position in a source's enumeration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cursor {
    position: usize,
    exhausted: bool,
}

impl Cursor {
    /// A cursor at the start of the enumeration.
    pub fn rewound() -> Self {
        Self::default()
    }

    /// Index of the next record to read.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Whether the source reported the end.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Step past the record at the current position.
    pub fn advance(&mut self) {
        self.position += 1;
    }

    /// Record that the source has no further entries.
    pub fn exhaust(&mut self) {
        self.exhausted = true;
    }
}

/// Provider of passwd records.
pub trait RecordSource: Send {
    /// Move `cursor` back to the first record.
    fn rewind(&mut self, cursor: &mut Cursor) {
        *cursor = Cursor::rewound();
    }

    /// The record at `cursor`, advancing it; `None` once exhausted.
    fn next(&mut self, cursor: &mut Cursor) -> Result<Option<Passwd>>;

    /// First record with this login name.
    fn by_name(&mut self, name: &str) -> Result<Option<Passwd>>;

    /// First record with this uid.
    fn by_uid(&mut self, uid: Uid) -> Result<Option<Passwd>>;
}

/// A fixed list of records in natural order.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: Vec<Passwd>,
}

impl MemorySource {
    /// Serve `records` in the given order.
    pub fn new(records: Vec<Passwd>) -> Self {
        Self { records }
    }

    /// The records being served.
    pub fn records(&self) -> &[Passwd] {
        &self.records
    }
}

impl RecordSource for MemorySource {
    fn next(&mut self, cursor: &mut Cursor) -> Result<Option<Passwd>> {
        if cursor.is_exhausted() {
            return Ok(None);
        }
        match self.records.get(cursor.position()) {
            Some(record) => {
                cursor.advance();
                Ok(Some(record.clone()))
            }
            None => {
                cursor.exhaust();
                Ok(None)
            }
        }
    }

    fn by_name(&mut self, name: &str) -> Result<Option<Passwd>> {
        Ok(self.records.iter().find(|r| r.name() == name).cloned())
    }

    fn by_uid(&mut self, uid: Uid) -> Result<Option<Passwd>> {
        Ok(self.records.iter().find(|r| r.uid() == uid).cloned())
    }
}

/// Records loaded from a passwd(5) or master.passwd(5) file.
///
/// The file is read once on [`FileSource::open`] and again on
/// [`FileSource::reload`]; lookups never touch the filesystem.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    inner: MemorySource,
}

impl FileSource {
    /// Load and parse `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let records = load(&path)?;
        Ok(Self {
            path,
            inner: MemorySource::new(records),
        })
    }

    /// Re-read the file. On error the previously loaded records are kept.
    pub fn reload(&mut self) -> Result<()> {
        let records = load(&self.path)?;
        self.inner = MemorySource::new(records);
        Ok(())
    }

    /// The file this source reads.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The records currently loaded.
    pub fn records(&self) -> &[Passwd] {
        self.inner.records()
    }
}

impl RecordSource for FileSource {
    fn next(&mut self, cursor: &mut Cursor) -> Result<Option<Passwd>> {
        self.inner.next(cursor)
    }

    fn by_name(&mut self, name: &str) -> Result<Option<Passwd>> {
        self.inner.by_name(name)
    }

    fn by_uid(&mut self, uid: Uid) -> Result<Option<Passwd>> {
        self.inner.by_uid(uid)
    }
}

fn load(path: &Path) -> Result<Vec<Passwd>> {
    let contents = fs::read_to_string(path)?;
    let records = parse_passwd(&contents)?;
    debug!(path = %path.display(), records = records.len(), "loaded passwd file");
    Ok(records)
}

/// Parse passwd file contents.
///
/// Lines have either seven colon-separated fields
/// (`name:passwd:uid:gid:gecos:dir:shell`) or the ten of master.passwd
/// (`name:passwd:uid:gid:class:change:expire:gecos:dir:shell`). Blank lines
/// and lines starting with `#` are skipped. Every attribute the line format
/// carries is marked present.
pub fn parse_passwd(contents: &str) -> Result<Vec<Passwd>> {
    let mut records = Vec::new();
    for (idx, line) in contents.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        records.push(parse_line(line, idx + 1)?);
    }
    Ok(records)
}

fn parse_line(line: &str, lineno: usize) -> Result<Passwd> {
    let invalid = |reason: String| CapwdError::InvalidEntry {
        line: lineno,
        reason,
    };

    let parts: Vec<&str> = line.split(':').collect();
    let (name, passwd, uid, gid) = match parts.as_slice() {
        [name, passwd, uid, gid, ..] => (*name, *passwd, *uid, *gid),
        _ => {
            return Err(invalid(format!(
                "expected 7 or 10 colon-separated fields, found {}",
                parts.len()
            )))
        }
    };

    if name.is_empty() {
        return Err(invalid("empty login name".into()));
    }
    let uid: Uid = uid
        .parse()
        .map_err(|_| invalid(format!("invalid uid '{}'", uid)))?;
    let gid = gid
        .parse()
        .map_err(|_| invalid(format!("invalid gid '{}'", gid)))?;

    let record = Passwd::new(name, uid, gid).with_passwd(passwd);
    match parts.as_slice() {
        [_, _, _, _, gecos, dir, shell] => Ok(record
            .with_gecos(*gecos)
            .with_dir(*dir)
            .with_shell(*shell)),
        [_, _, _, _, class, change, expire, gecos, dir, shell] => {
            let change = parse_time(change)
                .map_err(|_| invalid(format!("invalid change time '{}'", change)))?;
            let expire = parse_time(expire)
                .map_err(|_| invalid(format!("invalid expire time '{}'", expire)))?;
            Ok(record
                .with_class(*class)
                .with_change(change)
                .with_expire(expire)
                .with_gecos(*gecos)
                .with_dir(*dir)
                .with_shell(*shell))
        }
        _ => Err(invalid(format!(
            "expected 7 or 10 colon-separated fields, found {}",
            parts.len()
        ))),
    }
}

// Empty means "never", which the record represents as 0.
fn parse_time(value: &str) -> std::result::Result<i64, std::num::ParseIntError> {
    if value.is_empty() {
        Ok(0)
    } else {
        value.parse()
    }
}
