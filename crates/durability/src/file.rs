//! File-backed durable store
//!
//! The whole file is read at open and rewritten at every commit. A commit
//! writes `<path>.tmp`, syncs it, and renames it over `<path>`, so readers
//! see either the previous snapshot or the new one, never a torn write.
//!
//! Maps other than the selected `map_name` are carried through unchanged.
//! While open, the store holds an exclusive advisory lock on `<path>.lock`,
//! so a second store on the same file fails with [`Error::Locked`] instead
//! of overwriting maps committed by the first.

use crate::format::{self, RawMap};
use chronmap_core::{Codec, DurableStore, Error, Result};
use fs2::FileExt;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Durable store persisted to a single snapshot file
pub struct FileDurableStore<K, V> {
    path: PathBuf,
    map_name: String,
    /// Maps of the same file not owned by this store
    others: BTreeMap<String, RawMap>,
    /// Staged contents of `map_name`
    working: RawMap,
    key_codec: Arc<dyn Codec<K>>,
    value_codec: Arc<dyn Codec<V>>,
    /// Held until close
    lock: Option<File>,
    closed: bool,
}

impl<K, V> FileDurableStore<K, V> {
    /// Open `map_name` inside the file at `path`, creating parent
    /// directories as needed. A missing file opens as empty.
    pub fn open(
        path: impl AsRef<Path>,
        map_name: impl Into<String>,
        key_codec: Arc<dyn Codec<K>>,
        value_codec: Arc<dyn Codec<V>>,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let map_name = map_name.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let lock = acquire_lock(&path)?;

        let mut others = match fs::read(&path) {
            Ok(bytes) => format::decode(&bytes)?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        let working = others.remove(&map_name).unwrap_or_default();

        info!(
            path = %path.display(),
            map = %map_name,
            entries = working.len(),
            other_maps = others.len(),
            "Opened snapshot file"
        );

        Ok(Self {
            path,
            map_name,
            others,
            working,
            key_codec,
            value_codec,
            lock: Some(lock),
            closed: false,
        })
    }

    /// Path of the snapshot file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name of the map this store reads and writes
    pub fn map_name(&self) -> &str {
        &self.map_name
    }

    fn temp_path(&self) -> PathBuf {
        sibling(&self.path, ".tmp")
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::Closed(self.path.display().to_string()));
        }
        Ok(())
    }

    fn write_image(&self) -> Result<()> {
        let mut maps: Vec<(&str, &RawMap)> = self
            .others
            .iter()
            .map(|(name, map)| (name.as_str(), map))
            .collect();
        maps.push((self.map_name.as_str(), &self.working));
        maps.sort_by(|a, b| a.0.cmp(b.0));
        let image = format::encode(&maps)?;

        let tmp = self.temp_path();
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&image)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        sync_parent_dir(&self.path);

        debug!(
            path = %self.path.display(),
            bytes = image.len(),
            entries = self.working.len(),
            "Wrote snapshot file"
        );
        Ok(())
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Take the exclusive lock guarding `path`, failing if another store holds it.
fn acquire_lock(path: &Path) -> Result<File> {
    let lock_path = sibling(path, ".lock");
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(&lock_path)?;
    match file.try_lock_exclusive() {
        Ok(()) => Ok(file),
        Err(e) if is_contended(&e) => Err(Error::Locked(path.display().to_string())),
        Err(e) => Err(e.into()),
    }
}

fn is_contended(e: &io::Error) -> bool {
    e.kind() == ErrorKind::WouldBlock
        || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

/// Best-effort fsync of the directory entry after a rename.
#[cfg(unix)]
fn sync_parent_dir(path: &Path) {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if let Ok(d) = File::open(dir) {
        let _ = d.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) {}

impl<K, V> DurableStore<K, V> for FileDurableStore<K, V>
where
    K: Send,
    V: Send,
{
    fn for_each(&mut self, f: &mut dyn FnMut(K, V) -> Result<()>) -> Result<()> {
        self.ensure_open()?;
        for (key, value) in &self.working {
            let key = self.key_codec.decode(key)?;
            let value = self.value_codec.decode(value)?;
            f(key, value)?;
        }
        Ok(())
    }

    fn upsert(&mut self, key: &K, value: &V) -> Result<()> {
        self.ensure_open()?;
        let mut k = Vec::new();
        self.key_codec.encode(key, &mut k)?;
        let mut v = Vec::new();
        self.value_codec.encode(value, &mut v)?;
        self.working.insert(k, v);
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.working.clear();
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.write_image()
    }

    fn len(&self) -> usize {
        self.working.len()
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.working.clear();
            self.others.clear();
            if let Some(lock) = self.lock.take() {
                let _ = FileExt::unlock(&lock);
            }
            debug!(path = %self.path.display(), "Closed snapshot file");
        }
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

impl<K, V> fmt::Debug for FileDurableStore<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileDurableStore")
            .field("path", &self.path)
            .field("map_name", &self.map_name)
            .field("entries", &self.working.len())
            .field("key_codec", &self.key_codec.name())
            .field("value_codec", &self.value_codec.name())
            .field("closed", &self.closed)
            .finish()
    }
}
