use crate::error::CoreError;
use crate::model::{MAX_NAME_LEN, MAX_PATH_LEN, Track};
use std::ffi::OsStr;
use std::path::Path;
use walkdir::WalkDir;

const INITIAL_CAPACITY: usize = 100;

/// Computes the capacity a store must grow to before holding
/// `len + additional` elements: the smallest doubling of the current
/// capacity (starting from `initial`) that covers the requirement.
/// Growth past the addressable limit is rejected, never wrapped.
pub(crate) fn grown_capacity(
    cap: usize,
    len: usize,
    additional: usize,
    initial: usize,
    what: &'static str,
) -> Result<usize, CoreError> {
    let need = len
        .checked_add(additional)
        .ok_or(CoreError::Capacity(what))?;
    if cap >= need {
        return Ok(cap);
    }

    let mut newcap = if cap == 0 { initial } else { cap };
    while newcap < need {
        if newcap > isize::MAX as usize / 2 {
            return Err(CoreError::Capacity(what));
        }
        newcap *= 2;
    }
    Ok(newcap)
}

/// The authoritative, insertion-ordered track collection. Tracks are
/// unique by name and by source path; a position in this sequence is a
/// library index, stable until a lower-indexed track is removed.
#[derive(Debug, Default)]
pub struct Library {
    tracks: Vec<Track>,
    cap: usize,
}

/// Counters reported by a folder import.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FolderScan {
    pub added: usize,
    pub skipped_exists: usize,
    pub skipped_capacity: usize,
    pub skipped_invalid: usize,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// First match in insertion order, case-sensitive.
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.tracks.iter().position(|track| track.name == name)
    }

    pub fn find_by_path(&self, path: &Path) -> Option<usize> {
        self.tracks.iter().position(|track| track.path == path)
    }

    /// Appends a track and returns its library index.
    pub fn add(&mut self, name: &str, path: &Path) -> Result<usize, CoreError> {
        if name.chars().count() > MAX_NAME_LEN {
            return Err(CoreError::NameTooLong(name.to_string()));
        }
        if path.as_os_str().len() > MAX_PATH_LEN {
            return Err(CoreError::PathTooLong);
        }
        if self.find_by_name(name).is_some() {
            return Err(CoreError::DuplicateName(name.to_string()));
        }
        if self.find_by_path(path).is_some() {
            return Err(CoreError::DuplicatePath(path.to_path_buf()));
        }

        self.ensure_capacity(1)?;
        self.tracks.push(Track {
            name: name.to_string(),
            path: path.to_path_buf(),
        });
        Ok(self.tracks.len() - 1)
    }

    /// Replaces a track's name; the path and library index are untouched,
    /// so playlist references stay valid.
    pub fn rename(&mut self, index: usize, new_name: &str) -> Result<(), CoreError> {
        if index >= self.tracks.len() {
            return Err(CoreError::InvalidIndex {
                count: self.tracks.len(),
            });
        }
        if new_name.chars().count() > MAX_NAME_LEN {
            return Err(CoreError::NameTooLong(new_name.to_string()));
        }
        if self
            .find_by_name(new_name)
            .is_some_and(|existing| existing != index)
        {
            return Err(CoreError::DuplicateName(new_name.to_string()));
        }

        self.tracks[index].name = new_name.to_string();
        Ok(())
    }

    /// Removes a track, shifting all subsequent tracks down one index.
    /// The caller owns repairing playlist references before anything can
    /// observe the shrunken library.
    pub fn remove(&mut self, index: usize) -> Result<Track, CoreError> {
        if index >= self.tracks.len() {
            return Err(CoreError::InvalidIndex {
                count: self.tracks.len(),
            });
        }
        Ok(self.tracks.remove(index))
    }

    fn ensure_capacity(&mut self, additional: usize) -> Result<(), CoreError> {
        let newcap = grown_capacity(
            self.cap,
            self.tracks.len(),
            additional,
            INITIAL_CAPACITY,
            "library",
        )?;
        if newcap > self.cap {
            self.tracks.reserve(newcap - self.tracks.len());
            self.cap = newcap;
        }
        Ok(())
    }
}

/// Scans a directory (non-recursive) for `*.mp3` files and adds each one
/// with its file stem as the track name. Duplicates and invalid entries
/// are counted, not fatal; a capacity failure stops the scan.
pub fn import_folder(library: &mut Library, dir: &Path) -> Result<FolderScan, CoreError> {
    if !dir.is_dir() {
        return Err(CoreError::FileNotFound(dir.to_path_buf()));
    }

    let mut entries: Vec<_> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && is_mp3(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    entries.sort();

    let mut scan = FolderScan::default();
    for path in entries {
        let Some(stem) = path.file_stem().and_then(OsStr::to_str) else {
            scan.skipped_invalid += 1;
            continue;
        };
        let name: String = stem.chars().take(MAX_NAME_LEN).collect();
        if name.is_empty() || path.as_os_str().len() > MAX_PATH_LEN {
            scan.skipped_invalid += 1;
            continue;
        }

        match library.add(&name, &path) {
            Ok(_) => scan.added += 1,
            Err(CoreError::DuplicateName(_)) | Err(CoreError::DuplicatePath(_)) => {
                scan.skipped_exists += 1;
            }
            Err(CoreError::Capacity(_)) => {
                scan.skipped_capacity += 1;
                break;
            }
            Err(_) => scan.skipped_invalid += 1,
        }
    }

    Ok(scan)
}

fn is_mp3(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case("mp3"))
}
