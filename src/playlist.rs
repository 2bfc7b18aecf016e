use crate::error::CoreError;
use crate::library::grown_capacity;
use crate::model::MAX_NAME_LEN;

const INITIAL_PLAYLISTS_CAPACITY: usize = 20;
const INITIAL_ENTRIES_CAPACITY: usize = 100;

/// An ordered list of library indices. Duplicates are allowed; the same
/// track may appear at several positions.
#[derive(Debug, Clone)]
pub struct Playlist {
    name: String,
    entries: Vec<usize>,
    cap: usize,
}

impl Playlist {
    fn new(name: String) -> Self {
        Self {
            name,
            entries: Vec::new(),
            cap: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[usize] {
        &self.entries
    }

    pub fn entry(&self, position: usize) -> Option<usize> {
        self.entries.get(position).copied()
    }

    fn push(&mut self, library_index: usize) -> Result<(), CoreError> {
        let newcap = grown_capacity(
            self.cap,
            self.entries.len(),
            1,
            INITIAL_ENTRIES_CAPACITY,
            "playlist entry",
        )?;
        if newcap > self.cap {
            self.entries.reserve(newcap - self.entries.len());
            self.cap = newcap;
        }
        self.entries.push(library_index);
        Ok(())
    }
}

/// All playlists, unique by name, in creation order.
#[derive(Debug, Default)]
pub struct PlaylistCollection {
    playlists: Vec<Playlist>,
    cap: usize,
}

impl PlaylistCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.playlists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.playlists.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Playlist> {
        self.playlists.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Playlist> {
        self.playlists.iter()
    }

    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.playlists.iter().position(|pl| pl.name == name)
    }

    pub fn create(&mut self, name: &str) -> Result<usize, CoreError> {
        if name.chars().count() > MAX_NAME_LEN {
            return Err(CoreError::NameTooLong(name.to_string()));
        }
        if self.find_by_name(name).is_some() {
            return Err(CoreError::DuplicatePlaylist(name.to_string()));
        }

        let newcap = grown_capacity(
            self.cap,
            self.playlists.len(),
            1,
            INITIAL_PLAYLISTS_CAPACITY,
            "playlist",
        )?;
        if newcap > self.cap {
            self.playlists.reserve(newcap - self.playlists.len());
            self.cap = newcap;
        }
        self.playlists.push(Playlist::new(name.to_string()));
        Ok(self.playlists.len() - 1)
    }

    /// Removes a playlist, shifting later playlists down one index.
    pub fn delete(&mut self, index: usize) -> Result<Playlist, CoreError> {
        if index >= self.playlists.len() {
            return Err(CoreError::InvalidIndex {
                count: self.playlists.len(),
            });
        }
        Ok(self.playlists.remove(index))
    }

    /// Appends a library index to a playlist. The index must be in range
    /// for the current library.
    pub fn add_entry(
        &mut self,
        playlist_index: usize,
        library_index: usize,
        library_len: usize,
    ) -> Result<(), CoreError> {
        if library_index >= library_len {
            return Err(CoreError::InvalidIndex { count: library_len });
        }
        let count = self.playlists.len();
        let playlist = self
            .playlists
            .get_mut(playlist_index)
            .ok_or(CoreError::InvalidIndex { count })?;
        playlist.push(library_index)
    }

    /// Removes the entry at a 1-based position, shifting later entries
    /// down. Returns the library index that was removed.
    pub fn remove_entry(
        &mut self,
        playlist_index: usize,
        position: usize,
    ) -> Result<usize, CoreError> {
        let count = self.playlists.len();
        let playlist = self
            .playlists
            .get_mut(playlist_index)
            .ok_or(CoreError::InvalidIndex { count })?;
        if position == 0 || position > playlist.entries.len() {
            return Err(CoreError::InvalidPosition {
                position,
                count: playlist.entries.len(),
            });
        }
        Ok(playlist.entries.remove(position - 1))
    }

    /// Repairs every playlist after the library removed the track at
    /// `removed`: entries pointing at it are dropped, entries past it are
    /// decremented, in one pass that preserves relative order.
    pub fn on_library_removed(&mut self, removed: usize) {
        for playlist in &mut self.playlists {
            playlist.entries.retain_mut(|entry| {
                if *entry == removed {
                    return false;
                }
                if *entry > removed {
                    *entry -= 1;
                }
                true
            });
        }
    }
}
