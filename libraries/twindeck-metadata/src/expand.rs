/// Expansion of playlist files, cue sheets and directories into rows
use crate::error::{MetadataError, Result};
use crate::formats::is_cuesheet;
use crate::resolver::{local_path, MediaResolver};
use std::path::{Path, PathBuf};
use twindeck_core::PlaylistEntry;
use twindeck_cuesheet::cuesheet_entry;
use walkdir::WalkDir;

/// Lazily resolved playlist rows; only valid entries are yielded
pub type Elements = Box<dyn Iterator<Item = PlaylistEntry> + Send>;

/// Expands user selections into playlist rows.
#[derive(Clone)]
pub struct ElementExpander {
    resolver: MediaResolver,
}

impl ElementExpander {
    /// Create an expander resolving through `resolver`
    pub fn new(resolver: MediaResolver) -> Self {
        Self { resolver }
    }

    /// Rows for a selection of paths.
    ///
    /// A single cue sheet, m3u/m3u8/pls file or directory is expanded; a
    /// selection made only of directories walks each of them; anything
    /// else is resolved file by file.
    pub fn elements(&self, paths: &[PathBuf]) -> Elements {
        if let [single] = paths {
            let ext = single
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_ascii_lowercase);
            match ext.as_deref() {
                _ if is_cuesheet(single) => return self.from_cuesheet(single),
                Some("m3u" | "m3u8") => return self.from_m3u(single),
                Some("pls") => return self.from_pls(single),
                _ if single.is_dir() => return self.from_directory(single, 2),
                _ => {}
            }
        }

        if !paths.is_empty() && paths.iter().all(|p| p.is_dir()) {
            let expander = self.clone();
            let dirs = paths.to_vec();
            return Box::new(
                dirs.into_iter()
                    .flat_map(move |dir| expander.from_directory(&dir, 2)),
            );
        }

        self.resolve_all(paths.to_vec())
    }

    fn resolve_all(&self, paths: Vec<PathBuf>) -> Elements {
        let resolver = self.resolver.clone();
        Box::new(
            paths
                .into_iter()
                .map(move |path| resolver.resolve_path(&path))
                .filter(PlaylistEntry::is_valid),
        )
    }

    /// A single-file cue sheet yields its cue entry; a multi-file one
    /// yields each distinct content file
    fn from_cuesheet(&self, path: &Path) -> Elements {
        let Ok(entry) = cuesheet_entry(path, self.resolver.reader()) else {
            return Box::new(std::iter::empty());
        };
        let mut files: Vec<String> = Vec::new();
        if let Some(index) = entry.cuesheet() {
            for track in index.tracks().iter().filter(|t| t.index_number == 1) {
                if !files.contains(&track.pathname) {
                    files.push(track.pathname.clone());
                }
            }
        }

        if files.len() > 1 {
            self.resolve_all(files.into_iter().filter(|f| !f.is_empty()).map(PathBuf::from).collect())
        } else if files.iter().any(|f| !f.is_empty()) {
            let mut entry = entry;
            if let Some(track) = entry.as_track_mut() {
                track.uuid = uuid::Uuid::new_v4().to_string();
            }
            Box::new(std::iter::once(entry))
        } else {
            Box::new(std::iter::empty())
        }
    }

    fn from_m3u(&self, path: &Path) -> Elements {
        match read_m3u(path) {
            Ok(M3u::Directory(dir)) => self.from_directory(&dir, 1),
            Ok(M3u::Files(files)) => self.resolve_all(files),
            Err(e) => {
                tracing::warn!("Problem reading file {}: {}", path.display(), e);
                Box::new(std::iter::empty())
            }
        }
    }

    fn from_pls(&self, path: &Path) -> Elements {
        match read_pls(path) {
            Ok(files) => self.resolve_all(files),
            Err(e) => {
                tracing::warn!("Problem reading file {}: {}", path.display(), e);
                Box::new(std::iter::empty())
            }
        }
    }

    /// Files of `dir` in name order, then those of its subdirectories,
    /// `depth` levels deep. Hidden subdirectories are skipped.
    pub fn from_directory(&self, dir: &Path, depth: usize) -> Elements {
        tracing::debug!("Examining {}", dir.display());
        let resolver = self.resolver.clone();
        let walk = WalkDir::new(dir)
            .follow_links(true)
            .min_depth(1)
            .max_depth(depth)
            .sort_by(|a, b| {
                a.file_type()
                    .is_dir()
                    .cmp(&b.file_type().is_dir())
                    .then_with(|| a.file_name().cmp(b.file_name()))
            })
            .into_iter()
            .filter_entry(|e| {
                !(e.file_type().is_dir() && e.file_name().to_string_lossy().starts_with('.'))
            });
        Box::new(
            walk.filter_map(std::result::Result::ok)
                .filter(|e| !e.file_type().is_dir())
                .map(move |e| resolver.resolve_path(e.path()))
                .filter(PlaylistEntry::is_valid),
        )
    }
}

enum M3u {
    Files(Vec<PathBuf>),
    Directory(PathBuf),
}

fn read_m3u(path: &Path) -> Result<M3u> {
    let data = std::fs::read(path)?;
    let text = String::from_utf8_lossy(&data);
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    let lines: Vec<&str> = text.trim().lines().collect();

    let mut files = Vec::new();
    for line in &lines {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let file = if line.starts_with('/') {
            PathBuf::from(line)
        } else if line.starts_with("file://") {
            match local_path(line) {
                Ok(local) => local,
                Err(_) => continue,
            }
        } else {
            base.join(line)
        };
        if lines.len() == 1 && file.is_dir() {
            return Ok(M3u::Directory(file));
        }
        files.push(file);
    }
    Ok(M3u::Files(files))
}

/// Version 2 pls files: one `[playlist]` section with `FileN` keys
fn read_pls(path: &Path) -> Result<Vec<PathBuf>> {
    let data = std::fs::read(path)?;
    let text = String::from_utf8_lossy(&data);

    let mut sections = Vec::new();
    let mut keys = std::collections::HashMap::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            sections.push(section.to_string());
        } else if let Some((key, value)) = line.split_once('=') {
            keys.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    if sections != ["playlist"] {
        return Err(MetadataError::Playlist(
            "wrong number of sections in pls file".to_string(),
        ));
    }
    if keys.get("version").map(String::as_str) != Some("2") {
        return Err(MetadataError::Playlist(
            "can handle version 2 pls playlists only".to_string(),
        ));
    }
    let count: usize = keys
        .get("numberofentries")
        .ok_or_else(|| MetadataError::Playlist("NumberOfEntries is missing from playlist".to_string()))?
        .parse()
        .map_err(|_| MetadataError::Playlist("NumberOfEntries is not an int".to_string()))?;

    Ok((1..=count)
        .filter_map(|i| keys.get(&format!("file{i}")))
        .map(PathBuf::from)
        .filter(|p| p.is_file())
        .collect())
}
