// File system operations for batch inputs and per-stem outputs
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use super::{StorageError, StorageResult};

/// Suffix identifying melody contour files
pub const MELODY_SUFFIX: &str = ".MIDI.smooth.melody";

/// Suffix of the note table paired with each melody
pub const NOTE_SUFFIX: &str = ".pruned.note";

/// Calculate SHA256 hash of data
pub fn calculate_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// SHA256 of a file's contents
pub fn file_sha256(path: &Path) -> StorageResult<String> {
    let data = fs::read(path).map_err(|source| StorageError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(calculate_sha256(&data))
}

/// File name up to its first `.`
pub fn stem_of(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let stem = name.split('.').next().unwrap_or(name);
    (!stem.is_empty()).then(|| stem.to_string())
}

/// Melody files to process: `input` itself when it is a melody file,
/// otherwise every melody file directly inside `input`, sorted by name
pub fn discover_melody_files(input: &Path) -> StorageResult<Vec<PathBuf>> {
    let is_melody = |path: &Path| {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(MELODY_SUFFIX))
    };

    if !input.is_dir() {
        return Ok(if is_melody(input) {
            vec![input.to_path_buf()]
        } else {
            Vec::new()
        });
    }

    let entries = fs::read_dir(input).map_err(|source| StorageError::Read {
        path: input.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && is_melody(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// `<note_dir>/<stem>.pruned.note`
pub fn note_path_for(note_dir: &Path, stem: &str) -> PathBuf {
    note_dir.join(format!("{}{}", stem, NOTE_SUFFIX))
}

/// A file written by `OutputSet::commit`
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub sha256: String,
}

/// Outputs of one stem, staged in memory and written together
#[derive(Debug, Default)]
pub struct OutputSet {
    files: Vec<(String, Vec<u8>)>,
}

impl OutputSet {
    pub fn new() -> Self {
        OutputSet::default()
    }

    pub fn add(&mut self, file_name: impl Into<String>, contents: impl Into<Vec<u8>>) {
        self.files.push((file_name.into(), contents.into()));
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|(name, _)| name.as_str())
    }

    /// Write every staged file into `dir`
    ///
    /// On the first failure the files already written by this call are
    /// removed, so a stem never keeps a partial result set.
    pub fn commit(self, dir: &Path) -> StorageResult<Vec<WrittenFile>> {
        fs::create_dir_all(dir).map_err(|source| StorageError::Write {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut written: Vec<WrittenFile> = Vec::with_capacity(self.files.len());
        for (file_name, contents) in &self.files {
            let path = dir.join(file_name);
            if let Err(source) = fs::write(&path, contents) {
                for file in &written {
                    if let Err(e) = fs::remove_file(&file.path) {
                        log::warn!("Failed to roll back {}: {}", file.path.display(), e);
                    }
                }
                return Err(StorageError::Write { path, source });
            }

            written.push(WrittenFile {
                path,
                sha256: calculate_sha256(contents),
            });
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_calculate_sha256() {
        let data = b"hello world";
        let hash = calculate_sha256(data);
        assert_eq!(
            hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_stem_of() {
        assert_eq!(
            stem_of(Path::new("/data/solo_01.MIDI.smooth.melody")),
            Some("solo_01".to_string())
        );
        assert_eq!(stem_of(Path::new("plain")), Some("plain".to_string()));
        assert_eq!(stem_of(Path::new(".hidden")), None);
    }

    #[test]
    fn test_discover_melody_files() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["b.MIDI.smooth.melody", "a.MIDI.smooth.melody", "a.pruned.note", "c.wav"] {
            fs::write(temp_dir.path().join(name), "0\n").unwrap();
        }

        let files = discover_melody_files(temp_dir.path()).unwrap();
        let names: Vec<_> = files.iter().filter_map(|p| stem_of(p)).collect();
        assert_eq!(names, vec!["a", "b"]);

        let single = discover_melody_files(&temp_dir.path().join("a.MIDI.smooth.melody")).unwrap();
        assert_eq!(single.len(), 1);

        let other = discover_melody_files(&temp_dir.path().join("c.wav")).unwrap();
        assert!(other.is_empty());
    }

    #[test]
    fn test_note_path_for() {
        assert_eq!(
            note_path_for(Path::new("/notes"), "solo"),
            PathBuf::from("/notes/solo.pruned.note")
        );
    }

    #[test]
    fn test_output_set_commit() {
        let temp_dir = TempDir::new().unwrap();
        let mut outputs = OutputSet::new();
        outputs.add("x.ascending.pattern", "0 1\n");
        outputs.add("x.descending.pattern", "");

        let written = outputs.commit(temp_dir.path()).unwrap();

        assert_eq!(written.len(), 2);
        assert_eq!(fs::read_to_string(&written[0].path).unwrap(), "0 1\n");
        assert_eq!(written[0].sha256, calculate_sha256(b"0 1\n"));
    }

    #[test]
    fn test_output_set_rolls_back_on_failure() {
        let temp_dir = TempDir::new().unwrap();
        // A directory where the second file should go makes its write fail
        fs::create_dir(temp_dir.path().join("x.blocked")).unwrap();

        let mut outputs = OutputSet::new();
        outputs.add("x.first", "1\n");
        outputs.add("x.blocked", "2\n");
        outputs.add("x.third", "3\n");

        let result = outputs.commit(temp_dir.path());

        assert!(matches!(result, Err(StorageError::Write { .. })));
        assert!(!temp_dir.path().join("x.first").exists());
        assert!(!temp_dir.path().join("x.third").exists());
    }
}
