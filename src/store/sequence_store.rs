//! Label/index keyed sequence store.

use super::layout::{
    self, frame_file, is_stale_staging, parse_index, staging_dir_name, subdirectories,
    validate_label, CONSOLIDATED_FILE, PREVIEW_FILE,
};
use super::npy;
use super::preview::PreviewSettings;
use super::StoreError;
use crate::capture::KeypointFrame;
use crate::sequence::{Sequence, SequenceShape};
use std::fs;
use std::path::{Path, PathBuf};

/// Store location and geometry.
///
/// Passed explicitly to every store so several can coexist (tests,
/// multiple datasets) without shared global state.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Dataset root directory.
    pub root: PathBuf,
    /// Expected sequence geometry.
    pub shape: SequenceShape,
    /// Rewrite legacy sequences as consolidated files after reading them.
    pub migrate_on_read: bool,
    /// Thumbnail settings for [`SequenceStore::save_preview`].
    pub preview: PreviewSettings,
}

impl StoreConfig {
    /// Default geometry and settings rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            shape: SequenceShape::default(),
            migrate_on_read: true,
            preview: PreviewSettings::default(),
        }
    }

    pub fn with_shape(mut self, shape: SequenceShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_migrate_on_read(mut self, migrate: bool) -> Self {
        self.migrate_on_read = migrate;
        self
    }
}

/// Layout a sequence was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceLayout {
    /// One `keypoints.npy` holding every frame.
    Consolidated,
    /// One `<frame>.npy` file per frame.
    Legacy,
}

/// A sequence read from disk together with how it was recovered.
#[derive(Debug, Clone)]
pub struct LoadedSequence {
    pub sequence: Sequence,
    pub layout: SequenceLayout,
    /// Legacy frames that were absent and replaced by the zero frame.
    pub missing_frames: Vec<usize>,
    /// Whether a consolidated copy was written by this load.
    pub migrated: bool,
}

/// Outcome of [`SequenceStore::consolidate_all`].
#[derive(Debug, Clone, Default)]
pub struct MigrationReport {
    /// Sequences rewritten into the consolidated layout.
    pub migrated: usize,
    /// Sequences already consolidated or with no frames to migrate.
    pub unchanged: usize,
    /// Sequences that could not be read or written.
    pub failed: Vec<(String, u32, String)>,
    /// Staging directories left behind by interrupted saves and removed.
    pub swept: usize,
}

/// Filesystem-backed sequence store.
pub struct SequenceStore {
    config: StoreConfig,
}

impl SequenceStore {
    pub fn new(config: StoreConfig) -> Self {
        tracing::debug!(
            root = %config.root.display(),
            length = config.shape.length,
            keypoints = config.shape.keypoints,
            "Sequence store opened"
        );
        Self { config }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    pub fn shape(&self) -> SequenceShape {
        self.config.shape
    }

    pub(super) fn label_dir(&self, label: &str) -> PathBuf {
        self.config.root.join(label)
    }

    pub(super) fn sequence_dir(&self, label: &str, index: u32) -> PathBuf {
        self.label_dir(label).join(index.to_string())
    }

    /// Path of the preview thumbnail for a sequence.
    pub fn preview_path(&self, label: &str, index: u32) -> PathBuf {
        self.sequence_dir(label, index).join(PREVIEW_FILE)
    }

    // ---- labels ----

    /// Returns all labels, sorted by name.
    pub fn list_labels(&self) -> Result<Vec<String>, StoreError> {
        let mut labels: Vec<String> = subdirectories(&self.config.root)?
            .into_iter()
            .map(|(name, _)| name)
            .filter(|name| validate_label(name).is_ok())
            .collect();
        labels.sort();
        Ok(labels)
    }

    pub fn label_exists(&self, label: &str) -> bool {
        validate_label(label).is_ok() && self.label_dir(label).is_dir()
    }

    /// Creates an empty label directory.
    pub fn create_label(&self, label: &str) -> Result<(), StoreError> {
        validate_label(label)?;
        let dir = self.label_dir(label);
        if dir.exists() {
            return Err(StoreError::LabelExists(label.to_string()));
        }
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        tracing::info!(label, "Created label");
        Ok(())
    }

    /// Renames a label without ever overwriting an existing one.
    pub fn rename_label(&self, old: &str, new: &str) -> Result<(), StoreError> {
        validate_label(old)?;
        validate_label(new)?;

        let from = self.label_dir(old);
        let to = self.label_dir(new);
        if !from.is_dir() {
            return Err(StoreError::LabelNotFound(old.to_string()));
        }
        if to.exists() {
            return Err(StoreError::LabelExists(new.to_string()));
        }

        fs::rename(&from, &to).map_err(|e| StoreError::io(&from, e))?;
        tracing::info!(from = old, to = new, "Renamed label");
        Ok(())
    }

    /// Removes a label and all of its sequences. A missing label is not an error.
    pub fn delete_label(&self, label: &str) -> Result<(), StoreError> {
        validate_label(label)?;
        let dir = self.label_dir(label);
        remove_dir_if_present(&dir)?;
        tracing::info!(label, "Deleted label");
        Ok(())
    }

    // ---- sequences ----

    /// Sorted indices of the sequences stored under `label`.
    ///
    /// Gaps left by deletions are reflected as-is; staging directories
    /// and other non-index entries are skipped.
    pub fn sequence_indices(&self, label: &str) -> Result<Vec<u32>, StoreError> {
        validate_label(label)?;
        let mut indices: Vec<u32> = subdirectories(&self.label_dir(label))?
            .into_iter()
            .filter_map(|(name, _)| parse_index(&name))
            .collect();
        indices.sort_unstable();
        Ok(indices)
    }

    /// Number of sequences stored under `label`, regardless of layout or gaps.
    pub fn count(&self, label: &str) -> Result<usize, StoreError> {
        Ok(self.sequence_indices(label)?.len())
    }

    /// Index the next captured sequence will use: one past the highest.
    pub fn next_index(&self, label: &str) -> Result<u32, StoreError> {
        Ok(self
            .sequence_indices(label)?
            .last()
            .map_or(0, |last| last + 1))
    }

    pub fn sequence_exists(&self, label: &str, index: u32) -> bool {
        validate_label(label).is_ok() && self.sequence_dir(label, index).is_dir()
    }

    /// Saves a new sequence. Fails if `label/index` already exists.
    ///
    /// The sequence is written into a hidden staging directory and renamed
    /// into place, so an interrupted save never leaves a visible partial
    /// sequence behind.
    pub fn save(&self, label: &str, index: u32, sequence: &Sequence) -> Result<(), StoreError> {
        validate_label(label)?;
        self.check_shape(sequence)?;

        let label_dir = self.label_dir(label);
        fs::create_dir_all(&label_dir).map_err(|e| StoreError::io(&label_dir, e))?;

        let target = self.sequence_dir(label, index);
        if target.exists() {
            return Err(StoreError::SequenceExists {
                label: label.to_string(),
                index,
            });
        }

        let staging = label_dir.join(staging_dir_name(index));
        remove_dir_if_present(&staging)?;
        fs::create_dir(&staging).map_err(|e| StoreError::io(&staging, e))?;

        let bytes = encode_sequence(sequence);
        let written = layout::write_atomic(&staging.join(CONSOLIDATED_FILE), &bytes)
            .and_then(|()| fs::rename(&staging, &target).map_err(|e| StoreError::io(&target, e)));
        if let Err(e) = written {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }

        tracing::debug!(label, index, "Saved sequence");
        Ok(())
    }

    /// Saves a sequence under the next free index and returns it.
    pub fn save_next(&self, label: &str, sequence: &Sequence) -> Result<u32, StoreError> {
        let index = self.next_index(label)?;
        self.save(label, index, sequence)?;
        Ok(index)
    }

    /// Overwrites the consolidated data of a sequence, creating it if needed.
    pub fn replace(&self, label: &str, index: u32, sequence: &Sequence) -> Result<(), StoreError> {
        validate_label(label)?;
        self.check_shape(sequence)?;

        let dir = self.sequence_dir(label, index);
        if !dir.is_dir() {
            return self.save(label, index, sequence);
        }
        layout::write_atomic(&dir.join(CONSOLIDATED_FILE), &encode_sequence(sequence))?;
        tracing::debug!(label, index, "Replaced sequence");
        Ok(())
    }

    /// Loads a sequence using the configured length.
    pub fn load(&self, label: &str, index: u32) -> Result<Option<LoadedSequence>, StoreError> {
        self.load_with_length(label, index, self.config.shape.length)
    }

    /// Loads a sequence of `expected_length` frames.
    ///
    /// Returns `Ok(None)` when the sequence does not exist or a legacy
    /// sequence has no frame files at all. Missing legacy frames are
    /// zero-filled and listed in [`LoadedSequence::missing_frames`].
    /// Legacy sequences are only consolidated when `expected_length`
    /// matches the configured geometry.
    pub fn load_with_length(
        &self,
        label: &str,
        index: u32,
        expected_length: usize,
    ) -> Result<Option<LoadedSequence>, StoreError> {
        let loaded = self.read_sequence(label, index, expected_length)?;

        let Some(mut loaded) = loaded else {
            return Ok(None);
        };
        if loaded.layout == SequenceLayout::Legacy
            && self.config.migrate_on_read
            && expected_length == self.config.shape.length
        {
            let path = self.sequence_dir(label, index).join(CONSOLIDATED_FILE);
            match layout::write_atomic(&path, &encode_sequence(&loaded.sequence)) {
                Ok(()) => {
                    loaded.migrated = true;
                    tracing::debug!(label, index, "Consolidated legacy sequence on read");
                }
                Err(e) => {
                    tracing::trace!(label, index, error = %e, "Skipped legacy consolidation");
                }
            }
        }
        Ok(Some(loaded))
    }

    /// Rewrites one legacy sequence in the consolidated layout.
    ///
    /// Returns `Ok(false)` when there was nothing to migrate.
    pub fn consolidate(&self, label: &str, index: u32) -> Result<bool, StoreError> {
        let dir = self.sequence_dir(label, index);
        if dir.join(CONSOLIDATED_FILE).is_file() {
            return Ok(false);
        }

        match self.read_sequence(label, index, self.config.shape.length)? {
            Some(loaded) => {
                layout::write_atomic(
                    &dir.join(CONSOLIDATED_FILE),
                    &encode_sequence(&loaded.sequence),
                )?;
                tracing::debug!(
                    label,
                    index,
                    missing = loaded.missing_frames.len(),
                    "Consolidated legacy sequence"
                );
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Consolidates every legacy sequence in the dataset.
    ///
    /// Also removes staging directories abandoned by other processes.
    pub fn consolidate_all(&self) -> Result<MigrationReport, StoreError> {
        let mut report = MigrationReport::default();
        for label in self.list_labels()? {
            report.swept += self.sweep_staging(&label)?;
            for index in self.sequence_indices(&label)? {
                match self.consolidate(&label, index) {
                    Ok(true) => report.migrated += 1,
                    Ok(false) => report.unchanged += 1,
                    Err(e) => {
                        tracing::warn!(label = %label, index, error = %e, "Migration failed");
                        report.failed.push((label.clone(), index, e.to_string()));
                    }
                }
            }
        }
        tracing::info!(
            migrated = report.migrated,
            unchanged = report.unchanged,
            failed = report.failed.len(),
            swept = report.swept,
            "Dataset consolidation finished"
        );
        Ok(report)
    }

    /// Removes staging directories under `label` that an interrupted save
    /// from another process left behind. Returns how many were removed.
    pub fn sweep_staging(&self, label: &str) -> Result<usize, StoreError> {
        validate_label(label)?;
        let mut swept = 0;
        for (name, path) in subdirectories(&self.label_dir(label))? {
            if is_stale_staging(&name) {
                remove_dir_if_present(&path)?;
                tracing::debug!(label, staging = %name, "Removed abandoned staging directory");
                swept += 1;
            }
        }
        Ok(swept)
    }

    /// Removes a sequence. A missing sequence is not an error.
    pub fn delete(&self, label: &str, index: u32) -> Result<(), StoreError> {
        validate_label(label)?;
        remove_dir_if_present(&self.sequence_dir(label, index))?;
        tracing::debug!(label, index, "Deleted sequence");
        Ok(())
    }

    fn check_shape(&self, sequence: &Sequence) -> Result<(), StoreError> {
        let expected = self.config.shape;
        let found = sequence.shape();
        if found.keypoints != expected.keypoints {
            return Err(crate::sequence::SequenceError::WidthMismatch {
                expected: expected.keypoints,
                found: found.keypoints,
            }
            .into());
        }
        if found.length != expected.length {
            return Err(crate::sequence::SequenceError::LengthMismatch {
                expected: expected.length,
                found: found.length,
            }
            .into());
        }
        Ok(())
    }

    fn read_sequence(
        &self,
        label: &str,
        index: u32,
        expected_length: usize,
    ) -> Result<Option<LoadedSequence>, StoreError> {
        validate_label(label)?;
        let dir = self.sequence_dir(label, index);
        if !dir.is_dir() {
            return Ok(None);
        }

        let shape = SequenceShape::new(expected_length, self.config.shape.keypoints);
        let consolidated = dir.join(CONSOLIDATED_FILE);
        if consolidated.is_file() {
            let sequence = read_consolidated(&consolidated, shape)?;
            return Ok(Some(LoadedSequence {
                sequence,
                layout: SequenceLayout::Consolidated,
                missing_frames: Vec::new(),
                migrated: false,
            }));
        }

        let mut frames = Vec::with_capacity(expected_length);
        let mut missing_frames = Vec::new();
        for frame in 0..expected_length {
            let path = dir.join(frame_file(frame));
            if path.is_file() {
                frames.push(read_frame(&path, shape.keypoints)?);
            } else {
                missing_frames.push(frame);
                frames.push(KeypointFrame::zeros(shape.keypoints));
            }
        }

        if missing_frames.len() == expected_length {
            return Ok(None);
        }

        Ok(Some(LoadedSequence {
            sequence: Sequence::new(frames, shape)?,
            layout: SequenceLayout::Legacy,
            missing_frames,
            migrated: false,
        }))
    }
}

fn encode_sequence(sequence: &Sequence) -> Vec<u8> {
    let shape = sequence.shape();
    npy::encode(&[shape.length, shape.keypoints], &sequence.to_flat())
}

fn read_consolidated(path: &Path, shape: SequenceShape) -> Result<Sequence, StoreError> {
    let bytes = fs::read(path).map_err(|e| StoreError::io(path, e))?;
    let array = npy::decode(&bytes).map_err(|e| StoreError::corrupt(path, e))?;

    if array.shape != [shape.length, shape.keypoints] {
        return Err(StoreError::corrupt(
            path,
            format!(
                "array shape {:?}, expected [{}, {}]",
                array.shape, shape.length, shape.keypoints
            ),
        ));
    }
    Sequence::from_flat(&array.data, shape).map_err(|e| StoreError::corrupt(path, e))
}

fn read_frame(path: &Path, keypoints: usize) -> Result<KeypointFrame, StoreError> {
    let bytes = fs::read(path).map_err(|e| StoreError::io(path, e))?;
    let array = npy::decode(&bytes).map_err(|e| StoreError::corrupt(path, e))?;

    let width_ok = match array.shape.as_slice() {
        [k] => *k == keypoints,
        [1, k] => *k == keypoints,
        _ => false,
    };
    if !width_ok {
        return Err(StoreError::corrupt(
            path,
            format!("frame shape {:?}, expected [{}]", array.shape, keypoints),
        ));
    }
    Ok(KeypointFrame::new(array.data))
}

fn remove_dir_if_present(dir: &Path) -> Result<(), StoreError> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StoreError::io(dir, e)),
    }
}
