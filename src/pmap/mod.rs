//! The parametric map aggregate.
//!
//! A [`ParametricMap`] owns its frames, their functional groups, the
//! dimension index model and the identification attributes. Objects are
//! built incrementally, validated once on save and handed to a
//! [`DatasetCodec`] for encoding.
//!
//! ```ignore
//! use parametric_map::prelude::*;
//!
//! let mut map = ParametricMap::create(NumericKind::Float32, 64, 64, Identification::default())?;
//! map.add_for_all_frames(PixelMeasures::new(1.0, 1.0))?;
//! map.add_for_all_frames(PlaneOrientation::axial())?;
//! map.add_for_all_frames(FrameType::derived("ADC", "DIFFUSION"))?;
//! map.add_frame(vec![0.0f32; 64 * 64], [FrameContent::new().into()])?;
//! let bytes = map.to_bytes()?;
//! ```
//!
//! # States
//!
//! `Building` after create/import, `Loaded` after load; both are mutable.
//! A successful save moves to `Persisted`, after which every mutation fails
//! with [`Error::Frozen`]. A failed save leaves the state as it was.

mod convert;
mod dimension;
mod identification;
mod validate;

pub use convert::pixel_data_tag;
pub use dimension::*;
pub use identification::*;
pub use validate::{Requirement, ValidationMode, ValidationOptions, ValidationRule, Violation};

use std::fmt;
use std::path::Path;

use crate::codec::{DatasetCodec, Part10Codec};
use crate::core::{Dataset, Sample, SampleBuffer, SampleVisitor, UidGenerator, UidProvider};
use crate::fg::{FunctionalGroup, FunctionalGroupRegistry, GroupKind};
use crate::util::{Error, NumericKind, Result, Tag};

/// Lifecycle state of a [`ParametricMap`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectState {
    /// Freshly created or imported; mutable.
    Building,
    /// Save in progress.
    Validating,
    /// Saved; read-only.
    Persisted,
    /// Decoded from bytes; mutable.
    Loaded,
}

impl ObjectState {
    pub const fn is_mutable(self) -> bool {
        matches!(self, Self::Building | Self::Loaded)
    }
}

impl fmt::Display for ObjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Building => "building",
            Self::Validating => "validating",
            Self::Persisted => "persisted",
            Self::Loaded => "loaded",
        };
        f.write_str(s)
    }
}

/// Multi-frame parametric map.
#[derive(Clone, Debug)]
pub struct ParametricMap {
    kind: NumericKind,
    rows: u16,
    columns: u16,
    identification: Identification,
    registry: FunctionalGroupRegistry,
    dimensions: DimensionIndexModel,
    frames: Vec<SampleBuffer>,
    state: ObjectState,
    validation: ValidationOptions,
}

impl ParametricMap {
    // ========================================================================
    // Construction
    // ========================================================================

    /// Create an empty object. Missing UIDs come from a default [`UidGenerator`].
    ///
    /// Empty software versions are filled with [`DEFAULT_SOFTWARE_VERSIONS`].
    pub fn create(kind: NumericKind, rows: u16, columns: u16, identification: Identification) -> Result<Self> {
        Self::create_with_uids(kind, rows, columns, identification, &mut UidGenerator::default())
    }

    /// Create an empty object, filling missing UIDs from `uids`.
    pub fn create_with_uids(
        kind: NumericKind,
        rows: u16,
        columns: u16,
        mut identification: Identification,
        uids: &mut dyn UidProvider,
    ) -> Result<Self> {
        if rows == 0 || columns == 0 {
            return Err(Error::InvalidGeometry { rows, columns });
        }
        identification.assign_missing_uids(uids)?;
        if identification.equipment.software_versions.is_empty() {
            identification.equipment.software_versions = DEFAULT_SOFTWARE_VERSIONS.to_string();
        }
        tracing::debug!("created {} map {}x{}", kind, rows, columns);
        Ok(Self {
            kind,
            rows,
            columns,
            identification,
            registry: FunctionalGroupRegistry::new(),
            dimensions: DimensionIndexModel::new(),
            frames: Vec::new(),
            state: ObjectState::Building,
            validation: ValidationOptions::default(),
        })
    }

    /// Create an object derived from `source`: identification is copied per
    /// `options`, geometry and groups start empty.
    pub fn import(
        source: &Identification,
        kind: NumericKind,
        rows: u16,
        columns: u16,
        options: ImportOptions,
    ) -> Result<Self> {
        Self::import_with_uids(source, kind, rows, columns, options, &mut UidGenerator::default())
    }

    pub fn import_with_uids(
        source: &Identification,
        kind: NumericKind,
        rows: u16,
        columns: u16,
        options: ImportOptions,
        uids: &mut dyn UidProvider,
    ) -> Result<Self> {
        let identification = Identification::derived_from(source, options, uids)?;
        Self::create_with_uids(kind, rows, columns, identification, uids)
    }

    /// Replace the options used by [`save`](Self::save).
    pub fn with_validation(mut self, options: ValidationOptions) -> Self {
        self.validation = options;
        self
    }

    pub fn set_validation(&mut self, options: ValidationOptions) {
        self.validation = options;
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    fn ensure_mutable(&self) -> Result<()> {
        if self.state.is_mutable() {
            Ok(())
        } else {
            Err(Error::Frozen)
        }
    }

    /// Attach a group at shared scope.
    pub fn add_for_all_frames(&mut self, group: impl Into<FunctionalGroup>) -> Result<()> {
        self.ensure_mutable()?;
        self.registry.add_shared(group.into())
    }

    /// Append a frame with its per-frame groups and return its index.
    ///
    /// Fails with [`Error::TypeMismatch`] if the samples are not of the
    /// object's kind, or [`Error::DuplicateGroupKind`] on a scope conflict.
    /// Nothing is attached on failure.
    pub fn add_frame(
        &mut self,
        samples: impl Into<SampleBuffer>,
        groups: impl IntoIterator<Item = FunctionalGroup>,
    ) -> Result<usize> {
        self.ensure_mutable()?;
        let samples = samples.into();
        samples.ensure_kind(self.kind)?;
        let index = self.registry.push_frame(groups)?;
        self.frames.push(samples);
        Ok(index)
    }

    /// Attach a per-frame group to an existing frame.
    pub fn add_frame_group(&mut self, frame: usize, group: impl Into<FunctionalGroup>) -> Result<()> {
        self.ensure_mutable()?;
        self.registry.add_per_frame(frame, group.into())
    }

    /// Append a dimension index over `pointer` in the frame content group.
    pub fn add_dimension_index(
        &mut self,
        pointer: Tag,
        organization_uid: impl Into<String>,
        label: impl Into<String>,
    ) -> Result<()> {
        self.add_dimension(DimensionIndex::new(pointer, organization_uid, label))
    }

    pub fn add_dimension(&mut self, entry: DimensionIndex) -> Result<()> {
        self.ensure_mutable()?;
        self.dimensions.push(entry);
        Ok(())
    }

    pub fn identification_mut(&mut self) -> Result<&mut Identification> {
        self.ensure_mutable()?;
        Ok(&mut self.identification)
    }

    // ========================================================================
    // Access
    // ========================================================================

    #[inline]
    pub fn numeric_kind(&self) -> NumericKind {
        self.kind
    }

    #[inline]
    pub fn rows(&self) -> u16 {
        self.rows
    }

    #[inline]
    pub fn columns(&self) -> u16 {
        self.columns
    }

    /// Samples per frame (`rows * columns`).
    #[inline]
    pub fn samples_per_frame(&self) -> usize {
        self.rows as usize * self.columns as usize
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn state(&self) -> ObjectState {
        self.state
    }

    pub fn identification(&self) -> &Identification {
        &self.identification
    }

    pub fn registry(&self) -> &FunctionalGroupRegistry {
        &self.registry
    }

    pub fn dimensions(&self) -> &DimensionIndexModel {
        &self.dimensions
    }

    pub fn validation(&self) -> &ValidationOptions {
        &self.validation
    }

    /// Resolve a group for a frame, per-frame first. The flag is `true` when shared.
    pub fn group(&self, frame: usize, kind: GroupKind) -> Result<(&FunctionalGroup, bool)> {
        self.registry.get(frame, kind)
    }

    pub fn frame(&self, index: usize) -> Result<Frame<'_>> {
        let samples = self.frames.get(index).ok_or(Error::FrameOutOfBounds {
            index,
            count: self.frames.len(),
        })?;
        Ok(Frame { index, samples, map: self })
    }

    pub fn frames(&self) -> impl ExactSizeIterator<Item = Frame<'_>> + '_ {
        self.frames
            .iter()
            .enumerate()
            .map(move |(index, samples)| Frame { index, samples, map: self })
    }

    /// Typed samples of a frame; [`Error::TypeMismatch`] if `T` is not the object's kind.
    pub fn frame_samples<T: Sample>(&self, index: usize) -> Result<&[T]> {
        self.frame(index)?.samples().as_slice()
    }

    /// Dispatch a frame's samples to the visitor handler for the object's kind.
    pub fn visit_frame<V: SampleVisitor>(&self, index: usize, visitor: &mut V) -> Result<V::Output> {
        Ok(self.frame(index)?.samples().visit(visitor))
    }

    // ========================================================================
    // Validation and persistence
    // ========================================================================

    /// Every violation under `options`, without changing state.
    pub fn violations(&self, options: &ValidationOptions) -> Vec<Violation> {
        validate::run(self, options)
    }

    /// Validate with the object's options.
    pub fn validate(&self) -> Result<()> {
        let violations = validate::run(self, &self.validation);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(Error::ValidationFailed { violations })
        }
    }

    /// Generic dataset view of the object.
    pub fn to_dataset(&self) -> Dataset {
        convert::to_dataset(self)
    }

    /// Build an object from a generic dataset. The result is `Loaded`.
    pub fn from_dataset(dataset: &Dataset) -> Result<Self> {
        convert::from_dataset(dataset)
    }

    /// Validate, encode with `codec` and freeze the object.
    ///
    /// On any failure the object keeps its previous state.
    #[tracing::instrument(skip_all, fields(frames = self.frames.len()))]
    pub fn save(&mut self, codec: &dyn DatasetCodec) -> Result<Vec<u8>> {
        let prior = self.state;
        self.state = ObjectState::Validating;
        let result = self.validate().and_then(|()| Ok(codec.encode(&self.to_dataset())?));
        match result {
            Ok(bytes) => {
                self.state = ObjectState::Persisted;
                tracing::debug!("saved {} bytes", bytes.len());
                Ok(bytes)
            }
            Err(e) => {
                self.state = prior;
                tracing::warn!("save failed: {}", e);
                Err(e)
            }
        }
    }

    /// Save with the default [`Part10Codec`].
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.save(&Part10Codec::default())
    }

    /// Save with `codec` and write the bytes to `path`.
    pub fn save_file(&mut self, path: impl AsRef<Path>, codec: &dyn DatasetCodec) -> Result<()> {
        let prior = self.state;
        let bytes = self.save(codec)?;
        std::fs::write(path, bytes).inspect_err(|_| self.state = prior)?;
        Ok(())
    }

    /// Decode `bytes` with `codec`.
    #[tracing::instrument(skip_all, fields(len = bytes.len()))]
    pub fn load(bytes: &[u8], codec: &dyn DatasetCodec) -> Result<Self> {
        let dataset = codec.decode(bytes)?;
        let map = Self::from_dataset(&dataset)?;
        tracing::debug!("loaded {} {} frames", map.frame_count(), map.kind);
        Ok(map)
    }

    /// Decode `bytes` with the default [`Part10Codec`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::load(bytes, &Part10Codec::default())
    }

    /// Load a file written by the default [`Part10Codec`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        Self::load_file(file)
    }

    #[cfg(feature = "mmap")]
    fn load_file(file: std::fs::File) -> Result<Self> {
        if file.metadata()?.len() == 0 {
            return Self::from_bytes(&[]);
        }
        // Safety: the mapping is read-only and dropped before returning.
        let mmap = unsafe { memmap2::Mmap::map(&file) }.map_err(|e| Error::MmapFailed(e.to_string()))?;
        Self::from_bytes(&mmap)
    }

    #[cfg(not(feature = "mmap"))]
    fn load_file(mut file: std::fs::File) -> Result<Self> {
        use std::io::Read;

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }
}

/// Borrowed view of one frame.
#[derive(Clone, Copy)]
pub struct Frame<'a> {
    index: usize,
    samples: &'a SampleBuffer,
    map: &'a ParametricMap,
}

impl<'a> Frame<'a> {
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn samples(&self) -> &'a SampleBuffer {
        self.samples
    }

    /// Sample at (`row`, `col`) as `f64`.
    pub fn value_at(&self, row: u16, col: u16) -> Option<f64> {
        if row >= self.map.rows || col >= self.map.columns {
            return None;
        }
        self.samples
            .get_f64(row as usize * self.map.columns as usize + col as usize)
    }

    /// Stored value at (`row`, `col`) mapped through the first covering value mapping item.
    pub fn real_world_value_at(&self, row: u16, col: u16) -> Option<f64> {
        let stored = self.value_at(row, col)?;
        let (group, _) = self.map.registry.resolve(self.index, GroupKind::RealWorldValueMapping)?;
        group
            .as_real_world_value_mapping()?
            .items
            .iter()
            .filter(|item| (item.first_value_mapped..=item.last_value_mapped).contains(&stored))
            .find_map(|item| item.map_value(stored))
    }

    /// Per-frame groups of this frame.
    pub fn groups(&self) -> &'a [FunctionalGroup] {
        self.map.registry.frame_groups(self.index).unwrap_or_default()
    }

    /// Resolve a group, per-frame first.
    pub fn group(&self, kind: GroupKind) -> Result<(&'a FunctionalGroup, bool)> {
        self.map.registry.get(self.index, kind)
    }

    /// Dimension index values from the frame content group.
    pub fn index_values(&self) -> Option<&'a [u32]> {
        frame_index_values(&self.map.registry, self.index)
    }
}

impl fmt::Debug for Frame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("index", &self.index)
            .field("samples", self.samples)
            .field("groups", &self.groups().len())
            .finish()
    }
}
