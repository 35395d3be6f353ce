//! Structural validation run by `save`.
//!
//! Rules run in a fixed order. Per-frame rules check frames in parallel but
//! report in frame order, so fail-fast always yields the lowest failing frame
//! of the first failing rule.

use std::fmt;

use rayon::prelude::*;
use smallvec::{smallvec, SmallVec};
use tracing::debug;

use super::dimension::frame_index_values;
use super::ParametricMap;
use crate::fg::{FunctionalGroupRegistry, GroupKind, GroupScope};
use crate::util::Error;

/// Validation rules in evaluation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValidationRule {
    /// At least one frame.
    FramesPresent = 1,
    /// Required group kinds resolve for every frame.
    RequiredGroups = 2,
    /// Dimension index values match the model.
    Dimensions = 3,
    /// Frame buffers hold rows x columns samples of the object's kind.
    SampleBuffers = 4,
    /// Real world value mapping items are well specified with bounds the numeric kind stores.
    ValueMappings = 5,
    /// Study, series and instance UIDs present.
    Identification = 6,
}

impl ValidationRule {
    pub const fn number(self) -> u8 {
        self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::FramesPresent => "frames present",
            Self::RequiredGroups => "required groups",
            Self::Dimensions => "dimensions",
            Self::SampleBuffers => "sample buffers",
            Self::ValueMappings => "value mappings",
            Self::Identification => "identification",
        }
    }
}

impl fmt::Display for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule {} ({})", self.number(), self.name())
    }
}

/// One failed check with its context.
#[derive(Debug)]
pub struct Violation {
    pub rule: ValidationRule,
    pub frame: Option<usize>,
    pub kind: Option<GroupKind>,
    pub cause: Error,
}

impl Violation {
    fn new(rule: ValidationRule, cause: Error) -> Self {
        Self { rule, frame: None, kind: None, cause }
    }

    fn at_frame(mut self, frame: usize) -> Self {
        self.frame = Some(frame);
        self
    }

    fn with_kind(mut self, kind: GroupKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rule)?;
        if let Some(frame) = self.frame {
            write!(f, ", frame {}", frame)?;
        }
        if let Some(kind) = self.kind {
            write!(f, ", {}", kind)?;
        }
        write!(f, ": {}", self.cause)
    }
}

/// Whether validation stops at the first violation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ValidationMode {
    #[default]
    FailFast,
    Accumulate,
}

/// A required group: satisfied when any of its kinds resolves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Requirement {
    any_of: SmallVec<[GroupKind; 2]>,
}

impl Requirement {
    pub fn one(kind: GroupKind) -> Self {
        Self { any_of: smallvec![kind] }
    }

    pub fn any_of(kinds: impl IntoIterator<Item = GroupKind>) -> Self {
        Self { any_of: kinds.into_iter().collect() }
    }

    pub fn kinds(&self) -> &[GroupKind] {
        &self.any_of
    }

    /// Kind reported when the requirement fails.
    pub fn primary(&self) -> Option<GroupKind> {
        self.any_of.first().copied()
    }

    pub fn is_satisfied(&self, registry: &FunctionalGroupRegistry, frame: usize) -> bool {
        self.any_of.iter().any(|&k| registry.resolve(frame, k).is_some())
    }
}

/// Validation configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationOptions {
    pub mode: ValidationMode,
    pub required: Vec<Requirement>,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            mode: ValidationMode::FailFast,
            required: Self::default_requirements(),
        }
    }
}

impl ValidationOptions {
    /// Pixel measures, plane orientation or position, and frame type.
    pub fn default_requirements() -> Vec<Requirement> {
        vec![
            Requirement::one(GroupKind::PixelMeasures),
            Requirement::any_of([GroupKind::PlaneOrientation, GroupKind::PlanePosition]),
            Requirement::one(GroupKind::FrameType),
        ]
    }

    /// Collect every violation instead of stopping at the first.
    pub fn accumulate(mut self) -> Self {
        self.mode = ValidationMode::Accumulate;
        self
    }

    pub fn with_required(mut self, required: Vec<Requirement>) -> Self {
        self.required = required;
        self
    }

    pub fn require(mut self, requirement: Requirement) -> Self {
        self.required.push(requirement);
        self
    }
}

/// Run all rules. In fail-fast mode at most one violation is returned.
pub(crate) fn run(map: &ParametricMap, opts: &ValidationOptions) -> Vec<Violation> {
    let fail_fast = opts.mode == ValidationMode::FailFast;
    let mut violations = Vec::new();

    let rules: [&dyn Fn() -> Vec<Violation>; 6] = [
        &|| frames_present(map),
        &|| per_frame(map, opts.mode, |i| required_groups(map, opts, i)),
        &|| per_frame(map, opts.mode, |i| dimensions(map, i)),
        &|| per_frame(map, opts.mode, |i| sample_buffer(map, i)),
        &|| value_mappings(map, opts.mode),
        &|| identification(map),
    ];
    for rule in rules {
        violations.extend(rule());
        if fail_fast && !violations.is_empty() {
            violations.truncate(1);
            break;
        }
    }
    debug!("validation found {} violations", violations.len());
    violations
}

/// Apply a per-frame check to every frame, keeping frame order.
fn per_frame<F>(map: &ParametricMap, mode: ValidationMode, check: F) -> Vec<Violation>
where
    F: Fn(usize) -> SmallVec<[Violation; 1]> + Sync + Send,
{
    let frames = 0..map.frame_count();
    match mode {
        ValidationMode::FailFast => frames
            .into_par_iter()
            .find_map_first(|i| check(i).into_iter().next())
            .into_iter()
            .collect(),
        ValidationMode::Accumulate => frames.into_par_iter().flat_map_iter(&check).collect(),
    }
}

fn frames_present(map: &ParametricMap) -> Vec<Violation> {
    if map.frame_count() == 0 {
        vec![Violation::new(ValidationRule::FramesPresent, Error::NotFound("no frames".to_string()))]
    } else {
        Vec::new()
    }
}

fn required_groups(map: &ParametricMap, opts: &ValidationOptions, frame: usize) -> SmallVec<[Violation; 1]> {
    opts.required
        .iter()
        .filter(|req| !req.is_satisfied(&map.registry, frame))
        .filter_map(|req| req.primary())
        .map(|kind| {
            Violation::new(ValidationRule::RequiredGroups, Error::GroupNotFound { frame, kind })
                .at_frame(frame)
                .with_kind(kind)
        })
        .collect()
}

fn dimensions(map: &ParametricMap, frame: usize) -> SmallVec<[Violation; 1]> {
    let values = frame_index_values(&map.registry, frame);
    match map.dimensions.validate_frame(frame, values) {
        Ok(()) => SmallVec::new(),
        Err(e) => smallvec![Violation::new(ValidationRule::Dimensions, e)
            .at_frame(frame)
            .with_kind(GroupKind::FrameContent)],
    }
}

fn sample_buffer(map: &ParametricMap, frame: usize) -> SmallVec<[Violation; 1]> {
    let Some(buffer) = map.frames.get(frame) else {
        return SmallVec::new();
    };
    let cause = if let Err(e) = buffer.ensure_kind(map.kind) {
        e
    } else if buffer.len() != map.samples_per_frame() {
        Error::SampleCountMismatch { frame, expected: map.samples_per_frame(), actual: buffer.len() }
    } else {
        return SmallVec::new();
    };
    smallvec![Violation::new(ValidationRule::SampleBuffers, cause).at_frame(frame)]
}

fn value_mappings(map: &ParametricMap, mode: ValidationMode) -> Vec<Violation> {
    let mut out = Vec::new();
    for (scope, group) in map.registry.instances(GroupKind::RealWorldValueMapping) {
        let Some(rwvm) = group.as_real_world_value_mapping() else {
            continue;
        };
        let frame = match scope {
            GroupScope::Shared => None,
            GroupScope::Frame(i) => Some(i),
        };
        for (index, item) in rwvm.items.iter().enumerate() {
            if let Err(cause) = item.validate(map.kind, frame, index) {
                out.push(Violation {
                    rule: ValidationRule::ValueMappings,
                    frame,
                    kind: Some(GroupKind::RealWorldValueMapping),
                    cause,
                });
                if mode == ValidationMode::FailFast {
                    return out;
                }
            }
        }
    }
    out
}

fn identification(map: &ParametricMap) -> Vec<Violation> {
    match map.identification.check() {
        Ok(()) => Vec::new(),
        Err(e) => vec![Violation::new(ValidationRule::Identification, e)],
    }
}
