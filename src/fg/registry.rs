//! Shared/per-frame scoping of functional groups.
//!
//! A kind lives either at shared scope (one instance, visible to every frame)
//! or at per-frame scope (at most one instance per frame), never both.
//! Lookups resolve per-frame first, then shared.

use smallvec::SmallVec;
use tracing::debug;

use super::{FunctionalGroup, GroupKind, GroupScope};
use crate::util::{Error, Result};

/// Per-frame groups of one frame. Most frames carry only a handful.
pub type FrameGroups = SmallVec<[FunctionalGroup; 4]>;

/// Owner of every functional group instance of one object.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FunctionalGroupRegistry {
    shared: Vec<FunctionalGroup>,
    frames: Vec<FrameGroups>,
}

impl FunctionalGroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frame slots.
    #[inline]
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// Shared groups in insertion order.
    #[inline]
    pub fn shared(&self) -> &[FunctionalGroup] {
        &self.shared
    }

    /// Per-frame groups of a frame.
    pub fn frame_groups(&self, frame: usize) -> Option<&[FunctionalGroup]> {
        self.frames.get(frame).map(|g| g.as_slice())
    }

    /// Shared instance of a kind.
    pub fn shared_group(&self, kind: GroupKind) -> Option<&FunctionalGroup> {
        self.shared.iter().find(|g| g.kind() == kind)
    }

    pub fn is_shared(&self, kind: GroupKind) -> bool {
        self.shared_group(kind).is_some()
    }

    /// First frame carrying a per-frame instance of `kind`.
    pub fn first_frame_with(&self, kind: GroupKind) -> Option<usize> {
        self.frames
            .iter()
            .position(|groups| groups.iter().any(|g| g.kind() == kind))
    }

    pub fn is_per_frame(&self, kind: GroupKind) -> bool {
        self.first_frame_with(kind).is_some()
    }

    /// Attach a shared group.
    ///
    /// Fails with [`Error::DuplicateGroupKind`] if the kind is already shared
    /// or attached to any frame.
    pub fn add_shared(&mut self, group: FunctionalGroup) -> Result<()> {
        let kind = group.kind();
        if self.is_shared(kind) {
            return Err(Error::DuplicateGroupKind { kind, scope: GroupScope::Shared });
        }
        if let Some(frame) = self.first_frame_with(kind) {
            return Err(Error::DuplicateGroupKind { kind, scope: GroupScope::Frame(frame) });
        }
        debug!("shared group {} attached", kind);
        self.shared.push(group);
        Ok(())
    }

    /// Check a group set for the frame at `frame` without attaching it.
    pub fn check_frame_groups(&self, frame: usize, groups: &[FunctionalGroup]) -> Result<()> {
        for (i, group) in groups.iter().enumerate() {
            let kind = group.kind();
            if self.is_shared(kind) {
                return Err(Error::DuplicateGroupKind { kind, scope: GroupScope::Shared });
            }
            if groups[..i].iter().any(|g| g.kind() == kind) {
                return Err(Error::DuplicateGroupKind { kind, scope: GroupScope::Frame(frame) });
            }
        }
        Ok(())
    }

    /// Append a frame slot with its per-frame groups. Nothing is attached on error.
    pub fn push_frame(&mut self, groups: impl IntoIterator<Item = FunctionalGroup>) -> Result<usize> {
        let groups: FrameGroups = groups.into_iter().collect();
        let index = self.frames.len();
        self.check_frame_groups(index, &groups)?;
        debug!("frame {} registered with {} groups", index, groups.len());
        self.frames.push(groups);
        Ok(index)
    }

    /// Attach a per-frame group to an existing frame.
    pub fn add_per_frame(&mut self, frame: usize, group: FunctionalGroup) -> Result<()> {
        let kind = group.kind();
        if self.is_shared(kind) {
            return Err(Error::DuplicateGroupKind { kind, scope: GroupScope::Shared });
        }
        let count = self.frames.len();
        let groups = self
            .frames
            .get_mut(frame)
            .ok_or(Error::FrameOutOfBounds { index: frame, count })?;
        if groups.iter().any(|g| g.kind() == kind) {
            return Err(Error::DuplicateGroupKind { kind, scope: GroupScope::Frame(frame) });
        }
        groups.push(group);
        Ok(())
    }

    /// Resolve a kind for a frame, per-frame first. `None` if unresolvable.
    pub fn resolve(&self, frame: usize, kind: GroupKind) -> Option<(&FunctionalGroup, bool)> {
        self.frames
            .get(frame)?
            .iter()
            .find(|g| g.kind() == kind)
            .map(|g| (g, false))
            .or_else(|| self.shared_group(kind).map(|g| (g, true)))
    }

    /// Resolve a kind for a frame. The flag is `true` for a shared instance.
    pub fn get(&self, frame: usize, kind: GroupKind) -> Result<(&FunctionalGroup, bool)> {
        if frame >= self.frames.len() {
            return Err(Error::FrameOutOfBounds { index: frame, count: self.frames.len() });
        }
        self.resolve(frame, kind)
            .ok_or(Error::GroupNotFound { frame, kind })
    }

    /// Every instance of a kind with its scope: the shared one, else one per carrying frame.
    pub fn instances(&self, kind: GroupKind) -> impl Iterator<Item = (GroupScope, &FunctionalGroup)> + '_ {
        let shared = self
            .shared_group(kind)
            .map(|g| (GroupScope::Shared, g));
        let per_frame = self.frames.iter().enumerate().flat_map(move |(i, groups)| {
            groups
                .iter()
                .filter(move |g| g.kind() == kind)
                .map(move |g| (GroupScope::Frame(i), g))
        });
        shared.into_iter().chain(per_frame)
    }
}
