//! Dimension index model - declared axes ordering the frames.

use smallvec::SmallVec;
use tracing::trace;

use crate::core::{tags, Dataset, DatasetExt};
use crate::fg::{FunctionalGroupRegistry, GroupKind};
use crate::util::{Error, Result, Tag, VR};

/// One declared axis.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DimensionIndex {
    /// Attribute whose value indexes this axis.
    pub pointer: Tag,
    /// Functional group sequence holding that attribute.
    pub functional_group: Tag,
    /// Dimension organization this axis belongs to.
    pub organization_uid: String,
    pub label: String,
}

impl DimensionIndex {
    /// Axis over an attribute of the frame content group.
    pub fn new(pointer: Tag, organization_uid: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            pointer,
            functional_group: GroupKind::FrameContent.sequence_tag(),
            organization_uid: organization_uid.into(),
            label: label.into(),
        }
    }

    pub fn with_functional_group(mut self, kind: GroupKind) -> Self {
        self.functional_group = kind.sequence_tag();
        self
    }

    pub fn to_item(&self) -> Dataset {
        let mut item = Dataset::new_empty();
        item.put_at(tags::DIMENSION_INDEX_POINTER, self.pointer);
        item.put_at(tags::FUNCTIONAL_GROUP_POINTER, self.functional_group);
        item.put_text(tags::DIMENSION_ORGANIZATION_UID, VR::UI, self.organization_uid.as_str());
        item.put_text_nonempty(tags::DIMENSION_DESCRIPTION_LABEL, VR::LO, &self.label);
        item
    }

    pub fn from_item(item: &Dataset) -> Result<Self> {
        let pointer = item
            .tag_attr(tags::DIMENSION_INDEX_POINTER)?
            .ok_or(Error::MissingAttribute(tags::DIMENSION_INDEX_POINTER))?;
        Ok(Self {
            pointer,
            functional_group: item
                .tag_attr(tags::FUNCTIONAL_GROUP_POINTER)?
                .unwrap_or(GroupKind::FrameContent.sequence_tag()),
            organization_uid: item.text_or_default(tags::DIMENSION_ORGANIZATION_UID)?,
            label: item.text_or_default(tags::DIMENSION_DESCRIPTION_LABEL)?,
        })
    }
}

/// Ordered axes. Order defines the expected order of per-frame index values.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DimensionIndexModel {
    entries: Vec<DimensionIndex>,
}

impl DimensionIndexModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an axis.
    pub fn push(&mut self, entry: DimensionIndex) {
        trace!("dimension {} -> {}", self.entries.len(), entry.pointer);
        self.entries.push(entry);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[DimensionIndex] {
        &self.entries
    }

    /// Distinct organization UIDs in first-use order.
    pub fn organization_uids(&self) -> SmallVec<[&str; 2]> {
        let mut uids: SmallVec<[&str; 2]> = SmallVec::new();
        for e in &self.entries {
            if !uids.contains(&e.organization_uid.as_str()) {
                uids.push(&e.organization_uid);
            }
        }
        uids
    }

    /// Check one frame's index values. A frame without frame content supplies none.
    pub fn validate_frame(&self, frame: usize, values: Option<&[u32]>) -> Result<()> {
        let actual = values.map_or(0, <[u32]>::len);
        if actual != self.entries.len() {
            return Err(Error::DimensionMismatch { frame, expected: self.entries.len(), actual });
        }
        Ok(())
    }

    /// Check every frame of a registry, stopping at the first mismatch.
    pub fn validate_against(&self, registry: &FunctionalGroupRegistry) -> Result<()> {
        (0..registry.num_frames())
            .try_for_each(|frame| self.validate_frame(frame, frame_index_values(registry, frame)))
    }
}

/// Dimension index values a frame resolves to, if it has frame content.
pub fn frame_index_values(registry: &FunctionalGroupRegistry, frame: usize) -> Option<&[u32]> {
    registry
        .resolve(frame, GroupKind::FrameContent)
        .and_then(|(g, _)| g.as_frame_content())
        .map(|fc| fc.dimension_index_values.as_slice())
}

impl<'a> IntoIterator for &'a DimensionIndexModel {
    type Item = &'a DimensionIndex;
    type IntoIter = std::slice::Iter<'a, DimensionIndex>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl FromIterator<DimensionIndex> for DimensionIndexModel {
    fn from_iter<I: IntoIterator<Item = DimensionIndex>>(iter: I) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fg::{FrameContent, FrameGroups, FunctionalGroup};

    fn registry(values: &[&[u32]]) -> FunctionalGroupRegistry {
        let mut reg = FunctionalGroupRegistry::new();
        for v in values {
            reg.push_frame([FunctionalGroup::from(FrameContent::with_index_values(v))]).unwrap();
        }
        reg
    }

    #[test]
    fn test_matching_frames() {
        let mut model = DimensionIndexModel::new();
        model.push(DimensionIndex::new(tags::IN_STACK_POSITION_NUMBER, "1.2.3", "Slice"));
        assert!(model.validate_against(&registry(&[&[0], &[9]])).is_ok());
    }

    #[test]
    fn test_count_mismatch() {
        let mut model = DimensionIndexModel::new();
        model.push(DimensionIndex::new(tags::STACK_ID, "1.2.3", "Stack"));
        model.push(DimensionIndex::new(tags::IN_STACK_POSITION_NUMBER, "1.2.3", "Slice"));
        let err = model.validate_against(&registry(&[&[1, 1], &[1]])).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { frame: 1, expected: 2, actual: 1 }));
    }

    #[test]
    fn test_values_without_entries() {
        let err = DimensionIndexModel::new()
            .validate_against(&registry(&[&[3]]))
            .unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { frame: 0, expected: 0, actual: 1 }));
    }

    #[test]
    fn test_missing_frame_content() {
        let mut reg = FunctionalGroupRegistry::new();
        reg.push_frame(FrameGroups::new()).unwrap();
        assert!(DimensionIndexModel::new().validate_against(&reg).is_ok());

        let model: DimensionIndexModel =
            [DimensionIndex::new(tags::IN_STACK_POSITION_NUMBER, "1.2.3", "")].into_iter().collect();
        assert!(matches!(
            model.validate_against(&reg),
            Err(Error::DimensionMismatch { frame: 0, expected: 1, actual: 0 })
        ));
    }

    #[test]
    fn test_organization_uids() {
        let model: DimensionIndexModel = [
            DimensionIndex::new(tags::STACK_ID, "1.1", "a"),
            DimensionIndex::new(tags::IN_STACK_POSITION_NUMBER, "1.2", "b"),
            DimensionIndex::new(tags::TEMPORAL_POSITION_INDEX, "1.1", "c"),
        ]
        .into_iter()
        .collect();
        assert_eq!(model.organization_uids().as_slice(), &["1.1", "1.2"]);
    }

    #[test]
    fn test_item_defaults_to_frame_content() {
        let entry = DimensionIndex::new(tags::IN_STACK_POSITION_NUMBER, "1.2.3", "Slice");
        let mut item = entry.to_item();
        item.remove_element(tags::FUNCTIONAL_GROUP_POINTER);
        assert_eq!(DimensionIndex::from_item(&item).unwrap(), entry);

        assert!(matches!(
            DimensionIndex::from_item(&Dataset::new_empty()),
            Err(Error::MissingAttribute(t)) if t == tags::DIMENSION_INDEX_POINTER
        ));
    }
}
