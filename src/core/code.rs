//! Coded entries and content items.
//!
//! Codes are stored opaquely: the crate never interprets coding schemes or
//! meanings, it only carries them between the object model and datasets.

use crate::core::{tags, Dataset, DatasetExt};
use crate::util::{Error, Result, Tag, VR};

/// A (code value, coding scheme designator, code meaning) triplet.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CodedEntry {
    pub value: String,
    pub scheme: String,
    pub meaning: String,
}

impl CodedEntry {
    pub fn new(value: impl Into<String>, scheme: impl Into<String>, meaning: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            scheme: scheme.into(),
            meaning: meaning.into(),
        }
    }

    /// True when all three fields are empty.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty() && self.scheme.is_empty() && self.meaning.is_empty()
    }

    pub fn to_item(&self) -> Dataset {
        let mut item = Dataset::new_empty();
        item.put_text(tags::CODE_VALUE, VR::SH, self.value.as_str());
        item.put_text(tags::CODING_SCHEME_DESIGNATOR, VR::SH, self.scheme.as_str());
        item.put_text(tags::CODE_MEANING, VR::LO, self.meaning.as_str());
        item
    }

    pub fn from_item(item: &Dataset) -> Result<Self> {
        Ok(Self {
            value: item.text_or_default(tags::CODE_VALUE)?,
            scheme: item.text_or_default(tags::CODING_SCHEME_DESIGNATOR)?,
            meaning: item.text_or_default(tags::CODE_MEANING)?,
        })
    }

    /// Read the single code held by a code sequence, `None` if absent.
    pub fn from_sequence(ds: &Dataset, tag: Tag) -> Result<Option<Self>> {
        ds.first_item(tag)?.map(Self::from_item).transpose()
    }
}

/// A code-valued content item: concept name, concept, and nested items.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContentItem {
    pub concept_name: CodedEntry,
    pub concept: CodedEntry,
    pub children: Vec<ContentItem>,
}

impl ContentItem {
    /// Value type written for every item.
    pub const VALUE_TYPE: &'static str = "CODE";

    /// Nesting depth accepted when reading.
    const MAX_DEPTH: usize = 16;

    pub fn new(concept_name: CodedEntry, concept: CodedEntry) -> Self {
        Self {
            concept_name,
            concept,
            children: Vec::new(),
        }
    }

    /// Append a nested item.
    pub fn with_child(mut self, child: ContentItem) -> Self {
        self.children.push(child);
        self
    }

    pub fn to_item(&self) -> Dataset {
        let mut item = Dataset::new_empty();
        item.put_text(tags::VALUE_TYPE, VR::CS, Self::VALUE_TYPE);
        item.put_single_item(tags::CONCEPT_NAME_CODE_SEQUENCE, self.concept_name.to_item());
        item.put_single_item(tags::CONCEPT_CODE_SEQUENCE, self.concept.to_item());
        if !self.children.is_empty() {
            item.put_sequence(
                tags::CONTENT_SEQUENCE,
                self.children.iter().map(ContentItem::to_item).collect(),
            );
        }
        item
    }

    pub fn from_item(item: &Dataset) -> Result<Self> {
        Self::from_item_depth(item, 0)
    }

    fn from_item_depth(item: &Dataset, depth: usize) -> Result<Self> {
        if depth > Self::MAX_DEPTH {
            return Err(Error::invalid("content item nesting too deep"));
        }
        let children = item
            .sequence_items(tags::CONTENT_SEQUENCE)?
            .iter()
            .map(|child| Self::from_item_depth(child, depth + 1))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            concept_name: CodedEntry::from_sequence(item, tags::CONCEPT_NAME_CODE_SEQUENCE)?
                .unwrap_or_default(),
            concept: CodedEntry::from_sequence(item, tags::CONCEPT_CODE_SEQUENCE)?.unwrap_or_default(),
            children,
        })
    }
}
