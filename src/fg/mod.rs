//! Functional groups - typed metadata bundles attachable per frame or shared.
//!
//! - [`GroupKind`] - the closed set of built-in kinds plus registered custom kinds
//! - [`FunctionalGroup`] - tagged union over the group structs
//! - [`FunctionalGroupRegistry`] - shared/per-frame scoping authority
//! - [`RealWorldValueMapping`] - stored-value to real-world-value mapping

mod groups;
mod rwvm;
mod registry;

pub use groups::*;
pub use rwvm::*;
pub use registry::*;

use std::fmt;

use crate::core::{tags, Dataset};
use crate::util::{Error, NumericKind, Result, Tag};

/// Kind of a functional group, identified by its sequence tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKind {
    PixelMeasures,
    PlaneOrientation,
    PlanePosition,
    FrameAnatomy,
    FrameContent,
    RealWorldValueMapping,
    PixelValueTransformation,
    FrameType,
    /// Registered kind carried opaquely, keyed by its sequence tag.
    Custom(Tag),
}

impl GroupKind {
    /// Built-in kinds.
    pub const BUILTIN: [GroupKind; 8] = [
        Self::PixelMeasures,
        Self::PlaneOrientation,
        Self::PlanePosition,
        Self::FrameAnatomy,
        Self::FrameContent,
        Self::RealWorldValueMapping,
        Self::PixelValueTransformation,
        Self::FrameType,
    ];

    /// Sequence tag holding this group inside a functional groups item.
    pub const fn sequence_tag(self) -> Tag {
        match self {
            Self::PixelMeasures => tags::PIXEL_MEASURES_SEQUENCE,
            Self::PlaneOrientation => tags::PLANE_ORIENTATION_SEQUENCE,
            Self::PlanePosition => tags::PLANE_POSITION_SEQUENCE,
            Self::FrameAnatomy => tags::FRAME_ANATOMY_SEQUENCE,
            Self::FrameContent => tags::FRAME_CONTENT_SEQUENCE,
            Self::RealWorldValueMapping => tags::REAL_WORLD_VALUE_MAPPING_SEQUENCE,
            Self::PixelValueTransformation => tags::PIXEL_VALUE_TRANSFORMATION_SEQUENCE,
            Self::FrameType => tags::PARAMETRIC_MAP_FRAME_TYPE_SEQUENCE,
            Self::Custom(tag) => tag,
        }
    }

    /// Kind for a sequence tag; unknown tags become [`GroupKind::Custom`].
    pub fn from_sequence_tag(tag: Tag) -> Self {
        Self::BUILTIN
            .into_iter()
            .find(|k| k.sequence_tag() == tag)
            .unwrap_or(Self::Custom(tag))
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::PixelMeasures => "PixelMeasures",
            Self::PlaneOrientation => "PlaneOrientation",
            Self::PlanePosition => "PlanePosition",
            Self::FrameAnatomy => "FrameAnatomy",
            Self::FrameContent => "FrameContent",
            Self::RealWorldValueMapping => "RealWorldValueMapping",
            Self::PixelValueTransformation => "PixelValueTransformation",
            Self::FrameType => "FrameType",
            Self::Custom(_) => "Custom",
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(tag) => write!(f, "Custom{}", tag),
            _ => write!(f, "{}", self.name()),
        }
    }
}

/// Where a group instance is attached.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GroupScope {
    /// Applies to every frame.
    Shared,
    /// Applies to one frame.
    Frame(usize),
}

impl fmt::Display for GroupScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shared => write!(f, "shared"),
            Self::Frame(i) => write!(f, "frame {}", i),
        }
    }
}

/// A group struct that maps to and from a single functional group sequence item.
pub trait GroupMacro: Sized {
    /// The kind this struct represents.
    const KIND: GroupKind;

    /// Encode as a sequence item. `kind` is the numeric kind of the owning object.
    fn to_item(&self, kind: NumericKind) -> Dataset;

    /// Decode from a sequence item.
    fn from_item(item: &Dataset) -> Result<Self>;
}

/// Opaque group of a registered kind.
///
/// The sequence tag is never one of the built-in kinds' tags, so a custom
/// group cannot shadow a typed group in either scope.
#[derive(Clone, Debug, PartialEq)]
pub struct CustomGroup {
    sequence_tag: Tag,
    items: Vec<Dataset>,
}

impl CustomGroup {
    /// Wrap opaque items under `sequence_tag`.
    ///
    /// Fails with [`Error::ReservedGroupTag`] when the tag belongs to a built-in kind.
    pub fn new(sequence_tag: Tag, items: Vec<Dataset>) -> Result<Self> {
        match GroupKind::from_sequence_tag(sequence_tag) {
            GroupKind::Custom(_) => Ok(Self { sequence_tag, items }),
            kind => Err(Error::ReservedGroupTag { tag: sequence_tag, kind }),
        }
    }

    pub fn sequence_tag(&self) -> Tag {
        self.sequence_tag
    }

    pub fn items(&self) -> &[Dataset] {
        &self.items
    }
}

/// One functional group instance.
#[derive(Clone, Debug, PartialEq)]
pub enum FunctionalGroup {
    PixelMeasures(PixelMeasures),
    PlaneOrientation(PlaneOrientation),
    PlanePosition(PlanePosition),
    FrameAnatomy(FrameAnatomy),
    FrameContent(FrameContent),
    RealWorldValueMapping(RealWorldValueMapping),
    PixelValueTransformation(PixelValueTransformation),
    FrameType(FrameType),
    Custom(CustomGroup),
}

// Variants whose sequence holds exactly one item.
macro_rules! single_item_groups {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for FunctionalGroup {
                fn from(g: $variant) -> Self {
                    FunctionalGroup::$variant(g)
                }
            }
        )*

        impl FunctionalGroup {
            /// The kind of this group.
            pub fn kind(&self) -> GroupKind {
                match self {
                    $(Self::$variant(_) => <$variant as GroupMacro>::KIND,)*
                    Self::RealWorldValueMapping(_) => GroupKind::RealWorldValueMapping,
                    Self::Custom(c) => GroupKind::Custom(c.sequence_tag()),
                }
            }

            /// Encode as the items of the group's sequence.
            pub fn to_items(&self, kind: NumericKind) -> Vec<Dataset> {
                match self {
                    $(Self::$variant(g) => vec![g.to_item(kind)],)*
                    Self::RealWorldValueMapping(g) => g.to_items(kind),
                    Self::Custom(c) => c.items().to_vec(),
                }
            }

            /// Decode the items of a group sequence of the given kind.
            pub fn from_items(kind: GroupKind, items: &[Dataset]) -> Result<Self> {
                let first = || {
                    items.first().ok_or_else(|| {
                        Error::invalid(format!("empty {} sequence", kind))
                    })
                };
                Ok(match kind {
                    $(GroupKind::$variant => Self::$variant($variant::from_item(first()?)?),)*
                    GroupKind::RealWorldValueMapping => {
                        Self::RealWorldValueMapping(RealWorldValueMapping::from_items(items)?)
                    }
                    GroupKind::Custom(tag) => Self::Custom(CustomGroup::new(tag, items.to_vec())?),
                })
            }
        }
    };
}

single_item_groups!(
    PixelMeasures,
    PlaneOrientation,
    PlanePosition,
    FrameAnatomy,
    FrameContent,
    PixelValueTransformation,
    FrameType,
);

impl From<RealWorldValueMapping> for FunctionalGroup {
    fn from(g: RealWorldValueMapping) -> Self {
        FunctionalGroup::RealWorldValueMapping(g)
    }
}

impl From<CustomGroup> for FunctionalGroup {
    fn from(g: CustomGroup) -> Self {
        FunctionalGroup::Custom(g)
    }
}

impl FunctionalGroup {
    pub fn as_frame_content(&self) -> Option<&FrameContent> {
        match self {
            Self::FrameContent(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_real_world_value_mapping(&self) -> Option<&RealWorldValueMapping> {
        match self {
            Self::RealWorldValueMapping(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_plane_position(&self) -> Option<&PlanePosition> {
        match self {
            Self::PlanePosition(g) => Some(g),
            _ => None,
        }
    }
}
