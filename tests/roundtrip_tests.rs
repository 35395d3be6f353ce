//! Integration tests for saving and loading parametric maps.

mod common;

use common::*;
use glam::DVec3;
use parametric_map::prelude::*;
use parametric_map::CodecError;
use tempfile::NamedTempFile;

const ROWS: u16 = 4;
const COLUMNS: u16 = 3;
const LEN: usize = ROWS as usize * COLUMNS as usize;

/// Build, save to a temp file and reopen a three-frame map of `T`.
fn file_roundtrip<T: Sample>(f: impl Fn(usize) -> T) -> (Vec<Vec<T>>, ParametricMap) {
    init_logging();
    let mut map = ParametricMap::create(T::KIND, ROWS, COLUMNS, identification()).expect("create");
    add_required_groups(&mut map);
    map.add_dimension_index(tags::IN_STACK_POSITION_NUMBER, "1.2.826.0.1.3680043.2.1", "Slice")
        .expect("dimension");

    let frames: Vec<Vec<T>> = (0..3).map(|i| ramp(LEN, i, &f)).collect();
    for (i, samples) in frames.iter().enumerate() {
        map.add_frame(SampleBuffer::from_vec(samples.clone()), [content(i as u32)]).expect("add frame");
    }

    let temp = NamedTempFile::new().expect("Failed to create temp file");
    map.save_file(temp.path(), &Part10Codec::default()).expect("save");
    assert_eq!(map.state(), ObjectState::Persisted);

    let loaded = ParametricMap::open(temp.path()).expect("open");
    (frames, loaded)
}

#[test]
fn test_roundtrip_uint16() {
    let (frames, loaded) = file_roundtrip(|i| (i as u16).wrapping_mul(4099));
    assert_eq!(loaded.numeric_kind(), NumericKind::UInt16);
    for (i, expected) in frames.iter().enumerate() {
        assert_eq!(loaded.frame_samples::<u16>(i).unwrap(), expected.as_slice());
    }
}

#[test]
fn test_roundtrip_int16() {
    let (frames, loaded) = file_roundtrip(|i| i16::MIN + (i as i16) * 997);
    assert_eq!(loaded.numeric_kind(), NumericKind::SInt16);
    for (i, expected) in frames.iter().enumerate() {
        assert_eq!(loaded.frame_samples::<i16>(i).unwrap(), expected.as_slice());
    }
}

#[test]
fn test_roundtrip_float32_bits() {
    let special = [f32::NAN, -0.0, f32::INFINITY, f32::MIN_POSITIVE / 2.0, f32::MAX];
    let (frames, loaded) = file_roundtrip(|i| special.get(i).copied().unwrap_or(i as f32 * 0.1));
    assert_eq!(loaded.numeric_kind(), NumericKind::Float32);
    for (i, expected) in frames.iter().enumerate() {
        let got: Vec<u32> = loaded.frame_samples::<f32>(i).unwrap().iter().map(|v| v.to_bits()).collect();
        let want: Vec<u32> = expected.iter().map(|v| v.to_bits()).collect();
        assert_eq!(got, want, "frame {}", i);
    }
}

#[test]
fn test_roundtrip_float64_bits() {
    let (frames, loaded) = file_roundtrip(|i| if i == 5 { f64::NAN } else { (i as f64).sqrt() - 1e-300 });
    assert_eq!(loaded.numeric_kind(), NumericKind::Float64);
    for (i, expected) in frames.iter().enumerate() {
        let got: Vec<u64> = loaded.frame_samples::<f64>(i).unwrap().iter().map(|v| v.to_bits()).collect();
        let want: Vec<u64> = expected.iter().map(|v| v.to_bits()).collect();
        assert_eq!(got, want, "frame {}", i);
    }
}

#[test]
fn test_ten_frame_uint16_map() {
    init_logging();
    let mut map = ParametricMap::create(NumericKind::UInt16, 10, 10, identification()).unwrap();
    add_required_groups(&mut map);
    map.add_dimension_index(tags::IN_STACK_POSITION_NUMBER, "1.2.3.4", "Slice").unwrap();
    for i in 0..10 {
        map.add_frame(vec![i as u16; 100], [content(i)]).unwrap();
    }
    let bytes = map.to_bytes().expect("save");

    let loaded = ParametricMap::from_bytes(&bytes).expect("load");
    assert_eq!(loaded.frame_count(), 10);
    assert_eq!(loaded.numeric_kind(), NumericKind::UInt16);
    assert_eq!(loaded.state(), ObjectState::Loaded);
    for i in 0..10 {
        assert_eq!(loaded.frame(i as usize).unwrap().index_values(), Some(&[i][..]));
    }
}

#[test]
fn test_ten_frame_map_with_pixel_measures_only() {
    let options = ValidationOptions::default()
        .with_required(vec![Requirement::one(GroupKind::PixelMeasures)]);
    let mut map = ParametricMap::create(NumericKind::UInt16, 10, 10, Identification::default())
        .unwrap()
        .with_validation(options);
    map.add_for_all_frames(PixelMeasures::new(1.0, 1.0)).unwrap();
    map.add_dimension_index(tags::IN_STACK_POSITION_NUMBER, "1.2.3.4", "").unwrap();
    for i in 0..10 {
        map.add_frame(vec![0u16; 100], [content(i)]).unwrap();
    }
    let bytes = map.to_bytes().expect("save");
    let loaded = ParametricMap::from_bytes(&bytes).unwrap();
    assert_eq!(loaded.frame_count(), 10);
    assert_eq!(loaded.numeric_kind(), NumericKind::UInt16);
}

#[test]
fn test_groups_survive_roundtrip() {
    init_logging();
    let mut map = ParametricMap::create(NumericKind::Float32, 2, 2, identification()).unwrap();
    map.add_for_all_frames(PixelMeasures::new(0.5, 0.25).with_spacing_between_slices(2.0)).unwrap();
    map.add_for_all_frames(PlaneOrientation::axial()).unwrap();
    map.add_for_all_frames(FrameType::derived("ADC", "DIFFUSION")).unwrap();
    map.add_for_all_frames(FrameAnatomy::new("B", CodedEntry::new("T-A0100", "SRT", "Brain"))).unwrap();

    let mut item = RwvmItem::linear(0.0, 4095.0, 1e-6, 0.0)
        .with_units(CodedEntry::new("mm2/s", "UCUM", "mm2/s"))
        .with_label("ADC", "Apparent diffusion coefficient");
    item.add_quantity_definition(ContentItem::new(
        CodedEntry::new("G-C1C6", "SRT", "Quantity"),
        CodedEntry::new("113041", "DCM", "Apparent Diffusion Coefficient"),
    ));
    let rwvm = RealWorldValueMapping::new().with_item(item);
    map.add_for_all_frames(rwvm.clone()).unwrap();

    let custom_tag = Tag(0x0018, 0x9112);
    let mut custom_item = Dataset::new_empty();
    custom_item.put_text(tags::CONTENT_QUALIFICATION, VR::CS, "RESEARCH");
    let custom = CustomGroup::new(custom_tag, vec![custom_item]).expect("custom group");

    for z in 0..2 {
        let position = PlanePosition::new(DVec3::new(-10.0, 20.0, z as f64 * 2.5));
        let groups = vec![FunctionalGroup::from(position), FunctionalGroup::from(FrameContent::new())];
        map.add_frame(vec![0.5f32; 4], groups).unwrap();
    }
    map.add_frame_group(1, custom.clone()).unwrap();

    let loaded = ParametricMap::from_bytes(&map.to_bytes().unwrap()).unwrap();

    let (g, shared) = loaded.group(1, GroupKind::RealWorldValueMapping).unwrap();
    assert!(shared);
    assert_eq!(g.as_real_world_value_mapping(), Some(&rwvm));

    let (g, shared) = loaded.group(1, GroupKind::PlanePosition).unwrap();
    assert!(!shared);
    assert_eq!(g.as_plane_position().map(|p| p.position.z), Some(2.5));

    let (g, shared) = loaded.group(1, GroupKind::Custom(custom_tag)).unwrap();
    assert!(!shared);
    let FunctionalGroup::Custom(loaded_custom) = g else {
        panic!("expected a custom group, got {}", g.kind());
    };
    assert_eq!(loaded_custom.sequence_tag(), custom.sequence_tag());
    assert_eq!(loaded_custom.items().len(), 1);
    assert_eq!(
        loaded_custom.items()[0].text(tags::CONTENT_QUALIFICATION).unwrap().as_deref(),
        Some("RESEARCH")
    );
    assert!(loaded.group(0, GroupKind::Custom(custom_tag)).is_err());

    for g in map.registry().shared() {
        assert_eq!(loaded.registry().shared_group(g.kind()), Some(g), "{}", g.kind());
    }
    assert_eq!(loaded.dimensions(), map.dimensions());
    assert_eq!(loaded.identification(), map.identification());
}

#[test]
fn test_loaded_map_is_mutable() {
    let mut map = ParametricMap::create(NumericKind::SInt16, 2, 2, identification()).unwrap();
    add_required_groups(&mut map);
    map.add_frame(vec![-1i16; 4], FrameGroups::new()).unwrap();
    let bytes = map.to_bytes().unwrap();

    let mut loaded = ParametricMap::from_bytes(&bytes).unwrap();
    loaded.add_frame(vec![7i16; 4], FrameGroups::new()).unwrap();
    let again = ParametricMap::from_bytes(&loaded.to_bytes().unwrap()).unwrap();
    assert_eq!(again.frame_count(), 2);
    assert_eq!(again.frame_samples::<i16>(1).unwrap(), &[7, 7, 7, 7]);
}

#[test]
fn test_visit_frame() {
    struct Mean;

    impl SampleVisitor for Mean {
        type Output = f64;

        fn visit_u16(&mut self, s: &[u16]) -> f64 {
            s.iter().map(|&v| v as f64).sum::<f64>() / s.len() as f64
        }
        fn visit_i16(&mut self, s: &[i16]) -> f64 {
            s.iter().map(|&v| v as f64).sum::<f64>() / s.len() as f64
        }
        fn visit_f32(&mut self, s: &[f32]) -> f64 {
            s.iter().map(|&v| v as f64).sum::<f64>() / s.len() as f64
        }
        fn visit_f64(&mut self, s: &[f64]) -> f64 {
            s.iter().sum::<f64>() / s.len() as f64
        }
    }

    let mut map = ParametricMap::create(NumericKind::UInt16, 1, 4, identification()).unwrap();
    add_required_groups(&mut map);
    map.add_frame(vec![1u16, 2, 3, 6], FrameGroups::new()).unwrap();
    let loaded = ParametricMap::from_bytes(&map.to_bytes().unwrap()).unwrap();
    assert_eq!(loaded.visit_frame(0, &mut Mean).unwrap(), 3.0);
}

#[test]
fn test_import_copies_identification() {
    let mut source = ParametricMap::create(NumericKind::UInt16, 2, 2, identification()).unwrap();
    add_required_groups(&mut source);
    source.add_frame(vec![0u16; 4], FrameGroups::new()).unwrap();
    let loaded = ParametricMap::from_bytes(&source.to_bytes().unwrap()).unwrap();

    let derived = ParametricMap::import(
        loaded.identification(),
        NumericKind::Float32,
        8,
        8,
        ImportOptions::default(),
    )
    .unwrap();
    assert_eq!(derived.state(), ObjectState::Building);
    assert_eq!(derived.frame_count(), 0);
    assert_eq!(derived.identification().patient, source.identification().patient);
    assert_eq!(derived.identification().study, source.identification().study);
    assert_ne!(
        derived.identification().series.instance_uid,
        source.identification().series.instance_uid
    );
    assert_ne!(derived.identification().sop_instance_uid, source.identification().sop_instance_uid);
}

#[test]
fn test_malformed_input() {
    let mut map = ParametricMap::create(NumericKind::UInt16, 2, 2, identification()).unwrap();
    add_required_groups(&mut map);
    map.add_frame(vec![0u16; 4], FrameGroups::new()).unwrap();
    let bytes = map.to_bytes().unwrap();

    let err = ParametricMap::from_bytes(&bytes[..bytes.len() - 3]).unwrap_err();
    assert!(matches!(err, Error::Codec(CodecError::Read(_))), "{}", err);

    let err = ParametricMap::from_bytes(b"not a dicom file").unwrap_err();
    assert!(matches!(err, Error::Codec(CodecError::Read(_))));

    // A valid file that is not a parametric map.
    let mut other = Dataset::new_empty();
    other.put_text(tags::SOP_CLASS_UID, VR::UI, uids::PARAMETRIC_MAP_STORAGE);
    other.put_text(tags::SOP_INSTANCE_UID, VR::UI, "1.2.3.4");
    let err = ParametricMap::from_bytes(&Part10Codec::default().encode(&other).unwrap()).unwrap_err();
    assert!(matches!(err, Error::MissingAttribute(t) if t == tags::ROWS));
}

#[test]
fn test_saved_file_is_dicom_part10() {
    let mut map = ParametricMap::create(NumericKind::Float32, 2, 2, identification()).unwrap();
    add_required_groups(&mut map);
    map.add_frame(vec![1.5f32; 4], FrameGroups::new()).unwrap();
    let bytes = map.to_bytes().unwrap();
    assert_eq!(&bytes[128..132], b"DICM");

    let ds = Part10Codec::default().decode(&bytes).unwrap();
    assert_eq!(
        ds.text(tags::SOP_INSTANCE_UID).unwrap().as_deref(),
        Some(map.identification().sop_instance_uid.as_str())
    );
    assert_eq!(ds.u32_attr(tags::NUMBER_OF_FRAMES).unwrap(), Some(1));
}

#[test]
fn test_back_to_back_maps_have_distinct_uids() {
    let uids: Vec<String> = (0..8)
        .map(|_| {
            let mut map = ParametricMap::create(NumericKind::UInt16, 2, 2, identification()).unwrap();
            add_required_groups(&mut map);
            map.add_frame(vec![0u16; 4], FrameGroups::new()).unwrap();
            let loaded = ParametricMap::from_bytes(&map.to_bytes().unwrap()).unwrap();
            loaded.identification().sop_instance_uid.clone()
        })
        .collect();
    let distinct: std::collections::HashSet<_> = uids.iter().collect();
    assert_eq!(distinct.len(), uids.len());
}

#[test]
fn test_custom_group_with_builtin_tag_never_reaches_file() {
    let err = CustomGroup::new(tags::PLANE_POSITION_SEQUENCE, vec![Dataset::new_empty()]).unwrap_err();
    assert!(matches!(err, Error::ReservedGroupTag { kind: GroupKind::PlanePosition, .. }));

    // Per-frame positions plus a registered custom group still load back.
    let tag = Tag(0x0018, 0x9112);
    let mut map = ParametricMap::create(NumericKind::UInt16, 2, 2, identification()).unwrap();
    add_required_groups(&mut map);
    map.add_for_all_frames(CustomGroup::new(tag, vec![Dataset::new_empty()]).unwrap()).unwrap();
    map.add_frame(vec![0u16; 4], [PlanePosition::new(DVec3::Z).into()]).unwrap();
    let loaded = ParametricMap::from_bytes(&map.to_bytes().unwrap()).unwrap();
    assert!(loaded.group(0, GroupKind::PlanePosition).is_ok());
    assert!(loaded.group(0, GroupKind::Custom(tag)).is_ok());
}

#[test]
fn test_open_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = ParametricMap::open(dir.path().join("absent.pmap")).unwrap_err();
    assert!(matches!(err, Error::FileNotFound(_)));
}
