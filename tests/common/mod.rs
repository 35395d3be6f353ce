//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Once;

use parametric_map::prelude::*;

static INIT: Once = Once::new();

/// Install a test-writer subscriber once; filter from `RUST_LOG`.
pub fn init_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Identification with the fields a derived map usually carries.
pub fn identification() -> Identification {
    let mut ident = Identification::default();
    ident.patient.name = "Doe^Jane".to_string();
    ident.patient.id = "PM-0001".to_string();
    ident.study.id = "S1".to_string();
    ident.series.modality = "MR".to_string();
    ident.series.description = "ADC map".to_string();
    ident.equipment.manufacturer = "ACME Imaging".to_string();
    ident
}

/// Shared groups satisfying the default required set.
pub fn add_required_groups(map: &mut ParametricMap) {
    map.add_for_all_frames(PixelMeasures::new(0.8, 0.8).with_slice_thickness(3.0))
        .expect("pixel measures");
    map.add_for_all_frames(PlaneOrientation::axial()).expect("orientation");
    map.add_for_all_frames(FrameType::derived("ADC", "DIFFUSION")).expect("frame type");
}

/// Deterministic samples of kind `T` for frame `frame`.
pub fn ramp<T: Sample>(len: usize, frame: usize, f: impl Fn(usize) -> T) -> Vec<T> {
    (0..len).map(|i| f(i + frame * len)).collect()
}

/// Frame content with one dimension index value.
pub fn content(value: u32) -> FunctionalGroup {
    FrameContent::with_index_values(&[value]).into()
}
