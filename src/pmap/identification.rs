//! Identification attributes carried through unchanged.
//!
//! Beyond the presence of the study, series and instance UIDs nothing here is
//! validated. Fields absent from a loaded dataset become empty strings.

use crate::core::{tags, Dataset, DatasetExt, UidProvider};
use crate::util::{Error, Result, VR};

/// Software versions recorded for objects this crate creates.
pub const DEFAULT_SOFTWARE_VERSIONS: &str = concat!(
    "parametric-map ",
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("PMAP_BUILD_DATE"),
    ")"
);

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Patient {
    pub name: String,
    pub id: String,
    pub birth_date: String,
    pub sex: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Study {
    pub instance_uid: String,
    pub id: String,
    pub date: String,
    pub time: String,
    pub accession_number: String,
    pub referring_physician_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Series {
    pub instance_uid: String,
    pub number: u32,
    pub modality: String,
    pub description: String,
}

impl Default for Series {
    fn default() -> Self {
        Self {
            instance_uid: String::new(),
            number: 1,
            modality: "OT".to_string(),
            description: String::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Equipment {
    pub manufacturer: String,
    pub model_name: String,
    pub device_serial_number: String,
    pub software_versions: String,
}

/// Content identification of the derived object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentIdentification {
    pub instance_number: u32,
    pub label: String,
    pub description: String,
    pub creator_name: String,
}

impl Default for ContentIdentification {
    fn default() -> Self {
        Self {
            instance_number: 1,
            label: "PARAMETRIC_MAP".to_string(),
            description: String::new(),
            creator_name: String::new(),
        }
    }
}

/// All identification of one object.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Identification {
    pub patient: Patient,
    pub study: Study,
    pub series: Series,
    pub equipment: Equipment,
    pub content: ContentIdentification,
    pub sop_instance_uid: String,
    pub frame_of_reference_uid: String,
    pub content_date: String,
    pub content_time: String,
}

/// What `import` copies from a source object besides patient and study.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// Copy the series (instance UID included) instead of starting a new one.
    pub series: bool,
}

impl ImportOptions {
    pub fn with_series(mut self, series: bool) -> Self {
        self.series = series;
        self
    }
}

impl Identification {
    /// Fill every empty UID from `uids`.
    pub fn assign_missing_uids(&mut self, uids: &mut dyn UidProvider) -> Result<()> {
        for uid in [
            &mut self.study.instance_uid,
            &mut self.series.instance_uid,
            &mut self.sop_instance_uid,
            &mut self.frame_of_reference_uid,
        ] {
            if uid.is_empty() {
                *uid = uids.next_uid()?;
            }
        }
        Ok(())
    }

    /// Fresh identification for an object derived from `source`.
    ///
    /// Patient, study and frame of reference are always carried over; the
    /// series only when requested. The SOP instance UID is always new.
    pub fn derived_from(
        source: &Identification,
        options: ImportOptions,
        uids: &mut dyn UidProvider,
    ) -> Result<Self> {
        let mut ident = Self {
            patient: source.patient.clone(),
            study: source.study.clone(),
            frame_of_reference_uid: source.frame_of_reference_uid.clone(),
            ..Self::default()
        };
        if options.series {
            ident.series = source.series.clone();
        } else {
            ident.series.modality = source.series.modality.clone();
        }
        ident.assign_missing_uids(uids)?;
        Ok(ident)
    }

    /// Fail with [`Error::MissingIdentification`] naming the first empty mandatory UID.
    pub fn check(&self) -> Result<()> {
        let required = [
            ("StudyInstanceUID", &self.study.instance_uid),
            ("SeriesInstanceUID", &self.series.instance_uid),
            ("SOPInstanceUID", &self.sop_instance_uid),
        ];
        match required.into_iter().find(|(_, v)| v.is_empty()) {
            Some((name, _)) => Err(Error::MissingIdentification(name)),
            None => Ok(()),
        }
    }

    pub fn write_to(&self, ds: &mut Dataset) {
        let p = &self.patient;
        ds.put_text(tags::PATIENT_NAME, VR::PN, p.name.as_str());
        ds.put_text(tags::PATIENT_ID, VR::LO, p.id.as_str());
        ds.put_text(tags::PATIENT_BIRTH_DATE, VR::DA, p.birth_date.as_str());
        ds.put_text(tags::PATIENT_SEX, VR::CS, p.sex.as_str());

        let s = &self.study;
        ds.put_text(tags::STUDY_INSTANCE_UID, VR::UI, s.instance_uid.as_str());
        ds.put_text(tags::STUDY_ID, VR::SH, s.id.as_str());
        ds.put_text(tags::STUDY_DATE, VR::DA, s.date.as_str());
        ds.put_text(tags::STUDY_TIME, VR::TM, s.time.as_str());
        ds.put_text(tags::ACCESSION_NUMBER, VR::SH, s.accession_number.as_str());
        ds.put_text(tags::REFERRING_PHYSICIAN_NAME, VR::PN, s.referring_physician_name.as_str());

        let se = &self.series;
        ds.put_text(tags::SERIES_INSTANCE_UID, VR::UI, se.instance_uid.as_str());
        ds.put_is(tags::SERIES_NUMBER, i64::from(se.number));
        ds.put_text(tags::MODALITY, VR::CS, se.modality.as_str());
        ds.put_text_nonempty(tags::SERIES_DESCRIPTION, VR::LO, &se.description);

        let e = &self.equipment;
        ds.put_text(tags::MANUFACTURER, VR::LO, e.manufacturer.as_str());
        ds.put_text(tags::MANUFACTURER_MODEL_NAME, VR::LO, e.model_name.as_str());
        ds.put_text(tags::DEVICE_SERIAL_NUMBER, VR::LO, e.device_serial_number.as_str());
        ds.put_text(tags::SOFTWARE_VERSIONS, VR::LO, e.software_versions.as_str());

        let c = &self.content;
        ds.put_is(tags::INSTANCE_NUMBER, i64::from(c.instance_number));
        ds.put_text(tags::CONTENT_LABEL, VR::CS, c.label.as_str());
        ds.put_text(tags::CONTENT_DESCRIPTION, VR::LO, c.description.as_str());
        ds.put_text(tags::CONTENT_CREATOR_NAME, VR::PN, c.creator_name.as_str());
        ds.put_text(tags::CONTENT_DATE, VR::DA, self.content_date.as_str());
        ds.put_text(tags::CONTENT_TIME, VR::TM, self.content_time.as_str());

        ds.put_text(tags::SOP_INSTANCE_UID, VR::UI, self.sop_instance_uid.as_str());
        ds.put_text(tags::FRAME_OF_REFERENCE_UID, VR::UI, self.frame_of_reference_uid.as_str());
    }

    /// Extract identification from any dataset.
    pub fn from_dataset(ds: &Dataset) -> Result<Self> {
        let s = |tag| ds.text_or_default(tag);
        let defaults = Self::default();
        Ok(Self {
            patient: Patient {
                name: s(tags::PATIENT_NAME)?,
                id: s(tags::PATIENT_ID)?,
                birth_date: s(tags::PATIENT_BIRTH_DATE)?,
                sex: s(tags::PATIENT_SEX)?,
            },
            study: Study {
                instance_uid: s(tags::STUDY_INSTANCE_UID)?,
                id: s(tags::STUDY_ID)?,
                date: s(tags::STUDY_DATE)?,
                time: s(tags::STUDY_TIME)?,
                accession_number: s(tags::ACCESSION_NUMBER)?,
                referring_physician_name: s(tags::REFERRING_PHYSICIAN_NAME)?,
            },
            series: Series {
                instance_uid: s(tags::SERIES_INSTANCE_UID)?,
                number: ds.u32_attr(tags::SERIES_NUMBER)?.unwrap_or(defaults.series.number),
                modality: ds.text(tags::MODALITY)?.unwrap_or(defaults.series.modality),
                description: s(tags::SERIES_DESCRIPTION)?,
            },
            equipment: Equipment {
                manufacturer: s(tags::MANUFACTURER)?,
                model_name: s(tags::MANUFACTURER_MODEL_NAME)?,
                device_serial_number: s(tags::DEVICE_SERIAL_NUMBER)?,
                software_versions: s(tags::SOFTWARE_VERSIONS)?,
            },
            content: ContentIdentification {
                instance_number: ds
                    .u32_attr(tags::INSTANCE_NUMBER)?
                    .unwrap_or(defaults.content.instance_number),
                label: s(tags::CONTENT_LABEL)?,
                description: s(tags::CONTENT_DESCRIPTION)?,
                creator_name: s(tags::CONTENT_CREATOR_NAME)?,
            },
            sop_instance_uid: s(tags::SOP_INSTANCE_UID)?,
            frame_of_reference_uid: s(tags::FRAME_OF_REFERENCE_UID)?,
            content_date: s(tags::CONTENT_DATE)?,
            content_time: s(tags::CONTENT_TIME)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::UidGenerator;

    fn counter() -> impl FnMut() -> String {
        let mut n = 0;
        move || {
            n += 1;
            format!("1.2.{}", n)
        }
    }

    #[test]
    fn test_assign_missing_uids() {
        let mut ident = Identification::default();
        ident.study.instance_uid = "9.9".to_string();
        ident.assign_missing_uids(&mut counter()).unwrap();
        assert_eq!(ident.study.instance_uid, "9.9");
        assert_eq!(ident.series.instance_uid, "1.2.1");
        assert_eq!(ident.sop_instance_uid, "1.2.2");
        assert_eq!(ident.frame_of_reference_uid, "1.2.3");
        assert!(ident.check().is_ok());
    }

    #[test]
    fn test_check_names_first_missing() {
        let mut ident = Identification::default();
        ident.study.instance_uid = "1".to_string();
        assert!(matches!(ident.check(), Err(Error::MissingIdentification("SeriesInstanceUID"))));
    }

    #[test]
    fn test_dataset_roundtrip() {
        let mut ident = Identification::default();
        ident.patient.name = "Doe^Jane".to_string();
        ident.patient.id = "P-001".to_string();
        ident.study.accession_number = "A17".to_string();
        ident.series.modality = "MR".to_string();
        ident.series.number = 301;
        ident.equipment.manufacturer = "ACME".to_string();
        ident.content.creator_name = "Analyst".to_string();
        ident.assign_missing_uids(&mut UidGenerator::default()).unwrap();

        let mut ds = Dataset::new_empty();
        ident.write_to(&mut ds);
        assert_eq!(Identification::from_dataset(&ds).unwrap(), ident);
    }

    #[test]
    fn test_defaults_for_absent_attributes() {
        let ident = Identification::from_dataset(&Dataset::new_empty()).unwrap();
        assert_eq!(ident.series.modality, "OT");
        assert_eq!(ident.content.instance_number, 1);
        assert!(ident.patient.name.is_empty());
    }

    #[test]
    fn test_uid_provider_error_propagates() {
        let mut ident = Identification::default();
        let mut long_root = UidGenerator::new("1".repeat(70));
        assert!(matches!(
            ident.assign_missing_uids(&mut long_root),
            Err(Error::UidTooLong(_))
        ));
    }

    #[test]
    fn test_derived_from() {
        let mut source = Identification::default();
        source.patient.id = "P-7".to_string();
        source.series.modality = "MR".to_string();
        source.series.description = "DWI".to_string();
        source.assign_missing_uids(&mut counter()).unwrap();

        let mut uids = UidGenerator::new("5.6");
        let derived = Identification::derived_from(&source, ImportOptions::default(), &mut uids).unwrap();
        assert_eq!(derived.patient, source.patient);
        assert_eq!(derived.study, source.study);
        assert_eq!(derived.frame_of_reference_uid, source.frame_of_reference_uid);
        assert_eq!(derived.series.modality, "MR");
        assert!(derived.series.description.is_empty());
        assert_ne!(derived.series.instance_uid, source.series.instance_uid);
        assert_ne!(derived.sop_instance_uid, source.sop_instance_uid);

        let same_series =
            Identification::derived_from(&source, ImportOptions::default().with_series(true), &mut uids)
                .unwrap();
        assert_eq!(same_series.series, source.series);
        assert_ne!(same_series.sop_instance_uid, source.sop_instance_uid);
    }
}
