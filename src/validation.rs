//! Screening criteria for chest CT studies.
//!
//! Every rule is a pure predicate over [`Metadata`]; the voxel data is never
//! consulted. Rules are reported in a fixed order that callers use for
//! display.

use crate::{
    enums::Orientation,
    metadata::{Metadata, NIFTI_MODALITY},
};

/// Body-part keywords accepted as chest, matched case-insensitively.
pub const CHEST_KEYWORDS: [&str; 4] = ["CHEST", "THORAX", "LUNG", "ГРУД"];

/// Studies need strictly more slices than this.
pub const MIN_SLICES: usize = 10;

const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationCheck {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    checks: Vec<ValidationCheck>,
}

impl ValidationReport {
    pub fn checks(&self) -> &[ValidationCheck] {
        &self.checks
    }

    pub fn overall_valid(&self) -> bool {
        self.checks.iter().all(|check| check.passed)
    }

    /// Checks that did not pass, in report order.
    pub fn failures(&self) -> impl Iterator<Item = &ValidationCheck> {
        self.checks.iter().filter(|check| !check.passed)
    }
}

/// Run the five screening rules against `metadata`.
pub fn validate(metadata: &Metadata) -> ValidationReport {
    let checks = vec![
        check_source_format(metadata),
        check_modality(metadata),
        check_body_part(metadata),
        check_orientation(metadata),
        check_slice_count(metadata),
    ];
    ValidationReport { checks }
}

fn check_source_format(metadata: &Metadata) -> ValidationCheck {
    let detail = match metadata.source_format {
        Some(format) => format!("Detected format: {format}"),
        None => format!("Detected format: {NOT_AVAILABLE}"),
    };
    ValidationCheck {
        name: "Source format",
        passed: metadata.source_format.is_some(),
        detail,
    }
}

fn check_modality(metadata: &Metadata) -> ValidationCheck {
    let modality = metadata.modality.as_deref().unwrap_or(NOT_AVAILABLE);
    ValidationCheck {
        name: "Modality (CT)",
        passed: modality == "CT" || modality == NIFTI_MODALITY,
        detail: format!("Detected modality: {modality}"),
    }
}

fn check_body_part(metadata: &Metadata) -> ValidationCheck {
    let body_part = metadata
        .body_part_examined
        .as_deref()
        .unwrap_or(NOT_AVAILABLE);
    let upper = body_part.to_uppercase();
    ValidationCheck {
        name: "Body part (chest)",
        passed: CHEST_KEYWORDS.iter().any(|keyword| upper.contains(keyword)),
        detail: format!("Examined body part: {body_part}"),
    }
}

fn check_orientation(metadata: &Metadata) -> ValidationCheck {
    ValidationCheck {
        name: "Orientation (axial)",
        passed: metadata.orientation == Orientation::Axial,
        detail: format!("Detected orientation: {}", metadata.orientation),
    }
}

fn check_slice_count(metadata: &Metadata) -> ValidationCheck {
    ValidationCheck {
        name: "Slice count (> 10)",
        passed: metadata.num_frames > MIN_SLICES,
        detail: format!("Slices found: {}", metadata.num_frames),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::SourceFormat;

    fn chest_ct() -> Metadata {
        Metadata {
            source_format: Some(SourceFormat::DicomSeries),
            modality: Some("CT".to_owned()),
            orientation: Orientation::Axial,
            num_frames: 20,
            body_part_examined: Some("CHEST".to_owned()),
            ..Metadata::default()
        }
    }

    #[test]
    fn chest_ct_passes_every_rule() {
        let report = validate(&chest_ct());
        assert_eq!(report.checks().len(), 5);
        assert!(report.overall_valid());
        assert_eq!(report.failures().count(), 0);
    }

    #[test]
    fn rules_are_reported_in_fixed_order() {
        let names: Vec<_> = validate(&Metadata::default())
            .checks()
            .iter()
            .map(|check| check.name)
            .collect();
        assert_eq!(
            names,
            [
                "Source format",
                "Modality (CT)",
                "Body part (chest)",
                "Orientation (axial)",
                "Slice count (> 10)"
            ]
        );
    }

    #[test]
    fn body_part_keywords_are_case_insensitive() {
        for body_part in ["thorax", "Lung Screening", "грудная клетка"] {
            let metadata = Metadata {
                body_part_examined: Some(body_part.to_owned()),
                ..chest_ct()
            };
            assert!(validate(&metadata).overall_valid(), "{body_part}");
        }

        let abdomen = Metadata {
            body_part_examined: Some("ABDOMEN".to_owned()),
            ..chest_ct()
        };
        let report = validate(&abdomen);
        assert!(!report.overall_valid());
        assert_eq!(report.failures().next().unwrap().name, "Body part (chest)");
    }

    #[test]
    fn nifti_sentinel_counts_as_ct_but_image_does_not() {
        let nifti = Metadata {
            modality: Some(NIFTI_MODALITY.to_owned()),
            ..chest_ct()
        };
        assert!(validate(&nifti).checks()[1].passed);

        let image = Metadata {
            modality: Some(crate::metadata::IMAGE_MODALITY.to_owned()),
            ..chest_ct()
        };
        assert!(!validate(&image).checks()[1].passed);
    }

    #[test]
    fn exactly_ten_slices_is_too_few() {
        let metadata = Metadata {
            num_frames: 10,
            ..chest_ct()
        };
        let report = validate(&metadata);
        assert!(!report.checks()[4].passed);
        assert_eq!(report.checks()[4].detail, "Slices found: 10");

        let missing = validate(&Metadata::default());
        assert!(!missing.checks()[0].passed);
        assert!(!missing.checks()[3].passed);
    }
}
