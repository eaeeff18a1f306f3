//! Study / Series / Instance hierarchy types.
//!
//! The hierarchy is built once by [`assemble`](super::assemble) and never
//! mutated afterwards. A Study exclusively owns its series, and each series
//! exclusively owns its instances; there are no back-references. Consumers
//! that need a parent look it up by identifier.

use std::fmt;

use serde::Serialize;

// =============================================================================
// Pixel Reference
// =============================================================================

/// Opaque reference to the pixel data of an instance.
///
/// The reference is resolved lazily by the rendering adapter. Nothing in the
/// core interprets its contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PixelRef(String);

impl PixelRef {
    /// Create a new pixel reference.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the reference as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PixelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Instance
// =============================================================================

/// Pixel geometry and encoding attributes of an instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PixelGeometry {
    /// Number of pixel rows
    pub rows: u16,

    /// Number of pixel columns
    pub columns: u16,

    /// Bits allocated per sample
    pub bits_allocated: u16,

    /// Bits actually used per sample
    pub bits_stored: u16,

    /// Position of the most significant stored bit
    pub high_bit: u16,

    /// Whether samples are two's complement signed
    pub signed: bool,

    /// Number of samples per pixel (1 for grayscale, 3 for RGB)
    pub samples_per_pixel: u16,

    /// Photometric interpretation tag, e.g. `MONOCHROME2`
    pub photometric_interpretation: String,
}

impl Default for PixelGeometry {
    fn default() -> Self {
        Self {
            rows: 0,
            columns: 0,
            bits_allocated: 16,
            bits_stored: 16,
            high_bit: 15,
            signed: false,
            samples_per_pixel: 1,
            photometric_interpretation: "MONOCHROME2".to_string(),
        }
    }
}

/// One loadable image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instance {
    /// Unique identifier (SOP Instance UID)
    pub id: String,

    /// Ordinal position of the instance within its series
    pub instance_number: i32,

    /// SOP Class UID, empty if unknown
    pub sop_class_uid: String,

    /// Reference used by the rendering adapter to load pixels
    pub pixel_ref: PixelRef,

    /// Pixel geometry and encoding
    pub geometry: PixelGeometry,
}

// =============================================================================
// Series / Study
// =============================================================================

/// Ordered group of instances sharing a grouping key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub id: String,
    pub series_number: i32,
    pub description: String,
    pub modality: String,

    /// Non-empty, sorted ascending by instance number (stable)
    pub instances: Vec<Instance>,
}

impl Series {
    /// Find an instance of this series by identifier.
    pub fn find_instance(&self, instance_id: &str) -> Option<&Instance> {
        self.instances.iter().find(|i| i.id == instance_id)
    }

    /// First instance in display order.
    pub fn first_instance(&self) -> Option<&Instance> {
        self.instances.first()
    }
}

/// Root container of the hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Study {
    pub id: String,
    pub patient_name: String,
    pub patient_id: String,
    pub study_date: String,
    pub description: String,

    /// Non-empty, sorted ascending by series number (stable)
    pub series: Vec<Series>,
}

impl Study {
    /// Find a series by identifier.
    pub fn find_series(&self, series_id: &str) -> Option<&Series> {
        self.series.iter().find(|s| s.id == series_id)
    }

    /// Check whether an instance belongs to this study.
    pub fn contains_instance(&self, instance: &Instance) -> bool {
        self.series
            .iter()
            .any(|s| s.instances.iter().any(|i| i == instance))
    }

    /// First instance of the first series.
    pub fn first_instance(&self) -> Option<&Instance> {
        self.series.first().and_then(Series::first_instance)
    }

    /// Total number of instances across all series.
    pub fn instance_count(&self) -> usize {
        self.series.iter().map(|s| s.instances.len()).sum()
    }
}

// =============================================================================
// Instance Record
// =============================================================================

/// Series-level attributes carried by every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeriesTags {
    /// Grouping key (Series Instance UID); blank when absent
    pub uid: String,
    pub number: i32,
    pub description: String,
    pub modality: String,
}

/// Study-level attributes carried by every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudyTags {
    pub uid: String,
    pub patient_name: String,
    pub patient_id: String,
    pub date: String,
    pub description: String,
}

/// Flat per-image metadata record produced by a metadata extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRecord {
    pub instance: Instance,
    pub series: SeriesTags,
    pub study: StudyTags,
}
