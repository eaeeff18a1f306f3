//! Metadata extraction: raw file bytes to an [`InstanceRecord`].
//!
//! Extractors must tolerate missing optional attributes by substituting
//! documented defaults. Only unreadable or corrupt input is a hard failure.
//!
//! # Defaults
//!
//! | Attribute                  | Default           |
//! |----------------------------|-------------------|
//! | InstanceNumber             | 0                 |
//! | Rows / Columns             | 0                 |
//! | BitsAllocated              | 16                |
//! | BitsStored                 | 16                |
//! | HighBit                    | 15                |
//! | PixelRepresentation        | 0 (unsigned)      |
//! | SamplesPerPixel            | 1                 |
//! | PhotometricInterpretation  | `MONOCHROME2`     |
//! | SOPInstanceUID             | the pixel ref     |
//! | free-text attributes       | empty             |

use std::str::FromStr;

use async_trait::async_trait;
use bytes::Bytes;
use dicom_object::{from_reader, DefaultDicomObject};
use tracing::{debug, warn};

use crate::error::LoadError;
use crate::study::{Instance, InstanceRecord, PixelGeometry, PixelRef, SeriesTags, StudyTags};

/// Size of the Part-10 preamble preceding the `DICM` magic.
const PREAMBLE_LEN: usize = 128;

/// Magic bytes following the preamble.
const DICM_MAGIC: &[u8; 4] = b"DICM";

/// Trait for turning raw file bytes into a metadata record.
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    /// Extract the metadata record of one file.
    ///
    /// # Arguments
    /// * `data` - The complete file contents
    /// * `pixel_ref` - Reference to store on the instance for later pixel loads
    async fn extract(&self, data: Bytes, pixel_ref: &PixelRef) -> Result<InstanceRecord, LoadError>;
}

// =============================================================================
// DICOM Extractor
// =============================================================================

/// Metadata extractor for DICOM Part-10 files.
///
/// Files are accepted with or without the 128-byte preamble. Pixel data is
/// never decoded here.
#[derive(Debug, Clone, Default)]
pub struct DicomMetadataExtractor {}

impl DicomMetadataExtractor {
    pub fn new() -> Self {
        Self {}
    }

    /// Parse a record synchronously.
    pub fn parse(&self, data: &[u8], pixel_ref: &PixelRef) -> Result<InstanceRecord, LoadError> {
        let object = open_object(data).map_err(|message| {
            warn!(source = %pixel_ref, %message, "Rejected DICOM content");
            LoadError::MetadataParse {
                source_id: pixel_ref.to_string(),
                message,
            }
        })?;

        let geometry = PixelGeometry {
            rows: read_number(&object, "Rows").unwrap_or(0),
            columns: read_number(&object, "Columns").unwrap_or(0),
            bits_allocated: read_number(&object, "BitsAllocated").unwrap_or(16),
            bits_stored: read_number(&object, "BitsStored").unwrap_or(16),
            high_bit: read_number(&object, "HighBit").unwrap_or(15),
            signed: read_number::<u16>(&object, "PixelRepresentation").unwrap_or(0) == 1,
            samples_per_pixel: read_number(&object, "SamplesPerPixel").unwrap_or(1),
            photometric_interpretation: read_string(&object, "PhotometricInterpretation")
                .unwrap_or_else(|| "MONOCHROME2".to_string()),
        };

        let instance = Instance {
            id: read_string(&object, "SOPInstanceUID").unwrap_or_else(|| pixel_ref.to_string()),
            instance_number: read_number(&object, "InstanceNumber").unwrap_or(0),
            sop_class_uid: read_string(&object, "SOPClassUID").unwrap_or_default(),
            pixel_ref: pixel_ref.clone(),
            geometry,
        };

        let series = SeriesTags {
            uid: read_string(&object, "SeriesInstanceUID").unwrap_or_default(),
            number: read_number(&object, "SeriesNumber").unwrap_or(0),
            description: read_string(&object, "SeriesDescription").unwrap_or_default(),
            modality: read_string(&object, "Modality").unwrap_or_default(),
        };

        let study = StudyTags {
            uid: read_string(&object, "StudyInstanceUID").unwrap_or_default(),
            patient_name: read_string(&object, "PatientName").unwrap_or_default(),
            patient_id: read_string(&object, "PatientID").unwrap_or_default(),
            date: read_string(&object, "StudyDate").unwrap_or_default(),
            description: read_string(&object, "StudyDescription").unwrap_or_default(),
        };

        debug!(
            source = %pixel_ref,
            instance_id = %instance.id,
            series_uid = %series.uid,
            "Extracted DICOM metadata"
        );

        Ok(InstanceRecord {
            instance,
            series,
            study,
        })
    }
}

#[async_trait]
impl MetadataExtractor for DicomMetadataExtractor {
    async fn extract(&self, data: Bytes, pixel_ref: &PixelRef) -> Result<InstanceRecord, LoadError> {
        self.parse(&data, pixel_ref)
    }
}

/// Open a DICOM object from memory, skipping the preamble when present.
fn open_object(data: &[u8]) -> Result<DefaultDicomObject, String> {
    let body = match data.get(PREAMBLE_LEN..PREAMBLE_LEN + DICM_MAGIC.len()) {
        Some(magic) if magic == DICM_MAGIC => &data[PREAMBLE_LEN..],
        _ => data,
    };

    if !body.starts_with(DICM_MAGIC) {
        return Err("missing DICM magic code".to_string());
    }

    from_reader(body).map_err(|e| e.to_string())
}

fn read_string(object: &DefaultDicomObject, name: &str) -> Option<String> {
    object
        .element_by_name(name)
        .ok()
        .and_then(|element| element.to_str().ok())
        .map(|value| {
            value
                .trim_matches(|c: char| c.is_whitespace() || c == '\0')
                .to_string()
        })
        .filter(|value| !value.is_empty())
}

/// Read the first value of a numeric attribute.
fn read_number<T: FromStr>(object: &DefaultDicomObject, name: &str) -> Option<T> {
    read_string(object, name)?
        .split('\\')
        .next()
        .and_then(|value| value.trim().parse::<T>().ok())
}
