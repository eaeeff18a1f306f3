//! Study assembly from flat metadata records.
//!
//! Assembly is pure and deterministic for a given input order:
//!
//! 1. Records are grouped by Series Instance UID, in first-encountered order.
//!    A record without a usable key becomes the sole member of its own series.
//! 2. Each group is stably sorted by instance number.
//! 3. The first member in sorted order is the series representative: it
//!    provides the series number, description and modality.
//! 4. Series are stably sorted by series number.
//! 5. Study-level fields come from the first record of the batch in input
//!    order. This is a simplification, not a DICOM-correct aggregation of
//!    study-level metadata.

use std::collections::HashMap;

use tracing::debug;

use crate::error::AssembleError;

use super::model::{InstanceRecord, Series, Study};

/// Modality used when the representative record carries none.
pub const DEFAULT_MODALITY: &str = "OT";

/// Study identifier used when neither a study UID nor an instance id exists.
const FALLBACK_STUDY_ID: &str = "study";

/// A series under construction, in discovery order.
struct SeriesGroup {
    id: String,
    records: Vec<InstanceRecord>,
}

/// Assemble a batch of records into a Study / Series / Instance hierarchy.
///
/// # Errors
///
/// Returns [`AssembleError::EmptyInput`] if `records` is empty.
pub fn assemble(records: Vec<InstanceRecord>) -> Result<Study, AssembleError> {
    let first = records.first().ok_or(AssembleError::EmptyInput)?;
    let study_tags = first.study.clone();
    let first_instance_id = first.instance.id.clone();
    let record_count = records.len();

    let mut groups: Vec<SeriesGroup> = Vec::new();
    let mut group_by_key: HashMap<String, usize> = HashMap::new();

    for (position, record) in records.into_iter().enumerate() {
        let key = record.series.uid.trim().to_string();

        // UIDs never contain '#'.
        if key.is_empty() {
            groups.push(SeriesGroup {
                id: format!("#series-{position}"),
                records: vec![record],
            });
            continue;
        }

        match group_by_key.get(&key) {
            Some(&index) => groups[index].records.push(record),
            None => {
                group_by_key.insert(key.clone(), groups.len());
                groups.push(SeriesGroup {
                    id: key,
                    records: vec![record],
                });
            }
        }
    }

    let mut series: Vec<Series> = groups.into_iter().map(build_series).collect();
    // sort_by_key is stable: equal series numbers keep discovery order
    series.sort_by_key(|s| s.series_number);

    let id = [study_tags.uid.trim(), first_instance_id.trim()]
        .into_iter()
        .find(|candidate| !candidate.is_empty())
        .unwrap_or(FALLBACK_STUDY_ID)
        .to_string();

    debug!(
        study_id = %id,
        records = record_count,
        series = series.len(),
        "Assembled study"
    );

    Ok(Study {
        id,
        patient_name: study_tags.patient_name,
        patient_id: study_tags.patient_id,
        study_date: study_tags.date,
        description: study_tags.description,
        series,
    })
}

/// Build a series from a non-empty group.
fn build_series(group: SeriesGroup) -> Series {
    let mut records = group.records;
    records.sort_by_key(|r| r.instance.instance_number);

    // Groups are created with one record, so the representative always exists
    let representative = &records[0].series;
    let series_number = representative.number;
    let description = match representative.description.trim() {
        "" => format!("Series {series_number}"),
        text => text.to_string(),
    };
    let modality = match representative.modality.trim() {
        "" => DEFAULT_MODALITY.to_string(),
        code => code.to_string(),
    };

    Series {
        id: group.id,
        series_number,
        description,
        modality,
        instances: records.into_iter().map(|r| r.instance).collect(),
    }
}
