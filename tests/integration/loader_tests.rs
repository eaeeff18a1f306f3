//! Batch loading of DICOM files into the viewer state.

use dicom_viewer::error::LoadError;
use dicom_viewer::metadata::{DicomMetadataExtractor, LocalFileSource, MemorySource, StudyLoader};
use dicom_viewer::state::ViewerStateStore;
use dicom_viewer::study::PixelRef;

use super::test_utils::{scratch_dir, DicomBuilder, CT_IMAGE_STORAGE};

fn loader(store: &ViewerStateStore) -> StudyLoader<DicomMetadataExtractor> {
    StudyLoader::new(store.clone(), DicomMetadataExtractor::new())
}

fn memory_file(name: &str, builder: DicomBuilder) -> MemorySource {
    MemorySource::new(name, builder.build())
}

#[tokio::test]
async fn test_load_selects_first_instance_of_first_series() {
    let store = ViewerStateStore::new();
    let sources = vec![
        memory_file("mr-2", DicomBuilder::ct_instance("2.1.2", "2.1.500", 2).series(5, "T2")),
        memory_file("mr-1", DicomBuilder::ct_instance("2.1.1", "2.1.500", 1).series(5, "T2")),
        memory_file("loc-1", DicomBuilder::ct_instance("2.1.9", "2.1.100", 1).series(1, "Localizer")),
    ];

    let study = loader(&store).load(sources).await.unwrap();

    let state = store.snapshot();
    assert_eq!(state.current_series.as_deref(), Some("2.1.100"));
    assert_eq!(state.current_instance_id(), Some("2.1.9"));
    assert_eq!(study.series[1].instances[0].pixel_ref, PixelRef::new("mr-1"));
    assert!(!state.loading);
}

#[tokio::test]
async fn test_extracts_attributes() {
    let store = ViewerStateStore::new();
    let source = memory_file(
        "pet-1",
        DicomBuilder::ct_instance("3.1.1", "3.1.10", 7)
            .series(3, "PET AC")
            .study("3.1", "20230412", "Whole body")
            .patient("Roe^Richard", "P-77")
            .pixel_encoding(16, 12, true, "MONOCHROME1"),
    );

    let study = loader(&store).load(vec![source]).await.unwrap();
    let instance = &study.series[0].instances[0];

    assert_eq!(instance.id, "3.1.1");
    assert_eq!(instance.instance_number, 7);
    assert_eq!(instance.sop_class_uid, CT_IMAGE_STORAGE);
    assert_eq!(instance.geometry.rows, 512);
    assert_eq!(instance.geometry.columns, 512);
    assert_eq!(instance.geometry.bits_stored, 12);
    assert_eq!(instance.geometry.high_bit, 11);
    assert!(instance.geometry.signed);
    assert_eq!(instance.geometry.photometric_interpretation, "MONOCHROME1");
    assert_eq!(study.series[0].modality, "CT");
    assert_eq!(study.patient_name, "Roe^Richard");
    assert_eq!(study.study_date, "20230412");
}

#[tokio::test]
async fn test_missing_optional_attributes_use_defaults() {
    let store = ViewerStateStore::new();
    let source = memory_file(
        "sparse",
        DicomBuilder::new().text(0x0020, 0x000E, "UI", "4.1.10"),
    );

    let study = loader(&store).load(vec![source]).await.unwrap();
    let instance = &study.series[0].instances[0];

    assert_eq!(instance.id, "sparse");
    assert_eq!(instance.instance_number, 0);
    assert_eq!(instance.geometry.rows, 0);
    assert_eq!(instance.geometry.bits_allocated, 16);
    assert_eq!(instance.geometry.bits_stored, 16);
    assert_eq!(instance.geometry.high_bit, 15);
    assert!(!instance.geometry.signed);
    assert_eq!(instance.geometry.samples_per_pixel, 1);
    assert_eq!(instance.geometry.photometric_interpretation, "MONOCHROME2");
}

#[tokio::test]
async fn test_file_without_preamble() {
    let store = ViewerStateStore::new();
    let source = memory_file(
        "raw",
        DicomBuilder::ct_instance("5.1.1", "5.1.10", 1).without_preamble(),
    );

    let study = loader(&store).load(vec![source]).await.unwrap();
    assert_eq!(study.series[0].instances[0].id, "5.1.1");
}

#[tokio::test]
async fn test_one_corrupt_file_fails_the_batch() {
    let store = ViewerStateStore::new();
    let loader = loader(&store);

    let previous = loader
        .load(vec![memory_file("ok", DicomBuilder::ct_instance("6.1.1", "6.1.10", 1))])
        .await
        .unwrap();

    let err = loader
        .load(vec![
            memory_file("good", DicomBuilder::ct_instance("6.2.1", "6.2.10", 1)),
            MemorySource::new("corrupt", &b"not dicom at all"[..]),
        ])
        .await
        .unwrap_err();

    assert!(matches!(err, LoadError::MetadataParse { ref source_id, .. } if source_id == "corrupt"));

    let state = store.snapshot();
    assert_eq!(state.study.as_ref(), Some(&previous));
    assert_eq!(state.error, Some(err.to_string()));
    assert!(!state.loading);
}

#[tokio::test]
async fn test_loading_flag_is_published() {
    let store = ViewerStateStore::new();
    let mut subscription = store.subscribe();

    loader(&store)
        .load(vec![memory_file("one", DicomBuilder::ct_instance("7.1.1", "7.1.10", 1))])
        .await
        .unwrap();

    // Every intermediate snapshot may be coalesced, but the final one is settled.
    let state = subscription.changed().await.unwrap();
    assert!(!state.loading);
    assert!(state.study.is_some());
}

#[tokio::test]
async fn test_local_files() {
    let dir = scratch_dir("loader");
    let first = dir.join("1.dcm");
    let second = dir.join("2.dcm");
    tokio::fs::write(&first, DicomBuilder::ct_instance("8.1.1", "8.1.10", 1).build())
        .await
        .unwrap();
    tokio::fs::write(&second, DicomBuilder::ct_instance("8.1.2", "8.1.10", 2).build())
        .await
        .unwrap();

    let store = ViewerStateStore::new();
    let study = loader(&store)
        .load(vec![LocalFileSource::new(&second), LocalFileSource::new(&first)])
        .await
        .unwrap();

    let instances = &study.series[0].instances;
    assert_eq!(instances[0].pixel_ref.as_str(), first.display().to_string());
    assert_eq!(instances[1].pixel_ref.as_str(), second.display().to_string());

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}

#[tokio::test]
async fn test_missing_local_file() {
    let store = ViewerStateStore::new();
    let err = loader(&store)
        .load(vec![LocalFileSource::new("/nonexistent/dicom-viewer/1.dcm")])
        .await
        .unwrap_err();

    assert!(matches!(err, LoadError::FileRead { .. }));
    assert!(store.snapshot().study.is_none());
}
