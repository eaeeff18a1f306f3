//! Study hierarchy model and assembly.
//!
//! ```text
//! Study
//! ├── Series (sorted by series number)
//! │   ├── Instance (sorted by instance number)
//! │   └── ...
//! └── ...
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use dicom_viewer::study::assemble;
//!
//! let study = assemble(records)?;
//! for series in &study.series {
//!     println!("S{}: {} instances", series.series_number, series.instances.len());
//! }
//! ```

mod assembler;
mod model;

pub use assembler::{assemble, DEFAULT_MODALITY};
pub use model::{
    Instance, InstanceRecord, PixelGeometry, PixelRef, Series, SeriesTags, Study, StudyTags,
};
