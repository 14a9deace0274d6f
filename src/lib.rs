//! Apportions historical HOLC redlining grades onto modern census tracts and
//! joins the result with tract race composition and deed-restriction records.
//!
//! The core is [`apportion`]: for every tract, the share of its area overlapped
//! by the polygons of one grade. [`Study`] drives the whole batch.

mod common;
mod io;

pub mod census;
pub mod config;
pub mod deeds;
pub mod geom;
pub mod study;
pub mod types;

#[doc(inline)]
pub use common::ensure_writable;

#[doc(inline)]
pub use config::StudyConfig;

#[doc(inline)]
pub use geom::{
    apportion, apportion_all, CoverageColumn, CoverageRow, CoverageTable, DegenerateGeometryError,
    DegenerateReason, GradedRegion, OverlayMode, TractSet,
};

#[doc(inline)]
pub use io::{read_graded_regions, read_tracts, write_csv};

#[doc(inline)]
pub use study::{Study, StudyInputs, StudyOptions, StudyRow};

#[doc(inline)]
pub use types::{HolcGrade, TractId};
