//! Students, vaccination drives, and vaccination records for one school.
//!
//! The store enforces the uniqueness invariants (student identifier, one drive per date, one
//! record per student and drive) and the cascading student delete. The scheduler layers the
//! calendar rules on top, the recorder produces records, and `reports` holds the read-only
//! projections used by the dashboard and exports.

pub mod domain;
pub mod error;
pub mod recorder;
pub mod reports;
pub mod repository;
pub mod roster;
pub mod router;
pub mod scheduler;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use domain::{
    Drive, DriveId, DriveUpdate, NewDrive, NewStudent, NewVaccination, RecordId, Student,
    StudentId, StudentPatch, VaccinationRecord,
};
pub use error::VaccinationError;
pub use recorder::VaccinationRecorder;
pub use reports::{
    DashboardOverview, DriveSummary, Pagination, ReportPage, ReportRow, StudentFilter,
    StudentView,
};
pub use repository::{RepositoryError, StoreSnapshot, VaccinationRepository};
pub use roster::RosterImportError;
pub use router::vaccination_router;
pub use scheduler::{DriveScheduler, SchedulingPolicy};
pub use service::VaccinationService;
pub use store::SnapshotStore;
