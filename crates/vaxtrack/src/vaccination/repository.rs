use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{
    Drive, DriveId, DriveUpdate, NewDrive, NewStudent, NewVaccination, Student, StudentId,
    StudentPatch, VaccinationRecord,
};

/// Storage abstraction for students, drives, and vaccination records.
///
/// Implementations own the uniqueness invariants: each check and the write it guards must be one
/// atomic step, so two callers racing for the same drive date or (student, drive) pair cannot
/// both succeed. Every mutation is durable before it returns `Ok`.
pub trait VaccinationRepository: Send + Sync {
    fn insert_student(&self, student: NewStudent) -> Result<Student, RepositoryError>;
    /// Inserts every student or none of them.
    fn insert_students(&self, batch: Vec<NewStudent>) -> Result<Vec<Student>, RepositoryError>;
    fn update_student(
        &self,
        id: StudentId,
        patch: StudentPatch,
    ) -> Result<Student, RepositoryError>;
    /// Removes the student together with its vaccination records, returning how many records
    /// went with it.
    fn delete_student(&self, id: StudentId) -> Result<usize, RepositoryError>;
    fn student(&self, id: StudentId) -> Result<Option<Student>, RepositoryError>;

    fn insert_drive(&self, drive: NewDrive) -> Result<Drive, RepositoryError>;
    /// Overwrites the drive unless it is dated before `not_before`, checked under the same
    /// lock as the write.
    fn update_drive(
        &self,
        id: DriveId,
        update: DriveUpdate,
        not_before: NaiveDate,
    ) -> Result<Drive, RepositoryError>;
    fn drive(&self, id: DriveId) -> Result<Option<Drive>, RepositoryError>;

    fn insert_record(&self, record: NewVaccination)
        -> Result<VaccinationRecord, RepositoryError>;

    /// Consistent copy of every entity, for read-only projections.
    fn snapshot(&self) -> Result<StoreSnapshot, RepositoryError>;
}

/// Point-in-time view of the whole store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub students: Vec<Student>,
    pub drives: Vec<Drive>,
    pub records: Vec<VaccinationRecord>,
}

impl StoreSnapshot {
    pub fn student(&self, id: StudentId) -> Option<&Student> {
        self.students.iter().find(|student| student.id == id)
    }

    pub fn drive(&self, id: DriveId) -> Option<&Drive> {
        self.drives.iter().find(|drive| drive.id == id)
    }
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("student identifier '{0}' already exists")]
    DuplicateIdentifier(String),
    #[error("another drive is already scheduled on {0}")]
    SchedulingConflict(NaiveDate),
    #[error("student {student} already has a record for drive {drive}")]
    DuplicateVaccination { student: StudentId, drive: DriveId },
    #[error("student {0} not found")]
    StudentNotFound(StudentId),
    #[error("drive {0} not found")]
    DriveNotFound(DriveId),
    #[error("drive {id} took place on {date}")]
    PastDrive { id: DriveId, date: NaiveDate },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
