//! Snapshot-backed entity store.
//!
//! All entities live in one in-memory state guarded by a mutex. A write clones the state,
//! applies the mutation to the clone, persists the clone, and only then swaps it in. A failed
//! check or a failed write therefore leaves the visible state untouched, which gives every
//! operation (including the cascading student delete and roster batches) all-or-nothing
//! semantics.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::domain::{
    Drive, DriveId, DriveUpdate, NewDrive, NewStudent, NewVaccination, RecordId, Student,
    StudentId, StudentPatch, VaccinationRecord,
};
use super::repository::{RepositoryError, StoreSnapshot, VaccinationRepository};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreState {
    #[serde(default)]
    last_student_id: u64,
    #[serde(default)]
    last_drive_id: u64,
    #[serde(default)]
    last_record_id: u64,
    #[serde(default)]
    students: Vec<Student>,
    #[serde(default)]
    drives: Vec<Drive>,
    #[serde(default)]
    records: Vec<VaccinationRecord>,
}

impl StoreState {
    fn insert_student(&mut self, new: NewStudent) -> Result<Student, RepositoryError> {
        if self
            .students
            .iter()
            .any(|student| student.student_id == new.student_id)
        {
            return Err(RepositoryError::DuplicateIdentifier(new.student_id));
        }

        self.last_student_id += 1;
        let student = Student {
            id: StudentId(self.last_student_id),
            student_id: new.student_id,
            name: new.name,
            student_class: new.student_class,
            dob: new.dob,
            gender: new.gender,
            guardian_name: new.guardian_name,
            contact_number: new.contact_number,
            address: new.address,
        };
        self.students.push(student.clone());
        Ok(student)
    }

    fn update_student(
        &mut self,
        id: StudentId,
        patch: &StudentPatch,
    ) -> Result<Student, RepositoryError> {
        if let Some(student_id) = &patch.student_id {
            if self
                .students
                .iter()
                .any(|student| student.id != id && &student.student_id == student_id)
            {
                return Err(RepositoryError::DuplicateIdentifier(student_id.clone()));
            }
        }

        let student = self
            .students
            .iter_mut()
            .find(|student| student.id == id)
            .ok_or(RepositoryError::StudentNotFound(id))?;
        patch.apply(student);
        Ok(student.clone())
    }

    fn delete_student(&mut self, id: StudentId) -> Result<usize, RepositoryError> {
        let position = self
            .students
            .iter()
            .position(|student| student.id == id)
            .ok_or(RepositoryError::StudentNotFound(id))?;
        self.students.remove(position);

        let before = self.records.len();
        self.records.retain(|record| record.student != id);
        Ok(before - self.records.len())
    }

    fn insert_drive(&mut self, new: NewDrive) -> Result<Drive, RepositoryError> {
        if self.drives.iter().any(|drive| drive.date == new.date) {
            return Err(RepositoryError::SchedulingConflict(new.date));
        }

        self.last_drive_id += 1;
        let drive = Drive {
            id: DriveId(self.last_drive_id),
            vaccine_name: new.vaccine_name,
            date: new.date,
            available_doses: new.available_doses,
            applicable_classes: new.applicable_classes,
        };
        self.drives.push(drive.clone());
        Ok(drive)
    }

    fn update_drive(
        &mut self,
        id: DriveId,
        update: &DriveUpdate,
        not_before: NaiveDate,
    ) -> Result<Drive, RepositoryError> {
        let position = self
            .drives
            .iter()
            .position(|drive| drive.id == id)
            .ok_or(RepositoryError::DriveNotFound(id))?;
        let current = self.drives[position].date;
        if current < not_before {
            return Err(RepositoryError::PastDrive { id, date: current });
        }
        if self
            .drives
            .iter()
            .any(|drive| drive.id != id && drive.date == update.date)
        {
            return Err(RepositoryError::SchedulingConflict(update.date));
        }

        let drive = &mut self.drives[position];
        update.apply(drive);
        Ok(drive.clone())
    }

    fn insert_record(&mut self, new: NewVaccination) -> Result<VaccinationRecord, RepositoryError> {
        if !self.students.iter().any(|student| student.id == new.student) {
            return Err(RepositoryError::StudentNotFound(new.student));
        }
        if !self.drives.iter().any(|drive| drive.id == new.drive) {
            return Err(RepositoryError::DriveNotFound(new.drive));
        }
        if self
            .records
            .iter()
            .any(|record| record.student == new.student && record.drive == new.drive)
        {
            return Err(RepositoryError::DuplicateVaccination {
                student: new.student,
                drive: new.drive,
            });
        }

        self.last_record_id += 1;
        let record = VaccinationRecord {
            id: RecordId(self.last_record_id),
            student: new.student,
            drive: new.drive,
            date_vaccinated: new.date_vaccinated,
        };
        self.records.push(record.clone());
        Ok(record)
    }

    fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            students: self.students.clone(),
            drives: self.drives.clone(),
            records: self.records.clone(),
        }
    }
}

/// Entity store persisted as a JSON document, or kept purely in memory.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    state: Mutex<StoreState>,
    path: Option<PathBuf>,
}

impl SnapshotStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens the snapshot at `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let path = path.into();
        let state = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice::<StoreState>(&bytes).map_err(|err| {
                RepositoryError::Unavailable(format!(
                    "snapshot {} is not readable: {err}",
                    path.display()
                ))
            })?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => StoreState::default(),
            Err(err) => return Err(io_unavailable(&path, err)),
        };

        debug!(
            path = %path.display(),
            students = state.students.len(),
            drives = state.drives.len(),
            records = state.records.len(),
            "opened vaccination store"
        );

        Ok(Self {
            state: Mutex::new(state),
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }

    fn read<T>(&self, view: impl FnOnce(&StoreState) -> T) -> Result<T, RepositoryError> {
        let guard = self.lock()?;
        Ok(view(&guard))
    }

    fn write<T>(
        &self,
        mutation: impl FnOnce(&mut StoreState) -> Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        let mut guard = self.lock()?;
        let mut next = guard.clone();
        let value = mutation(&mut next)?;
        self.persist(&next)?;
        *guard = next;
        Ok(value)
    }

    fn persist(&self, state: &StoreState) -> Result<(), RepositoryError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let payload = serde_json::to_vec_pretty(state).map_err(|err| {
            RepositoryError::Unavailable(format!("failed to encode snapshot: {err}"))
        })?;

        let mut staging = path.as_os_str().to_owned();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        replace_file(path, &staging, &payload).map_err(|err| {
            error!(path = %path.display(), error = %err, "snapshot write failed");
            io_unavailable(path, err)
        })
    }
}

/// Writes and fsyncs `staging`, renames it over `path`, then fsyncs the directory so the
/// rename itself survives a crash.
fn replace_file(path: &Path, staging: &Path, payload: &[u8]) -> io::Result<()> {
    write_and_sync(staging, payload)?;
    fs::rename(staging, path)?;
    sync_parent(path)
}

fn write_and_sync(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg(unix)]
fn sync_parent(path: &Path) -> io::Result<()> {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> io::Result<()> {
    Ok(())
}

fn io_unavailable(path: &Path, err: io::Error) -> RepositoryError {
    RepositoryError::Unavailable(format!("{}: {err}", path.display()))
}

impl VaccinationRepository for SnapshotStore {
    fn insert_student(&self, student: NewStudent) -> Result<Student, RepositoryError> {
        self.write(|state| state.insert_student(student))
    }

    fn insert_students(&self, batch: Vec<NewStudent>) -> Result<Vec<Student>, RepositoryError> {
        self.write(|state| {
            batch
                .into_iter()
                .map(|student| state.insert_student(student))
                .collect()
        })
    }

    fn update_student(
        &self,
        id: StudentId,
        patch: StudentPatch,
    ) -> Result<Student, RepositoryError> {
        self.write(|state| state.update_student(id, &patch))
    }

    fn delete_student(&self, id: StudentId) -> Result<usize, RepositoryError> {
        self.write(|state| state.delete_student(id))
    }

    fn student(&self, id: StudentId) -> Result<Option<Student>, RepositoryError> {
        self.read(|state| {
            state
                .students
                .iter()
                .find(|student| student.id == id)
                .cloned()
        })
    }

    fn insert_drive(&self, drive: NewDrive) -> Result<Drive, RepositoryError> {
        self.write(|state| state.insert_drive(drive))
    }

    fn update_drive(
        &self,
        id: DriveId,
        update: DriveUpdate,
        not_before: NaiveDate,
    ) -> Result<Drive, RepositoryError> {
        self.write(|state| state.update_drive(id, &update, not_before))
    }

    fn drive(&self, id: DriveId) -> Result<Option<Drive>, RepositoryError> {
        self.read(|state| state.drives.iter().find(|drive| drive.id == id).cloned())
    }

    fn insert_record(
        &self,
        record: NewVaccination,
    ) -> Result<VaccinationRecord, RepositoryError> {
        self.write(|state| state.insert_record(record))
    }

    fn snapshot(&self) -> Result<StoreSnapshot, RepositoryError> {
        self.read(StoreState::snapshot)
    }
}
