use std::io::Read;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};

use super::domain::{
    Drive, DriveId, DriveUpdate, NewDrive, NewStudent, Student, StudentId, StudentPatch,
    VaccinationRecord,
};
use super::error::VaccinationError;
use super::recorder::VaccinationRecorder;
use super::reports::{
    self, DashboardOverview, Pagination, ReportPage, ReportRow, StudentFilter, StudentView,
};
use super::repository::VaccinationRepository;
use super::roster::{self, RosterImportError};
use super::scheduler::{DriveScheduler, SchedulingPolicy};
use crate::clock::Clock;

/// Service composing the drive scheduler, vaccination recorder, roster import, and reports over
/// one repository.
pub struct VaccinationService<R> {
    repository: Arc<R>,
    clock: Arc<dyn Clock>,
    scheduler: DriveScheduler<R>,
    recorder: VaccinationRecorder<R>,
}

impl<R> VaccinationService<R>
where
    R: VaccinationRepository + 'static,
{
    pub fn new(repository: Arc<R>, clock: Arc<dyn Clock>, policy: SchedulingPolicy) -> Self {
        let scheduler = DriveScheduler::new(repository.clone(), clock.clone(), policy);
        let recorder = VaccinationRecorder::new(repository.clone(), clock.clone());

        Self {
            repository,
            clock,
            scheduler,
            recorder,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn create_drive(&self, request: NewDrive) -> Result<Drive, VaccinationError> {
        self.scheduler.create(request)
    }

    pub fn edit_drive(&self, id: DriveId, update: DriveUpdate) -> Result<Drive, VaccinationError> {
        self.scheduler.edit(id, update)
    }

    pub fn upcoming_drives(&self) -> Result<Vec<Drive>, VaccinationError> {
        self.scheduler.upcoming()
    }

    pub fn add_student(&self, student: NewStudent) -> Result<Student, VaccinationError> {
        let student = student.normalized().map_err(VaccinationError::Validation)?;
        let stored = self.repository.insert_student(student)?;
        info!(
            id = %stored.id,
            student = %stored.student_id,
            class = %stored.student_class,
            "student added"
        );
        Ok(stored)
    }

    /// Imports a roster all-or-nothing, returning the stored students in row order.
    pub fn import_roster<T: Read>(&self, reader: T) -> Result<Vec<Student>, VaccinationError> {
        let batch = roster::parse_roster(reader).map_err(|err| {
            warn!(error = %err, "roster rejected");
            err
        })?;

        let stored = self
            .repository
            .insert_students(batch.clone())
            .map_err(|err| roster::attribute_to_row(&batch, err))
            .map_err(|err: RosterImportError| {
                warn!(error = %err, "roster rejected");
                err
            })?;

        info!(count = stored.len(), "roster imported");
        Ok(stored)
    }

    pub fn update_student(
        &self,
        id: StudentId,
        patch: StudentPatch,
    ) -> Result<Student, VaccinationError> {
        let patch = patch.normalized().map_err(VaccinationError::Validation)?;
        let student = self.repository.update_student(id, patch)?;
        info!(id = %student.id, student = %student.student_id, "student updated");
        Ok(student)
    }

    pub fn delete_student(&self, id: StudentId) -> Result<(), VaccinationError> {
        let removed_records = self.repository.delete_student(id)?;
        info!(id = %id, removed_records, "student deleted");
        Ok(())
    }

    pub fn vaccinate(
        &self,
        student: StudentId,
        drive: DriveId,
        date: Option<NaiveDate>,
    ) -> Result<VaccinationRecord, VaccinationError> {
        self.recorder.vaccinate(student, drive, date)
    }

    pub fn search_students(
        &self,
        filter: &StudentFilter,
    ) -> Result<Vec<StudentView>, VaccinationError> {
        let snapshot = self.repository.snapshot()?;
        Ok(reports::search_students(&snapshot, filter))
    }

    pub fn overview(&self) -> Result<DashboardOverview, VaccinationError> {
        let snapshot = self.repository.snapshot()?;
        Ok(reports::overview(&snapshot, self.clock.today()))
    }

    pub fn report(
        &self,
        vaccine_filter: Option<&str>,
        pagination: Pagination,
    ) -> Result<ReportPage, VaccinationError> {
        let rows = self.report_rows(vaccine_filter)?;
        Ok(reports::report_page(rows, pagination))
    }

    pub fn report_rows(
        &self,
        vaccine_filter: Option<&str>,
    ) -> Result<Vec<ReportRow>, VaccinationError> {
        let snapshot = self.repository.snapshot()?;
        Ok(reports::report_rows(&snapshot, vaccine_filter))
    }

    /// Full report as CSV bytes with the fixed export header.
    pub fn export_report(
        &self,
        vaccine_filter: Option<&str>,
    ) -> Result<Vec<u8>, VaccinationError> {
        let rows = self.report_rows(vaccine_filter)?;
        let mut buffer = Vec::new();
        reports::write_export(&rows, &mut buffer)
            .map_err(|err| VaccinationError::Storage(format!("failed to render export: {err}")))?;
        Ok(buffer)
    }

    pub fn vaccine_names(&self) -> Result<Vec<String>, VaccinationError> {
        let snapshot = self.repository.snapshot()?;
        Ok(reports::vaccine_names(&snapshot))
    }
}
