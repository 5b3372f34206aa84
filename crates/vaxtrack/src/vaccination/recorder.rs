use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use super::domain::{DriveId, NewVaccination, StudentId, VaccinationRecord};
use super::error::VaccinationError;
use super::repository::VaccinationRepository;
use crate::clock::Clock;

/// Records vaccinations, at most once per (student, drive).
///
/// Class applicability and remaining doses are not checked, and dose counts are never
/// decremented.
pub struct VaccinationRecorder<R> {
    repository: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<R> VaccinationRecorder<R>
where
    R: VaccinationRepository + 'static,
{
    pub fn new(repository: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    pub fn vaccinate(
        &self,
        student_id: StudentId,
        drive_id: DriveId,
        date: Option<NaiveDate>,
    ) -> Result<VaccinationRecord, VaccinationError> {
        let drive = self
            .repository
            .drive(drive_id)?
            .ok_or(VaccinationError::DriveNotFound(drive_id))?;
        let student = self
            .repository
            .student(student_id)?
            .ok_or(VaccinationError::StudentNotFound(student_id))?;

        if !drive.applies_to(&student.student_class) {
            debug!(
                student = %student.student_id,
                class = %student.student_class,
                drive_id = %drive.id,
                "recording vaccination outside the drive's applicable classes"
            );
        }

        let date_vaccinated = date.unwrap_or_else(|| self.clock.today());
        let record = self.repository.insert_record(NewVaccination {
            student: student_id,
            drive: drive_id,
            date_vaccinated,
        })?;

        info!(
            record_id = %record.id,
            student = %student.student_id,
            vaccine = %drive.vaccine_name,
            date = %record.date_vaccinated,
            "vaccination recorded"
        );
        Ok(record)
    }
}
