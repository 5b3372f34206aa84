use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use tracing::info;

use super::domain::{Drive, DriveId, DriveUpdate, NewDrive};
use super::error::VaccinationError;
use super::repository::VaccinationRepository;
use crate::clock::Clock;

/// Calendar rules for drive creation and edits.
///
/// The lead-time boundary is exclusive at calendar-day granularity: with the default of 15
/// days, a drive requested on day `today + 15` is rejected and `today + 16` is the earliest
/// accepted date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulingPolicy {
    lead_days: i64,
}

impl SchedulingPolicy {
    pub const DEFAULT_LEAD_DAYS: i64 = 15;
    /// Ten years.
    pub const MAX_LEAD_DAYS: i64 = 3650;

    /// Clamps `lead_days` into `0..=MAX_LEAD_DAYS`.
    pub fn new(lead_days: i64) -> Self {
        Self {
            lead_days: lead_days.clamp(0, Self::MAX_LEAD_DAYS),
        }
    }

    /// Saturates at the last representable date.
    pub fn earliest_date(&self, today: NaiveDate) -> NaiveDate {
        today
            .checked_add_signed(Duration::days(self.lead_days + 1))
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn check_lead_time(
        &self,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Result<(), VaccinationError> {
        let earliest = self.earliest_date(today);
        if date < earliest {
            return Err(VaccinationError::LeadTimeViolation {
                date,
                earliest,
                lead_days: self.lead_days,
            });
        }
        Ok(())
    }
}

impl Default for SchedulingPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LEAD_DAYS)
    }
}

/// Creates and edits drives against the lead-time, immutability, and one-drive-per-day rules.
pub struct DriveScheduler<R> {
    repository: Arc<R>,
    clock: Arc<dyn Clock>,
    policy: SchedulingPolicy,
}

impl<R> DriveScheduler<R>
where
    R: VaccinationRepository + 'static,
{
    pub fn new(repository: Arc<R>, clock: Arc<dyn Clock>, policy: SchedulingPolicy) -> Self {
        Self {
            repository,
            clock,
            policy,
        }
    }

    pub fn create(&self, request: NewDrive) -> Result<Drive, VaccinationError> {
        let request = request.normalized().map_err(VaccinationError::Validation)?;
        let today = self.clock.today();
        self.policy.check_lead_time(request.date, today)?;

        let drive = self.repository.insert_drive(request)?;
        info!(
            drive_id = %drive.id,
            vaccine = %drive.vaccine_name,
            date = %drive.date,
            doses = drive.available_doses,
            "vaccination drive scheduled"
        );
        Ok(drive)
    }

    /// Overwrites date, doses, and classes. A drive stays editable through its own date; the
    /// store rejects strictly past drives under its write lock, with "today" read from the clock
    /// on every call. The new date is not held to the lead time, only to the one-drive-per-day
    /// rule.
    pub fn edit(&self, id: DriveId, update: DriveUpdate) -> Result<Drive, VaccinationError> {
        let today = self.clock.today();
        let drive = self
            .repository
            .update_drive(id, update.normalized(), today)?;
        info!(
            drive_id = %drive.id,
            date = %drive.date,
            doses = drive.available_doses,
            "vaccination drive updated"
        );
        Ok(drive)
    }

    /// Drives dated today or later, soonest first.
    pub fn upcoming(&self) -> Result<Vec<Drive>, VaccinationError> {
        let today = self.clock.today();
        let mut drives: Vec<Drive> = self
            .repository
            .snapshot()?
            .drives
            .into_iter()
            .filter(|drive| drive.date >= today)
            .collect();
        drives.sort_by_key(|drive| drive.date);
        Ok(drives)
    }
}
