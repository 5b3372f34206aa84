use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::NaiveDate;
use serde_json::json;

use super::domain::{DriveId, StudentId};
use super::repository::RepositoryError;
use super::roster::RosterImportError;

/// Error raised by the scheduling, recording, roster, and reporting operations.
#[derive(Debug, thiserror::Error)]
pub enum VaccinationError {
    #[error("student {0} not found")]
    StudentNotFound(StudentId),
    #[error("drive {0} not found")]
    DriveNotFound(DriveId),
    #[error("student identifier '{0}' already exists")]
    DuplicateIdentifier(String),
    #[error("another drive is already scheduled on {0}")]
    SchedulingConflict(NaiveDate),
    #[error(
        "drives must be scheduled more than {lead_days} days in advance; {date} is too soon, earliest allowed date is {earliest}"
    )]
    LeadTimeViolation {
        date: NaiveDate,
        earliest: NaiveDate,
        lead_days: i64,
    },
    #[error("drive {id} took place on {date}; past drives cannot be edited")]
    ImmutablePastDrive { id: DriveId, date: NaiveDate },
    #[error("student {student} already vaccinated in drive {drive}")]
    AlreadyVaccinated { student: StudentId, drive: DriveId },
    #[error("invalid input: {0}")]
    Validation(String),
    #[error(transparent)]
    Import(#[from] RosterImportError),
    #[error("storage failure: {0}")]
    Storage(String),
}

impl VaccinationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::StudentNotFound(_) | Self::DriveNotFound(_) => StatusCode::NOT_FOUND,
            Self::ImmutablePastDrive { .. } => StatusCode::FORBIDDEN,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Import(err) if err.is_storage_failure() => StatusCode::INTERNAL_SERVER_ERROR,
            Self::DuplicateIdentifier(_)
            | Self::SchedulingConflict(_)
            | Self::LeadTimeViolation { .. }
            | Self::AlreadyVaccinated { .. }
            | Self::Validation(_)
            | Self::Import(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<RepositoryError> for VaccinationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::DuplicateIdentifier(id) => Self::DuplicateIdentifier(id),
            RepositoryError::SchedulingConflict(date) => Self::SchedulingConflict(date),
            RepositoryError::DuplicateVaccination { student, drive } => {
                Self::AlreadyVaccinated { student, drive }
            }
            RepositoryError::StudentNotFound(id) => Self::StudentNotFound(id),
            RepositoryError::DriveNotFound(id) => Self::DriveNotFound(id),
            RepositoryError::PastDrive { id, date } => Self::ImmutablePastDrive { id, date },
            RepositoryError::Unavailable(reason) => Self::Storage(reason),
        }
    }
}

impl IntoResponse for VaccinationError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_class() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 10).expect("valid date");
        assert_eq!(
            VaccinationError::DriveNotFound(DriveId(4)).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            VaccinationError::ImmutablePastDrive {
                id: DriveId(4),
                date
            }
            .status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            VaccinationError::SchedulingConflict(date).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            VaccinationError::Storage("disk full".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn duplicate_vaccination_surfaces_as_already_vaccinated() {
        let error = VaccinationError::from(RepositoryError::DuplicateVaccination {
            student: StudentId(1),
            drive: DriveId(2),
        });
        assert!(matches!(
            error,
            VaccinationError::AlreadyVaccinated {
                student: StudentId(1),
                drive: DriveId(2)
            }
        ));
        assert!(error.to_string().contains("already vaccinated"));
    }
}
