//! Bulk student import from delimited text.
//!
//! Expected header: `name,student_id,student_class,dob,gender,guardian_name,contact_number,address`.
//! Only the first three columns are required; `dob` is `YYYY-MM-DD` when present. A batch is
//! applied all-or-nothing: the first failing row aborts the import and nothing is committed.

use std::collections::HashMap;
use std::io::Read;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

use super::domain::NewStudent;
use super::repository::RepositoryError;

/// Failure while reading or applying a roster. Row numbers count data rows from 1, excluding the
/// header.
#[derive(Debug, thiserror::Error)]
pub enum RosterImportError {
    #[error("roster could not be read: {0}")]
    Csv(#[from] csv::Error),
    #[error("roster contains no student rows")]
    Empty,
    #[error("error in row {row} ({content}): {reason}")]
    InvalidRow {
        row: usize,
        content: String,
        reason: String,
    },
    #[error("error in row {row}: student identifier '{student_id}' already exists")]
    DuplicateIdentifier { row: usize, student_id: String },
    #[error("roster could not be saved: {0}")]
    Repository(RepositoryError),
}

impl RosterImportError {
    pub fn row(&self) -> Option<usize> {
        match self {
            Self::InvalidRow { row, .. } | Self::DuplicateIdentifier { row, .. } => Some(*row),
            _ => None,
        }
    }

    pub fn is_storage_failure(&self) -> bool {
        matches!(self, Self::Repository(_))
    }
}

#[derive(Debug, Deserialize)]
struct RosterRow {
    name: String,
    student_id: String,
    student_class: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    dob: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    gender: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    guardian_name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    contact_number: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    address: Option<String>,
}

impl RosterRow {
    fn into_student(self) -> Result<NewStudent, String> {
        let dob = self
            .dob
            .as_deref()
            .map(|raw| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .map_err(|err| format!("dob '{raw}' is not a YYYY-MM-DD date ({err})"))
            })
            .transpose()?;

        NewStudent {
            name: self.name,
            student_id: self.student_id,
            student_class: self.student_class,
            dob,
            gender: self.gender,
            guardian_name: self.guardian_name,
            contact_number: self.contact_number,
            address: self.address,
        }
        .normalized()
    }
}

/// Parses every row up front so the batch is rejected before touching the store.
pub fn parse_roster<R: Read>(reader: R) -> Result<Vec<NewStudent>, RosterImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let mut students = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for (index, record) in csv_reader.records().enumerate() {
        let row = index + 1;
        let record = record?;
        let content = record.iter().collect::<Vec<_>>().join(",");

        let student = record
            .deserialize::<RosterRow>(Some(&headers))
            .map_err(|err| err.to_string())
            .and_then(RosterRow::into_student)
            .map_err(|reason| RosterImportError::InvalidRow {
                row,
                content: content.clone(),
                reason,
            })?;

        if seen.insert(student.student_id.clone(), row).is_some() {
            return Err(RosterImportError::DuplicateIdentifier {
                row,
                student_id: student.student_id,
            });
        }
        students.push(student);
    }

    if students.is_empty() {
        return Err(RosterImportError::Empty);
    }
    Ok(students)
}

/// Maps a store rejection back onto the row that caused it.
pub(crate) fn attribute_to_row(batch: &[NewStudent], error: RepositoryError) -> RosterImportError {
    match error {
        RepositoryError::DuplicateIdentifier(student_id) => {
            match batch
                .iter()
                .position(|student| student.student_id == student_id)
            {
                Some(index) => RosterImportError::DuplicateIdentifier {
                    row: index + 1,
                    student_id,
                },
                None => RosterImportError::Repository(RepositoryError::DuplicateIdentifier(
                    student_id,
                )),
            }
        }
        other => RosterImportError::Repository(other),
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
