use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Store-assigned identity of a student row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(pub u64);

/// Store-assigned identity of a vaccination drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DriveId(pub u64);

/// Store-assigned identity of a vaccination record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for DriveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Enrolled student. `student_id` is the school-issued identifier and is unique across the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub student_id: String,
    pub name: String,
    pub student_class: String,
    #[serde(default)]
    pub dob: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub guardian_name: Option<String>,
    #[serde(default)]
    pub contact_number: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Payload for adding a student, either individually or as one row of a roster import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStudent {
    pub name: String,
    pub student_id: String,
    pub student_class: String,
    #[serde(default)]
    pub dob: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub guardian_name: Option<String>,
    #[serde(default)]
    pub contact_number: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl NewStudent {
    pub fn new(
        name: impl Into<String>,
        student_id: impl Into<String>,
        student_class: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            student_id: student_id.into(),
            student_class: student_class.into(),
            dob: None,
            gender: None,
            guardian_name: None,
            contact_number: None,
            address: None,
        }
    }

    /// Trims identity fields and drops blank optional fields, rejecting missing required ones.
    pub fn normalized(self) -> Result<Self, String> {
        Ok(Self {
            name: required("name", self.name)?,
            student_id: required("student_id", self.student_id)?,
            student_class: required("student_class", self.student_class)?,
            dob: self.dob,
            gender: optional(self.gender),
            guardian_name: optional(self.guardian_name),
            contact_number: optional(self.contact_number),
            address: optional(self.address),
        })
    }
}

/// Partial update for a student. Only identity fields are editable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub student_class: Option<String>,
}

impl StudentPatch {
    pub fn normalized(self) -> Result<Self, String> {
        Ok(Self {
            name: self.name.map(|value| required("name", value)).transpose()?,
            student_id: self
                .student_id
                .map(|value| required("student_id", value))
                .transpose()?,
            student_class: self
                .student_class
                .map(|value| required("student_class", value))
                .transpose()?,
        })
    }

    pub fn apply(&self, student: &mut Student) {
        if let Some(name) = &self.name {
            student.name = name.clone();
        }
        if let Some(student_id) = &self.student_id {
            student.student_id = student_id.clone();
        }
        if let Some(student_class) = &self.student_class {
            student.student_class = student_class.clone();
        }
    }
}

/// Scheduled vaccination event. At most one drive exists per calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drive {
    pub id: DriveId,
    pub vaccine_name: String,
    pub date: NaiveDate,
    pub available_doses: u32,
    pub applicable_classes: Vec<String>,
}

impl Drive {
    pub fn applies_to(&self, student_class: &str) -> bool {
        self.applicable_classes
            .iter()
            .any(|class| class.eq_ignore_ascii_case(student_class.trim()))
    }
}

/// Payload for scheduling a drive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDrive {
    pub vaccine_name: String,
    pub date: NaiveDate,
    pub available_doses: u32,
    #[serde(default)]
    pub applicable_classes: Vec<String>,
}

impl NewDrive {
    pub fn normalized(self) -> Result<Self, String> {
        Ok(Self {
            vaccine_name: required("vaccine_name", self.vaccine_name)?,
            date: self.date,
            available_doses: self.available_doses,
            applicable_classes: normalize_classes(self.applicable_classes),
        })
    }
}

/// Mutable fields of an existing drive. The vaccine itself cannot be swapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveUpdate {
    pub date: NaiveDate,
    pub available_doses: u32,
    #[serde(default)]
    pub applicable_classes: Vec<String>,
}

impl DriveUpdate {
    pub fn normalized(self) -> Self {
        Self {
            applicable_classes: normalize_classes(self.applicable_classes),
            ..self
        }
    }

    pub fn apply(&self, drive: &mut Drive) {
        drive.date = self.date;
        drive.available_doses = self.available_doses;
        drive.applicable_classes = self.applicable_classes.clone();
    }
}

/// Proof that a student received the vaccine of a drive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaccinationRecord {
    pub id: RecordId,
    pub student: StudentId,
    pub drive: DriveId,
    pub date_vaccinated: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewVaccination {
    pub student: StudentId,
    pub drive: DriveId,
    pub date_vaccinated: NaiveDate,
}

/// Trims labels, drops blanks, and collapses duplicates while keeping first-seen order.
pub fn normalize_classes(classes: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    classes
        .into_iter()
        .map(|class| class.trim().to_string())
        .filter(|class| !class.is_empty())
        .filter(|class| seen.insert(class.to_ascii_lowercase()))
        .collect()
}

fn required(field: &str, value: String) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("{field} must not be blank"));
    }
    Ok(trimmed.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_are_trimmed_and_deduplicated() {
        let classes = normalize_classes(vec![
            " 5A".to_string(),
            "5B".to_string(),
            "".to_string(),
            "5a".to_string(),
        ]);
        assert_eq!(classes, vec!["5A".to_string(), "5B".to_string()]);
    }

    #[test]
    fn new_student_requires_identity_fields() {
        let err = NewStudent::new("Asha", "  ", "5A")
            .normalized()
            .expect_err("blank identifier rejected");
        assert!(err.contains("student_id"));
    }

    #[test]
    fn patch_only_touches_supplied_fields() {
        let mut student = Student {
            id: StudentId(1),
            student_id: "S1".to_string(),
            name: "Asha".to_string(),
            student_class: "5A".to_string(),
            dob: None,
            gender: Some("F".to_string()),
            guardian_name: None,
            contact_number: None,
            address: None,
        };
        let patch = StudentPatch {
            student_class: Some(" 6A ".to_string()),
            ..StudentPatch::default()
        }
        .normalized()
        .expect("valid patch");

        patch.apply(&mut student);

        assert_eq!(student.student_class, "6A");
        assert_eq!(student.name, "Asha");
        assert_eq!(student.gender.as_deref(), Some("F"));
    }

    #[test]
    fn drive_applicability_ignores_case() {
        let drive = Drive {
            id: DriveId(1),
            vaccine_name: "MMR".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date"),
            available_doses: 10,
            applicable_classes: vec!["5A".to_string()],
        };
        assert!(drive.applies_to("5a"));
        assert!(!drive.applies_to("6A"));
    }
}
