//! Read-only projections over a [`StoreSnapshot`].
//!
//! Records whose student or drive is missing are orphans and are skipped by every join.

use std::collections::{BTreeSet, HashSet};
use std::io::Write;

use chrono::NaiveDate;
use serde::Serialize;

use super::domain::{Drive, DriveId, StudentId, VaccinationRecord};
use super::repository::StoreSnapshot;

pub const EXPORT_HEADER: [&str; 4] = ["Student Name", "Class", "Vaccine Name", "Date Vaccinated"];
pub const EXPORT_FILE_NAME: &str = "vaccination_report.csv";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriveSummary {
    pub id: DriveId,
    pub vaccine: String,
    pub date: NaiveDate,
}

impl From<&Drive> for DriveSummary {
    fn from(drive: &Drive) -> Self {
        Self {
            id: drive.id,
            vaccine: drive.vaccine_name.clone(),
            date: drive.date,
        }
    }
}

/// Dashboard counts. Upcoming drives are strictly after today; ongoing drives are today.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardOverview {
    pub total_students: usize,
    pub vaccinated_students: usize,
    pub percentage_vaccinated: f64,
    pub upcoming_drives: Vec<DriveSummary>,
    pub ongoing_drives: Vec<DriveSummary>,
}

pub fn overview(snapshot: &StoreSnapshot, today: NaiveDate) -> DashboardOverview {
    let total_students = snapshot.students.len();
    let vaccinated_students = vaccinated_student_ids(snapshot).len();
    let percentage_vaccinated = if total_students == 0 {
        0.0
    } else {
        vaccinated_students as f64 * 100.0 / total_students as f64
    };

    let mut drives: Vec<&Drive> = snapshot.drives.iter().collect();
    drives.sort_by_key(|drive| drive.date);

    DashboardOverview {
        total_students,
        vaccinated_students,
        percentage_vaccinated,
        upcoming_drives: drives
            .iter()
            .filter(|drive| drive.date > today)
            .map(|drive| DriveSummary::from(*drive))
            .collect(),
        ongoing_drives: drives
            .iter()
            .filter(|drive| drive.date == today)
            .map(|drive| DriveSummary::from(*drive))
            .collect(),
    }
}

fn vaccinated_student_ids(snapshot: &StoreSnapshot) -> HashSet<StudentId> {
    snapshot
        .records
        .iter()
        .filter(|record| is_joined(snapshot, record))
        .map(|record| record.student)
        .collect()
}

fn is_joined(snapshot: &StoreSnapshot, record: &VaccinationRecord) -> bool {
    snapshot.student(record.student).is_some() && snapshot.drive(record.drive).is_some()
}

/// Student list filter. Text filters are case-insensitive substrings except `gender`, which is
/// an exact case-insensitive match. When `drive` is set, "vaccinated" means vaccinated in that
/// drive; otherwise it means vaccinated in any drive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentFilter {
    pub name: Option<String>,
    pub student_class: Option<String>,
    pub gender: Option<String>,
    pub vaccinated: Option<bool>,
    pub drive: Option<DriveId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentView {
    pub id: StudentId,
    pub name: String,
    #[serde(rename = "class")]
    pub student_class: String,
    pub student_id: String,
    pub vaccinated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guardian_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

pub fn search_students(snapshot: &StoreSnapshot, filter: &StudentFilter) -> Vec<StudentView> {
    let name = lowered(&filter.name);
    let class = lowered(&filter.student_class);
    let gender = lowered(&filter.gender);

    let vaccinated: HashSet<StudentId> = snapshot
        .records
        .iter()
        .filter(|record| is_joined(snapshot, record))
        .filter(|record| filter.drive.map_or(true, |drive| record.drive == drive))
        .map(|record| record.student)
        .collect();

    snapshot
        .students
        .iter()
        .filter(|student| {
            name.as_ref()
                .map_or(true, |needle| student.name.to_lowercase().contains(needle))
        })
        .filter(|student| {
            class.as_ref().map_or(true, |needle| {
                student.student_class.to_lowercase().contains(needle)
            })
        })
        .filter(|student| {
            gender.as_ref().map_or(true, |wanted| {
                student
                    .gender
                    .as_deref()
                    .is_some_and(|value| value.to_lowercase() == *wanted)
            })
        })
        .map(|student| (student, vaccinated.contains(&student.id)))
        .filter(|(_, is_vaccinated)| {
            filter
                .vaccinated
                .map_or(true, |wanted| wanted == *is_vaccinated)
        })
        .map(|(student, is_vaccinated)| StudentView {
            id: student.id,
            name: student.name.clone(),
            student_class: student.student_class.clone(),
            student_id: student.student_id.clone(),
            vaccinated: is_vaccinated,
            dob: student.dob,
            gender: student.gender.clone(),
            guardian_name: student.guardian_name.clone(),
            contact_number: student.contact_number.clone(),
            address: student.address.clone(),
        })
        .collect()
}

fn lowered(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_lowercase)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub student_name: String,
    #[serde(rename = "class")]
    pub student_class: String,
    pub vaccine_name: String,
    pub date_vaccinated: NaiveDate,
}

/// Joined vaccination rows in record order, optionally narrowed to vaccines whose name contains
/// `vaccine_filter` (case-insensitive).
pub fn report_rows(snapshot: &StoreSnapshot, vaccine_filter: Option<&str>) -> Vec<ReportRow> {
    let needle = vaccine_filter
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_lowercase);

    snapshot
        .records
        .iter()
        .filter_map(|record| {
            let student = snapshot.student(record.student)?;
            let drive = snapshot.drive(record.drive)?;
            Some((record, student, drive))
        })
        .filter(|(_, _, drive)| {
            needle
                .as_ref()
                .map_or(true, |needle| drive.vaccine_name.to_lowercase().contains(needle))
        })
        .map(|(record, student, drive)| ReportRow {
            student_name: student.name.clone(),
            student_class: student.student_class.clone(),
            vaccine_name: drive.vaccine_name.clone(),
            date_vaccinated: record.date_vaccinated,
        })
        .collect()
}

/// One-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: usize,
    limit: usize,
}

impl Pagination {
    pub const DEFAULT_LIMIT: usize = 10;

    pub fn new(page: usize, limit: usize) -> Result<Self, String> {
        if page == 0 {
            return Err("page must be at least 1".to_string());
        }
        if limit == 0 {
            return Err("limit must be at least 1".to_string());
        }
        Ok(Self { page, limit })
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportPage {
    pub records: Vec<ReportRow>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

/// Pages past the end come back empty with the real totals.
pub fn report_page(rows: Vec<ReportRow>, pagination: Pagination) -> ReportPage {
    let total_items = rows.len();
    let total_pages = total_items.div_ceil(pagination.limit);
    let records = rows
        .into_iter()
        .skip((pagination.page - 1).saturating_mul(pagination.limit))
        .take(pagination.limit)
        .collect();

    ReportPage {
        records,
        page: pagination.page,
        total_pages,
        total_items,
    }
}

/// Writes the rows as CSV with the fixed export header.
pub fn write_export<W: Write>(rows: &[ReportRow], writer: W) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(EXPORT_HEADER)?;
    for row in rows {
        let date = row.date_vaccinated.format("%Y-%m-%d").to_string();
        csv_writer.write_record([
            row.student_name.as_str(),
            row.student_class.as_str(),
            row.vaccine_name.as_str(),
            date.as_str(),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Distinct vaccine names across all drives, sorted.
pub fn vaccine_names(snapshot: &StoreSnapshot) -> Vec<String> {
    snapshot
        .drives
        .iter()
        .map(|drive| drive.vaccine_name.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
