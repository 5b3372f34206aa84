use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use super::domain::{DriveId, DriveUpdate, NewDrive, NewStudent, StudentId, StudentPatch};
use super::error::VaccinationError;
use super::reports::{Pagination, StudentFilter, EXPORT_FILE_NAME};
use super::repository::VaccinationRepository;
use super::service::VaccinationService;

type SharedService<R> = State<Arc<VaccinationService<R>>>;

/// Router builder exposing drive, student, dashboard, and report endpoints.
pub fn vaccination_router<R>(service: Arc<VaccinationService<R>>) -> Router
where
    R: VaccinationRepository + 'static,
{
    Router::new()
        .route("/drives", post(create_drive_handler::<R>))
        .route("/drives/upcoming", get(upcoming_drives_handler::<R>))
        .route("/drives/:drive_id", put(edit_drive_handler::<R>))
        .route(
            "/students",
            get(search_students_handler::<R>).post(add_student_handler::<R>),
        )
        .route("/students/upload", post(upload_students_handler::<R>))
        .route(
            "/students/:student_id",
            put(update_student_handler::<R>).delete(delete_student_handler::<R>),
        )
        .route(
            "/students/:student_id/vaccinate",
            post(vaccinate_handler::<R>),
        )
        .route("/dashboard/overview", get(overview_handler::<R>))
        .route("/reports", get(report_handler::<R>))
        .route("/reports/export", get(export_handler::<R>))
        .route("/vaccines", get(vaccine_names_handler::<R>))
        .with_state(service)
}

pub(crate) async fn create_drive_handler<R>(
    State(service): SharedService<R>,
    Json(request): Json<NewDrive>,
) -> Result<Response, VaccinationError>
where
    R: VaccinationRepository + 'static,
{
    let drive = service.create_drive(request)?;
    let payload = json!({ "message": "Drive created.", "id": drive.id });
    Ok((StatusCode::CREATED, Json(payload)).into_response())
}

pub(crate) async fn upcoming_drives_handler<R>(
    State(service): SharedService<R>,
) -> Result<Response, VaccinationError>
where
    R: VaccinationRepository + 'static,
{
    let drives = service.upcoming_drives()?;
    Ok(Json(drives).into_response())
}

pub(crate) async fn edit_drive_handler<R>(
    State(service): SharedService<R>,
    Path(drive_id): Path<u64>,
    Json(update): Json<DriveUpdate>,
) -> Result<Response, VaccinationError>
where
    R: VaccinationRepository + 'static,
{
    service.edit_drive(DriveId(drive_id), update)?;
    let payload = json!({ "message": "Drive updated successfully." });
    Ok(Json(payload).into_response())
}

pub(crate) async fn add_student_handler<R>(
    State(service): SharedService<R>,
    Json(student): Json<NewStudent>,
) -> Result<Response, VaccinationError>
where
    R: VaccinationRepository + 'static,
{
    let student = service.add_student(student)?;
    let payload = json!({ "message": "Student added successfully.", "id": student.id });
    Ok((StatusCode::CREATED, Json(payload)).into_response())
}

/// Accepts the roster as the raw request body (`text/csv`).
pub(crate) async fn upload_students_handler<R>(
    State(service): SharedService<R>,
    body: Bytes,
) -> Result<Response, VaccinationError>
where
    R: VaccinationRepository + 'static,
{
    if body.is_empty() {
        return Err(VaccinationError::Validation("no roster file supplied".to_string()));
    }
    let stored = service.import_roster(body.as_ref())?;
    let payload = json!({
        "message": "Students uploaded successfully",
        "imported": stored.len(),
    });
    Ok(Json(payload).into_response())
}

/// Raw query parameters; blank values are treated as absent.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct StudentSearchQuery {
    name: Option<String>,
    #[serde(rename = "studentClass", alias = "student_class")]
    student_class: Option<String>,
    gender: Option<String>,
    vaccinated: Option<String>,
    drive_id: Option<String>,
}

impl StudentSearchQuery {
    fn into_filter(self) -> Result<StudentFilter, VaccinationError> {
        let drive = match non_blank(self.drive_id) {
            Some(raw) => Some(DriveId(raw.parse::<u64>().map_err(|_| {
                VaccinationError::Validation(format!("drive_id '{raw}' is not a number"))
            })?)),
            None => None,
        };
        let vaccinated = match non_blank(self.vaccinated).as_deref() {
            Some("true") => Some(true),
            Some("false") => Some(false),
            _ => None,
        };

        Ok(StudentFilter {
            name: non_blank(self.name),
            student_class: non_blank(self.student_class),
            gender: non_blank(self.gender),
            vaccinated,
            drive,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub(crate) async fn search_students_handler<R>(
    State(service): SharedService<R>,
    Query(query): Query<StudentSearchQuery>,
) -> Result<Response, VaccinationError>
where
    R: VaccinationRepository + 'static,
{
    let filter = query.into_filter()?;
    let students = service.search_students(&filter)?;
    Ok(Json(students).into_response())
}

pub(crate) async fn update_student_handler<R>(
    State(service): SharedService<R>,
    Path(student_id): Path<u64>,
    Json(patch): Json<StudentPatch>,
) -> Result<Response, VaccinationError>
where
    R: VaccinationRepository + 'static,
{
    service.update_student(StudentId(student_id), patch)?;
    let payload = json!({ "message": "Student updated successfully" });
    Ok(Json(payload).into_response())
}

pub(crate) async fn delete_student_handler<R>(
    State(service): SharedService<R>,
    Path(student_id): Path<u64>,
) -> Result<Response, VaccinationError>
where
    R: VaccinationRepository + 'static,
{
    service.delete_student(StudentId(student_id))?;
    let payload = json!({ "message": "Student deleted successfully" });
    Ok(Json(payload).into_response())
}

#[derive(Debug, Deserialize)]
pub(crate) struct VaccinateRequest {
    drive_id: DriveId,
    #[serde(default)]
    date: Option<NaiveDate>,
}

pub(crate) async fn vaccinate_handler<R>(
    State(service): SharedService<R>,
    Path(student_id): Path<u64>,
    Json(request): Json<VaccinateRequest>,
) -> Result<Response, VaccinationError>
where
    R: VaccinationRepository + 'static,
{
    let record = service.vaccinate(StudentId(student_id), request.drive_id, request.date)?;
    let payload = json!({ "message": "Student vaccinated successfully.", "id": record.id });
    Ok(Json(payload).into_response())
}

pub(crate) async fn overview_handler<R>(
    State(service): SharedService<R>,
) -> Result<Response, VaccinationError>
where
    R: VaccinationRepository + 'static,
{
    let overview = service.overview()?;
    Ok(Json(overview).into_response())
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ReportQuery {
    vaccine_name: Option<String>,
    page: Option<usize>,
    limit: Option<usize>,
}

pub(crate) async fn report_handler<R>(
    State(service): SharedService<R>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, VaccinationError>
where
    R: VaccinationRepository + 'static,
{
    let pagination = Pagination::new(
        query.page.unwrap_or(1),
        query.limit.unwrap_or(Pagination::DEFAULT_LIMIT),
    )
    .map_err(VaccinationError::Validation)?;
    let page = service.report(query.vaccine_name.as_deref(), pagination)?;
    Ok(Json(page).into_response())
}

pub(crate) async fn export_handler<R>(
    State(service): SharedService<R>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, VaccinationError>
where
    R: VaccinationRepository + 'static,
{
    let csv = service.export_report(query.vaccine_name.as_deref())?;
    let disposition = format!("attachment; filename=\"{EXPORT_FILE_NAME}\"");
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

pub(crate) async fn vaccine_names_handler<R>(
    State(service): SharedService<R>,
) -> Result<Response, VaccinationError>
where
    R: VaccinationRepository + 'static,
{
    let names = service.vaccine_names()?;
    Ok(Json(names).into_response())
}
