use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use axum::response::IntoResponse;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use super::common::*;
use crate::clock::FixedClock;
use crate::vaccination::router;
use crate::vaccination::{SchedulingPolicy, VaccinationService};

fn drive_payload(vaccine: &str, days_out: i64) -> Value {
    json!({
        "vaccine_name": vaccine,
        "date": days_from_today(days_out),
        "available_doses": 40,
        "applicable_classes": ["5A", "5B"],
    })
}

#[tokio::test]
async fn create_drive_returns_created_then_rejects_same_date() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .clone()
        .oneshot(json_request("POST", "/drives", &drive_payload("MMR", 20)))
        .await
        .expect("router response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["message"], "Drive created.");
    assert_eq!(body["id"], 1);

    let response = router
        .oneshot(json_request("POST", "/drives", &drive_payload("Polio", 20)))
        .await
        .expect("router response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json_body(response).await;
    assert!(body["error"]
        .as_str()
        .expect("error message")
        .contains("already scheduled"));
}

#[tokio::test]
async fn create_drive_inside_lead_time_is_bad_request() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(json_request("POST", "/drives", &drive_payload("MMR", 15)))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn editing_past_drive_is_forbidden() {
    let (service, _, clock, _, drives) = seeded_service();
    let router = router_with_service(service);
    clock.advance_days(21);

    let uri = format!("/drives/{}", drives[0].id);
    let payload = json!({
        "date": days_from_today(60),
        "available_doses": 10,
        "applicable_classes": ["5A"],
    });
    let response = router
        .oneshot(json_request("PUT", &uri, &payload))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn upcoming_drives_lists_future_and_today() {
    let (service, _, clock, _, _) = seeded_service();
    let router = router_with_service(service);
    clock.advance_days(30);

    let response = router
        .oneshot(empty_request("GET", "/drives/upcoming"))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    let drives = body.as_array().expect("drive list");
    assert_eq!(drives.len(), 1);
    assert_eq!(drives[0]["vaccine_name"], "Polio");
}

#[tokio::test]
async fn duplicate_student_identifier_is_bad_request() {
    let (service, _, _, _, _) = seeded_service();
    let router = router_with_service(service);

    let payload = json!({ "name": "Another Asha", "student_id": "S1", "student_class": "5A" });
    let response = router
        .oneshot(json_request("POST", "/students", &payload))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn vaccinating_against_unknown_drive_is_not_found() {
    let (service, _, _, students, _) = seeded_service();
    let router = router_with_service(service);

    let uri = format!("/students/{}/vaccinate", students[2].id);
    let response = router
        .oneshot(json_request("POST", &uri, &json!({ "drive_id": 99 })))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn second_vaccination_in_same_drive_is_bad_request() {
    let (service, _, _, students, drives) = seeded_service();
    let router = router_with_service(service);

    let uri = format!("/students/{}/vaccinate", students[0].id);
    let response = router
        .oneshot(json_request("POST", &uri, &json!({ "drive_id": drives[0].id })))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn vaccinated_query_filters_students() {
    let (service, _, _, _, drives) = seeded_service();
    let router = router_with_service(service);

    let response = router
        .clone()
        .oneshot(empty_request("GET", "/students?vaccinated=false"))
        .await
        .expect("router response");
    let body = read_json_body(response).await;
    let students = body.as_array().expect("student list");
    assert_eq!(students.len(), 1);
    assert_eq!(students[0]["student_id"], "S3");
    assert_eq!(students[0]["class"], "6A");

    let uri = format!("/students?vaccinated=true&drive_id={}&studentClass=5", drives[0].id);
    let response = router
        .oneshot(empty_request("GET", &uri))
        .await
        .expect("router response");
    let body = read_json_body(response).await;
    assert_eq!(body.as_array().expect("student list").len(), 2);
}

#[tokio::test]
async fn non_numeric_drive_filter_is_bad_request() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(empty_request("GET", "/students?drive_id=abc"))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_reports_offending_row() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let roster = "name,student_id,student_class,dob\n\
                  Asha Rao,S1,5A,2015-04-02\n\
                  Ben Okafor,S2,5B,not-a-date\n";
    let request = Request::builder()
        .method("POST")
        .uri("/students/upload")
        .header(header::CONTENT_TYPE, "text/csv")
        .body(Body::from(roster))
        .expect("valid request");
    let response = router.clone().oneshot(request).await.expect("router response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json_body(response).await;
    assert!(body["error"].as_str().expect("error message").contains("row 2"));

    let response = router
        .oneshot(empty_request("GET", "/students"))
        .await
        .expect("router response");
    let body = read_json_body(response).await;
    assert!(body.as_array().expect("student list").is_empty());
}

#[tokio::test]
async fn empty_upload_is_bad_request() {
    let (service, _, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(empty_request("POST", "/students/upload"))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_student_removes_their_records() {
    let (service, _, _, students, _) = seeded_service();
    let router = router_with_service(service);

    let uri = format!("/students/{}", students[0].id);
    let response = router
        .clone()
        .oneshot(empty_request("DELETE", &uri))
        .await
        .expect("router response");
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(empty_request("GET", "/reports"))
        .await
        .expect("router response");
    let body = read_json_body(response).await;
    assert_eq!(body["total_items"], 1);
    assert_eq!(body["records"][0]["student_name"], "Ben Okafor");
}

#[tokio::test]
async fn report_rejects_zero_limit() {
    let (service, _, _, _, _) = seeded_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(empty_request("GET", "/reports?limit=0"))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn report_paginates() {
    let (service, _, _, _, _) = seeded_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(empty_request("GET", "/reports?page=2&limit=2"))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["page"], 2);
    assert_eq!(body["total_pages"], 2);
    assert_eq!(body["records"].as_array().expect("records").len(), 1);
}

#[tokio::test]
async fn export_is_served_as_csv_attachment() {
    let (service, _, _, _, _) = seeded_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(empty_request("GET", "/reports/export?vaccine_name=polio"))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"vaccination_report.csv\""
    );
    let body = String::from_utf8(read_body(response).await).expect("utf8 body");
    let lines: Vec<_> = body.lines().collect();
    assert_eq!(lines[0], "Student Name,Class,Vaccine Name,Date Vaccinated");
    assert_eq!(lines.len(), 2);
}

#[tokio::test]
async fn overview_reports_dashboard_counts() {
    let (service, _, _, _, _) = seeded_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(empty_request("GET", "/dashboard/overview"))
        .await
        .expect("router response");

    let body = read_json_body(response).await;
    assert_eq!(body["total_students"], 3);
    assert_eq!(body["vaccinated_students"], 2);
    assert_eq!(body["upcoming_drives"].as_array().expect("drives").len(), 2);
}

#[tokio::test]
async fn handlers_map_storage_failures_to_internal_error() {
    let service = Arc::new(VaccinationService::new(
        Arc::new(UnavailableRepository),
        Arc::new(FixedClock::new(today())),
        SchedulingPolicy::default(),
    ));

    let response = router::overview_handler::<UnavailableRepository>(State(service.clone()))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let response = router::create_drive_handler::<UnavailableRepository>(
        State(service),
        axum::Json(drive_request("MMR", 20, &["5A"])),
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
