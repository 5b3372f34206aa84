use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use chrono::{Duration, NaiveDate};
use serde_json::Value;

use crate::clock::FixedClock;
use crate::vaccination::domain::{
    Drive, DriveId, DriveUpdate, NewDrive, NewStudent, NewVaccination, Student, StudentId,
    StudentPatch, VaccinationRecord,
};
use crate::vaccination::repository::{RepositoryError, StoreSnapshot, VaccinationRepository};
use crate::vaccination::{vaccination_router, SchedulingPolicy, SnapshotStore, VaccinationService};

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date")
}

pub(super) fn days_from_today(days: i64) -> NaiveDate {
    today() + Duration::days(days)
}

pub(super) type TestService = VaccinationService<SnapshotStore>;

pub(super) fn build_service() -> (TestService, Arc<SnapshotStore>, Arc<FixedClock>) {
    let store = Arc::new(SnapshotStore::in_memory());
    let clock = Arc::new(FixedClock::new(today()));
    let service =
        VaccinationService::new(store.clone(), clock.clone(), SchedulingPolicy::default());
    (service, store, clock)
}

pub(super) fn drive_request(vaccine: &str, days_out: i64, classes: &[&str]) -> NewDrive {
    NewDrive {
        vaccine_name: vaccine.to_string(),
        date: days_from_today(days_out),
        available_doses: 100,
        applicable_classes: classes.iter().map(|class| class.to_string()).collect(),
    }
}

pub(super) fn drive_update(date: NaiveDate, doses: u32) -> DriveUpdate {
    DriveUpdate {
        date,
        available_doses: doses,
        applicable_classes: vec!["5A".to_string()],
    }
}

pub(super) fn student(name: &str, student_id: &str, class: &str) -> NewStudent {
    NewStudent::new(name, student_id, class)
}

/// Service seeded with three students and two drives, `S1` vaccinated in both and `S2` in the
/// first one.
pub(super) type SeededService = (
    TestService,
    Arc<SnapshotStore>,
    Arc<FixedClock>,
    Vec<Student>,
    Vec<Drive>,
);

pub(super) fn seeded_service() -> SeededService {
    let (service, store, clock) = build_service();
    let students = vec![
        service.add_student(student("Asha Rao", "S1", "5A")).expect("add S1"),
        service.add_student(student("Ben Okafor", "S2", "5B")).expect("add S2"),
        service.add_student(student("Chen Li", "S3", "6A")).expect("add S3"),
    ];
    let drives = vec![
        service.create_drive(drive_request("MMR", 20, &["5A", "5B"])).expect("MMR drive"),
        service.create_drive(drive_request("Polio", 30, &["6A"])).expect("Polio drive"),
    ];
    service
        .vaccinate(students[0].id, drives[0].id, None)
        .expect("S1 MMR");
    service
        .vaccinate(students[0].id, drives[1].id, None)
        .expect("S1 Polio");
    service
        .vaccinate(students[1].id, drives[0].id, None)
        .expect("S2 MMR");
    (service, store, clock, students, drives)
}

pub(super) struct UnavailableRepository;

impl UnavailableRepository {
    fn offline<T>() -> Result<T, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

impl VaccinationRepository for UnavailableRepository {
    fn insert_student(&self, _student: NewStudent) -> Result<Student, RepositoryError> {
        Self::offline()
    }

    fn insert_students(&self, _batch: Vec<NewStudent>) -> Result<Vec<Student>, RepositoryError> {
        Self::offline()
    }

    fn update_student(
        &self,
        _id: StudentId,
        _patch: StudentPatch,
    ) -> Result<Student, RepositoryError> {
        Self::offline()
    }

    fn delete_student(&self, _id: StudentId) -> Result<usize, RepositoryError> {
        Self::offline()
    }

    fn student(&self, _id: StudentId) -> Result<Option<Student>, RepositoryError> {
        Self::offline()
    }

    fn insert_drive(&self, _drive: NewDrive) -> Result<Drive, RepositoryError> {
        Self::offline()
    }

    fn update_drive(
        &self,
        _id: DriveId,
        _update: DriveUpdate,
        _not_before: NaiveDate,
    ) -> Result<Drive, RepositoryError> {
        Self::offline()
    }

    fn drive(&self, _id: DriveId) -> Result<Option<Drive>, RepositoryError> {
        Self::offline()
    }

    fn insert_record(
        &self,
        _record: NewVaccination,
    ) -> Result<VaccinationRecord, RepositoryError> {
        Self::offline()
    }

    fn snapshot(&self) -> Result<StoreSnapshot, RepositoryError> {
        Self::offline()
    }
}

pub(super) fn router_with_service(service: TestService) -> axum::Router {
    vaccination_router(Arc::new(service))
}

pub(super) fn json_request(method: &str, uri: &str, payload: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(payload).expect("serializable payload")))
        .expect("valid request")
}

pub(super) fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("valid request")
}

pub(super) async fn read_body(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body")
        .to_vec()
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = read_body(response).await;
    serde_json::from_slice(&body).expect("json payload")
}
