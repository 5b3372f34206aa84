use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use vaxtrack::clock::{Clock, FixedClock, SystemClock};
use vaxtrack::config::{AdminConfig, AppConfig, StorageConfig};
use vaxtrack::error::AppError;
use vaxtrack::vaccination::{RepositoryError, SnapshotStore, VaccinationService};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) admin: Arc<AdminConfig>,
}

pub(crate) type Service = VaccinationService<SnapshotStore>;

pub(crate) fn open_store(storage: &StorageConfig) -> Result<SnapshotStore, RepositoryError> {
    match &storage.data_path {
        Some(path) => SnapshotStore::open(path),
        None => Ok(SnapshotStore::in_memory()),
    }
}

/// Builds the service over the configured store. `today` pins the calendar for offline reports.
pub(crate) fn build_service(
    config: &AppConfig,
    today: Option<NaiveDate>,
) -> Result<Service, AppError> {
    let store = open_store(&config.storage)?;
    let clock: Arc<dyn Clock> = match today {
        Some(date) => Arc::new(FixedClock::new(date)),
        None => Arc::new(SystemClock),
    };
    Ok(VaccinationService::new(
        Arc::new(store),
        clock,
        config.scheduling.policy(),
    ))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parse_date_trims_and_reports_bad_input() {
        assert_eq!(
            parse_date(" 2025-06-02 "),
            Ok(NaiveDate::from_ymd_opt(2025, 6, 2).expect("valid date"))
        );
        let err = parse_date("06/02/2025").expect_err("slash dates rejected");
        assert!(err.contains("06/02/2025"));
    }

    #[test]
    fn open_store_uses_file_when_configured() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("snapshot.json");

        let store = open_store(&StorageConfig {
            data_path: Some(path.clone()),
        })
        .expect("open store");
        assert_eq!(store.path(), Some(path.as_path()));

        let memory = open_store(&StorageConfig { data_path: None }).expect("memory store");
        assert!(memory.path().is_none());
    }
}
