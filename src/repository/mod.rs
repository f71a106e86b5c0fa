// ==========================================
// 发酵批次风险排序系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod batch_repo;
pub mod error;
pub mod history_repo;

// 重导出核心仓储
pub use batch_repo::BatchRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use history_repo::HistoryRepository;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema};
    use crate::domain::batch::{Batch, Measurement};
    use crate::domain::types::{BatchStatus, SensoryFlag};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rusqlite::Connection;
    use std::sync::{Arc, Mutex};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()
    }

    fn setup() -> (BatchRepository, HistoryRepository, Arc<Mutex<Connection>>) {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        let conn = Arc::new(Mutex::new(conn));
        (
            BatchRepository::from_connection(conn.clone()),
            HistoryRepository::from_connection(conn.clone()),
            conn,
        )
    }

    fn sample_batch(id: &str, started_at: DateTime<Utc>) -> Batch {
        Batch::new(id.to_string(), "STG 01".to_string(), "01".to_string(), started_at)
    }

    #[test]
    fn test_insert_and_find_roundtrip() {
        let (repo, _, _) = setup();
        repo.insert(&sample_batch("STG01_08:00", t0())).unwrap();

        let found = repo.find_by_id("STG01_08:00").unwrap().unwrap();
        assert_eq!(found.started_at, t0());
        assert_eq!(found.status, BatchStatus::Active);
        assert!(found.measurements.is_empty());
        assert!(repo.find_by_id("missing").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_id_is_unique_violation() {
        let (repo, _, _) = setup();
        repo.insert(&sample_batch("STG01_08:00", t0())).unwrap();
        let err = repo.insert(&sample_batch("STG01_08:00", t0())).unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));
    }

    #[test]
    fn test_append_measurement_returns_updated_batch_in_time_order() {
        let (repo, _, _) = setup();
        repo.insert(&sample_batch("STG01_08:00", t0())).unwrap();

        repo.append_measurement(
            "STG01_08:00",
            &Measurement::new(6.30, SensoryFlag::Normal, t0() + Duration::hours(1)),
        )
        .unwrap();
        let batch = repo
            .append_measurement(
                "STG01_08:00",
                &Measurement::new(6.10, SensoryFlag::Abnormal, t0() + Duration::hours(2)),
            )
            .unwrap();

        assert_eq!(batch.measurements.len(), 2);
        assert_eq!(batch.measurements[1].ph, 6.10);
        assert_eq!(batch.measurements[1].sensory_flag, SensoryFlag::Abnormal);
    }

    #[test]
    fn test_append_to_unknown_batch_is_not_found() {
        let (repo, _, _) = setup();
        let err = repo
            .append_measurement("nope", &Measurement::new(6.2, SensoryFlag::Normal, t0()))
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[test]
    fn test_confirm_archives_and_freezes_batch() {
        let (repo, history, _) = setup();
        repo.insert(&sample_batch("STG01_08:00", t0())).unwrap();

        let record = repo
            .confirm("STG01_08:00", 0.622, t0() + Duration::hours(4))
            .unwrap();
        assert_eq!(record.final_score, 0.622);

        let batch = repo.find_by_id("STG01_08:00").unwrap().unwrap();
        assert_eq!(batch.status, BatchStatus::Confirmed);
        assert_eq!(batch.final_score, Some(0.622));
        assert_eq!(batch.confirmed_at, Some(t0() + Duration::hours(4)));

        assert!(repo.list_active().unwrap().is_empty());
        assert_eq!(history.list().unwrap().len(), 1);

        // 已确认批次不可再追加 / 再确认
        let err = repo
            .append_measurement("STG01_08:00", &Measurement::new(6.2, SensoryFlag::Normal, t0()))
            .unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidStateTransition { .. }));
        let err = repo.confirm("STG01_08:00", 0.5, t0()).unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidStateTransition { .. }));
    }

    #[test]
    fn test_delete_cascades_measurements() {
        let (repo, _, conn) = setup();
        repo.insert(&sample_batch("STG01_08:00", t0())).unwrap();
        repo.append_measurement("STG01_08:00", &Measurement::new(6.2, SensoryFlag::Normal, t0()))
            .unwrap();

        repo.delete("STG01_08:00").unwrap();

        let remaining: i64 = conn
            .lock()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM batch_measurement", [], |row| row.get(0))
            .unwrap();
        assert_eq!(remaining, 0);
        assert!(matches!(
            repo.delete("STG01_08:00").unwrap_err(),
            RepositoryError::NotFound { .. }
        ));
    }

    #[test]
    fn test_list_active_orders_by_started_at_desc_with_measurements() {
        let (repo, _, _) = setup();
        repo.insert(&sample_batch("STG01_08:00", t0())).unwrap();
        repo.insert(&sample_batch("STG02_09:00", t0() + Duration::hours(1))).unwrap();
        repo.append_measurement("STG01_08:00", &Measurement::new(6.2, SensoryFlag::Normal, t0()))
            .unwrap();

        let active = repo.list_active().unwrap();
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].id, "STG02_09:00");
        assert!(active[0].measurements.is_empty());
        assert_eq!(active[1].measurements.len(), 1);
        assert_eq!(repo.count_active().unwrap(), 2);
    }

    #[test]
    fn test_history_clear_returns_count() {
        let (repo, history, _) = setup();
        repo.insert(&sample_batch("STG01_08:00", t0())).unwrap();
        repo.insert(&sample_batch("STG02_08:00", t0())).unwrap();
        repo.confirm("STG01_08:00", 0.4, t0()).unwrap();
        repo.confirm("STG02_08:00", 999.0, t0()).unwrap();

        assert_eq!(history.clear().unwrap(), 2);
        assert!(history.list().unwrap().is_empty());
        assert_eq!(history.clear().unwrap(), 0);
    }
}
