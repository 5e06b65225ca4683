//! Shard Expander (C6): expands one `TableSchema` + tenant into the list of
//! physical table names to reconcile. Deterministic given its inputs; the
//! only I/O is a read of store-directory metadata via C1's pool.

use chrono::{Datelike, NaiveDate};
use sqlx::{MySqlPool, Row};

use crate::error::EngineResult;
use crate::model::{PartitionType, StoreDirectoryConfig, TableSchema, TimeInterval};

/// An explicit window the orchestrator supplies for `partition_type = time`
/// expansion; defaults to covering "current" and "next" per `time_interval`.
#[derive(Debug, Clone, Copy)]
pub struct TimeWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl TimeWindow {
    /// Default window: the current and next period for the given interval,
    /// anchored at `today`.
    pub fn default_for(interval: TimeInterval, today: NaiveDate) -> Self {
        let to = match interval {
            TimeInterval::Day => today + chrono::Duration::days(1),
            TimeInterval::Month => add_months(today, 1),
            TimeInterval::Year => NaiveDate::from_ymd_opt(today.year() + 1, today.month(), 1).unwrap_or(today),
        };
        Self { from: today, to }
    }
}

fn add_months(date: NaiveDate, months: i32) -> NaiveDate {
    let total = date.year() * 12 + (date.month() as i32 - 1) + months;
    let year = total.div_euclid(12);
    let month = (total.rem_euclid(12)) as u32 + 1;
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(date)
}

pub struct ShardExpander;

impl ShardExpander {
    pub async fn expand(
        schema: &TableSchema,
        tenant_main_pool: &MySqlPool,
        store_directory: Option<&StoreDirectoryConfig>,
        time_window: Option<TimeWindow>,
        explicit_store_id: Option<&str>,
    ) -> EngineResult<Vec<String>> {
        match schema.partition_type {
            PartitionType::None => Ok(vec![schema.table_name.clone()]),
            PartitionType::Store => {
                let store_ids = Self::active_store_ids(tenant_main_pool, store_directory).await?;
                let store_ids: Vec<String> = match explicit_store_id {
                    Some(id) => vec![id.to_string()],
                    None => store_ids,
                };
                Ok(store_ids.into_iter().map(|id| format!("{}_{}", schema.table_name, id)).collect())
            }
            PartitionType::Time => {
                let interval = schema.time_interval.unwrap_or(TimeInterval::Day);
                let format = schema.effective_time_format().unwrap_or(interval.default_format()).to_string();
                let window = time_window.unwrap_or_else(|| TimeWindow::default_for(interval, today()));
                Ok(Self::time_shard_names(&schema.table_name, &format, interval, window))
            }
        }
    }

    async fn active_store_ids(
        pool: &MySqlPool,
        store_directory: Option<&StoreDirectoryConfig>,
    ) -> EngineResult<Vec<String>> {
        let config = match store_directory {
            Some(c) => c,
            None => return Ok(Vec::new()),
        };

        let query = format!(
            "SELECT {} FROM {} WHERE {} = ?",
            config.store_id_column, config.store_table_name, config.active_predicate.column
        );
        let rows = sqlx::query(&query).bind(&config.active_predicate.equals).fetch_all(pool).await?;

        rows.into_iter()
            .map(|row| -> EngineResult<String> { Ok(row.try_get::<String, _>(0).or_else(|_| row.try_get::<i64, _>(0).map(|v| v.to_string()))?) })
            .collect()
    }

    /// Generate shard-name suffixes between `window.from` and `window.to`
    /// (inclusive of `from`, exclusive of `to`), substituting `YYYY`/`MM`/`DD`
    /// tokens in `format`.
    fn time_shard_names(table_name: &str, format: &str, interval: TimeInterval, window: TimeWindow) -> Vec<String> {
        let mut names = Vec::new();
        let mut cursor = window.from;
        while cursor < window.to {
            let suffix = format
                .replace("YYYY", &format!("{:04}", cursor.year()))
                .replace("MM", &format!("{:02}", cursor.month()))
                .replace("DD", &format!("{:02}", cursor.day()));
            names.push(format!("{}{}", table_name, suffix));

            cursor = match interval {
                TimeInterval::Day => cursor + chrono::Duration::days(1),
                TimeInterval::Month => add_months(cursor, 1),
                TimeInterval::Year => NaiveDate::from_ymd_opt(cursor.year() + 1, cursor.month(), cursor.day().min(28))
                    .unwrap_or(cursor),
            };
        }
        names
    }
}

fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_shard_names_use_default_format() {
        let window = TimeWindow {
            from: NaiveDate::from_ymd_opt(2026, 1, 30).unwrap(),
            to: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
        };
        let names = ShardExpander::time_shard_names("events", "_YYYYMMDD", TimeInterval::Day, window);
        assert_eq!(names, vec!["events_20260130", "events_20260131"]);
    }

    #[test]
    fn month_shard_names_step_by_month() {
        let window = TimeWindow {
            from: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            to: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        };
        let names = ShardExpander::time_shard_names("orders", "_YYYYMM", TimeInterval::Month, window);
        assert_eq!(names, vec!["orders_202601", "orders_202602"]);
    }

    #[test]
    fn custom_time_format_tokens_substitute() {
        let window = TimeWindow {
            from: NaiveDate::from_ymd_opt(2026, 7, 27).unwrap(),
            to: NaiveDate::from_ymd_opt(2026, 7, 28).unwrap(),
        };
        let names = ShardExpander::time_shard_names("log", "_YYYY_MM_DD", TimeInterval::Day, window);
        assert_eq!(names, vec!["log_2026_07_27"]);
    }
}
