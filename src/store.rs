//! Analytical store handle backed by DuckDB

use crate::config::ViewerConfig;
use crate::error::{Result, ViewerError};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime};
use duckdb::types::{TimeUnit, Value as DuckValue};
use duckdb::{AccessMode, Config, Connection};
use indexmap::IndexMap;
use serde_json::{json, Map, Number, Value};
use std::sync::{Arc, Mutex};

/// One result row, field access by column label in select order
pub type Row = IndexMap<String, Value>;

/// Minimal contract of the embedded query engine: run a query, get rows.
#[async_trait]
pub trait AnalyticalStore: Send + Sync {
    /// Run a SQL query and return all rows
    async fn query(&self, sql: &str) -> Result<Vec<Row>>;

    /// Catalog introspection: names of all tables starting with `prefix`
    async fn list_tables(&self, prefix: &str) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT table_name FROM information_schema.tables WHERE table_name LIKE {}",
            quote_literal(&format!("{}%", prefix))
        );
        let rows = self.query(&sql).await?;

        // LIKE treats '_' as a wildcard, keep only exact prefix matches
        Ok(rows
            .iter()
            .filter_map(|row| row.get("table_name").and_then(Value::as_str))
            .filter(|name| name.starts_with(prefix))
            .map(str::to_string)
            .collect())
    }
}

/// DuckDB database shared by every query of the process.
///
/// Each query runs on its own clone of the root connection.
pub struct DuckDbStore {
    connection: Arc<Mutex<Connection>>,
    label: String,
}

impl DuckDbStore {
    /// Open the report database described by `config`
    pub fn open(config: &ViewerConfig) -> Result<Self> {
        config.validate()?;

        let access_mode = if config.read_only {
            AccessMode::ReadOnly
        } else {
            AccessMode::ReadWrite
        };
        let duckdb_config = Config::default().access_mode(access_mode)?;

        let connection = Connection::open_with_flags(config.db_path(), duckdb_config)
            .map_err(|e| {
                ViewerError::load(format!(
                    "Failed to open report database '{}': {}",
                    config.db_path().display(),
                    e
                ))
            })?;

        for setting in config.session_settings() {
            connection.execute_batch(&setting)?;
        }

        log::info!("Opened report database: {}", config.db_path().display());

        Ok(Self::from_connection(
            connection,
            config.db_path().display().to_string(),
        ))
    }

    pub fn open_in_memory() -> Result<Self> {
        let connection = Connection::open_in_memory()?;
        Ok(Self::from_connection(connection, ":memory:".to_string()))
    }

    pub fn from_connection(connection: Connection, label: String) -> Self {
        Self {
            connection: Arc::new(Mutex::new(connection)),
            label,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// A fresh connection to the same database, for one blocking query
    fn connection(&self) -> Result<Connection> {
        Ok(lock(&self.connection)?.try_clone()?)
    }

    /// Execute one or more statements that return no rows
    pub async fn execute_batch(&self, sql: &str) -> Result<()> {
        let connection = self.connection()?;
        let sql = sql.to_string();

        tokio::task::spawn_blocking(move || {
            connection.execute_batch(&sql)?;
            Ok(())
        })
        .await?
    }

    fn query_blocking(connection: &Connection, sql: &str) -> Result<Vec<Row>> {
        let mut stmt = connection.prepare(sql)?;
        let mut rows = stmt.query([])?;

        let column_names: Vec<String> = rows
            .as_ref()
            .map(|stmt| stmt.column_names())
            .unwrap_or_default();

        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Row::with_capacity(column_names.len());
            for (i, name) in column_names.iter().enumerate() {
                let value: DuckValue = row.get(i)?;
                record.insert(name.clone(), duck_value_to_json(&value));
            }
            result.push(record);
        }

        Ok(result)
    }
}

#[async_trait]
impl AnalyticalStore for DuckDbStore {
    async fn query(&self, sql: &str) -> Result<Vec<Row>> {
        log::debug!("[{}] {}", self.label, sql);

        let connection = self.connection()?;
        let sql = sql.to_string();

        tokio::task::spawn_blocking(move || Self::query_blocking(&connection, &sql)).await?
    }
}

fn lock(connection: &Mutex<Connection>) -> Result<std::sync::MutexGuard<'_, Connection>> {
    connection
        .lock()
        .map_err(|_| ViewerError::load("DuckDB connection lock poisoned"))
}

/// Convert an owned DuckDB value into JSON
pub fn duck_value_to_json(value: &DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(b) => Value::Bool(*b),
        DuckValue::TinyInt(i) => json!(i),
        DuckValue::SmallInt(i) => json!(i),
        DuckValue::Int(i) => json!(i),
        DuckValue::BigInt(i) => json!(i),
        DuckValue::HugeInt(i) => {
            if let Ok(small) = i64::try_from(*i) {
                json!(small)
            } else if let Ok(unsigned) = u64::try_from(*i) {
                json!(unsigned)
            } else {
                Value::String(i.to_string())
            }
        }
        DuckValue::UTinyInt(i) => json!(i),
        DuckValue::USmallInt(i) => json!(i),
        DuckValue::UInt(i) => json!(i),
        DuckValue::UBigInt(i) => json!(i),
        DuckValue::Float(f) => float_to_json(f64::from(*f)),
        DuckValue::Double(f) => float_to_json(*f),
        DuckValue::Decimal(d) => Value::String(d.to_string()),
        DuckValue::Text(s) => Value::String(s.clone()),
        DuckValue::Enum(s) => Value::String(s.clone()),
        DuckValue::Blob(b) => Value::String(format!("<blob:{} bytes>", b.len())),
        DuckValue::Date32(days) => NaiveDate::from_num_days_from_ce_opt(719_163 + *days)
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
            .unwrap_or_else(|| json!(days)),
        DuckValue::Timestamp(unit, t) => DateTime::from_timestamp_micros(to_micros(*unit, *t))
            .map(|dt| Value::String(dt.to_rfc3339()))
            .unwrap_or_else(|| json!(t)),
        DuckValue::Time64(unit, t) => {
            let micros = to_micros(*unit, *t);
            let secs = micros.div_euclid(1_000_000);
            let nanos = micros.rem_euclid(1_000_000) * 1_000;
            u32::try_from(secs)
                .ok()
                .zip(u32::try_from(nanos).ok())
                .and_then(|(s, n)| NaiveTime::from_num_seconds_from_midnight_opt(s, n))
                .map(|time| Value::String(time.to_string()))
                .unwrap_or_else(|| json!(t))
        }
        DuckValue::Interval {
            months,
            days,
            nanos,
        } => json!({ "months": months, "days": days, "nanos": nanos }),
        DuckValue::List(items) | DuckValue::Array(items) => {
            Value::Array(items.iter().map(duck_value_to_json).collect())
        }
        DuckValue::Struct(fields) => {
            let mut object = Map::new();
            for (key, field) in fields.iter() {
                object.insert(key.clone(), duck_value_to_json(field));
            }
            Value::Object(object)
        }
        DuckValue::Map(entries) => Value::Array(
            entries
                .iter()
                .map(|(key, entry)| {
                    json!({ "key": duck_value_to_json(key), "value": duck_value_to_json(entry) })
                })
                .collect(),
        ),
        DuckValue::Union(inner) => duck_value_to_json(inner),
        #[allow(unreachable_patterns)]
        other => Value::String(format!("{:?}", other)),
    }
}

fn float_to_json(f: f64) -> Value {
    Number::from_f64(f)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(f.to_string()))
}

fn to_micros(unit: TimeUnit, value: i64) -> i64 {
    match unit {
        TimeUnit::Second => value.saturating_mul(1_000_000),
        TimeUnit::Millisecond => value.saturating_mul(1_000),
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}

/// Quote an identifier (table or column name) for DuckDB
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a string literal for DuckDB
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
