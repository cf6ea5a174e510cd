//! Row encoding and multi-row inserts.
//!
//! Generators never build SQL. They hand typed records to the store as
//! `TableBatch`es; this module turns those into `INSERT` statements of
//! up to `batch_size` rows each.

use super::schema::StoreName;
use crate::error::{GenError, GenResult};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{types::Value, Connection, ErrorCode};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// SQLite's bound-parameter ceiling for the bundled library.
const MAX_VARIABLES: usize = 32_766;

/// A generated row bound for one table of one store.
pub trait Record {
    const STORE: StoreName;
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];

    /// Column values, in `COLUMNS` order.
    fn values(&self) -> Vec<Value>;
}

/// All rows of one table produced by a phase attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct TableBatch {
    pub store: StoreName,
    pub table: &'static str,
    pub columns: &'static [&'static str],
    pub rows: Vec<Vec<Value>>,
}

impl TableBatch {
    pub fn of<R: Record>(records: &[R]) -> Self {
        Self {
            store: R::STORE,
            table: R::TABLE,
            columns: R::COLUMNS,
            rows: records.iter().map(Record::values).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `store.table`, the key used in run reports.
    pub fn key(&self) -> String {
        format!("{}.{}", self.store, self.table)
    }
}

// ── Value helpers ─────────────────────────────────────────────────

pub fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

pub fn opt_text(s: Option<&str>) -> Value {
    s.map_or(Value::Null, text)
}

pub fn real(x: f64) -> Value {
    Value::Real(x)
}

pub fn opt_real(x: Option<f64>) -> Value {
    x.map_or(Value::Null, Value::Real)
}

pub fn int(i: i64) -> Value {
    Value::Integer(i)
}

pub fn flag(b: bool) -> Value {
    Value::Integer(b as i64)
}

pub fn date(d: NaiveDate) -> Value {
    Value::Text(d.format(DATE_FORMAT).to_string())
}

pub fn opt_date(d: Option<NaiveDate>) -> Value {
    d.map_or(Value::Null, date)
}

pub fn timestamp(t: NaiveDateTime) -> Value {
    Value::Text(t.format(TIMESTAMP_FORMAT).to_string())
}

// ── Insert ────────────────────────────────────────────────────────

/// Insert every row of `batch` through `conn`, `batch_size` rows per
/// statement. The caller owns the surrounding transaction.
pub(crate) fn insert_rows(conn: &Connection, batch: &TableBatch, batch_size: usize) -> GenResult<usize> {
    if batch.is_empty() {
        return Ok(0);
    }
    let width = batch.columns.len();
    let per_statement = batch_size.min(MAX_VARIABLES / width).max(1);
    let row_placeholders = format!("({})", vec!["?"; width].join(", "));
    let column_list = batch.columns.join(", ");

    let mut written = 0;
    for chunk in batch.rows.chunks(per_statement) {
        let sql = format!(
            "INSERT INTO {} ({}) VALUES {}",
            batch.table,
            column_list,
            vec![row_placeholders.as_str(); chunk.len()].join(", ")
        );
        let mut stmt = conn
            .prepare_cached(&sql)
            .map_err(|e| classify(batch.store, batch.table, e))?;
        stmt.execute(rusqlite::params_from_iter(chunk.iter().flatten()))
            .map_err(|e| classify(batch.store, batch.table, e))?;
        written += chunk.len();
        log::debug!(
            "{}: wrote {} rows ({written}/{})",
            batch.key(),
            chunk.len(),
            batch.len()
        );
    }
    Ok(written)
}

/// Constraint failures are retryable; anything else is a database fault.
pub(crate) fn classify(store: StoreName, table: &str, err: rusqlite::Error) -> GenError {
    match err {
        rusqlite::Error::SqliteFailure(code, message) if code.code == ErrorCode::ConstraintViolation => {
            GenError::ConstraintViolation {
                store: store.to_string(),
                table: table.to_string(),
                message: message.unwrap_or_else(|| code.to_string()),
            }
        }
        other => GenError::Database(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pair {
        id: i64,
        name: &'static str,
    }

    impl Record for Pair {
        const STORE: StoreName = StoreName::Compliance;
        const TABLE: &'static str = "pairs";
        const COLUMNS: &'static [&'static str] = &["id", "name"];

        fn values(&self) -> Vec<Value> {
            vec![int(self.id), text(self.name)]
        }
    }

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE pairs (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE);")
            .unwrap();
        conn
    }

    #[test]
    fn rows_are_chunked_by_batch_size() {
        let conn = conn();
        let names = ["a", "b", "c", "d", "e", "f", "g"];
        let records: Vec<Pair> = names
            .iter()
            .enumerate()
            .map(|(i, n)| Pair { id: i as i64, name: n })
            .collect();
        let batch = TableBatch::of(&records);
        assert_eq!(insert_rows(&conn, &batch, 3).unwrap(), 7);
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM pairs", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 7);
    }

    #[test]
    fn unique_violation_is_a_constraint_violation() {
        let conn = conn();
        let batch = TableBatch::of(&[Pair { id: 1, name: "x" }, Pair { id: 2, name: "x" }]);
        let err = insert_rows(&conn, &batch, 10).unwrap_err();
        match err {
            GenError::ConstraintViolation { store, table, .. } => {
                assert_eq!(store, "compliance");
                assert_eq!(table, "pairs");
            }
            other => panic!("expected constraint violation, got {other:?}"),
        }
    }
}
