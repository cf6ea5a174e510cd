//! SQLite persistence layer: six independent stores.
//!
//! RULE: Only store/ talks to the database.
//! Phases hand typed records to a `RecordSink`; they never execute SQL.
//!
//! Each store is its own SQLite database with its own connection. There
//! is no transaction spanning stores, so a phase's writes are grouped
//! into one transaction per touched store. Every insert runs before the
//! first commit, so a failed insert rolls all of them back. The commits
//! themselves run store by store.

pub mod batch;
pub mod schema;

mod banking;
mod compliance;
mod customer;
mod insurance;
mod lending;
mod workforce;

pub use batch::{Record, TableBatch};
pub use schema::StoreName;

use crate::{config::StorePaths, error::GenResult, phase::PhaseOutput};
use rusqlite::{Connection, Transaction};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Row count of one table, for status output and run reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableCount {
    pub store: StoreName,
    pub table: &'static str,
    pub rows: u64,
}

/// Destination of phase output.
pub trait RecordSink {
    /// Persist one phase attempt's output atomically per phase.
    /// Returns rows inserted per `store.table`.
    fn write_phase(
        &mut self,
        phase: &str,
        output: &PhaseOutput,
        batch_size: usize,
    ) -> GenResult<BTreeMap<String, usize>>;

    /// Delete every row of every table. Idempotent.
    fn clear(&mut self) -> GenResult<()>;

    fn table_counts(&self) -> GenResult<Vec<TableCount>>;
}

pub struct Store {
    name: StoreName,
    conn: Connection,
    path: Option<PathBuf>,
}

impl Store {
    /// Open (or create) one store's database at `path`.
    pub fn open(name: StoreName, path: &Path) -> GenResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            name,
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory(name: StoreName) -> GenResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            name,
            conn,
            path: None,
        })
    }

    pub fn name(&self) -> StoreName {
        self.name
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Apply this store's schema. Safe to run on an existing database.
    pub fn migrate(&self) -> GenResult<()> {
        self.conn.execute_batch(self.name.schema())?;
        Ok(())
    }

    /// Read access for status queries and tests.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn count(&self, table: &str) -> GenResult<u64> {
        let rows: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(rows as u64)
    }

    /// Every non-null value of `table.column`.
    pub fn column_values(&self, table: &str, column: &str) -> GenResult<Vec<String>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {column} FROM {table} WHERE {column} IS NOT NULL"
        ))?;
        let values = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(values)
    }

    fn clear_tables(&self) -> GenResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        for table in self.name.tables().iter().rev() {
            tx.execute(&format!("DELETE FROM {table}"), [])?;
        }
        // AUTOINCREMENT counters restart with the rows.
        let has_sequence: bool = tx.query_row(
            "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE name = 'sqlite_sequence')",
            [],
            |row| row.get(0),
        )?;
        if has_sequence {
            tx.execute("DELETE FROM sqlite_sequence", [])?;
        }
        tx.commit()?;
        Ok(())
    }
}

/// The six stores of one environment.
pub struct StoreSet {
    stores: BTreeMap<StoreName, Store>,
}

impl StoreSet {
    /// Six isolated in-memory databases, migrated.
    pub fn in_memory() -> GenResult<Self> {
        let mut stores = BTreeMap::new();
        for name in StoreName::ALL {
            let store = Store::in_memory(name)?;
            store.migrate()?;
            stores.insert(name, store);
        }
        Ok(Self { stores })
    }

    /// Open the six database files named by `paths`, migrated.
    pub fn open(paths: &StorePaths) -> GenResult<Self> {
        let mut stores = BTreeMap::new();
        for name in StoreName::ALL {
            let path = match name {
                StoreName::Employees => &paths.employees,
                StoreName::Customer => &paths.customer,
                StoreName::Accounts => &paths.accounts,
                StoreName::Loans => &paths.loans,
                StoreName::Insurance => &paths.insurance,
                StoreName::Compliance => &paths.compliance,
            };
            let store = Store::open(name, path)?;
            store.migrate()?;
            log::debug!("store {name}: opened {}", path.display());
            stores.insert(name, store);
        }
        Ok(Self { stores })
    }

    pub fn store(&self, name: StoreName) -> &Store {
        // Both constructors populate every StoreName.
        &self.stores[&name]
    }

    pub fn count(&self, name: StoreName, table: &str) -> GenResult<u64> {
        self.store(name).count(table)
    }
}

/// Commit store by store. A failed commit rolls back its own store and
/// every store after it; stores committed earlier keep the phase's rows.
fn commit_in_order(phase: &str, open: BTreeMap<StoreName, Transaction<'_>>) -> GenResult<()> {
    let mut committed: Vec<&'static str> = Vec::new();
    for (name, tx) in open {
        if let Err(e) = tx.commit() {
            log::error!(
                "{phase}: commit failed in store {name}; already committed: [{}]",
                committed.join(", ")
            );
            return Err(batch::classify(name, "<commit>", e));
        }
        committed.push(name.as_str());
    }
    Ok(())
}

impl RecordSink for StoreSet {
    fn write_phase(
        &mut self,
        phase: &str,
        output: &PhaseOutput,
        batch_size: usize,
    ) -> GenResult<BTreeMap<String, usize>> {
        // One open transaction per touched store. Dropping a Transaction
        // rolls it back, so any early return below discards them all.
        let mut open: BTreeMap<StoreName, Transaction<'_>> = BTreeMap::new();
        let mut inserted = BTreeMap::new();

        for table in output.batches() {
            if !open.contains_key(&table.store) {
                let tx = self.stores[&table.store].conn.unchecked_transaction()?;
                open.insert(table.store, tx);
            }
            let tx = &open[&table.store];
            let rows = batch::insert_rows(tx, table, batch_size)?;
            *inserted.entry(table.key()).or_insert(0) += rows;
        }

        commit_in_order(phase, open)?;
        log::debug!("{phase}: committed {} tables", inserted.len());
        Ok(inserted)
    }

    fn clear(&mut self) -> GenResult<()> {
        // Reverse of the phase order: dependants first.
        for name in StoreName::ALL.iter().rev() {
            self.stores[name].clear_tables()?;
            log::info!("store {name}: cleared");
        }
        Ok(())
    }

    fn table_counts(&self) -> GenResult<Vec<TableCount>> {
        let mut counts = Vec::new();
        for (name, store) in &self.stores {
            for &table in name.tables() {
                counts.push(TableCount {
                    store: *name,
                    table,
                    rows: store.count(table)?,
                });
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenError;

    #[test]
    fn file_stores_run_in_wal_mode() {
        let path = std::env::temp_dir().join(format!("demobank-wal-{}.db", std::process::id()));
        let store = Store::open(StoreName::Employees, &path).unwrap();
        let mode: String = store
            .connection()
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        drop(store);
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
        }
        assert_eq!(mode, "wal");
    }

    #[test]
    fn clear_restarts_autoincrement_ids() {
        let stores = StoreSet::in_memory().unwrap();
        let loans = stores.store(StoreName::Loans);
        let conn = loans.connection();
        conn.execute_batch("PRAGMA foreign_keys=OFF;").unwrap();
        let next_id = || -> i64 {
            conn.execute(
                "INSERT INTO loan_guarantors (loan_id, guarantor_name, relationship, contact_info, guarantee_amount) \
                 VALUES ('LOAN-1', 'Ann Lee', 'spouse', 'ann@example.com', 1000.0)",
                [],
            )
            .unwrap();
            conn.last_insert_rowid()
        };
        assert_eq!(next_id(), 1);
        assert_eq!(next_id(), 2);

        loans.clear_tables().unwrap();
        assert_eq!(loans.count("loan_guarantors").unwrap(), 0);
        assert_eq!(next_id(), 1);
    }

    #[test]
    fn failed_commit_keeps_earlier_stores_and_discards_the_rest() {
        let stores = StoreSet::in_memory().unwrap();
        let employees = stores.store(StoreName::Employees).connection();
        let customer = stores.store(StoreName::Customer).connection();

        let first = employees.unchecked_transaction().unwrap();
        first
            .execute(
                "INSERT INTO departments (department_id, code, department_name, budget) \
                 VALUES ('DEPT-1', 'OPS', 'Operations', 1000.0)",
                [],
            )
            .unwrap();

        // A deferred foreign key only fails at COMMIT.
        let second = customer.unchecked_transaction().unwrap();
        second.execute_batch("PRAGMA defer_foreign_keys=ON;").unwrap();
        second
            .execute(
                "INSERT INTO interactions (interaction_id, customer_id, employee_id, channel, topic, outcome, interaction_date) \
                 VALUES ('INT-1', 'CUST-MISSING', 'EMP-1', 'email', 'fees', 'resolved', '2025-01-01 10:00:00')",
                [],
            )
            .unwrap();

        let open = BTreeMap::from([(StoreName::Employees, first), (StoreName::Customer, second)]);
        let err = commit_in_order("engagement", open).unwrap_err();
        assert!(matches!(err, GenError::ConstraintViolation { .. }), "{err}");
        assert_eq!(stores.count(StoreName::Employees, "departments").unwrap(), 1);
        assert_eq!(stores.count(StoreName::Customer, "interactions").unwrap(), 0);
    }
}
