//! Ledger store: the committed source of truth for footprints and offset
//! purchases, and the change signal derived views subscribe to.
//!
//! Footprints are superseded, never edited: every commit appends a row and
//! the latest row is "current." Purchases are append-only. Each mutation
//! runs in a transaction, bumps the monotonic ledger version, and notifies
//! subscribers only after the transaction commits.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};

use crate::error::{DegradedModeWarning, EngineError, Result};
use crate::models::{Footprint, FootprintStatus, PurchaseItem, PurchaseRecord};
use crate::units::TonnesCo2e;

pub type SubscriptionId = usize;

const VERSION_KEY: &str = "version";
const BASELINE_CREDITS_KEY: &str = "baseline_credits_t";

pub struct LedgerStore {
    conn: Connection,
    degraded: Option<DegradedModeWarning>,
    subscribers: Vec<(SubscriptionId, Box<dyn Fn()>)>,
    next_subscription: SubscriptionId,
}

impl LedgerStore {
    /// Open the durable ledger. If the file cannot be opened, the session
    /// continues on an in-memory store and the returned ledger carries a
    /// `DegradedModeWarning` instead of failing the user action.
    pub fn open(path: &Path) -> Result<Self> {
        match Connection::open(path) {
            Ok(conn) => Self::with_connection(conn, None),
            Err(err) => {
                log::warn!(
                    "cannot open ledger at {}: {err}; falling back to in-memory storage",
                    path.display()
                );
                let warning = DegradedModeWarning {
                    reason: err.to_string(),
                };
                Self::with_connection(Connection::open_in_memory()?, Some(warning))
            }
        }
    }

    /// A ledger that lives only for this session. Not degraded: callers
    /// asked for in-memory storage.
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, None)
    }

    fn with_connection(conn: Connection, degraded: Option<DegradedModeWarning>) -> Result<Self> {
        init_schema(&conn)?;
        Ok(LedgerStore {
            conn,
            degraded,
            subscribers: Vec::new(),
            next_subscription: 0,
        })
    }

    /// Present when the durable medium was unavailable at open time.
    pub fn degraded(&self) -> Option<&DegradedModeWarning> {
        self.degraded.as_ref()
    }

    /// Register a callback fired after every committed mutation. There is
    /// no payload: subscribers re-read whatever projections they need.
    pub fn subscribe(&mut self, callback: impl Fn() + 'static) -> SubscriptionId {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscribers.retain(|(sid, _)| *sid != id);
    }

    fn notify(&self) {
        for (_, callback) in &self.subscribers {
            callback();
        }
    }

    /// Monotonic counter bumped by every mutation. Used by the sync layer
    /// to detect responses that raced a local change.
    pub fn version(&self) -> Result<u64> {
        let raw: String = self.conn.query_row(
            "SELECT value FROM meta WHERE key = ?1",
            [VERSION_KEY],
            |row| row.get(0),
        )?;
        raw.parse()
            .map_err(|_| EngineError::Parse(format!("bad ledger version '{raw}'")))
    }

    /// Commit a new footprint as current. The previous footprint stays in
    /// the ledger, superseded. Re-committing an already-committed id is a
    /// conflict.
    pub fn commit_footprint(&mut self, footprint: &Footprint) -> Result<()> {
        if !footprint.total.is_valid_quantity() || !footprint.identity_holds() {
            return Err(EngineError::Validation(format!(
                "footprint '{}' total does not equal the sum of its scopes",
                footprint.id
            )));
        }

        let tx = self.conn.transaction()?;
        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM footprints WHERE id = ?1)",
            [&footprint.id],
            |row| row.get(0),
        )?;
        if exists {
            return Err(EngineError::Conflict(format!(
                "footprint '{}' is already committed",
                footprint.id
            )));
        }

        tx.execute(
            "INSERT INTO footprints
                 (id, reporting_period, scope1_t, scope2_t, scope3_t, total_t, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                footprint.id,
                footprint.reporting_period,
                footprint.scope1.value(),
                footprint.scope2.value(),
                footprint.scope3.value(),
                footprint.total.value(),
                footprint.status.as_str(),
                footprint.created_at,
            ],
        )?;
        bump_version(&tx)?;
        tx.commit()?;

        self.notify();
        Ok(())
    }

    /// The most recently committed footprint, if any.
    pub fn current_footprint(&self) -> Result<Option<Footprint>> {
        let mut footprints = self.query_footprints("ORDER BY seq DESC LIMIT 1")?;
        Ok(footprints.pop())
    }

    /// Every committed footprint, oldest first (the supersede chain).
    pub fn footprints(&self) -> Result<Vec<Footprint>> {
        self.query_footprints("ORDER BY seq ASC")
    }

    pub fn contains_footprint(&self, id: &str) -> Result<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM footprints WHERE id = ?1)",
            [id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn query_footprints(&self, tail: &str) -> Result<Vec<Footprint>> {
        let sql = format!(
            "SELECT id, reporting_period, scope1_t, scope2_t, scope3_t, total_t, status, created_at
             FROM footprints {tail}"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, f64>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, DateTime<Utc>>(7)?,
            ))
        })?;

        let mut results = Vec::new();
        for row in rows {
            let (id, reporting_period, s1, s2, s3, total, status, created_at) = row?;
            results.push(Footprint {
                id,
                reporting_period,
                scope1: TonnesCo2e(s1),
                scope2: TonnesCo2e(s2),
                scope3: TonnesCo2e(s3),
                total: TonnesCo2e(total),
                status: FootprintStatus::parse(&status)?,
                created_at,
            });
        }
        Ok(results)
    }

    /// Append a completed purchase to the history. Duplicate ids are
    /// rejected; the record is stored all-or-nothing.
    pub fn append_purchase(&mut self, record: &PurchaseRecord) -> Result<()> {
        if !record.total_co2_offset.is_valid_quantity() || !record.total_price.is_finite() {
            return Err(EngineError::Validation(format!(
                "purchase '{}' has malformed totals",
                record.id
            )));
        }

        let tx = self.conn.transaction()?;
        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM purchases WHERE id = ?1)",
            [&record.id],
            |row| row.get(0),
        )?;
        if exists {
            return Err(EngineError::Conflict(format!(
                "purchase '{}' is already recorded",
                record.id
            )));
        }

        tx.execute(
            "INSERT INTO purchases (id, total_co2_t, total_price, purchased_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.id,
                record.total_co2_offset.value(),
                record.total_price,
                record.purchased_at,
            ],
        )?;
        for item in &record.items {
            tx.execute(
                "INSERT INTO purchase_items
                     (purchase_id, product_id, quantity, unit_price, co2_offset_t)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.id,
                    item.product_id,
                    item.quantity,
                    item.unit_price,
                    item.co2_offset.value(),
                ],
            )?;
        }
        bump_version(&tx)?;
        tx.commit()?;

        self.notify();
        Ok(())
    }

    /// Purchase history in insertion order.
    pub fn purchases(&self) -> Result<Vec<PurchaseRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, total_co2_t, total_price, purchased_at
             FROM purchases ORDER BY seq ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, DateTime<Utc>>(3)?,
            ))
        })?;

        let mut headers = Vec::new();
        for row in rows {
            headers.push(row?);
        }

        let mut results = Vec::new();
        for (id, total_co2, total_price, purchased_at) in headers {
            let items = self.purchase_items(&id)?;
            results.push(PurchaseRecord {
                id,
                items,
                total_co2_offset: TonnesCo2e(total_co2),
                total_price,
                purchased_at,
            });
        }
        Ok(results)
    }

    fn purchase_items(&self, purchase_id: &str) -> Result<Vec<PurchaseItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT product_id, quantity, unit_price, co2_offset_t
             FROM purchase_items WHERE purchase_id = ?1 ORDER BY rowid ASC",
        )?;
        let rows = stmt.query_map([purchase_id], |row| {
            Ok(PurchaseItem {
                product_id: row.get(0)?,
                quantity: row.get(1)?,
                unit_price: row.get(2)?,
                co2_offset: TonnesCo2e(row.get(3)?),
            })
        })?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    /// Offset credits granted outside the purchase ledger (e.g. donation
    /// programmes). Counted into the applied offsets by the balance
    /// projection.
    pub fn baseline_credits(&self) -> Result<TonnesCo2e> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM meta WHERE key = ?1",
                [BASELINE_CREDITS_KEY],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;
        match raw {
            None => Ok(TonnesCo2e(0.0)),
            Some(raw) => raw
                .parse()
                .map(TonnesCo2e)
                .map_err(|_| EngineError::Parse(format!("bad baseline credits '{raw}'"))),
        }
    }

    pub fn add_baseline_credits(&mut self, credits: TonnesCo2e) -> Result<()> {
        if !credits.is_valid_quantity() {
            return Err(EngineError::Validation(format!(
                "baseline credits must be a non-negative finite quantity, got {}",
                credits.value()
            )));
        }

        let current = self.baseline_credits()?;
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![BASELINE_CREDITS_KEY, (current + credits).value().to_string()],
        )?;
        bump_version(&tx)?;
        tx.commit()?;

        self.notify();
        Ok(())
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Footprint supersede chain; the highest seq is current
        CREATE TABLE IF NOT EXISTS footprints (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            reporting_period TEXT NOT NULL,
            scope1_t REAL NOT NULL,
            scope2_t REAL NOT NULL,
            scope3_t REAL NOT NULL,
            total_t REAL NOT NULL,
            status TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        -- Append-only purchase history
        CREATE TABLE IF NOT EXISTS purchases (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            total_co2_t REAL NOT NULL,
            total_price REAL NOT NULL,
            purchased_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS purchase_items (
            purchase_id TEXT NOT NULL,
            product_id TEXT NOT NULL,
            quantity INTEGER NOT NULL,
            unit_price REAL NOT NULL,
            co2_offset_t REAL NOT NULL
        );

        -- Ledger version and baseline credits
        CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_purchase_items_purchase
            ON purchase_items(purchase_id);

        INSERT OR IGNORE INTO meta (key, value) VALUES ('version', '0');
        "#,
    )?;
    Ok(())
}

fn bump_version(tx: &rusqlite::Transaction<'_>) -> Result<()> {
    tx.execute(
        "UPDATE meta SET value = CAST(CAST(value AS INTEGER) + 1 AS TEXT) WHERE key = ?1",
        [VERSION_KEY],
    )?;
    Ok(())
}
