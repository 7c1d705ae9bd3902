//! Best-effort remote footprint synchronization.
//!
//! The remote transport is out of scope; this module owns the boundary:
//! a DTO that absorbs the legacy field spellings remote payloads arrive
//! with, an explicit adapter to the canonical `Footprint`, and a staleness
//! guard so a response that raced a local mutation is discarded instead of
//! clobbering newer ledger state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::ledger::LedgerStore;
use crate::models::{Footprint, FootprintStatus};
use crate::units::TonnesCo2e;

/// Remote persistence interface. Production transport lives outside the
/// engine; tests use an in-memory fake.
pub trait RemoteFootprints {
    fn fetch_footprints(&self) -> Result<Vec<FootprintDto>>;
    fn push_footprint(&mut self, dto: &FootprintDto) -> Result<()>;
}

/// Wire shape of a footprint. Aliases cover the legacy payload spellings;
/// application logic never branches on which spelling arrived — everything
/// funnels through `into_footprint`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FootprintDto {
    pub id: String,
    #[serde(alias = "period", alias = "reportingPeriod")]
    pub reporting_period: String,
    #[serde(alias = "scope1Tonnes")]
    pub scope1: f64,
    #[serde(alias = "scope2Tonnes")]
    pub scope2: f64,
    #[serde(alias = "scope3Tonnes")]
    pub scope3: f64,
    /// Legacy payloads omit the total; it is recomputed on adaptation.
    #[serde(default, alias = "totalTonnes")]
    pub total: Option<f64>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_status() -> String {
    "draft".to_string()
}

impl FootprintDto {
    pub fn from_footprint(footprint: &Footprint) -> Self {
        FootprintDto {
            id: footprint.id.clone(),
            reporting_period: footprint.reporting_period.clone(),
            scope1: footprint.scope1.value(),
            scope2: footprint.scope2.value(),
            scope3: footprint.scope3.value(),
            total: Some(footprint.total.value()),
            status: footprint.status.as_str().to_string(),
            created_at: Some(footprint.created_at),
        }
    }

    /// Adapt to the canonical record. A missing total is recomputed from
    /// the scopes; a present total must satisfy the scope-sum identity.
    pub fn into_footprint(self) -> Result<Footprint> {
        for (name, value) in [
            ("scope1", self.scope1),
            ("scope2", self.scope2),
            ("scope3", self.scope3),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(EngineError::Validation(format!(
                    "remote footprint '{}' has invalid {name} ({value})",
                    self.id
                )));
            }
        }

        let scope_sum = self.scope1 + self.scope2 + self.scope3;
        let total = match self.total {
            None => scope_sum,
            Some(total) if (total - scope_sum).abs() < 1e-6 => total,
            Some(total) => {
                return Err(EngineError::Validation(format!(
                    "remote footprint '{}' total {total} does not match scope sum {scope_sum}",
                    self.id
                )));
            }
        };

        Ok(Footprint {
            id: self.id,
            reporting_period: self.reporting_period,
            scope1: TonnesCo2e(self.scope1),
            scope2: TonnesCo2e(self.scope2),
            scope3: TonnesCo2e(self.scope3),
            total: TonnesCo2e(total),
            status: FootprintStatus::parse(&self.status)?,
            created_at: self.created_at.unwrap_or_else(Utc::now),
        })
    }
}

/// What a pull did with the fetched snapshot.
#[derive(Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Applied this many new remote footprints, newest last (it becomes
    /// current).
    Applied(usize),
    /// The ledger advanced while the request was in flight; the response
    /// was discarded.
    StaleDiscarded,
}

/// Captures the ledger version when a sync request starts, so the response
/// can be checked against concurrent local mutations before applying.
pub struct SyncSession {
    started_version: u64,
}

impl SyncSession {
    pub fn begin(ledger: &LedgerStore) -> Result<Self> {
        Ok(SyncSession {
            started_version: ledger.version()?,
        })
    }

    /// Errors with `StaleSync` when the ledger has advanced since `begin`.
    pub fn ensure_fresh(&self, ledger: &LedgerStore) -> Result<()> {
        let current = ledger.version()?;
        if current != self.started_version {
            return Err(EngineError::StaleSync {
                started: self.started_version,
                current,
            });
        }
        Ok(())
    }

    /// Apply a fetched remote snapshot: commit footprints the ledger does
    /// not have yet, in remote order (last one wins as current). A stale
    /// response is discarded and logged, never applied.
    pub fn apply_fetched(
        self,
        ledger: &mut LedgerStore,
        dtos: Vec<FootprintDto>,
    ) -> Result<SyncOutcome> {
        match self.ensure_fresh(ledger) {
            Ok(()) => {}
            Err(EngineError::StaleSync { started, current }) => {
                log::warn!(
                    "discarding stale sync response (ledger advanced from v{started} to v{current})"
                );
                return Ok(SyncOutcome::StaleDiscarded);
            }
            Err(other) => return Err(other),
        }

        let mut applied = 0;
        for dto in dtos {
            if ledger.contains_footprint(&dto.id)? {
                continue;
            }
            ledger.commit_footprint(&dto.into_footprint()?)?;
            applied += 1;
        }
        Ok(SyncOutcome::Applied(applied))
    }
}

/// Fetch the remote snapshot and apply it unless the ledger moved first.
pub fn pull(ledger: &mut LedgerStore, remote: &impl RemoteFootprints) -> Result<SyncOutcome> {
    let session = SyncSession::begin(ledger)?;
    let dtos = remote.fetch_footprints()?;
    session.apply_fetched(ledger, dtos)
}

/// Push the current footprint to the remote (last-write-wins on that side).
pub fn push(ledger: &LedgerStore, remote: &mut impl RemoteFootprints) -> Result<bool> {
    match ledger.current_footprint()? {
        Some(footprint) => {
            remote.push_footprint(&FootprintDto::from_footprint(&footprint))?;
            Ok(true)
        }
        None => Ok(false),
    }
}
