//! Carbon balance projection.
//!
//! A pure derivation over the ledger, recomputed on every read so it can
//! never drift from the committed state. Nothing here is cached or stored.

use crate::error::Result;
use crate::ledger::LedgerStore;
use crate::models::CarbonBalance;
use crate::units::TonnesCo2e;

/// Derive the current balance from a full ledger snapshot.
///
/// Gross emissions come from the current footprint (0 when none exists);
/// applied offsets are the purchase history total plus baseline credits.
/// Net is clamped at zero and neutrality at 100%: over-offsetting is
/// neutrality, not negative emissions.
pub fn compute_balance(ledger: &LedgerStore) -> Result<CarbonBalance> {
    let gross = ledger
        .current_footprint()?
        .map(|footprint| footprint.total)
        .unwrap_or_default();

    let purchased: TonnesCo2e = ledger
        .purchases()?
        .iter()
        .map(|purchase| purchase.total_co2_offset)
        .sum();
    let offsets = purchased + ledger.baseline_credits()?;

    let net = TonnesCo2e((gross.value() - offsets.value()).max(0.0));
    let neutrality_percent = if gross.value() > 0.0 {
        (offsets.value() / gross.value() * 100.0).min(100.0)
    } else {
        0.0
    };

    Ok(CarbonBalance {
        gross_emissions: gross,
        offsets_applied: offsets,
        net_emissions: net,
        neutrality_percent,
    })
}
