use std::cell::Cell;
use std::fs;
use std::rc::Rc;

use carbon_ledger::balance::compute_balance;
use carbon_ledger::catalog::OffsetCatalog;
use carbon_ledger::footprint::{
    CompanyInfo, ElectricityUse, FuelUse, Scope1Inputs, Scope2Inputs, Scope3Inputs,
    build_footprint,
};
use carbon_ledger::ledger::LedgerStore;
use carbon_ledger::recommend::{checkout, expand, recommend};
use carbon_ledger::units::TonnesCo2e;

#[test]
fn activity_to_neutrality_round_trip() {
    let mut ledger = LedgerStore::in_memory().expect("open ledger");
    let catalog = OffsetCatalog::builtin();

    let fired = Rc::new(Cell::new(0u32));
    let counter = Rc::clone(&fired);
    ledger.subscribe(move || counter.set(counter.get() + 1));

    // Record a year of activity.
    let company = CompanyInfo {
        reporting_period: "2025".to_string(),
        employees: 12,
        annual_revenue: 800_000.0,
    };
    let scope1 = Scope1Inputs {
        fuels: vec![FuelUse {
            kind: "natural-gas".to_string(),
            amount: 60_000.0,
        }],
    };
    let scope2 = Scope2Inputs {
        meters: vec![ElectricityUse {
            kwh: 45_000.0,
            region: "UK".to_string(),
        }],
    };
    let scope3 = Scope3Inputs {
        business_travel: TonnesCo2e(4.0),
    };

    let footprint = build_footprint(&company, &scope1, &scope2, &scope3).expect("build footprint");
    assert!(footprint.identity_holds());
    ledger.commit_footprint(&footprint).expect("commit");

    let before = compute_balance(&ledger).expect("balance");
    assert!(before.gross_emissions.value() > 0.0);
    assert_eq!(before.offsets_applied.value(), 0.0);
    assert_eq!(before.neutrality_percent, 0.0);

    // Offset the whole remaining gap with the budget portfolio.
    let gap = before.net_emissions;
    let recs = recommend(&catalog, gap).expect("recommend");
    let budget = recs.iter().find(|r| r.name == "Budget Mix").expect("budget mix");
    let cart = expand(budget, gap);
    let record = checkout(&catalog, &cart).expect("checkout");
    ledger.append_purchase(&record).expect("append");

    // Whole units round up, so the purchase covers at least the gap.
    let after = compute_balance(&ledger).expect("balance");
    assert!(after.offsets_applied.value() >= gap.value());
    assert_eq!(after.net_emissions.value(), 0.0);
    assert_eq!(after.neutrality_percent, 100.0);

    // One commit + one append, one signal each.
    assert_eq!(fired.get(), 2);
}

#[test]
fn ledger_survives_reopen() {
    let path = std::env::temp_dir().join(format!(
        "carbon-ledger-roundtrip-{}.db",
        std::process::id()
    ));
    let _ = fs::remove_file(&path);

    let footprint_id;
    {
        let mut ledger = LedgerStore::open(&path).expect("open ledger");
        assert!(ledger.degraded().is_none());

        let company = CompanyInfo {
            reporting_period: "2025".to_string(),
            employees: 0,
            annual_revenue: 0.0,
        };
        let scope2 = Scope2Inputs {
            meters: vec![ElectricityUse {
                kwh: 1000.0,
                region: "UK".to_string(),
            }],
        };
        let footprint = build_footprint(
            &company,
            &Scope1Inputs::default(),
            &scope2,
            &Scope3Inputs::default(),
        )
        .expect("build footprint");
        footprint_id = footprint.id.clone();
        ledger.commit_footprint(&footprint).expect("commit");
        ledger
            .add_baseline_credits(TonnesCo2e(0.1))
            .expect("credits");
    }

    let ledger = LedgerStore::open(&path).expect("reopen ledger");
    let current = ledger.current_footprint().expect("read").expect("present");
    assert_eq!(current.id, footprint_id);
    // 1000 kWh on the UK grid: 212.33 kg = 0.21233 t.
    assert!((current.total.value() - 0.21233).abs() < 1e-9);
    assert!((ledger.baseline_credits().expect("credits").value() - 0.1).abs() < 1e-9);

    let _ = fs::remove_file(&path);
}
