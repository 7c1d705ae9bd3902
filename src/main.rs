//! Carbon ledger CLI
//!
//! Records activity data, converts it into GHG emissions, and tracks offset
//! purchases against carbon neutrality.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use carbon_ledger::balance::compute_balance;
use carbon_ledger::catalog::OffsetCatalog;
use carbon_ledger::footprint::{
    CompanyInfo, ElectricityUse, FuelUse, Scope1Inputs, Scope2Inputs, Scope3Inputs,
    build_footprint,
};
use carbon_ledger::import;
use carbon_ledger::ledger::LedgerStore;
use carbon_ledger::models::{CarbonBalance, CartLine, Footprint};
use carbon_ledger::recommend::{checkout, expand, recommend};
use carbon_ledger::units::TonnesCo2e;

#[derive(Parser)]
#[command(name = "carbon-ledger")]
#[command(about = "Carbon accounting and offset purchase ledger")]
struct Cli {
    /// Path to the SQLite ledger
    #[arg(short, long, default_value = "carbon_ledger.db")]
    ledger: PathBuf,

    /// Offset catalog JSON file (defaults to the built-in catalog)
    #[arg(long)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize an empty ledger
    Init,

    /// Calculate a footprint from activity values and commit it
    Calc {
        /// Reporting period, e.g. "2025"
        #[arg(long)]
        period: String,

        #[arg(long, default_value_t = 0)]
        employees: u32,

        /// Annual revenue, for the purchased-goods estimate
        #[arg(long, default_value_t = 0.0)]
        revenue: f64,

        /// Grid electricity consumed, kWh
        #[arg(long, default_value_t = 0.0)]
        electricity_kwh: f64,

        /// Grid region for the electricity factor
        #[arg(long, default_value = "UK")]
        region: String,

        /// Fuel use as kind=amount, repeatable (e.g. --fuel diesel=340)
        #[arg(long = "fuel")]
        fuels: Vec<String>,

        /// Direct business travel emissions, tonnes CO2e
        #[arg(long, default_value_t = 0.0)]
        travel_tonnes: f64,
    },

    /// Import activity CSV files from a directory and commit the footprint
    Import {
        dir: PathBuf,

        #[arg(long)]
        period: String,

        #[arg(long, default_value_t = 0)]
        employees: u32,

        #[arg(long, default_value_t = 0.0)]
        revenue: f64,
    },

    /// Show the current carbon balance
    Balance,

    /// List offset products
    Catalog,

    /// Recommend offset portfolios for the remaining gap
    Recommend {
        /// Tonnage to offset (defaults to the net remaining emissions)
        #[arg(long)]
        tonnes: Option<f64>,
    },

    /// Purchase offsets: product=quantity, repeatable
    Purchase {
        #[arg(long = "item", required = true)]
        items: Vec<String>,
    },

    /// List the purchase history
    Purchases,

    /// Record externally granted offset credits
    Credit { tonnes: f64 },

    /// Re-check and reprint the balance on a fixed interval
    Watch {
        #[arg(long, default_value_t = 5)]
        interval_secs: u64,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut ledger = LedgerStore::open(&cli.ledger)?;
    if let Some(warning) = ledger.degraded() {
        eprintln!("Warning: {warning}");
    }

    let catalog = match &cli.catalog {
        Some(path) => OffsetCatalog::from_json_file(path)
            .with_context(|| format!("loading catalog from {}", path.display()))?,
        None => OffsetCatalog::builtin(),
    };

    match cli.command {
        Commands::Init => {
            println!("Ledger initialized at: {}", cli.ledger.display());
        }

        Commands::Calc {
            period,
            employees,
            revenue,
            electricity_kwh,
            region,
            fuels,
            travel_tonnes,
        } => {
            let scope1 = Scope1Inputs {
                fuels: fuels
                    .iter()
                    .map(|raw| parse_fuel(raw))
                    .collect::<Result<Vec<_>>>()?,
            };
            let scope2 = Scope2Inputs {
                meters: vec![ElectricityUse {
                    kwh: electricity_kwh,
                    region,
                }],
            };
            let scope3 = Scope3Inputs {
                business_travel: TonnesCo2e(travel_tonnes),
            };
            let company = CompanyInfo {
                reporting_period: period,
                employees,
                annual_revenue: revenue,
            };

            let footprint = build_footprint(&company, &scope1, &scope2, &scope3)?;
            ledger.commit_footprint(&footprint)?;
            print_footprint(&footprint);
        }

        Commands::Import {
            dir,
            period,
            employees,
            revenue,
        } => {
            let (inputs, stats) = import::import_directory(&dir)?;
            println!("{stats}");

            let company = CompanyInfo {
                reporting_period: period,
                employees,
                annual_revenue: revenue,
            };
            let footprint =
                build_footprint(&company, &inputs.scope1, &inputs.scope2, &inputs.scope3)?;
            ledger.commit_footprint(&footprint)?;
            print_footprint(&footprint);
        }

        Commands::Balance => {
            print_balance(&compute_balance(&ledger)?);
        }

        Commands::Catalog => {
            println!(
                "{:<26} {:<13} {:>9} {:<11} {:>10}",
                "Product", "Category", "Price/t", "Permanence", "Available"
            );
            println!("{}", "-".repeat(74));
            for product in catalog.products() {
                println!(
                    "{:<26} {:<13} {:>9.2} {:<11} {:>10}",
                    product.name,
                    product.category.as_str(),
                    product.price_per_tonne,
                    product.permanence.as_str(),
                    product.available_units
                );
            }
        }

        Commands::Recommend { tonnes } => {
            let required = match tonnes {
                Some(t) => t,
                None => {
                    let balance = compute_balance(&ledger)?;
                    if balance.gross_emissions.value() == 0.0 {
                        println!("No footprint recorded yet. Run 'calc' or 'import' first.");
                        return Ok(());
                    }
                    if balance.net_emissions.value() == 0.0 {
                        println!("Already carbon neutral. Nothing to offset.");
                        return Ok(());
                    }
                    balance.net_emissions.value()
                }
            };

            let required = TonnesCo2e(required);
            for rec in recommend(&catalog, required)? {
                println!("=== {} ===", rec.name);
                for credit in &rec.credits {
                    println!(
                        "  {:>5.1}%  {:<26} {:>8.2}/t",
                        credit.percentage, credit.product.name, credit.product.price_per_tonne
                    );
                }
                println!(
                    "  Total: {:.2}  (avg {:.2}/t for {:.3} t)",
                    rec.total_cost,
                    rec.average_price,
                    required.value()
                );
                let preview = expand(&rec, required);
                let cart: Vec<String> = preview
                    .iter()
                    .map(|line| format!("{}={}", line.product_id, line.quantity))
                    .collect();
                println!("  Cart: {}", cart.join(" "));
                println!();
            }
        }

        Commands::Purchase { items } => {
            let lines = items
                .iter()
                .map(|raw| parse_cart_line(raw))
                .collect::<Result<Vec<_>>>()?;
            let record = checkout(&catalog, &lines)?;
            ledger.append_purchase(&record)?;

            println!("Purchase {} recorded.", record.id);
            for item in &record.items {
                println!(
                    "  {:>4} x {:<26} @ {:>8.2} = {:>10.2}",
                    item.quantity,
                    item.product_id,
                    item.unit_price,
                    item.unit_price * f64::from(item.quantity)
                );
            }
            println!(
                "  {:.3} tCO2e offset for {:.2}",
                record.total_co2_offset.value(),
                record.total_price
            );
            print_balance(&compute_balance(&ledger)?);
        }

        Commands::Purchases => {
            let purchases = ledger.purchases()?;
            if purchases.is_empty() {
                println!("No purchases recorded.");
            } else {
                println!(
                    "{:<38} {:<12} {:>6} {:>12} {:>12}",
                    "Purchase", "Date", "Items", "tCO2e", "Price"
                );
                println!("{}", "-".repeat(84));
                for record in purchases {
                    println!(
                        "{:<38} {:<12} {:>6} {:>12.3} {:>12.2}",
                        record.id,
                        record.purchased_at.format("%Y-%m-%d"),
                        record.items.len(),
                        record.total_co2_offset.value(),
                        record.total_price
                    );
                }
            }
        }

        Commands::Credit { tonnes } => {
            ledger.add_baseline_credits(TonnesCo2e(tonnes))?;
            println!("Recorded {tonnes} tCO2e of baseline credits.");
            print_balance(&compute_balance(&ledger)?);
        }

        Commands::Watch { interval_secs } => {
            // Safety net for changes landing outside the process: re-derive
            // the balance on a fixed interval and reprint when it moved.
            let mut last: Option<CarbonBalance> = None;
            loop {
                let balance = compute_balance(&ledger)?;
                if last.as_ref() != Some(&balance) {
                    print_balance(&balance);
                    last = Some(balance);
                }
                thread::sleep(Duration::from_secs(interval_secs));
            }
        }
    }

    Ok(())
}

fn parse_fuel(raw: &str) -> Result<FuelUse> {
    let Some((kind, amount)) = raw.split_once('=') else {
        bail!("expected kind=amount, got '{raw}'");
    };
    let amount: f64 = amount
        .trim()
        .parse()
        .with_context(|| format!("bad fuel amount in '{raw}'"))?;
    Ok(FuelUse {
        kind: kind.trim().to_string(),
        amount,
    })
}

fn parse_cart_line(raw: &str) -> Result<CartLine> {
    let Some((product, quantity)) = raw.split_once('=') else {
        bail!("expected product=quantity, got '{raw}'");
    };
    let quantity: u32 = quantity
        .trim()
        .parse()
        .with_context(|| format!("bad quantity in '{raw}'"))?;
    Ok(CartLine {
        product_id: product.trim().to_string(),
        quantity,
    })
}

fn print_footprint(footprint: &Footprint) {
    println!(
        "Committed footprint {} for {} ({})",
        footprint.id,
        footprint.reporting_period,
        footprint.status.as_str()
    );
    println!("  Scope 1: {:>12.3} tCO2e", footprint.scope1.value());
    println!("  Scope 2: {:>12.3} tCO2e", footprint.scope2.value());
    println!("  Scope 3: {:>12.3} tCO2e", footprint.scope3.value());
    println!("  Total:   {:>12.3} tCO2e", footprint.total.value());
}

fn print_balance(balance: &CarbonBalance) {
    println!("=== Carbon Balance ===");
    println!(
        "  Gross emissions: {:>12.3} tCO2e",
        balance.gross_emissions.value()
    );
    println!(
        "  Offsets applied: {:>12.3} tCO2e",
        balance.offsets_applied.value()
    );
    println!(
        "  Net remaining:   {:>12.3} tCO2e",
        balance.net_emissions.value()
    );
    println!("  Neutrality:      {:>11.1}%", balance.neutrality_percent);
}
