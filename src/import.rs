//! Activity data import.
//!
//! Reads directories of exported activity CSV files (meter readings, fuel
//! deliveries, travel summaries) and aggregates them into calculator inputs
//! for the footprint aggregator. Rows look like:
//!
//! ```text
//! 2025-03-14, electricity, 1280.5, kWh, UK
//! 2025-03-02, fuel, 340, litre, diesel
//! 2025-04-01, travel, 1.2, tCO2e
//! ```
//!
//! Header lines, comments and rows that do not parse are counted and
//! skipped; one bad export line does not fail the whole import.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use walkdir::WalkDir;

use crate::error::{EngineError, Result};
use crate::footprint::{ElectricityUse, FuelUse, Scope1Inputs, Scope2Inputs, Scope3Inputs};
use crate::units::TonnesCo2e;

const ROW_PATTERN: &str = r"(?x)
    ^\s*
    (\d{4}-\d{2}-\d{2})                  # date (recorded, not used yet)
    \s*,\s*
    (electricity|fuel|travel)            # activity kind
    \s*,\s*
    ([0-9]+(?:\.[0-9]+)?)                # quantity
    \s*,\s*
    ([A-Za-z0-9/]+)                      # unit
    (?:\s*,\s*([A-Za-z][A-Za-z0-9_-]*))? # detail: region or fuel kind
    \s*$";

/// Aggregated scope inputs from an import run.
#[derive(Debug, Default)]
pub struct ActivityInputs {
    pub scope1: Scope1Inputs,
    pub scope2: Scope2Inputs,
    pub scope3: Scope3Inputs,
}

#[derive(Debug, Default)]
pub struct ImportStats {
    pub files: usize,
    pub rows: usize,
    pub skipped: usize,
}

impl fmt::Display for ImportStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Imported {} activity rows from {} files. Skipped: {}",
            self.rows, self.files, self.skipped
        )
    }
}

/// Find all activity CSV files under a directory.
pub fn find_activity_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.extension().map_or(false, |ext| ext == "csv") {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

/// Scan a directory and aggregate every parseable activity row into scope
/// inputs for `build_footprint`.
pub fn import_directory(dir: &Path) -> Result<(ActivityInputs, ImportStats)> {
    let row_re = Regex::new(ROW_PATTERN)
        .map_err(|err| EngineError::Parse(format!("bad row pattern: {err}")))?;

    let mut stats = ImportStats::default();
    // BTreeMaps so repeated imports aggregate in a stable order.
    let mut electricity: BTreeMap<String, f64> = BTreeMap::new();
    let mut fuels: BTreeMap<String, f64> = BTreeMap::new();
    let mut travel = 0.0;

    for path in find_activity_files(dir)? {
        let content = fs::read_to_string(&path)?;
        stats.files += 1;

        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("date") {
                continue;
            }
            match parse_row(&row_re, trimmed) {
                Some(ActivityRow::Electricity { kwh, region }) => {
                    *electricity.entry(region).or_default() += kwh;
                    stats.rows += 1;
                }
                Some(ActivityRow::Fuel { kind, amount }) => {
                    *fuels.entry(kind).or_default() += amount;
                    stats.rows += 1;
                }
                Some(ActivityRow::Travel { tonnes }) => {
                    travel += tonnes;
                    stats.rows += 1;
                }
                None => {
                    log::debug!("skipping unparseable row in {}: {trimmed}", path.display());
                    stats.skipped += 1;
                }
            }
        }
    }

    let inputs = ActivityInputs {
        scope1: Scope1Inputs {
            fuels: fuels
                .into_iter()
                .map(|(kind, amount)| FuelUse { kind, amount })
                .collect(),
        },
        scope2: Scope2Inputs {
            meters: electricity
                .into_iter()
                .map(|(region, kwh)| ElectricityUse { kwh, region })
                .collect(),
        },
        scope3: Scope3Inputs {
            business_travel: TonnesCo2e(travel),
        },
    };
    Ok((inputs, stats))
}

enum ActivityRow {
    Electricity { kwh: f64, region: String },
    Fuel { kind: String, amount: f64 },
    Travel { tonnes: f64 },
}

fn parse_row(row_re: &Regex, line: &str) -> Option<ActivityRow> {
    let caps = row_re.captures(line)?;
    let kind = &caps[2];
    let quantity: f64 = caps[3].parse().ok()?;
    let unit = &caps[4];
    let detail = caps.get(5).map(|m| m.as_str().to_string());

    match kind {
        "electricity" => {
            let kwh = match unit.to_ascii_lowercase().as_str() {
                "kwh" => quantity,
                "mwh" => quantity * 1000.0,
                _ => return None,
            };
            Some(ActivityRow::Electricity {
                kwh,
                region: detail?,
            })
        }
        "fuel" => Some(ActivityRow::Fuel {
            kind: detail?,
            amount: quantity,
        }),
        "travel" => {
            let tonnes = match unit.to_ascii_lowercase().as_str() {
                "tco2e" | "t" => quantity,
                "kgco2e" | "kg" => quantity / 1000.0,
                _ => return None,
            };
            Some(ActivityRow::Travel { tonnes })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::footprint::{CompanyInfo, build_footprint};

    fn row_re() -> Regex {
        Regex::new(ROW_PATTERN).unwrap()
    }

    fn parse(line: &str) -> Option<ActivityRow> {
        parse_row(&row_re(), line)
    }

    #[test]
    fn parses_the_three_activity_kinds() {
        match parse("2025-03-14, electricity, 1280.5, kWh, UK") {
            Some(ActivityRow::Electricity { kwh, region }) => {
                assert_eq!(kwh, 1280.5);
                assert_eq!(region, "UK");
            }
            _ => panic!("electricity row did not parse"),
        }
        match parse("2025-03-02, fuel, 340, litre, diesel") {
            Some(ActivityRow::Fuel { kind, amount }) => {
                assert_eq!(kind, "diesel");
                assert_eq!(amount, 340.0);
            }
            _ => panic!("fuel row did not parse"),
        }
        match parse("2025-04-01, travel, 1.2, tCO2e") {
            Some(ActivityRow::Travel { tonnes }) => assert_eq!(tonnes, 1.2),
            _ => panic!("travel row did not parse"),
        }
    }

    #[test]
    fn converts_units() {
        match parse("2025-01-01, electricity, 2, MWh, EU") {
            Some(ActivityRow::Electricity { kwh, .. }) => assert_eq!(kwh, 2000.0),
            _ => panic!(),
        }
        match parse("2025-01-01, travel, 500, kgCO2e") {
            Some(ActivityRow::Travel { tonnes }) => assert_eq!(tonnes, 0.5),
            _ => panic!(),
        }
    }

    #[test]
    fn malformed_rows_are_rejected() {
        assert!(parse("not a row").is_none());
        assert!(parse("2025-01-01, electricity, ten, kWh, UK").is_none());
        assert!(parse("2025-01-01, electricity, 10, bananas, UK").is_none());
        // Electricity and fuel need a detail column.
        assert!(parse("2025-01-01, electricity, 10, kWh").is_none());
        assert!(parse("2025-01-01, fuel, 10, litre").is_none());
    }

    #[test]
    fn directory_import_aggregates_and_counts() {
        let dir = std::env::temp_dir().join(format!(
            "carbon-ledger-import-test-{}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("meters.csv"),
            "date, kind, quantity, unit, detail\n\
             2025-01-10, electricity, 600, kWh, UK\n\
             2025-02-10, electricity, 400, kWh, UK\n\
             # maintenance note\n\
             garbage line\n",
        )
        .unwrap();
        fs::write(
            dir.join("fleet.csv"),
            "2025-01-15, fuel, 120, litre, diesel\n\
             2025-02-15, fuel, 80, litre, diesel\n\
             2025-03-01, travel, 1.5, tCO2e\n",
        )
        .unwrap();

        let (inputs, stats) = import_directory(&dir).unwrap();
        fs::remove_dir_all(&dir).unwrap();

        assert_eq!(stats.files, 2);
        assert_eq!(stats.rows, 5);
        assert_eq!(stats.skipped, 1);

        assert_eq!(inputs.scope2.meters.len(), 1);
        assert_eq!(inputs.scope2.meters[0].kwh, 1000.0);
        assert_eq!(inputs.scope1.fuels.len(), 1);
        assert_eq!(inputs.scope1.fuels[0].amount, 200.0);
        assert_eq!(inputs.scope3.business_travel.value(), 1.5);

        // Imported inputs feed straight into the aggregator.
        let company = CompanyInfo {
            reporting_period: "2025".to_string(),
            employees: 5,
            annual_revenue: 0.0,
        };
        let footprint =
            build_footprint(&company, &inputs.scope1, &inputs.scope2, &inputs.scope3).unwrap();
        assert!(footprint.identity_holds());
        assert!((footprint.scope2.value() - 0.21233).abs() < 1e-9);
    }
}
