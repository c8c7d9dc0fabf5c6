//! Delimited-text export of a computed report
//!
//! Formatting only: every number comes from an already computed
//! [`AggregateReport`].

use std::io::Write;

use thiserror::Error;

use crate::report::{AggregateReport, MachineReport};

/// Column headers, in output order
pub const HEADERS: [&str; 7] = [
    "Machine",
    "Nominal power",
    "Load factor",
    "Consumption",
    "Cost",
    "Emissions",
    "Cost per m3",
];

/// Export errors
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Export is not valid UTF-8")]
    Utf8,
}

/// Output options
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Field delimiter
    pub delimiter: u8,
    /// Appended to monetary values
    pub currency_symbol: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            currency_symbol: "€".to_string(),
        }
    }
}

impl ExportOptions {
    pub fn with_delimiter(delimiter: u8) -> Self {
        Self {
            delimiter,
            ..Default::default()
        }
    }

    pub fn with_currency(mut self, symbol: impl Into<String>) -> Self {
        self.currency_symbol = symbol.into();
        self
    }
}

/// Write the machine table as delimited text
pub fn write_csv<W: Write>(
    report: &AggregateReport,
    writer: W,
    options: &ExportOptions,
) -> Result<(), ExportError> {
    let mut csv = csv::WriterBuilder::new()
        .delimiter(options.delimiter)
        .from_writer(writer);

    csv.write_record(HEADERS)?;
    for machine in &report.machines {
        csv.write_record(format_row(machine, options))?;
    }
    csv.flush()?;
    Ok(())
}

/// Export to an in-memory string
pub fn to_csv_string(
    report: &AggregateReport,
    options: &ExportOptions,
) -> Result<String, ExportError> {
    let mut buffer = Vec::new();
    write_csv(report, &mut buffer, options)?;
    String::from_utf8(buffer).map_err(|_| ExportError::Utf8)
}

fn format_row(machine: &MachineReport, options: &ExportOptions) -> [String; 7] {
    [
        machine.name.clone(),
        format!("{:.0} kW", machine.nominal_power_kw),
        format!("{:.0}%", machine.base_load_factor * 100.0),
        format!("{:.2} kWh", machine.consumption_kwh),
        format!("{:.2} {}", machine.cost, options.currency_symbol),
        format!("{:.3} t", machine.emissions_tonnes),
        format!("{:.2} {}", machine.cost_per_m3, options.currency_symbol),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HardnessAdjustment;

    fn report() -> AggregateReport {
        let saw = MachineReport {
            name: "Head saw".to_string(),
            nominal_power_kw: 75.0,
            base_load_factor: 0.65,
            effective_load_factor: 0.65,
            adjusted_power_kw: 75.0,
            live_reading_used: false,
            tariff_rate: 0.18,
            consumption_kwh: 8580.0,
            cost: 1544.4,
            emissions_tonnes: 0.429,
            cost_per_m3: 1.5444,
        };
        AggregateReport {
            total_cost: saw.cost,
            total_emissions_tonnes: saw.emissions_tonnes,
            total_consumption_kwh: saw.consumption_kwh,
            cost_per_m3: saw.cost_per_m3,
            machines: vec![saw],
            species: "Fir/Spruce".to_string(),
            effort_coefficient: 1.0,
            operating_hours: 176.0,
            target_volume_m3: 1000.0,
            adjustment: HardnessAdjustment::ScalePower,
        }
    }

    #[test]
    fn test_csv_layout() {
        let text = to_csv_string(&report(), &ExportOptions::default()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "Machine,Nominal power,Load factor,Consumption,Cost,Emissions,Cost per m3"
        );
        assert_eq!(
            lines[1],
            "Head saw,75 kW,65%,8580.00 kWh,1544.40 €,0.429 t,1.54 €"
        );
    }

    #[test]
    fn test_custom_delimiter_and_currency() {
        let options = ExportOptions::with_delimiter(b';').with_currency("CHF");
        let text = to_csv_string(&report(), &options).unwrap();
        assert!(text.contains("Head saw;75 kW;65%"));
        assert!(text.contains("1544.40 CHF"));
    }
}
