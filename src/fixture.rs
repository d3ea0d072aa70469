//! Fixtures for tests
use crate::calculator::{CostSummary, get_summary};
use crate::emissions::{
    ElectricitySource, EmissionInputs, FuelInputs, MobileInputs, ProcessInputs, Scope1Inputs,
    Scope2Inputs, ThermalInputs,
};
use crate::llm::TextGenerator;
use crate::product::ProductTable;
use crate::units::{MoneyPerEmissions, Tonnes};
use anyhow::Result;
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// A text generator which always gives the same response
pub struct FixedGenerator(pub String);

impl TextGenerator for FixedGenerator {
    fn generate(&self, _model: &str, _prompt: &str) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// 1000 t of pig iron at 85 EUR/tCO2e
#[fixture]
pub fn pig_iron_summary() -> CostSummary {
    get_summary(
        ProductTable::builtin(),
        "7201",
        Tonnes(1000.0),
        MoneyPerEmissions(85.0),
    )
    .unwrap()
}

/// Annual activity data for a small steel works supplied from the grid
#[fixture]
pub fn steel_emission_inputs() -> EmissionInputs {
    EmissionInputs {
        scope1: Some(Scope1Inputs {
            fuel: FuelInputs {
                coking_coal_ton: 1000.0,
                natural_gas_nm3: 500_000.0,
                fuel_oil_ton: 0.0,
            },
            mobile: MobileInputs {
                diesel_liter: 10_000.0,
            },
            process: ProcessInputs {
                limestone_ton: 200.0,
                electrode_ton: 50.0,
                ..ProcessInputs::default()
            },
            thermal_systems: ThermalInputs {
                reheating_fuel_nm3: 100_000.0,
                purchased_heat_mwh: 100.0,
            },
            product_output_ton: 1000.0,
        }),
        scope2: Some(Scope2Inputs {
            electricity_consumption_mwh: 2000.0,
            grid_emission_factor_kgco2_kwh: 0.4,
            source_type: ElectricitySource::Grid,
        }),
    }
}
