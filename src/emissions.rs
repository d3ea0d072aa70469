//! Scope 1 (direct) and Scope 2 (purchased electricity) emissions for an installation, and the
//! savings that could be made by reducing them.
use crate::input::{deserialise_non_negative, read_toml};
use crate::units::{EmissionIntensity, Emissions, Money, MoneyPerEmissions, Tonnes};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use std::path::Path;

// Emission factors (tCO2 per unit of input)
const COKING_COAL_FACTOR: f64 = 1.6; // per tonne
const NATURAL_GAS_FACTOR: f64 = 0.000_494; // per Nm³
const FUEL_OIL_FACTOR: f64 = 3.1; // per tonne
const DIESEL_FACTOR: f64 = 0.0027; // per litre
const LIMESTONE_FACTOR: f64 = 0.44; // per tonne
const ELECTRODE_FACTOR: f64 = 2.8; // per tonne
const ANODE_FACTOR: f64 = 3.6; // per tonne
const REDUCTANTS_FACTOR: f64 = 3.1; // per tonne
const PFC_FACTOR: f64 = 1.0; // per tonne CO2e
const PURCHASED_HEAT_FACTOR: f64 = 0.18; // per MWh
const AMMONIA_FACTOR: f64 = 2.1; // per tonne
const NITRIC_ACID_FACTOR: f64 = 0.3; // per tonne
const ALLOY_ELEMENTS_FACTOR: f64 = 8.0; // per tonne

/// Share of natural gas consumption removed in the efficiency scenario
const NATURAL_GAS_REDUCTION: f64 = 0.2;
/// Estimated investment for the natural gas efficiency scenario (EUR)
const NATURAL_GAS_INVESTMENT: f64 = 50_000.0;
/// Estimated investment for switching to renewable electricity (EUR)
const GREEN_ENERGY_INVESTMENT: f64 = 100_000.0;

fn default_product_output() -> f64 {
    1.0
}

/// Activity data for an installation, as read from `emissions.toml`.
///
/// Either scope may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EmissionInputs {
    /// Direct emissions activity data
    pub scope1: Option<Scope1Inputs>,
    /// Purchased electricity activity data
    pub scope2: Option<Scope2Inputs>,
}

impl EmissionInputs {
    /// Read activity data from a TOML file
    pub fn from_toml(file_path: &Path) -> Result<Self> {
        read_toml(file_path)
    }
}

/// Scope 1 activity data
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Scope1Inputs {
    /// Stationary combustion
    #[serde(default)]
    pub fuel: FuelInputs,
    /// Mobile combustion (forklifts, vehicles etc.)
    #[serde(default)]
    pub mobile: MobileInputs,
    /// Process inputs
    #[serde(default)]
    pub process: ProcessInputs,
    /// Reheating and purchased heat
    #[serde(default)]
    pub thermal_systems: ThermalInputs,
    /// Output of the installation in tonnes, used to calculate emission intensity
    #[serde(default = "default_product_output")]
    pub product_output_ton: f64,
}

/// Stationary combustion fuels
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FuelInputs {
    /// Coking coal (t)
    #[serde(default, deserialize_with = "deserialise_non_negative")]
    pub coking_coal_ton: f64,
    /// Natural gas (Nm³)
    #[serde(default, deserialize_with = "deserialise_non_negative")]
    pub natural_gas_nm3: f64,
    /// Fuel oil (t)
    #[serde(default, deserialize_with = "deserialise_non_negative")]
    pub fuel_oil_ton: f64,
}

/// Mobile combustion fuels
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MobileInputs {
    /// Diesel (l)
    #[serde(default, deserialize_with = "deserialise_non_negative")]
    pub diesel_liter: f64,
}

/// Process inputs which release greenhouse gases when consumed
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProcessInputs {
    /// Limestone (t)
    #[serde(default, deserialize_with = "deserialise_non_negative")]
    pub limestone_ton: f64,
    /// Graphite electrodes (electric arc furnace steel)
    #[serde(default, deserialize_with = "deserialise_non_negative")]
    pub electrode_ton: f64,
    /// Carbon anodes (aluminium)
    #[serde(default, deserialize_with = "deserialise_non_negative")]
    pub anode_ton: f64,
    /// Injected coke and other reductants (t)
    #[serde(default, deserialize_with = "deserialise_non_negative")]
    pub reductants_ton: f64,
    /// Perfluorocarbon emissions already expressed in tCO2e
    #[serde(default, deserialize_with = "deserialise_non_negative")]
    pub pfc_emissions_ton: f64,
    /// Ammonia produced (t)
    #[serde(default, deserialize_with = "deserialise_non_negative")]
    pub ammonia_ton: f64,
    /// Nitric acid produced (t)
    #[serde(default, deserialize_with = "deserialise_non_negative")]
    pub nitric_acid_ton: f64,
    /// Alloying elements such as magnesium and silicon
    #[serde(default, deserialize_with = "deserialise_non_negative")]
    pub alloy_elements_ton: f64,
}

/// Heat inputs
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ThermalInputs {
    /// Natural gas burnt in reheating furnaces
    #[serde(default, deserialize_with = "deserialise_non_negative")]
    pub reheating_fuel_nm3: f64,
    /// Heat bought from outside the installation in megawatt hours
    #[serde(default, deserialize_with = "deserialise_non_negative")]
    pub purchased_heat_mwh: f64,
}

/// Scope 2 activity data
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Scope2Inputs {
    /// Electricity consumed in megawatt hours
    #[serde(default, deserialize_with = "deserialise_non_negative")]
    pub electricity_consumption_mwh: f64,
    /// Emission factor of the grid (kgCO2/kWh)
    #[serde(default, deserialize_with = "deserialise_non_negative")]
    pub grid_emission_factor_kgco2_kwh: f64,
    /// Where the electricity comes from
    #[serde(default)]
    pub source_type: ElectricitySource,
}

/// Where purchased electricity comes from
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    SerializeLabeledStringEnum,
    DeserializeLabeledStringEnum,
)]
pub enum ElectricitySource {
    /// The standard grid mix
    #[default]
    #[string = "grid"]
    Grid,
    /// Grid electricity backed by renewable energy certificates
    #[string = "irec"]
    Irec,
    /// A power purchase agreement with a renewable generator
    #[string = "ppa"]
    Ppa,
    /// On-site solar
    #[string = "solar"]
    Solar,
}

impl ElectricitySource {
    /// Whether electricity from this source is counted as zero-emission
    pub fn is_green(self) -> bool {
        !matches!(self, Self::Grid)
    }

    /// A human-readable description of the source
    pub fn description(self) -> &'static str {
        match self {
            Self::Grid => "Standard grid mix",
            Self::Irec => "Green energy verified (I-REC)",
            Self::Ppa => "Green energy verified (PPA)",
            Self::Solar => "Green energy verified (solar)",
        }
    }
}

/// Emissions attributed to a single source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceEmissions {
    /// Name of the source
    pub source: &'static str,
    /// Emissions from the source
    pub emissions: Emissions,
}

impl SourceEmissions {
    fn new(source: &'static str, activity: f64, factor: f64) -> Self {
        Self {
            source,
            emissions: Emissions(activity * factor),
        }
    }
}

/// Percentage of an emissions total contributed by each Scope 1 category
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[allow(missing_docs)]
pub struct Scope1Shares {
    pub fuel: f64,
    pub mobile: f64,
    pub process: f64,
    pub thermal: f64,
}

/// Calculated Scope 1 emissions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scope1Emissions {
    /// Emissions from stationary combustion, by fuel
    pub fuel: Vec<SourceEmissions>,
    /// Emissions from mobile combustion, by fuel
    pub mobile: Vec<SourceEmissions>,
    /// Emissions from process inputs, by input
    pub process: Vec<SourceEmissions>,
    /// Emissions from heat, by source
    pub thermal: Vec<SourceEmissions>,
    /// Total of [`Self::fuel`]
    pub total_fuel: Emissions,
    /// Total of [`Self::mobile`]
    pub total_mobile: Emissions,
    /// Total of [`Self::process`]
    pub total_process: Emissions,
    /// Total of [`Self::thermal`]
    pub total_thermal: Emissions,
    /// Sum of all Scope 1 categories
    pub total: Emissions,
    /// Output of the installation
    pub product_output: Tonnes,
    /// Emissions per tonne of output (zero if there is no output)
    pub intensity: EmissionIntensity,
    /// Percentage of the total from each category
    pub breakdown_percent: Scope1Shares,
}

/// Calculated Scope 2 emissions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scope2Emissions {
    /// Electricity consumed in megawatt hours
    pub consumption_mwh: f64,
    /// Emission factor of the grid (kgCO2/kWh)
    pub grid_emission_factor: f64,
    /// Where the electricity comes from
    pub source_type: ElectricitySource,
    /// Whether the electricity is counted as zero-emission
    pub is_green_energy: bool,
    /// Human-readable description of the source
    pub description: &'static str,
    /// Emissions from purchased electricity
    pub total: Emissions,
}

/// Emissions across both scopes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmissionsSummary {
    /// Scope 1 emissions, if activity data was given
    pub scope1: Option<Scope1Emissions>,
    /// Scope 2 emissions, if activity data was given
    pub scope2: Option<Scope2Emissions>,
    /// Scope 1 plus Scope 2
    pub total: Emissions,
    /// Percentage of the total from Scope 1
    pub scope1_percent: f64,
    /// Percentage of the total from Scope 2
    pub scope2_percent: f64,
}

/// Percentage of `total` made up by `part`, or zero if `total` is not positive
fn percent_of(part: Emissions, total: Emissions) -> f64 {
    if total.value() > 0.0 {
        (part / total).value() * 100.0
    } else {
        0.0
    }
}

fn sum_emissions(sources: &[SourceEmissions]) -> Emissions {
    sources.iter().map(|s| s.emissions).sum()
}

/// Calculate Scope 1 emissions from activity data
pub fn calculate_scope1(inputs: &Scope1Inputs) -> Scope1Emissions {
    let Scope1Inputs {
        fuel,
        mobile,
        process,
        thermal_systems: thermal,
        product_output_ton,
    } = inputs;

    let fuel = vec![
        SourceEmissions::new("coking_coal", fuel.coking_coal_ton, COKING_COAL_FACTOR),
        SourceEmissions::new("natural_gas", fuel.natural_gas_nm3, NATURAL_GAS_FACTOR),
        SourceEmissions::new("fuel_oil", fuel.fuel_oil_ton, FUEL_OIL_FACTOR),
    ];
    let diesel = SourceEmissions::new("diesel", mobile.diesel_liter, DIESEL_FACTOR);
    let mobile = vec![diesel];
    let process = vec![
        SourceEmissions::new("limestone", process.limestone_ton, LIMESTONE_FACTOR),
        SourceEmissions::new("electrode", process.electrode_ton, ELECTRODE_FACTOR),
        SourceEmissions::new("anode", process.anode_ton, ANODE_FACTOR),
        SourceEmissions::new("reductants", process.reductants_ton, REDUCTANTS_FACTOR),
        SourceEmissions::new("pfc", process.pfc_emissions_ton, PFC_FACTOR),
        SourceEmissions::new("ammonia", process.ammonia_ton, AMMONIA_FACTOR),
        SourceEmissions::new("nitric_acid", process.nitric_acid_ton, NITRIC_ACID_FACTOR),
        SourceEmissions::new(
            "alloy_elements",
            process.alloy_elements_ton,
            ALLOY_ELEMENTS_FACTOR,
        ),
    ];
    let thermal = vec![
        SourceEmissions::new("reheating", thermal.reheating_fuel_nm3, NATURAL_GAS_FACTOR),
        SourceEmissions::new(
            "purchased_heat",
            thermal.purchased_heat_mwh,
            PURCHASED_HEAT_FACTOR,
        ),
    ];

    let total_fuel = sum_emissions(&fuel);
    let total_mobile = sum_emissions(&mobile);
    let total_process = sum_emissions(&process);
    let total_thermal = sum_emissions(&thermal);
    let total = total_fuel + total_mobile + total_process + total_thermal;

    let product_output = Tonnes(*product_output_ton);
    let intensity = if product_output.value() > 0.0 {
        total / product_output
    } else {
        EmissionIntensity(0.0)
    };

    Scope1Emissions {
        fuel,
        mobile,
        process,
        thermal,
        total_fuel,
        total_mobile,
        total_process,
        total_thermal,
        total,
        product_output,
        intensity,
        breakdown_percent: Scope1Shares {
            fuel: percent_of(total_fuel, total),
            mobile: percent_of(total_mobile, total),
            process: percent_of(total_process, total),
            thermal: percent_of(total_thermal, total),
        },
    }
}

/// Emissions from grid electricity, ignoring the declared source
fn grid_electricity_emissions(inputs: &Scope2Inputs) -> Emissions {
    // MWh * kgCO2/kWh gives tCO2
    Emissions(inputs.electricity_consumption_mwh * inputs.grid_emission_factor_kgco2_kwh)
}

/// Calculate Scope 2 emissions from activity data.
///
/// Electricity from a green source is counted as zero-emission.
pub fn calculate_scope2(inputs: &Scope2Inputs) -> Scope2Emissions {
    let is_green_energy = inputs.source_type.is_green();
    let total = if is_green_energy {
        Emissions(0.0)
    } else {
        grid_electricity_emissions(inputs)
    };

    Scope2Emissions {
        consumption_mwh: inputs.electricity_consumption_mwh,
        grid_emission_factor: inputs.grid_emission_factor_kgco2_kwh,
        source_type: inputs.source_type,
        is_green_energy,
        description: inputs.source_type.description(),
        total,
    }
}

/// Calculate emissions for whichever scopes have activity data
pub fn summarise(inputs: &EmissionInputs) -> EmissionsSummary {
    let scope1 = inputs.scope1.as_ref().map(calculate_scope1);
    let scope2 = inputs.scope2.as_ref().map(calculate_scope2);
    let scope1_total = scope1.as_ref().map_or(Emissions(0.0), |s| s.total);
    let scope2_total = scope2.as_ref().map_or(Emissions(0.0), |s| s.total);
    let total = scope1_total + scope2_total;

    EmissionsSummary {
        scope1,
        scope2,
        total,
        scope1_percent: percent_of(scope1_total, total),
        scope2_percent: percent_of(scope2_total, total),
    }
}

/// Which emission-reduction measure a scenario represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScenarioKind {
    /// Burn less natural gas
    NaturalGasReduction,
    /// Replace grid electricity with renewable electricity
    GreenEnergyTransition,
    /// All applicable scenarios together
    Combined,
}

/// An emission-reduction measure with its estimated costs and savings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimisationScenario {
    /// Which measure this is
    pub kind: ScenarioKind,
    /// Human-readable name
    pub name: &'static str,
    /// Annual emissions avoided
    pub emission_saving: Emissions,
    /// Annual CBAM cost avoided at the reference carbon price
    pub annual_saving: Money,
    /// Up-front investment needed
    pub investment: Money,
    /// Years for the saving to pay back the investment (zero if there is no saving)
    pub roi_years: f64,
    /// Percentage of total emissions avoided (combined scenario only)
    pub emission_reduction_percent: Option<f64>,
    /// Concrete actions making up the scenario
    pub measures: Vec<&'static str>,
}

impl OptimisationScenario {
    fn new(
        kind: ScenarioKind,
        name: &'static str,
        emission_saving: Emissions,
        carbon_price: MoneyPerEmissions,
        investment: Money,
        measures: Vec<&'static str>,
    ) -> Self {
        let annual_saving = emission_saving * carbon_price;
        Self {
            kind,
            name,
            emission_saving,
            annual_saving,
            investment,
            roi_years: payback_years(investment, annual_saving),
            emission_reduction_percent: None,
            measures,
        }
    }
}

/// Years needed for `annual_saving` to recover `investment`
fn payback_years(investment: Money, annual_saving: Money) -> f64 {
    if annual_saving.value() > 0.0 {
        (investment / annual_saving).value()
    } else {
        0.0
    }
}

/// Generate emission-reduction scenarios for an installation.
///
/// A combined scenario is added when more than one individual scenario applies.
///
/// # Arguments
///
/// * `inputs` - Activity data for the installation
/// * `total_emissions` - Total Scope 1 and 2 emissions, used for the combined reduction percentage
/// * `carbon_price` - Reference carbon price used to value avoided emissions
pub fn optimisation_scenarios(
    inputs: &EmissionInputs,
    total_emissions: Emissions,
    carbon_price: MoneyPerEmissions,
) -> Vec<OptimisationScenario> {
    let mut scenarios = Vec::new();

    if let Some(scope1) = &inputs.scope1
        && scope1.fuel.natural_gas_nm3 > 0.0
    {
        let reduced_nm3 = scope1.fuel.natural_gas_nm3 * NATURAL_GAS_REDUCTION;
        scenarios.push(OptimisationScenario::new(
            ScenarioKind::NaturalGasReduction,
            "Reduce natural gas consumption by 20%",
            Emissions(reduced_nm3 * NATURAL_GAS_FACTOR),
            carbon_price,
            Money(NATURAL_GAS_INVESTMENT),
            vec![
                "Waste heat recovery systems",
                "High-efficiency burner technology",
                "Process optimisation",
            ],
        ));
    }

    if let Some(scope2) = &inputs.scope2
        && scope2.source_type == ElectricitySource::Grid
        && scope2.electricity_consumption_mwh > 0.0
    {
        scenarios.push(OptimisationScenario::new(
            ScenarioKind::GreenEnergyTransition,
            "Switch to renewable electricity (I-REC / PPA / solar)",
            grid_electricity_emissions(scope2),
            carbon_price,
            Money(GREEN_ENERGY_INVESTMENT),
            vec![
                "Purchase I-REC certificates",
                "Sign a power purchase agreement",
                "Install rooftop solar",
            ],
        ));
    }

    if scenarios.len() > 1 {
        let emission_saving: Emissions = scenarios.iter().map(|s| s.emission_saving).sum();
        let annual_saving: Money = scenarios.iter().map(|s| s.annual_saving).sum();
        let investment: Money = scenarios.iter().map(|s| s.investment).sum();
        scenarios.push(OptimisationScenario {
            kind: ScenarioKind::Combined,
            name: "Combined transition strategy",
            emission_saving,
            annual_saving,
            investment,
            roi_years: payback_years(investment, annual_saving),
            emission_reduction_percent: Some(percent_of(emission_saving, total_emissions)),
            measures: Vec::new(),
        });
    }

    scenarios
}

/// Emissions for an installation together with the scenarios for reducing them
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmissionsAnalysis {
    /// Emissions across both scopes
    pub summary: EmissionsSummary,
    /// Emission-reduction scenarios
    pub scenarios: Vec<OptimisationScenario>,
}

impl EmissionsAnalysis {
    /// Analyse activity data, valuing avoided emissions at `carbon_price`
    pub fn new(inputs: &EmissionInputs, carbon_price: MoneyPerEmissions) -> Self {
        let summary = summarise(inputs);
        let scenarios = optimisation_scenarios(inputs, summary.total, carbon_price);

        Self { summary, scenarios }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::steel_emission_inputs;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;
    use std::fs;
    use tempfile::tempdir;

    #[rstest]
    fn test_calculate_scope1(steel_emission_inputs: EmissionInputs) {
        let scope1 = calculate_scope1(steel_emission_inputs.scope1.as_ref().unwrap());

        // 1000 t coking coal + 500,000 Nm³ natural gas
        assert_approx_eq!(
            Emissions,
            scope1.total_fuel,
            Emissions(1600.0 + 247.0),
            epsilon = 1e-9
        );
        // 10,000 l diesel
        assert_approx_eq!(
            Emissions,
            scope1.total_mobile,
            Emissions(27.0),
            epsilon = 1e-9
        );
        // 200 t limestone + 50 t electrode
        assert_approx_eq!(
            Emissions,
            scope1.total_process,
            Emissions(88.0 + 140.0),
            epsilon = 1e-9
        );
        // 100,000 Nm³ reheating + 100 MWh heat
        assert_approx_eq!(
            Emissions,
            scope1.total_thermal,
            Emissions(49.4 + 18.0),
            epsilon = 1e-9
        );
        assert_approx_eq!(
            Emissions,
            scope1.total,
            Emissions(1847.0 + 27.0 + 228.0 + 67.4),
            epsilon = 1e-9
        );
        assert_approx_eq!(
            EmissionIntensity,
            scope1.intensity,
            EmissionIntensity(2169.4 / 1000.0),
            epsilon = 1e-12
        );

        let shares = scope1.breakdown_percent;
        assert_approx_eq!(
            f64,
            shares.fuel + shares.mobile + shares.process + shares.thermal,
            100.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_calculate_scope1_no_output() {
        let inputs = Scope1Inputs {
            fuel: FuelInputs {
                fuel_oil_ton: 10.0,
                ..Default::default()
            },
            mobile: MobileInputs::default(),
            process: ProcessInputs::default(),
            thermal_systems: ThermalInputs::default(),
            product_output_ton: 0.0,
        };
        let scope1 = calculate_scope1(&inputs);
        assert_approx_eq!(Emissions, scope1.total, Emissions(31.0), epsilon = 1e-9);
        assert_eq!(scope1.intensity, EmissionIntensity(0.0));
    }

    #[test]
    fn test_calculate_scope1_empty() {
        let scope1: Scope1Inputs = toml::from_str("").unwrap();
        assert_eq!(scope1.product_output_ton, 1.0);
        let scope1 = calculate_scope1(&scope1);
        assert_eq!(scope1.total, Emissions(0.0));
        assert_eq!(scope1.breakdown_percent, Scope1Shares::default());
    }

    #[rstest]
    #[case(ElectricitySource::Grid, 800.0, false)]
    #[case(ElectricitySource::Irec, 0.0, true)]
    #[case(ElectricitySource::Ppa, 0.0, true)]
    #[case(ElectricitySource::Solar, 0.0, true)]
    fn test_calculate_scope2(
        #[case] source_type: ElectricitySource,
        #[case] expected: f64,
        #[case] is_green: bool,
    ) {
        let inputs = Scope2Inputs {
            electricity_consumption_mwh: 2000.0,
            grid_emission_factor_kgco2_kwh: 0.4,
            source_type,
        };
        let scope2 = calculate_scope2(&inputs);
        assert_approx_eq!(Emissions, scope2.total, Emissions(expected), epsilon = 1e-9);
        assert_eq!(scope2.is_green_energy, is_green);
    }

    #[rstest]
    fn test_summarise(steel_emission_inputs: EmissionInputs) {
        let summary = summarise(&steel_emission_inputs);
        assert_approx_eq!(
            Emissions,
            summary.total,
            Emissions(2169.4 + 800.0),
            epsilon = 1e-9
        );
        assert_approx_eq!(
            f64,
            summary.scope1_percent + summary.scope2_percent,
            100.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_summarise_empty() {
        let summary = summarise(&EmissionInputs::default());
        assert!(summary.scope1.is_none());
        assert!(summary.scope2.is_none());
        assert_eq!(summary.total, Emissions(0.0));
        assert_eq!(summary.scope1_percent, 0.0);
        assert_eq!(summary.scope2_percent, 0.0);
    }

    #[rstest]
    fn test_optimisation_scenarios(steel_emission_inputs: EmissionInputs) {
        let total = summarise(&steel_emission_inputs).total;
        let scenarios =
            optimisation_scenarios(&steel_emission_inputs, total, MoneyPerEmissions(85.0));
        let kinds: Vec<_> = scenarios.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            [
                ScenarioKind::NaturalGasReduction,
                ScenarioKind::GreenEnergyTransition,
                ScenarioKind::Combined
            ]
        );

        // 20% of 500,000 Nm³
        let gas = &scenarios[0];
        assert_approx_eq!(
            Emissions,
            gas.emission_saving,
            Emissions(49.4),
            epsilon = 1e-9
        );
        assert_approx_eq!(Money, gas.annual_saving, Money(4199.0), epsilon = 1e-6);
        assert_approx_eq!(f64, gas.roi_years, 50_000.0 / 4199.0, epsilon = 1e-9);

        let green = &scenarios[1];
        assert_approx_eq!(
            Emissions,
            green.emission_saving,
            Emissions(800.0),
            epsilon = 1e-9
        );
        assert_approx_eq!(Money, green.annual_saving, Money(68_000.0), epsilon = 1e-6);

        let combined = &scenarios[2];
        assert_approx_eq!(Money, combined.investment, Money(150_000.0));
        assert_approx_eq!(
            Money,
            combined.annual_saving,
            Money(72_199.0),
            epsilon = 1e-6
        );
        assert_approx_eq!(
            f64,
            combined.emission_reduction_percent.unwrap(),
            849.4 / 2969.4 * 100.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_optimisation_scenarios_green_source() {
        let inputs = EmissionInputs {
            scope1: None,
            scope2: Some(Scope2Inputs {
                electricity_consumption_mwh: 2000.0,
                grid_emission_factor_kgco2_kwh: 0.4,
                source_type: ElectricitySource::Ppa,
            }),
        };
        assert!(
            optimisation_scenarios(&inputs, Emissions(0.0), MoneyPerEmissions(85.0)).is_empty()
        );
    }

    #[test]
    fn test_optimisation_scenarios_zero_price() {
        let inputs = EmissionInputs {
            scope1: None,
            scope2: Some(Scope2Inputs {
                electricity_consumption_mwh: 100.0,
                grid_emission_factor_kgco2_kwh: 0.5,
                source_type: ElectricitySource::Grid,
            }),
        };
        let scenarios = optimisation_scenarios(&inputs, Emissions(50.0), MoneyPerEmissions(0.0));
        assert_eq!(scenarios.len(), 1);
        assert_eq!(scenarios[0].roi_years, 0.0);
    }

    #[test]
    fn test_from_toml() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("emissions.toml");
        fs::write(
            &file_path,
            "[scope1.fuel]\nnatural_gas_nm3 = 1000\n\n[scope2]\nelectricity_consumption_mwh = 10\n\
             grid_emission_factor_kgco2_kwh = 0.5\nsource_type = \"solar\"\n",
        )
        .unwrap();
        let inputs = EmissionInputs::from_toml(&file_path).unwrap();
        let scope1 = inputs.scope1.unwrap();
        assert_eq!(scope1.fuel.natural_gas_nm3, 1000.0);
        assert_eq!(scope1.product_output_ton, 1.0);
        assert_eq!(inputs.scope2.unwrap().source_type, ElectricitySource::Solar);

        fs::write(&file_path, "[scope1.fuel]\nnatural_gas_nm3 = -1\n").unwrap();
        assert!(EmissionInputs::from_toml(&file_path).is_err());
    }
}
