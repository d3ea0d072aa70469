//! Calculation of embedded emissions and CBAM certificate costs for an import.
use crate::product::{ProductEmissionProfile, ProductTable};
use crate::units::{EmissionIntensity, Emissions, Money, MoneyPerEmissions, Tonnes};
use anyhow::{Result, ensure};
use serde::Serialize;

/// The inputs needed to calculate the CBAM cost of an import
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostCalculationInput {
    /// The EU ETS carbon price
    pub reference_carbon_price: MoneyPerEmissions,
    /// Amount of product imported
    pub quantity: Tonnes,
    /// Emissions from the production process per tonne of product
    pub direct_intensity: EmissionIntensity,
    /// Emissions from purchased energy per tonne of product
    pub indirect_intensity: EmissionIntensity,
    /// Carbon price already paid in the country of origin
    pub foreign_carbon_price: MoneyPerEmissions,
}

impl CostCalculationInput {
    /// Create a new input with no carbon price paid in the country of origin
    pub fn new(
        reference_carbon_price: MoneyPerEmissions,
        quantity: Tonnes,
        direct_intensity: EmissionIntensity,
        indirect_intensity: EmissionIntensity,
    ) -> Self {
        Self {
            reference_carbon_price,
            quantity,
            direct_intensity,
            indirect_intensity,
            foreign_carbon_price: MoneyPerEmissions(0.0),
        }
    }

    /// Create a new input from a product's emission profile
    pub fn from_profile(
        profile: &ProductEmissionProfile,
        quantity: Tonnes,
        reference_carbon_price: MoneyPerEmissions,
    ) -> Self {
        Self::new(
            reference_carbon_price,
            quantity,
            profile.direct_intensity,
            profile.indirect_intensity,
        )
    }

    /// Set the carbon price already paid in the country of origin
    pub fn with_foreign_carbon_price(mut self, price: MoneyPerEmissions) -> Self {
        self.foreign_carbon_price = price;
        self
    }

    /// Check that the input values are sensible.
    ///
    /// [`calculate`] accepts any values, so this should be called wherever input arrives from the
    /// user. Emission intensities are not checked.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.quantity.is_finite() && self.quantity >= Tonnes(0.0),
            "Quantity must be a finite number greater than or equal to zero"
        );
        ensure!(
            self.reference_carbon_price.is_finite(),
            "Reference carbon price must be a finite number"
        );
        ensure!(
            self.foreign_carbon_price.is_finite(),
            "Foreign carbon price must be a finite number"
        );

        Ok(())
    }
}

/// The results of a CBAM cost calculation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostCalculationResult {
    /// Direct plus indirect emission intensity
    pub total_intensity: EmissionIntensity,
    /// Total emissions embedded in the import
    pub total_emission: Emissions,
    /// Number of CBAM certificates to surrender (one per tCO2e)
    pub certificates_required: f64,
    /// Cost of the certificates at the reference price
    pub gross_cost: Money,
    /// Cost after deducting the carbon price paid in the country of origin
    pub adjusted_cost: Money,
}

/// Calculate the embedded emissions and CBAM cost for an import.
///
/// No rounding is applied and no validation is performed.
pub fn calculate(input: &CostCalculationInput) -> CostCalculationResult {
    let total_intensity = input.direct_intensity + input.indirect_intensity;
    let total_emission = input.quantity * total_intensity;
    let certificates_required = total_emission.value();
    let gross_cost = total_emission * input.reference_carbon_price;
    let adjusted_cost = gross_cost - total_emission * input.foreign_carbon_price;

    CostCalculationResult {
        total_intensity,
        total_emission,
        certificates_required,
        gross_cost,
        adjusted_cost,
    }
}

/// A complete CBAM cost summary for a product
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostSummary {
    /// The product code as found in the table
    pub product_code: String,
    /// Text description of the product
    pub product: String,
    /// The sector the product belongs to
    pub category: String,
    /// Amount of product imported
    pub quantity: Tonnes,
    /// Emissions from the production process per tonne of product
    pub direct_intensity: EmissionIntensity,
    /// Emissions from purchased energy per tonne of product
    pub indirect_intensity: EmissionIntensity,
    /// The EU ETS carbon price used
    pub reference_carbon_price: MoneyPerEmissions,
    /// The calculated emissions and costs
    #[serde(flatten)]
    pub result: CostCalculationResult,
}

/// Look up a product and calculate its CBAM cost.
///
/// # Returns
///
/// The cost summary or `None` if the product code is unknown.
pub fn get_summary(
    table: &ProductTable,
    product_code: &str,
    quantity: Tonnes,
    reference_carbon_price: MoneyPerEmissions,
) -> Option<CostSummary> {
    get_summary_with_foreign_price(
        table,
        product_code,
        quantity,
        reference_carbon_price,
        MoneyPerEmissions(0.0),
    )
}

/// As [`get_summary`], but deducting a carbon price already paid in the country of origin
pub fn get_summary_with_foreign_price(
    table: &ProductTable,
    product_code: &str,
    quantity: Tonnes,
    reference_carbon_price: MoneyPerEmissions,
    foreign_carbon_price: MoneyPerEmissions,
) -> Option<CostSummary> {
    let profile = table.lookup(product_code)?;
    let input = CostCalculationInput::from_profile(profile, quantity, reference_carbon_price)
        .with_foreign_carbon_price(foreign_carbon_price);

    Some(CostSummary {
        product_code: product_code.trim().to_string(),
        product: profile.description.clone(),
        category: profile.category.clone(),
        quantity,
        direct_intensity: profile.direct_intensity,
        indirect_intensity: profile.indirect_intensity,
        reference_carbon_price,
        result: calculate(&input),
    })
}
