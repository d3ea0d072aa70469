//! Emission reference data for CBAM-covered products, keyed by CN (Combined Nomenclature) code.
use crate::input::{deserialise_non_negative, input_err_msg, read_csv};
use crate::units::EmissionIntensity;
use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use indexmap::map::Entry;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

/// Emission intensities for a single product
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductEmissionProfile {
    /// Text description of the product (e.g. "Pig iron")
    pub description: String,
    /// The sector the product belongs to (e.g. "Iron and Steel")
    pub category: String,
    /// Emissions from the production process itself
    pub direct_intensity: EmissionIntensity,
    /// Emissions from purchased energy (mostly electricity)
    pub indirect_intensity: EmissionIntensity,
}

impl ProductEmissionProfile {
    /// Total embedded emissions per tonne of product.
    ///
    /// This is always derived from the direct and indirect components.
    pub fn total_intensity(&self) -> EmissionIntensity {
        self.direct_intensity + self.indirect_intensity
    }
}

/// A lookup table from product code to [`ProductEmissionProfile`].
///
/// Iteration order is the order in which products were inserted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProductTable(IndexMap<String, ProductEmissionProfile>);

/// Built-in reference data, in the same format as a user-supplied product table
const BUILTIN_PRODUCTS: &str = include_str!("../data/products.csv");

/// The built-in table, created on first use and never modified afterwards
static BUILTIN_TABLE: LazyLock<ProductTable> = LazyLock::new(|| {
    ProductTable::from_csv_str(BUILTIN_PRODUCTS).expect("Built-in product table should be valid")
});

/// A row of a product table CSV file
#[derive(Debug, Deserialize, PartialEq)]
struct ProductRaw {
    code: String,
    description: String,
    category: String,
    #[serde(deserialize_with = "deserialise_non_negative")]
    direct: f64,
    #[serde(deserialize_with = "deserialise_non_negative")]
    indirect: f64,
}

impl FromIterator<(String, ProductEmissionProfile)> for ProductTable {
    fn from_iter<I: IntoIterator<Item = (String, ProductEmissionProfile)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl ProductTable {
    /// The built-in reference table shipped with the program.
    ///
    /// This is shared process-wide and can be read concurrently from any thread.
    pub fn builtin() -> &'static ProductTable {
        &BUILTIN_TABLE
    }

    /// Read a product table from a CSV file.
    ///
    /// The file must have the columns `code`, `description`, `category`, `direct` and `indirect`.
    /// Codes are trimmed and must be unique.
    pub fn from_csv(file_path: &Path) -> Result<ProductTable> {
        let rows = read_csv::<ProductRaw>(file_path)?;
        Self::from_rows(rows).with_context(|| input_err_msg(file_path))
    }

    /// Read a product table from CSV text with the same columns as [`ProductTable::from_csv`]
    fn from_csv_str(contents: &str) -> Result<ProductTable> {
        let rows: Vec<ProductRaw> = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(contents.as_bytes())
            .into_deserialize()
            .collect::<Result<_, _>>()?;
        Self::from_rows(rows)
    }

    fn from_rows<I>(rows: I) -> Result<ProductTable>
    where
        I: IntoIterator<Item = ProductRaw>,
    {
        let mut map = IndexMap::new();
        for row in rows {
            let code = row.code.trim().to_string();
            if code.is_empty() {
                bail!("Empty product code for product \"{}\"", row.description);
            }

            match map.entry(code) {
                Entry::Occupied(entry) => bail!("Duplicate product code: {}", entry.key()),
                Entry::Vacant(entry) => {
                    entry.insert(ProductEmissionProfile {
                        description: row.description,
                        category: row.category,
                        direct_intensity: EmissionIntensity(row.direct),
                        indirect_intensity: EmissionIntensity(row.indirect),
                    });
                }
            }
        }

        Ok(Self(map))
    }

    /// Look up a product by its code.
    ///
    /// Leading and trailing whitespace is ignored, but otherwise the code must match exactly.
    ///
    /// # Returns
    ///
    /// The matching profile or `None` if the code is not in the table.
    pub fn lookup(&self, code: &str) -> Option<&ProductEmissionProfile> {
        self.0.get(code.trim())
    }

    /// Iterate over all product codes and profiles
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProductEmissionProfile)> {
        self.0
            .iter()
            .map(|(code, profile)| (code.as_str(), profile))
    }

    /// Iterate over all product codes
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// The unique product categories, in the order they first appear
    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = Vec::new();
        for profile in self.0.values() {
            if !categories.contains(&profile.category.as_str()) {
                categories.push(&profile.category);
            }
        }

        categories
    }

    /// Find products whose description contains `term` (case-insensitive)
    pub fn search<'a>(
        &'a self,
        term: &str,
    ) -> impl Iterator<Item = (&'a str, &'a ProductEmissionProfile)> {
        let term = term.to_lowercase();
        self.iter()
            .filter(move |(_, profile)| profile.description.to_lowercase().contains(&term))
    }

    /// The number of products in the table
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
