//! Code related to the CLI commands for looking up products in the emission reference table
use super::TableOpts;
use crate::product::{ProductEmissionProfile, ProductTable};
use anyhow::{Result, ensure};
use clap::Subcommand;
use unicase::UniCase;

/// Subcommands for looking up products
#[derive(Subcommand)]
pub enum ProductSubcommands {
    /// List products and their emission intensities.
    List {
        /// Only list products in this category
        #[arg(long)]
        category: Option<String>,
        /// Emission reference table
        #[command(flatten)]
        table: TableOpts,
    },
    /// Search for products by description.
    Search {
        /// Text to look for in product descriptions.
        term: String,
        /// Emission reference table
        #[command(flatten)]
        table: TableOpts,
    },
    /// List product categories.
    Categories {
        /// Emission reference table
        #[command(flatten)]
        table: TableOpts,
    },
}

impl ProductSubcommands {
    /// Execute the supplied products subcommand
    pub fn execute(self) -> Result<()> {
        match self {
            Self::List { category, table } => {
                let table = table.load()?;
                handle_products_list_command(&table, category.as_deref())
            }
            Self::Search { term, table } => {
                let table = table.load()?;
                handle_products_search_command(&table, &term)
            }
            Self::Categories { table } => {
                let table = table.load()?;
                handle_products_categories_command(&table);
                Ok(())
            }
        }
    }
}

/// Print one product per line
fn print_product(code: &str, profile: &ProductEmissionProfile) {
    println!(
        "{code:<10} {:<50} {:>6.3} tCO2e/t  ({})",
        profile.description,
        profile.total_intensity().value(),
        profile.category
    );
}

/// Products in `category` (case-insensitive), or all products if `None`
pub fn products_in_category<'a>(
    table: &'a ProductTable,
    category: Option<&str>,
) -> Vec<(&'a str, &'a ProductEmissionProfile)> {
    let category = category.map(UniCase::new);
    table
        .iter()
        .filter(|(_, profile)| {
            category
                .as_ref()
                .is_none_or(|category| *category == UniCase::new(profile.category.as_str()))
        })
        .collect()
}

/// Handle the `products list` command
pub fn handle_products_list_command(table: &ProductTable, category: Option<&str>) -> Result<()> {
    let products = products_in_category(table, category);
    if let Some(category) = category {
        ensure!(!products.is_empty(), "No products in category {category}");
    }

    for (code, profile) in products {
        print_product(code, profile);
    }

    Ok(())
}

/// Handle the `products search` command
pub fn handle_products_search_command(table: &ProductTable, term: &str) -> Result<()> {
    let mut found = false;
    for (code, profile) in table.search(term) {
        print_product(code, profile);
        found = true;
    }
    ensure!(found, "No products matching \"{term}\"");

    Ok(())
}

/// Handle the `products categories` command
pub fn handle_products_categories_command(table: &ProductTable) {
    for category in table.categories() {
        println!("{category}");
    }
}
