//! Content validation command implementation.

use super::{CliError, read_catalog};
use mergeboard::GameConfig;
use mergeboard::game::{Category, ItemCatalog};
use std::path::Path;

/// Execute the validate command.
///
/// # Errors
///
/// Returns an error if the catalog or config cannot be read or is invalid.
pub(crate) fn execute(catalog_path: &Path, config_path: Option<&Path>) -> Result<(), CliError> {
    println!("Validating: {}", catalog_path.display());
    println!();

    let catalog = read_catalog(catalog_path);
    print_check("Catalog parses and links", catalog.is_ok());
    let catalog = catalog?;

    if let Some(path) = config_path {
        let config = GameConfig::load(path);
        print_check("Config parses", config.is_ok());
        let config = config?;

        let valid = config.validate(&catalog);
        print_check("Config matches catalog", valid.is_ok());
        valid?;
    }

    println!();
    print_summary(&catalog);
    println!();
    println!("Validation successful!");

    Ok(())
}

fn print_check(name: &str, ok: bool) {
    println!("  [{}] {name}", if ok { "OK" } else { "FAILED" });
}

fn print_summary(catalog: &ItemCatalog) {
    let count = |category: Category| {
        catalog
            .iter()
            .filter(|def| def.category == category)
            .count()
    };

    println!("Summary:");
    println!("  Item types:   {}", catalog.len());
    println!("  Generators:   {}", count(Category::Generator));
    println!("  Chests:       {}", count(Category::Chest));
    println!("  Blockers:     {}", count(Category::Blocker));
    println!("  Merge chains:");
    for root in catalog.chain_roots() {
        let Ok(chain) = catalog.chain(&root.id) else {
            continue;
        };
        let names: Vec<&str> = chain.iter().map(|def| def.id.as_str()).collect();
        println!("    {}", names.join(" -> "));
    }
}
