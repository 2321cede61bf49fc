//! Save inspection command implementation.

use super::{CliError, load_content};
use mergeboard::render::{render_board, render_economy};
use mergeboard::{GameSession, Snapshot, SystemClock};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::Path;

/// Execute the inspect command.
///
/// The save is restored against the current time, so the energy shown
/// includes offline regeneration. The file itself is not modified.
///
/// # Errors
///
/// Returns an error if the save or content cannot be loaded, or the save
/// does not restore against the content.
pub(crate) fn execute(
    save: &Path,
    catalog: Option<&Path>,
    config: Option<&Path>,
) -> Result<(), CliError> {
    let (catalog, config) = load_content(catalog, config)?;
    let snapshot = Snapshot::load(save)?;
    let session = GameSession::restore(
        snapshot,
        catalog,
        config,
        SystemClock,
        StdRng::seed_from_u64(0),
    )?;

    println!("Save: {}", save.display());
    println!();
    print!("{}", render_board(session.board(), session.catalog()));
    println!();
    println!("{}", render_economy(session.economy()));
    if let Some(ms) = session.time_to_next_energy() {
        println!("Next energy in {}s", ms.div_ceil(1_000));
    }

    let completed: Vec<String> = session
        .progress()
        .iter()
        .map(|(id, times)| format!("{id} (x{times})"))
        .collect();
    if !completed.is_empty() {
        println!("Completed gates: {}", completed.join(", "));
    }

    let violations = session.check_invariants();
    if !violations.is_empty() {
        for violation in &violations {
            println!("{violation}");
        }
        return Err(CliError::new(format!(
            "{} invariant violations",
            violations.len()
        )));
    }

    Ok(())
}
