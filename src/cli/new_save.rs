//! New save command implementation.

use super::{CliError, load_content};
use mergeboard::{GameSession, SystemClock};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::Path;

/// Execute the new-save command.
///
/// A fresh board draws no randomness and snapshots carry no RNG state, so
/// the session RNG is fixed.
///
/// # Errors
///
/// Returns an error if the content is invalid or the file cannot be written.
pub(crate) fn execute(
    path: &Path,
    catalog: Option<&Path>,
    config: Option<&Path>,
) -> Result<(), CliError> {
    let (catalog, config) = load_content(catalog, config)?;
    let session = GameSession::new(catalog, config, SystemClock, StdRng::seed_from_u64(0))?;

    session.snapshot().save(path)?;

    println!(
        "Wrote {} ({} items on a {}x{} board)",
        path.display(),
        session.board().len(),
        session.board().width(),
        session.board().height()
    );

    Ok(())
}
