//! Clear command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::vector_store::create_store;
use anyhow::Result;
use std::io::{BufRead, Write};

/// Run the clear command.
pub async fn run_clear(yes: bool, settings: Settings) -> Result<()> {
    if !yes {
        print!("Remove every video, highlight and summary? [y/N] ");
        std::io::stdout().flush()?;

        let mut answer = String::new();
        std::io::stdin().lock().read_line(&mut answer)?;
        if !matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
            Output::info("Nothing removed.");
            return Ok(());
        }
    }

    let store = create_store(&settings)?;
    store.clear_all().await?;
    Output::success("Store cleared.");

    Ok(())
}
