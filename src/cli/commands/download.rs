//! Download command.

use console::{style, Term};

use crate::client::{ArchiveClient, DownloadOutcome};
use crate::config::Settings;

/// Download a file into the local data directory.
pub async fn cmd_download(settings: &Settings, file_path: &str) -> anyhow::Result<()> {
    let client = ArchiveClient::new(settings)?.with_progress(Term::stderr().is_term());

    match client.download_path(file_path).await? {
        DownloadOutcome::Downloaded(path) => {
            println!("{} Downloaded to {}", style("✓").green(), path.display());
        }
        DownloadOutcome::AlreadyPresent(path) => {
            println!(
                "{} Already present at {}",
                style("→").cyan(),
                path.display()
            );
        }
    }
    Ok(())
}
