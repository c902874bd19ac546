//! Upload command.

use std::path::Path;

use console::style;

use crate::client::{is_auth_failure, AccessError, ArchiveClient};
use crate::config::{Settings, ENV_API_KEY};

/// Upload a local file to the archive.
pub async fn cmd_upload(settings: &Settings, file_path: &Path) -> anyhow::Result<()> {
    let client = ArchiveClient::new(settings)?;

    match client.upload(file_path, None).await {
        Ok(file) => {
            println!(
                "{} Uploaded {} to {}",
                style("✓").green(),
                file.filename(),
                file.archive_path()
            );
            Ok(())
        }
        Err(AccessError::Http { status, .. }) if is_auth_failure(status) => {
            eprintln!(
                "{} The server rejected the API key. Pass --api-key or set {}.",
                style("!").yellow(),
                ENV_API_KEY
            );
            anyhow::bail!("upload of {} was not authorized ({})", file_path.display(), status)
        }
        Err(e) => Err(e.into()),
    }
}
