//! Saving research output to a text file


use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tracing::{info, warn};

use crate::database::sqlite::record_timestamp;
use crate::learning::LearningService;
use crate::{ResearchError, Result};

/// Query text stored with every saved-output interaction
pub const SAVED_OUTPUT_QUERY: &str = "Research Query";

/// Tools descriptor stored with every saved-output interaction
pub const SAVE_TOOL_NAME: &str = "save_tool";

/// One appended block of research output
pub fn format_output_block(data: &str) -> String {
    format!(
        "--- Research Output ---\nTimestamp: {}\n\n{}\n\n",
        record_timestamp().format("%Y-%m-%d %H:%M:%S"),
        data
    )
}

/// Where `filename` lands; only bare file names inside the data directory
/// are accepted
pub fn resolve_output_path(base_dir: &Path, filename: Option<&str>) -> Result<PathBuf> {
    let Some(filename) = filename.map(str::trim).filter(|name| !name.is_empty()) else {
        return Ok(base_dir.join("research_output.txt"));
    };

    let mut components = Path::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) => Ok(base_dir.join(name)),
        _ => Err(ResearchError::Config(format!(
            "Invalid output file name '{}': use a plain file name",
            filename
        ))),
    }
}

/// Append `data` to the output file and record the save as a successful
/// interaction
pub async fn save_research_output(
    service: &LearningService,
    data: &str,
    filename: Option<&str>,
) -> Result<String> {
    let path = resolve_output_path(service.config().get_base_dir(), filename)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    file.write_all(format_output_block(data).as_bytes())?;
    info!("Saved {} bytes of research output to {}", data.len(), path.display());

    if let Err(e) = service
        .record_interaction_with(SAVED_OUTPUT_QUERY, data, SAVE_TOOL_NAME, 1.0)
        .await
    {
        warn!("Saved output but failed to record the interaction: {}", e);
    }

    Ok(format!("Data successfully saved to {}", path.display()))
}
