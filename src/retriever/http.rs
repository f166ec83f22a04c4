use std::time::Duration;
use tracing::debug;
use ureq::Agent;

use super::BackendError;

/// Blocking HTTP agent whose every request is bounded by `timeout`
pub(crate) fn build_agent(timeout: Duration, user_agent: &str) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .user_agent(user_agent)
        .build()
        .into()
}

/// Single GET without retries; backends degrade instead of retrying
pub(crate) fn get_text(agent: &Agent, url: &str) -> Result<String, BackendError> {
    debug!("Making HTTP GET request to: {}", url);

    match agent.get(url).call() {
        Ok(mut response) => {
            let text = response
                .body_mut()
                .read_to_string()
                .map_err(|e| BackendError::Transport(e.to_string()))?;
            debug!("Successfully read {} bytes from {}", text.len(), url);
            Ok(text)
        }
        Err(ureq::Error::StatusCode(code)) => {
            debug!("HTTP request failed with status {}: {}", code, url);
            Err(BackendError::Http(code))
        }
        Err(e) => {
            debug!("HTTP request failed with transport error: {}", e);
            Err(BackendError::Transport(e.to_string()))
        }
    }
}
