//! Shared User-Agent string for API and document HTTP clients.
//!
//! arXiv asks automated clients to identify themselves; every request made by
//! this crate carries the same UA so traffic is attributable to one tool.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/paper-harvester";

/// Default User-Agent for every outgoing request.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("paper-harvester/{version} (academic-research-tool; +{PROJECT_UA_URL})")
}
