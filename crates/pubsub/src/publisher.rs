//! Publishing seam.

use std::collections::HashMap;

/// Domain-agnostic publisher contract.
///
/// Implementations wrap the real broker client; the handle is created once
/// by the composition root and shared (it must be thread-safe), never
/// recreated per call.
pub trait Publisher: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(
        &self,
        topic: &str,
        data: &[u8],
        attributes: &HashMap<String, String>,
    ) -> Result<(), Self::Error>;
}

/// Fully qualified topic path within a project namespace.
pub fn topic_path(project: &str, topic: &str) -> String {
    format!("projects/{project}/topics/{topic}")
}
