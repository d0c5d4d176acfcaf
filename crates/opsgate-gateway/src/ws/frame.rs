use serde::{Deserialize, Serialize};

/// The only wire entity: a JSON-wrapped text payload, both directions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub content: String,
}
