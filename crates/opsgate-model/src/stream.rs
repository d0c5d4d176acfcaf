/// Events emitted while draining a streaming generateContent response.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// Incremental text content from the model.
    TextDelta { text: String },

    /// Stream completed successfully.
    Done,

    /// Error during streaming.
    Error { message: String },
}

/// Parse a single SSE line. The Gemini streaming endpoint (`alt=sse`) emits
/// only `data: <json>` lines; anything else is noise.
pub fn parse_sse_data(line: &str) -> Option<&str> {
    line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:"))
}
