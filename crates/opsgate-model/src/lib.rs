pub mod client;
pub mod error;
pub mod render;
pub mod session;
pub mod stream;
pub mod types;

pub use client::{GeminiClient, GenerativeModel};
pub use error::ModelError;
pub use session::ChatSession;
pub use types::{Candidate, Content, GenerateResponse, Part, Role, Turn};
