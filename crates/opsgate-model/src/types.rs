//! Wire types for the Gemini generateContent API plus the connection-local
//! conversation history.

use serde::{Deserialize, Serialize};

/// Originator of a history turn. The API expects the literal strings
/// `"user"` and `"model"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One entry of a chat session's history: a role plus ordered text parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub parts: Vec<String>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![text.into()],
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![text.into()],
        }
    }
}

// Gemini API response types (camelCase on the wire).

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Part {
    pub text: Option<String>,
}

impl GenerateResponse {
    /// Convenience constructor used by tests and fakes: one candidate whose
    /// content is the given parts.
    pub fn from_parts(parts: &[&str]) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Some(Content {
                    parts: parts
                        .iter()
                        .map(|t| Part {
                            text: Some((*t).to_string()),
                        })
                        .collect(),
                }),
                finish_reason: None,
            }],
        }
    }
}
