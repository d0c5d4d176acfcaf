use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    /// The shell could not be spawned or the child's output could not be
    /// collected.
    #[error("spawn failed: {0}")]
    Spawn(String),
}
