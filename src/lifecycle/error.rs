use crate::services::ServiceError;

/// Errors raised by [`Agent`](super::Agent) lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// A collaborator failed while the agent was starting. Everything built by
    /// that attempt has already been torn down.
    #[error("Agent startup failed at {stage}: {source}")]
    Startup {
        stage: &'static str,
        #[source]
        source: ServiceError,
    },
}

impl AgentError {
    pub fn stage(&self) -> &'static str {
        match self {
            AgentError::Startup { stage, .. } => stage,
        }
    }
}
