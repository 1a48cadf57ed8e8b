#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("unknown position: {0}")]
    UnknownPosition(String),

    #[error("unknown movement type: {0}")]
    UnknownMovementType(String),

    #[error("unknown risk level: {0}")]
    UnknownRiskLevel(String),

    #[error("unknown age group: {0}")]
    UnknownAgeGroup(String),
}
