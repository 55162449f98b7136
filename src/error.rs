use thiserror::Error;

use crate::ir::NodeId;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// A toggle named an id that is not a scope of the source graph.
    #[error("no scope with id {id}")]
    NotFound { id: NodeId },
    #[error("malformed graph{}: {}", fmt_id(.id), .reason)]
    MalformedGraph { id: Option<NodeId>, reason: String },
    #[error("invalid layout config: {reason}")]
    InvalidConfig { reason: String },
}

impl GraphError {
    pub(crate) fn malformed(id: NodeId, reason: impl Into<String>) -> Self {
        Self::MalformedGraph {
            id: Some(id),
            reason: reason.into(),
        }
    }

    pub fn offending_id(&self) -> Option<NodeId> {
        match self {
            Self::NotFound { id } => Some(*id),
            Self::MalformedGraph { id, .. } => *id,
            Self::InvalidConfig { .. } => None,
        }
    }
}

fn fmt_id(id: &Option<NodeId>) -> String {
    match id {
        Some(id) => format!(" at node {id}"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_node() {
        let err = GraphError::malformed(7, "dangling successor 12");
        assert_eq!(err.to_string(), "malformed graph at node 7: dangling successor 12");
        assert_eq!(err.offending_id(), Some(7));

        let err = GraphError::NotFound { id: 3 };
        assert_eq!(err.to_string(), "no scope with id 3");
    }
}
