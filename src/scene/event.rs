use crate::node_id::NodeId;

/// Notifications a scene graph delivers to whoever is watching it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneEvent {
    NodeAdded(NodeId),
    NodeRemoved(NodeId),
    NodeModified(NodeId),

    /// A node was inserted and its data should now be read through its
    /// storage node. Reading the file is the host's job.
    ReadDataRequested {
        node: NodeId,
        storage: NodeId,
    },

    RestoreStarted,
    RestoreEnded,
}

impl SceneEvent {
    pub fn node(&self) -> Option<&NodeId> {
        match self {
            SceneEvent::NodeAdded(id)
            | SceneEvent::NodeRemoved(id)
            | SceneEvent::NodeModified(id) => Some(id),
            SceneEvent::ReadDataRequested { node, .. } => Some(node),
            SceneEvent::RestoreStarted | SceneEvent::RestoreEnded => None,
        }
    }
}
