//! Scene views: named, restorable snapshots of part of a scene graph.
//!
//! A scene view keeps deep copies of the nodes that were eligible when it was
//! captured in a private graph of its own, keyed by the identifiers those nodes
//! had in the live graph. Restoring reconciles the live graph against that
//! private graph: nodes the snapshot doesn't know about are removed, nodes it
//! does know about are updated in place, and nodes that have since gone are
//! recreated under their old identifiers so that references between them keep
//! resolving.
//!
//! Capture and restore never fail. When something they need is missing they
//! log a warning and do nothing, since a half-restored scene is worse than an
//! unrestored one.

mod inclusion;
mod restore;
mod store;

#[cfg(test)]
mod tests;

pub use inclusion::*;
pub use restore::AppliedRestore;

use crate::{
    image::ImageData,
    node_id::NodeId,
    scene::SceneGraph,
};

/// A snapshot record: a description, a thumbnail, and the private graph that
/// holds the captured nodes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SceneView {
    /// Free-form text. Newlines are preserved.
    pub description: String,

    pub screenshot: Option<ImageData>,

    /// What kind of view the thumbnail shows. The meaning of the values is up
    /// to the host.
    pub screenshot_type: i32,

    /// Seconds since the UNIX epoch at the last capture.
    pub timestamp: Option<u64>,

    /// The storage node that holds the thumbnail on disk.
    pub storage_node: Option<NodeId>,

    nodes: Option<SceneGraph>,
}

impl SceneView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn description(self, description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..self
        }
    }

    pub fn screenshot(self, screenshot: ImageData, screenshot_type: i32) -> Self {
        Self {
            screenshot: Some(screenshot),
            screenshot_type,
            ..self
        }
    }

    /// The captured nodes, if this view has been captured or loaded.
    pub fn nodes(&self) -> Option<&SceneGraph> {
        self.nodes.as_ref()
    }

    pub(crate) fn nodes_mut(&mut self) -> Option<&mut SceneGraph> {
        self.nodes.as_mut()
    }

    pub(crate) fn set_nodes(&mut self, nodes: SceneGraph) {
        self.nodes = Some(nodes);
    }

    /// The private graph, created empty if this view doesn't have one yet.
    pub(crate) fn nodes_or_default(&mut self) -> &mut SceneGraph {
        self.nodes.get_or_insert_with(SceneGraph::detached)
    }
}

impl SceneGraph {
    /// Captures the scene into the scene view node with the given identifier.
    /// Returns false if there is no such scene view.
    pub fn store_scene_view(&mut self, id: &str) -> bool {
        self.with_scene_view(id, |view, scene| view.store_scene(scene))
            .is_some()
    }

    /// Restores the scene from the scene view node with the given identifier.
    pub fn restore_scene_view(&mut self, id: &str) -> Option<AppliedRestore> {
        self.with_scene_view(id, |view, scene| view.restore_scene(scene))
    }

    /// Reconciles every scene view in the graph with it, as is done after a
    /// document has been loaded.
    pub fn update_scene_views(&mut self) {
        let views: Vec<NodeId> = self
            .iter()
            .filter(|node| node.kind.as_scene_view().is_some())
            .map(|node| node.id().clone())
            .collect();

        for id in views {
            // The view's own hook runs first so that a thumbnail waiting on
            // its storage node gets read.
            self.update_node_scene(&id);
            self.with_scene_view(&id, |view, scene| view.update_scene(scene));
        }
    }
}
