//! Defines the algorithm for restoring a scene from a scene view.

use std::collections::HashMap;

use serde::Serialize;

use crate::{
    node::Node,
    node_id::NodeId,
    scene::SceneGraph,
};

use super::{include_node_in_scene_view, SceneView};

/// What a restore did to the live graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedRestore {
    /// Every node detached from the live graph, cascades included.
    pub removed: Vec<NodeId>,

    /// Nodes recreated from the snapshot under their captured identifiers.
    pub added: Vec<NodeId>,

    /// Existing nodes whose state was overwritten from the snapshot.
    pub updated: Vec<NodeId>,
}

impl AppliedRestore {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty() && self.updated.is_empty()
    }
}

impl SceneView {
    /// Makes the eligible part of `scene` match this view.
    ///
    /// Nodes that aren't in the snapshot are removed first, then the ones that
    /// are get updated or recreated. The whole restore happens inside the
    /// graph's restoring state, so observers see one batch of notifications.
    /// The snapshot itself is never modified and can be restored any number
    /// of times.
    pub fn restore_scene(&self, scene: &mut SceneGraph) -> AppliedRestore {
        let snapshot = match self.nodes() {
            Some(snapshot) => snapshot,
            None => {
                log::warn!("Scene view has no nodes to restore");
                return AppliedRestore::default();
            }
        };

        let mut applied = AppliedRestore::default();

        {
            let mut restoring = scene.start_restore();

            let eligible: HashMap<&NodeId, &Node> = snapshot
                .iter()
                .filter(|node| include_node_in_scene_view(node, snapshot))
                .map(|node| (node.id(), node))
                .collect();

            remove_stale_nodes(&mut restoring, &eligible, &mut applied);
            apply_snapshot_nodes(&mut restoring, snapshot, &eligible, &mut applied);
            update_restored_nodes(&mut restoring);
        }

        debug_assert!(
            scene.iter().all(|node| scene.owns(node)),
            "every node must belong to the scene after a restore"
        );

        log::debug!(
            "Restored scene view: {} removed, {} added, {} updated",
            applied.removed.len(),
            applied.added.len(),
            applied.updated.len()
        );

        applied
    }
}

/// Removes every eligible live node the snapshot doesn't have, or has as a
/// different kind of node.
///
/// Removing one node can take others with it, so every identifier is checked
/// again right before it's removed.
fn remove_stale_nodes(
    scene: &mut SceneGraph,
    snapshot: &HashMap<&NodeId, &Node>,
    applied: &mut AppliedRestore,
) {
    let mut to_remove: Vec<NodeId> = scene
        .iter()
        .filter(|node| {
            let stale = match snapshot.get(node.id()) {
                Some(captured) => captured.class() != node.class(),
                None => true,
            };

            stale && include_node_in_scene_view(node, scene) && node.save_with_scene
        })
        .map(|node| node.id().clone())
        .collect();

    while let Some(id) = to_remove.pop() {
        if !scene.contains(&id) {
            log::trace!("{} was already removed along with another node", id);
            continue;
        }

        for removed in scene.remove_node(&id) {
            applied.removed.push(removed.id().clone());
        }
    }
}

fn apply_snapshot_nodes(
    scene: &mut SceneGraph,
    snapshot: &SceneGraph,
    eligible: &HashMap<&NodeId, &Node>,
    applied: &mut AppliedRestore,
) {
    for captured in snapshot.iter() {
        let id = captured.id();

        if !eligible.contains_key(id) {
            continue;
        }

        match scene.get(id).map(Node::class) {
            Some(class) if class == captured.class() => {
                if scene.get(id) != Some(captured) {
                    scene.copy_node_state(id, captured);
                    applied.updated.push(id.clone());
                }

                // Already has its data; it mustn't be read again.
                if let Some(live) = scene.get_mut(id) {
                    live.add_to_scene = false;
                }
            }
            Some(class) => {
                log::warn!(
                    "Not restoring {}: the scene keeps a {} under that ID",
                    id,
                    class.class_name()
                );
            }
            None => {
                let mut copy = captured.instance_copy();
                copy.add_to_scene = true;

                let added = scene.add_node(copy);
                if &added != id {
                    log::warn!("Restored node {} was added as {}", id, added);
                }

                applied.added.push(added);
            }
        }
    }
}

fn update_restored_nodes(scene: &mut SceneGraph) {
    let ids: Vec<NodeId> = scene
        .iter()
        .filter(|node| include_node_in_scene_view(node, scene) && node.save_with_scene)
        .map(|node| node.id().clone())
        .collect();

    for id in ids {
        scene.update_node_scene(&id);
    }
}
