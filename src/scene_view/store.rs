//! Capturing a scene into a scene view, and keeping the captured copy
//! consistent with the scene it came from.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::scene::SceneGraph;

use super::{include_node_in_scene_view, SceneView};

impl SceneView {
    /// Replaces this view's contents with copies of every eligible node in
    /// `scene` that is saved with it.
    ///
    /// Each copy keeps the identifier of the node it was taken from. Nothing
    /// in `scene` is modified.
    pub fn store_scene(&mut self, scene: &SceneGraph) {
        let nodes = self.nodes_or_default();
        nodes.clear();
        nodes.set_root_directory(scene.root_directory());

        for node in scene.iter() {
            if !(include_node_in_scene_view(node, scene) && node.save_with_scene) {
                continue;
            }

            let mut copy = node.instance_copy();
            copy.add_to_scene = true;

            let id = nodes.adopt_node(copy);

            if let Some(copy) = nodes.get_mut(&id) {
                copy.add_to_scene = false;
            }
        }

        nodes.copy_changed_ids(scene);
        nodes.update_node_references();

        log::debug!("Captured {} nodes into scene view", nodes.len());

        self.timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .ok();
    }

    /// Brings the captured nodes in line with identifier changes `scene` made
    /// while it was being loaded, then runs their scene-update hooks against
    /// the private graph.
    pub fn update_scene(&mut self, scene: &SceneGraph) {
        if let Some(nodes) = self.nodes_mut() {
            nodes.copy_changed_ids(scene);
            nodes.update_node_references();
        }

        self.update_snapshot_scene();
    }

    /// Clears every captured node's pending-add flag so none of them asks for
    /// its data, then runs each one's scene-update hook against the private
    /// graph.
    pub fn update_snapshot_scene(&mut self) {
        let nodes = match self.nodes_mut() {
            Some(nodes) => nodes,
            None => return,
        };

        for id in nodes.ids() {
            if let Some(node) = nodes.get_mut(&id) {
                node.add_to_scene = false;
            }
        }

        for id in nodes.ids() {
            nodes.update_node_scene(&id);
        }
    }

    /// Copies the file name of every live storage node onto its captured
    /// counterpart, so the view is written with the paths the scene uses.
    pub fn set_absent_storage_file_names(&mut self, scene: &SceneGraph) {
        let nodes = match self.nodes_mut() {
            Some(nodes) => nodes,
            None => return,
        };

        for id in nodes.ids() {
            let live_file_name = match scene.get(&id).and_then(|node| node.kind.as_storage()) {
                Some(storage) => storage.file_name.clone(),
                None => continue,
            };

            if let Some(storage) = nodes
                .get_mut(&id)
                .and_then(|node| node.kind.as_storage_mut())
            {
                storage.file_name = live_file_name;
            }
        }
    }
}
