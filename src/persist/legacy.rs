//! Older scenes kept scene view thumbnails in a `ScreenCaptures` directory
//! next to the document, named after the view, instead of pointing at them
//! with a storage node.

use std::path::{Path, PathBuf};

use crate::{
    node::{Node, NodeKind, StorageNode},
    node_id::NodeId,
    scene::SceneGraph,
};

const SCREEN_CAPTURE_DIRECTORY: &str = "ScreenCaptures";
const UNNAMED_SCENE_VIEW: &str = "vtkMRMLSceneViewNodeNoID";

pub fn screen_capture_path(root_directory: &Path, id: &NodeId) -> PathBuf {
    let root_directory = if root_directory.as_os_str().is_empty() {
        Path::new(".")
    } else {
        root_directory
    };

    let file_stem = if id.is_none() {
        UNNAMED_SCENE_VIEW
    } else {
        id.as_str()
    };

    root_directory
        .join(SCREEN_CAPTURE_DIRECTORY)
        .join(format!("{}.png", file_stem))
}

/// Gives the scene view a storage node for its legacy thumbnail, if there is
/// one on disk and the view doesn't already have a storage node.
pub fn probe_screen_capture(scene: &mut SceneGraph, id: &NodeId) {
    let path = screen_capture_path(scene.root_directory(), id);

    let exists = fs_err::metadata(&path)
        .map(|metadata| metadata.is_file())
        .unwrap_or(false);

    if !exists {
        return;
    }

    let has_storage = scene
        .get(id)
        .and_then(|node| node.kind.storage_node())
        .is_some();

    if has_storage {
        log::warn!(
            "Found a screen capture at {}, but scene view {} already has a storage node to read its thumbnail",
            path.display(),
            id
        );
        return;
    }

    let storage = scene.add_node(Node::new(NodeKind::SceneViewStorage(StorageNode {
        file_name: path.clone(),
    })));

    let storage_ref = storage.clone();
    scene.modify_node(id, move |node| {
        if let Some(view) = node.kind.as_scene_view_mut() {
            view.storage_node = Some(storage_ref);
        }

        node.add_to_scene = true;
    });

    log::warn!(
        "Found a screen capture at {}, reading it through new storage node {}. \
         It will be overwritten if another storage node points at a different file",
        path.display(),
        storage
    );
}
