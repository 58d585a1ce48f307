//! Saving and loading scene graphs as JSON scene documents.
//!
//! A document is a flat list of node elements. Each element carries its
//! node's state as string attributes, and a scene view element nests one child
//! element per captured node.

mod element;
mod legacy;

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{error::SceneError, node_id::NodeId, scene::SceneGraph};

pub use element::{read_node, write_node};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDocument {
    #[serde(default)]
    pub nodes: Vec<NodeElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeElement {
    pub tag: String,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeElement>,
}

impl NodeElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: IndexMap::new(),
            children: Vec::new(),
        }
    }
}

/// Options that control how documents are read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoadOptions {
    /// Whether a scene view with no storage node picks up a thumbnail from the
    /// `ScreenCaptures` directory next to the document, the way older files
    /// stored them.
    pub probe_legacy_screen_captures: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            probe_legacy_screen_captures: true,
        }
    }
}

/// Newlines in descriptions are written as `[br]`, since attribute values
/// are kept on one line. A description that contains a literal `[br]` reads
/// back as a newline.
pub fn escape_description(description: &str) -> String {
    description.replace('\n', "[br]")
}

pub fn unescape_description(description: &str) -> String {
    description.replace("[br]", "\n")
}

impl SceneGraph {
    /// Writes every node saved with the scene into a document. Captured
    /// storage nodes pick up the scene's file names first.
    pub fn to_document(&mut self) -> SceneDocument {
        let views: Vec<NodeId> = self
            .iter()
            .filter(|node| node.kind.as_scene_view().is_some())
            .map(|node| node.id().clone())
            .collect();

        for id in views {
            self.with_scene_view(&id, |view, scene| view.set_absent_storage_file_names(scene));
        }

        SceneDocument {
            nodes: self
                .iter()
                .filter(|node| node.save_with_scene)
                .map(write_node)
                .collect(),
        }
    }

    /// Builds a graph from a document.
    ///
    /// Nodes are added in document order. Once they're all in, references are
    /// resolved through the changed-ID table, every node's scene-update hook
    /// runs so nodes with storage ask for their data, and scene views are
    /// reconciled with the loaded graph. The changed-ID table is emptied
    /// afterwards, so later captures and restores see references as loaded.
    pub fn from_document(
        document: &SceneDocument,
        root_directory: impl Into<PathBuf>,
        options: &LoadOptions,
    ) -> Result<SceneGraph, SceneError> {
        let mut scene = SceneGraph::new();
        scene.set_root_directory(root_directory);
        scene.begin_import();

        for element in &document.nodes {
            let mut node = read_node(element, scene.root_directory())?;
            node.add_to_scene = true;

            let is_scene_view = node.kind.as_scene_view().is_some();
            let id = scene.add_node(node);

            if is_scene_view && options.probe_legacy_screen_captures {
                legacy::probe_screen_capture(&mut scene, &id);
            }
        }

        scene.update_node_references();

        for id in scene.ids() {
            scene.update_node_scene(&id);
        }

        scene.update_scene_views();
        scene.end_import();

        // Loading is done; nothing left is waiting to be inserted.
        for id in scene.ids() {
            if let Some(node) = scene.get_mut(&id) {
                node.add_to_scene = false;
            }
        }

        log::debug!("Loaded {} nodes", scene.len());
        Ok(scene)
    }

    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<(), SceneError> {
        let path = path.as_ref();
        let document = self.to_document();
        let contents = serde_json::to_string_pretty(&document)?;

        fs_err::write(path, contents)?;
        log::debug!("Saved scene to {}", path.display());

        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<SceneGraph, SceneError> {
        Self::load_with_options(path, &LoadOptions::default())
    }

    /// Loads a document from disk. The directory that holds the file becomes
    /// the graph's root directory.
    pub fn load_with_options(
        path: impl AsRef<Path>,
        options: &LoadOptions,
    ) -> Result<SceneGraph, SceneError> {
        let path = path.as_ref();
        let contents = fs_err::read(path)?;

        let document: SceneDocument = serde_json::from_slice(&contents)
            .map_err(|source| SceneError::malformed_document(source, path))?;

        let root_directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        Self::from_document(&document, root_directory, options)
    }
}
