//! Payloads carried by each kind of node.

use std::path::PathBuf;

use crate::{image::ImageData, node_id::NodeId};

pub const IDENTITY_MATRIX: [f64; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// An image volume. The voxel payload is owned by the node.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeNode {
    pub display_node: Option<NodeId>,
    pub storage_node: Option<NodeId>,
    pub transform_node: Option<NodeId>,
    pub spacing: [f64; 3],
    pub origin: [f64; 3],
    pub image: Option<ImageData>,
}

impl Default for VolumeNode {
    fn default() -> Self {
        Self {
            display_node: None,
            storage_node: None,
            transform_node: None,
            spacing: [1.0, 1.0, 1.0],
            origin: [0.0, 0.0, 0.0],
            image: None,
        }
    }
}

/// A surface model. Geometry is loaded through its storage node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelNode {
    pub display_node: Option<NodeId>,
    pub storage_node: Option<NodeId>,
    pub transform_node: Option<NodeId>,
}

/// Display properties shared by volume and model display nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayNode {
    pub color: [f64; 3],
    pub opacity: f64,
    pub visible: bool,
    pub color_node: Option<NodeId>,
}

impl Default for DisplayNode {
    fn default() -> Self {
        Self {
            color: [0.5, 0.5, 0.5],
            opacity: 1.0,
            visible: true,
            color_node: None,
        }
    }
}

/// A lookup table of RGBA colors.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColorTableNode {
    pub colors: Vec<[f64; 4]>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformNode {
    /// Row-major 4x4 matrix.
    pub matrix: [f64; 16],
    pub transform_node: Option<NodeId>,
}

impl Default for TransformNode {
    fn default() -> Self {
        Self {
            matrix: IDENTITY_MATRIX,
            transform_node: None,
        }
    }
}

/// Points at the file that holds another node's bulk data.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StorageNode {
    pub file_name: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HierarchyNode {
    pub parent_node: Option<NodeId>,
    pub associated_node: Option<NodeId>,
    pub sorting_value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CameraNode {
    pub position: [f64; 3],
    pub focal_point: [f64; 3],
    pub view_up: [f64; 3],
}

impl Default for CameraNode {
    fn default() -> Self {
        Self {
            position: [0.0, 500.0, 0.0],
            focal_point: [0.0, 0.0, 0.0],
            view_up: [0.0, 0.0, 1.0],
        }
    }
}

/// Older files grouped scene views into clip nodes. They are kept only so
/// those files still load.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SnapshotClipNode {
    pub scene_view_nodes: Vec<NodeId>,
}
