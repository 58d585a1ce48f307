//! Capture and restore snapshots ("scene views") of a reference-linked scene
//! graph.

mod error;
mod event_log;
mod image;
mod node_id;

pub mod node;
pub mod persist;
pub mod scene;
pub mod scene_view;

pub use crate::error::{ErrorDisplay, SceneError};
pub use crate::event_log::EventLog;
pub use crate::image::ImageData;
pub use crate::node::{Node, NodeClass, NodeKind};
pub use crate::node_id::{NodeId, SceneId};
pub use crate::persist::{LoadOptions, NodeElement, SceneDocument};
pub use crate::scene::{RestoreState, SceneEvent, SceneGraph};
pub use crate::scene_view::{include_node_in_scene_view, AppliedRestore, SceneView};
