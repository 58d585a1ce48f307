//! The document-model node: common state shared by every node plus a closed
//! set of kind-specific payloads.

mod kinds;

pub use kinds::*;

use std::collections::BTreeMap;

use crate::{
    node_id::{NodeId, SceneId},
    scene_view::SceneView,
};

/// Every kind of node the scene graph knows how to hold.
///
/// The class name doubles as the prefix of graph-assigned identifiers, and the
/// tag name is the element name used in saved documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeClass {
    ScalarVolume,
    Model,
    VolumeDisplay,
    ModelDisplay,
    ColorTable,
    LinearTransform,
    VolumeStorage,
    ModelStorage,
    Hierarchy,
    Camera,
    SceneView,
    SceneViewStorage,
    SnapshotClip,
}

impl NodeClass {
    pub const ALL: [NodeClass; 13] = [
        NodeClass::ScalarVolume,
        NodeClass::Model,
        NodeClass::VolumeDisplay,
        NodeClass::ModelDisplay,
        NodeClass::ColorTable,
        NodeClass::LinearTransform,
        NodeClass::VolumeStorage,
        NodeClass::ModelStorage,
        NodeClass::Hierarchy,
        NodeClass::Camera,
        NodeClass::SceneView,
        NodeClass::SceneViewStorage,
        NodeClass::SnapshotClip,
    ];

    pub fn class_name(self) -> &'static str {
        match self {
            NodeClass::ScalarVolume => "vtkMRMLScalarVolumeNode",
            NodeClass::Model => "vtkMRMLModelNode",
            NodeClass::VolumeDisplay => "vtkMRMLScalarVolumeDisplayNode",
            NodeClass::ModelDisplay => "vtkMRMLModelDisplayNode",
            NodeClass::ColorTable => "vtkMRMLColorTableNode",
            NodeClass::LinearTransform => "vtkMRMLLinearTransformNode",
            NodeClass::VolumeStorage => "vtkMRMLVolumeArchetypeStorageNode",
            NodeClass::ModelStorage => "vtkMRMLModelStorageNode",
            NodeClass::Hierarchy => "vtkMRMLHierarchyNode",
            NodeClass::Camera => "vtkMRMLCameraNode",
            NodeClass::SceneView => "vtkMRMLSceneViewNode",
            NodeClass::SceneViewStorage => "vtkMRMLSceneViewStorageNode",
            NodeClass::SnapshotClip => "vtkMRMLSnapshotClipNode",
        }
    }

    pub fn tag_name(self) -> &'static str {
        match self {
            NodeClass::ScalarVolume => "Volume",
            NodeClass::Model => "Model",
            NodeClass::VolumeDisplay => "VolumeDisplay",
            NodeClass::ModelDisplay => "ModelDisplay",
            NodeClass::ColorTable => "ColorTable",
            NodeClass::LinearTransform => "LinearTransform",
            NodeClass::VolumeStorage => "VolumeArchetypeStorage",
            NodeClass::ModelStorage => "ModelStorage",
            NodeClass::Hierarchy => "Hierarchy",
            NodeClass::Camera => "Camera",
            NodeClass::SceneView => "SceneView",
            NodeClass::SceneViewStorage => "SceneViewStorage",
            NodeClass::SnapshotClip => "SnapshotClip",
        }
    }

    pub fn from_tag_name(tag: &str) -> Option<NodeClass> {
        NodeClass::ALL
            .iter()
            .copied()
            .find(|class| class.tag_name() == tag)
    }

    pub fn is_storage(self) -> bool {
        matches!(
            self,
            NodeClass::VolumeStorage | NodeClass::ModelStorage | NodeClass::SceneViewStorage
        )
    }

    pub fn is_hierarchy(self) -> bool {
        matches!(self, NodeClass::Hierarchy)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    ScalarVolume(VolumeNode),
    Model(ModelNode),
    VolumeDisplay(DisplayNode),
    ModelDisplay(DisplayNode),
    ColorTable(ColorTableNode),
    LinearTransform(TransformNode),
    VolumeStorage(StorageNode),
    ModelStorage(StorageNode),
    Hierarchy(HierarchyNode),
    Camera(CameraNode),
    SceneView(SceneView),
    SceneViewStorage(StorageNode),
    SnapshotClip(SnapshotClipNode),
}

impl NodeKind {
    /// A freshly constructed payload of the given class.
    pub fn new(class: NodeClass) -> NodeKind {
        match class {
            NodeClass::ScalarVolume => NodeKind::ScalarVolume(Default::default()),
            NodeClass::Model => NodeKind::Model(Default::default()),
            NodeClass::VolumeDisplay => NodeKind::VolumeDisplay(Default::default()),
            NodeClass::ModelDisplay => NodeKind::ModelDisplay(Default::default()),
            NodeClass::ColorTable => NodeKind::ColorTable(Default::default()),
            NodeClass::LinearTransform => NodeKind::LinearTransform(Default::default()),
            NodeClass::VolumeStorage => NodeKind::VolumeStorage(Default::default()),
            NodeClass::ModelStorage => NodeKind::ModelStorage(Default::default()),
            NodeClass::Hierarchy => NodeKind::Hierarchy(Default::default()),
            NodeClass::Camera => NodeKind::Camera(Default::default()),
            NodeClass::SceneView => NodeKind::SceneView(Default::default()),
            NodeClass::SceneViewStorage => NodeKind::SceneViewStorage(Default::default()),
            NodeClass::SnapshotClip => NodeKind::SnapshotClip(Default::default()),
        }
    }

    pub fn class(&self) -> NodeClass {
        match self {
            NodeKind::ScalarVolume(_) => NodeClass::ScalarVolume,
            NodeKind::Model(_) => NodeClass::Model,
            NodeKind::VolumeDisplay(_) => NodeClass::VolumeDisplay,
            NodeKind::ModelDisplay(_) => NodeClass::ModelDisplay,
            NodeKind::ColorTable(_) => NodeClass::ColorTable,
            NodeKind::LinearTransform(_) => NodeClass::LinearTransform,
            NodeKind::VolumeStorage(_) => NodeClass::VolumeStorage,
            NodeKind::ModelStorage(_) => NodeClass::ModelStorage,
            NodeKind::Hierarchy(_) => NodeClass::Hierarchy,
            NodeKind::Camera(_) => NodeClass::Camera,
            NodeKind::SceneView(_) => NodeClass::SceneView,
            NodeKind::SceneViewStorage(_) => NodeClass::SceneViewStorage,
            NodeKind::SnapshotClip(_) => NodeClass::SnapshotClip,
        }
    }

    /// Identifiers of every node this payload refers to.
    pub fn references(&self) -> Vec<&NodeId> {
        match self {
            NodeKind::ScalarVolume(volume) => [
                &volume.display_node,
                &volume.storage_node,
                &volume.transform_node,
            ]
            .into_iter()
            .flatten()
            .collect(),
            NodeKind::Model(model) => [
                &model.display_node,
                &model.storage_node,
                &model.transform_node,
            ]
            .into_iter()
            .flatten()
            .collect(),
            NodeKind::VolumeDisplay(display) | NodeKind::ModelDisplay(display) => {
                display.color_node.iter().collect()
            }
            NodeKind::LinearTransform(transform) => transform.transform_node.iter().collect(),
            NodeKind::Hierarchy(hierarchy) => [&hierarchy.parent_node, &hierarchy.associated_node]
                .into_iter()
                .flatten()
                .collect(),
            NodeKind::SceneView(view) => view.storage_node.iter().collect(),
            NodeKind::SnapshotClip(clip) => clip.scene_view_nodes.iter().collect(),
            NodeKind::ColorTable(_)
            | NodeKind::VolumeStorage(_)
            | NodeKind::ModelStorage(_)
            | NodeKind::Camera(_)
            | NodeKind::SceneViewStorage(_) => Vec::new(),
        }
    }

    pub fn references_mut(&mut self) -> Vec<&mut NodeId> {
        match self {
            NodeKind::ScalarVolume(volume) => [
                &mut volume.display_node,
                &mut volume.storage_node,
                &mut volume.transform_node,
            ]
            .into_iter()
            .flatten()
            .collect(),
            NodeKind::Model(model) => [
                &mut model.display_node,
                &mut model.storage_node,
                &mut model.transform_node,
            ]
            .into_iter()
            .flatten()
            .collect(),
            NodeKind::VolumeDisplay(display) | NodeKind::ModelDisplay(display) => {
                display.color_node.iter_mut().collect()
            }
            NodeKind::LinearTransform(transform) => transform.transform_node.iter_mut().collect(),
            NodeKind::Hierarchy(hierarchy) => [
                &mut hierarchy.parent_node,
                &mut hierarchy.associated_node,
            ]
            .into_iter()
            .flatten()
            .collect(),
            NodeKind::SceneView(view) => view.storage_node.iter_mut().collect(),
            NodeKind::SnapshotClip(clip) => clip.scene_view_nodes.iter_mut().collect(),
            NodeKind::ColorTable(_)
            | NodeKind::VolumeStorage(_)
            | NodeKind::ModelStorage(_)
            | NodeKind::Camera(_)
            | NodeKind::SceneViewStorage(_) => Vec::new(),
        }
    }

    /// Nodes that only exist to serve this one. Removing this node from a
    /// graph also removes these, unless something else still refers to them.
    pub fn owned_dependents(&self) -> Vec<&NodeId> {
        match self {
            NodeKind::ScalarVolume(volume) => [&volume.display_node, &volume.storage_node]
                .into_iter()
                .flatten()
                .collect(),
            NodeKind::Model(model) => [&model.display_node, &model.storage_node]
                .into_iter()
                .flatten()
                .collect(),
            NodeKind::SceneView(view) => view.storage_node.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// The storage node that holds this node's bulk data, if it has one.
    pub fn storage_node(&self) -> Option<&NodeId> {
        match self {
            NodeKind::ScalarVolume(volume) => volume.storage_node.as_ref(),
            NodeKind::Model(model) => model.storage_node.as_ref(),
            NodeKind::SceneView(view) => view.storage_node.as_ref(),
            _ => None,
        }
    }

    pub fn as_storage(&self) -> Option<&StorageNode> {
        match self {
            NodeKind::VolumeStorage(storage)
            | NodeKind::ModelStorage(storage)
            | NodeKind::SceneViewStorage(storage) => Some(storage),
            _ => None,
        }
    }

    pub fn as_storage_mut(&mut self) -> Option<&mut StorageNode> {
        match self {
            NodeKind::VolumeStorage(storage)
            | NodeKind::ModelStorage(storage)
            | NodeKind::SceneViewStorage(storage) => Some(storage),
            _ => None,
        }
    }

    pub fn as_hierarchy(&self) -> Option<&HierarchyNode> {
        match self {
            NodeKind::Hierarchy(hierarchy) => Some(hierarchy),
            _ => None,
        }
    }

    pub fn as_scene_view(&self) -> Option<&SceneView> {
        match self {
            NodeKind::SceneView(view) => Some(view),
            _ => None,
        }
    }

    pub fn as_scene_view_mut(&mut self) -> Option<&mut SceneView> {
        match self {
            NodeKind::SceneView(view) => Some(view),
            _ => None,
        }
    }
}

/// One entity in a scene graph.
///
/// Equality compares document state only: name, flags, singleton tag,
/// attributes and payload. The identifier, the owning graph and the defer-add
/// flag are bookkeeping and don't take part.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) id: NodeId,

    pub name: String,

    /// Only nodes with this flag set are written to documents and captured by
    /// scene views.
    pub save_with_scene: bool,

    pub hide_from_editors: bool,

    /// Singleton nodes get a fixed identifier built from their class name and
    /// this tag, so there is at most one of them per graph.
    pub singleton_tag: Option<String>,

    /// Free-form string attributes attached by the host.
    pub attributes: BTreeMap<String, String>,

    pub kind: NodeKind,

    /// Set while a node is being inserted. A node whose flag is still set when
    /// its scene-update hook runs asks its storage node for its data.
    pub(crate) add_to_scene: bool,

    /// The graph this node is attached to, if any.
    pub(crate) scene: Option<SceneId>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            id: NodeId::none(),
            name: String::new(),
            save_with_scene: true,
            hide_from_editors: false,
            singleton_tag: None,
            attributes: BTreeMap::new(),
            kind,
            add_to_scene: false,
            scene: None,
        }
    }

    pub fn of_class(class: NodeClass) -> Self {
        Self::new(NodeKind::new(class))
    }

    pub fn name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    /// Requests an identifier. The graph keeps it if it's free when the node
    /// is added.
    pub fn with_id(self, id: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            ..self
        }
    }

    pub fn save_with_scene(self, save_with_scene: bool) -> Self {
        Self {
            save_with_scene,
            ..self
        }
    }

    pub fn hide_from_editors(self, hide_from_editors: bool) -> Self {
        Self {
            hide_from_editors,
            ..self
        }
    }

    pub fn singleton_tag(self, tag: impl Into<String>) -> Self {
        Self {
            singleton_tag: Some(tag.into()),
            ..self
        }
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn class(&self) -> NodeClass {
        self.kind.class()
    }

    pub fn attribute_value(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn is_pending_add(&self) -> bool {
        self.add_to_scene
    }

    pub fn scene_id(&self) -> Option<SceneId> {
        self.scene
    }

    /// An independent copy of this node with the same identifier, attached to
    /// no graph.
    pub fn instance_copy(&self) -> Node {
        Node {
            scene: None,
            add_to_scene: false,
            ..self.clone()
        }
    }

    /// Overwrites this node's document state with another's. The identifier
    /// and graph attachment are left alone.
    pub fn copy_from(&mut self, other: &Node) {
        self.name = other.name.clone();
        self.save_with_scene = other.save_with_scene;
        self.hide_from_editors = other.hide_from_editors;
        self.singleton_tag = other.singleton_tag.clone();
        self.attributes = other.attributes.clone();
        self.kind = other.kind.clone();
    }

    pub(crate) fn remap_references<F>(&mut self, mut remap: F)
    where
        F: FnMut(&NodeId) -> Option<NodeId>,
    {
        for reference in self.kind.references_mut() {
            if let Some(new_id) = remap(reference) {
                *reference = new_id;
            }
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.save_with_scene == other.save_with_scene
            && self.hide_from_editors == other.hide_from_editors
            && self.singleton_tag == other.singleton_tag
            && self.attributes == other.attributes
            && self.kind == other.kind
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn tag_names_round_trip() {
        for class in NodeClass::ALL {
            assert_eq!(NodeClass::from_tag_name(class.tag_name()), Some(class));
            assert_eq!(NodeKind::new(class).class(), class);
        }

        assert_eq!(NodeClass::from_tag_name("Nope"), None);
    }

    #[test]
    fn volume_references() {
        let node = Node::new(NodeKind::ScalarVolume(VolumeNode {
            display_node: Some("display".into()),
            storage_node: Some("storage".into()),
            ..Default::default()
        }));

        let references: Vec<&str> = node.kind.references().into_iter().map(NodeId::as_str).collect();
        assert_eq!(references, vec!["display", "storage"]);

        let dependents: Vec<&str> = node
            .kind
            .owned_dependents()
            .into_iter()
            .map(NodeId::as_str)
            .collect();
        assert_eq!(dependents, vec!["display", "storage"]);
    }

    #[test]
    fn remap_rewrites_only_known_ids() {
        let mut node = Node::new(NodeKind::Hierarchy(HierarchyNode {
            parent_node: Some("old".into()),
            associated_node: Some("kept".into()),
            sorting_value: 0.0,
        }));

        node.remap_references(|id| (id.as_str() == "old").then(|| NodeId::from("new")));

        let hierarchy = node.kind.as_hierarchy().unwrap();
        assert_eq!(hierarchy.parent_node, Some("new".into()));
        assert_eq!(hierarchy.associated_node, Some("kept".into()));
    }

    #[test]
    fn equality_ignores_bookkeeping() {
        let a = Node::of_class(NodeClass::Camera).name("Cam").with_id("a");
        let mut b = a.clone().with_id("b");
        b.add_to_scene = true;
        b.scene = Some(SceneId::new());

        assert_eq!(a, b);
        assert_ne!(a, b.name("Other"));
    }

    #[test]
    fn instance_copy_is_detached() {
        let mut node = Node::of_class(NodeClass::Camera).with_id("cam");
        node.scene = Some(SceneId::new());
        node.add_to_scene = true;

        let copy = node.instance_copy();
        assert_eq!(copy.id().as_str(), "cam");
        assert_eq!(copy.scene_id(), None);
        assert!(!copy.is_pending_add());
    }
}
