//! Conversion between nodes and document elements.

use std::{path::Path, str::FromStr};

use crate::{
    error::SceneError,
    node::{
        CameraNode, ColorTableNode, DisplayNode, HierarchyNode, ModelNode, Node, NodeClass,
        NodeKind, SnapshotClipNode, StorageNode, TransformNode, VolumeNode,
    },
    node_id::NodeId,
    scene::SceneGraph,
    scene_view::SceneView,
};

use super::{escape_description, unescape_description, NodeElement};

pub fn write_node(node: &Node) -> NodeElement {
    let mut element = NodeElement::new(node.class().tag_name());

    {
        let mut writer = AttributeWriter(&mut element);
        writer.text("id", node.id().as_str());
        writer.text("name", &node.name);
        writer.flag("hideFromEditors", node.hide_from_editors);

        if let Some(tag) = &node.singleton_tag {
            writer.text("singletonTag", tag);
        }

        if !node.attributes.is_empty() {
            let joined = node
                .attributes
                .iter()
                .map(|(key, value)| format!("{}:{}", key, value))
                .collect::<Vec<_>>()
                .join(";");

            writer.text("attributes", &joined);
        }
    }

    write_kind(&node.kind, &mut element);
    element
}

fn write_kind(kind: &NodeKind, element: &mut NodeElement) {
    let mut writer = AttributeWriter(&mut *element);

    match kind {
        NodeKind::ScalarVolume(volume) => {
            writer.reference("displayNodeRef", &volume.display_node);
            writer.reference("storageNodeRef", &volume.storage_node);
            writer.reference("transformNodeRef", &volume.transform_node);
            writer.floats("spacing", &volume.spacing);
            writer.floats("origin", &volume.origin);
        }
        NodeKind::Model(model) => {
            writer.reference("displayNodeRef", &model.display_node);
            writer.reference("storageNodeRef", &model.storage_node);
            writer.reference("transformNodeRef", &model.transform_node);
        }
        NodeKind::VolumeDisplay(display) | NodeKind::ModelDisplay(display) => {
            writer.floats("color", &display.color);
            writer.text("opacity", &display.opacity.to_string());
            writer.flag("visibility", display.visible);
            writer.reference("colorNodeRef", &display.color_node);
        }
        NodeKind::ColorTable(table) => {
            let flattened: Vec<f64> = table.colors.iter().flatten().copied().collect();
            writer.floats("colors", &flattened);
        }
        NodeKind::LinearTransform(transform) => {
            writer.floats("matrixTransformToParent", &transform.matrix);
            writer.reference("transformNodeRef", &transform.transform_node);
        }
        NodeKind::VolumeStorage(storage)
        | NodeKind::ModelStorage(storage)
        | NodeKind::SceneViewStorage(storage) => {
            writer.text("fileName", &storage.file_name.to_string_lossy());
        }
        NodeKind::Hierarchy(hierarchy) => {
            writer.reference("parentNodeRef", &hierarchy.parent_node);
            writer.reference("associatedNodeRef", &hierarchy.associated_node);
            writer.text("sortingValue", &hierarchy.sorting_value.to_string());
        }
        NodeKind::Camera(camera) => {
            writer.floats("position", &camera.position);
            writer.floats("focalPoint", &camera.focal_point);
            writer.floats("viewUp", &camera.view_up);
        }
        NodeKind::SceneView(view) => {
            writer.text("screenshotType", &view.screenshot_type.to_string());
            writer.text("sceneViewDescription", &escape_description(&view.description));

            if let Some(timestamp) = view.timestamp {
                writer.text("timestamp", &timestamp.to_string());
            }

            writer.reference("storageNodeRef", &view.storage_node);

            if let Some(nodes) = view.nodes() {
                element.children = nodes
                    .iter()
                    .filter(|node| node.class() != NodeClass::SceneView && node.save_with_scene)
                    .map(write_node)
                    .collect();
            }
        }
        NodeKind::SnapshotClip(clip) => {
            let ids: Vec<&str> = clip.scene_view_nodes.iter().map(NodeId::as_str).collect();
            writer.text("sceneViewNodeRefs", &ids.join(" "));
        }
    }
}

struct AttributeWriter<'a>(&'a mut NodeElement);

impl AttributeWriter<'_> {
    fn text(&mut self, name: &str, value: &str) {
        self.0.attributes.insert(name.to_owned(), value.to_owned());
    }

    fn flag(&mut self, name: &str, value: bool) {
        self.text(name, if value { "true" } else { "false" });
    }

    fn reference(&mut self, name: &str, value: &Option<NodeId>) {
        if let Some(id) = value {
            self.text(name, id.as_str());
        }
    }

    fn floats(&mut self, name: &str, values: &[f64]) {
        let joined = values
            .iter()
            .map(f64::to_string)
            .collect::<Vec<_>>()
            .join(" ");

        self.text(name, &joined);
    }
}

/// Builds a detached node from an element. Scene view children are read into
/// the view's private graph, which is rooted at `root_directory`.
pub fn read_node(element: &NodeElement, root_directory: &Path) -> Result<Node, SceneError> {
    let class = NodeClass::from_tag_name(&element.tag)
        .ok_or_else(|| SceneError::unknown_node_tag(&element.tag))?;

    let reader = AttributeReader(element);
    let mut node = Node::of_class(class);

    if let Some(id) = reader.text("id") {
        node = node.with_id(id);
    }

    if let Some(name) = reader.text("name") {
        node.name = name.to_owned();
    }

    node.hide_from_editors = reader.flag("hideFromEditors", false)?;
    node.singleton_tag = reader.text("singletonTag").map(str::to_owned);

    if let Some(attributes) = reader.text("attributes") {
        for pair in attributes.split(';').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair
                .split_once(':')
                .ok_or_else(|| reader.invalid("attributes", attributes))?;

            node.attributes.insert(key.to_owned(), value.to_owned());
        }
    }

    node.kind = read_kind(class, &reader, root_directory)?;
    Ok(node)
}

fn read_kind(
    class: NodeClass,
    reader: &AttributeReader,
    root_directory: &Path,
) -> Result<NodeKind, SceneError> {
    let kind = match class {
        NodeClass::ScalarVolume => {
            let defaults = VolumeNode::default();

            NodeKind::ScalarVolume(VolumeNode {
                display_node: reader.reference("displayNodeRef"),
                storage_node: reader.reference("storageNodeRef"),
                transform_node: reader.reference("transformNodeRef"),
                spacing: reader.floats("spacing", defaults.spacing)?,
                origin: reader.floats("origin", defaults.origin)?,
                image: None,
            })
        }
        NodeClass::Model => NodeKind::Model(ModelNode {
            display_node: reader.reference("displayNodeRef"),
            storage_node: reader.reference("storageNodeRef"),
            transform_node: reader.reference("transformNodeRef"),
        }),
        NodeClass::VolumeDisplay => NodeKind::VolumeDisplay(read_display(reader)?),
        NodeClass::ModelDisplay => NodeKind::ModelDisplay(read_display(reader)?),
        NodeClass::ColorTable => {
            let flattened = reader.float_list("colors")?;

            if flattened.len() % 4 != 0 {
                let value = reader.text("colors").unwrap_or_default();
                return Err(reader.invalid("colors", value));
            }

            NodeKind::ColorTable(ColorTableNode {
                colors: flattened
                    .chunks_exact(4)
                    .map(|rgba| [rgba[0], rgba[1], rgba[2], rgba[3]])
                    .collect(),
            })
        }
        NodeClass::LinearTransform => NodeKind::LinearTransform(TransformNode {
            matrix: reader.floats("matrixTransformToParent", TransformNode::default().matrix)?,
            transform_node: reader.reference("transformNodeRef"),
        }),
        NodeClass::VolumeStorage => NodeKind::VolumeStorage(read_storage(reader)),
        NodeClass::ModelStorage => NodeKind::ModelStorage(read_storage(reader)),
        NodeClass::SceneViewStorage => NodeKind::SceneViewStorage(read_storage(reader)),
        NodeClass::Hierarchy => NodeKind::Hierarchy(HierarchyNode {
            parent_node: reader.reference("parentNodeRef"),
            associated_node: reader.reference("associatedNodeRef"),
            sorting_value: reader.parse("sortingValue", 0.0)?,
        }),
        NodeClass::Camera => {
            let defaults = CameraNode::default();

            NodeKind::Camera(CameraNode {
                position: reader.floats("position", defaults.position)?,
                focal_point: reader.floats("focalPoint", defaults.focal_point)?,
                view_up: reader.floats("viewUp", defaults.view_up)?,
            })
        }
        NodeClass::SceneView => NodeKind::SceneView(read_scene_view(reader, root_directory)?),
        NodeClass::SnapshotClip => NodeKind::SnapshotClip(SnapshotClipNode {
            scene_view_nodes: reader
                .text("sceneViewNodeRefs")
                .unwrap_or_default()
                .split_whitespace()
                .map(NodeId::from)
                .collect(),
        }),
    };

    Ok(kind)
}

fn read_display(reader: &AttributeReader) -> Result<DisplayNode, SceneError> {
    let defaults = DisplayNode::default();

    Ok(DisplayNode {
        color: reader.floats("color", defaults.color)?,
        opacity: reader.parse("opacity", defaults.opacity)?,
        visible: reader.flag("visibility", defaults.visible)?,
        color_node: reader.reference("colorNodeRef"),
    })
}

fn read_storage(reader: &AttributeReader) -> StorageNode {
    StorageNode {
        file_name: reader.text("fileName").unwrap_or_default().into(),
    }
}

fn read_scene_view(reader: &AttributeReader, root_directory: &Path) -> Result<SceneView, SceneError> {
    let mut view = SceneView::new().description(unescape_description(
        reader.text("sceneViewDescription").unwrap_or_default(),
    ));
    view.screenshot_type = reader.parse("screenshotType", 0)?;
    view.storage_node = reader.reference("storageNodeRef");

    if reader.text("timestamp").is_some() {
        view.timestamp = Some(reader.parse("timestamp", 0)?);
    }

    if reader.0.children.is_empty() {
        return Ok(view);
    }

    let mut nodes = SceneGraph::detached();
    nodes.set_root_directory(root_directory);

    for child in &reader.0.children {
        let child = read_node(child, root_directory)?;

        if child.class() == NodeClass::SceneView {
            log::warn!("Skipping scene view {} nested in another scene view", child.id());
            continue;
        }

        if child.id().is_none() {
            nodes.add_node(child);
        } else {
            nodes.adopt_node(child);
        }
    }

    view.set_nodes(nodes);
    Ok(view)
}

struct AttributeReader<'a>(&'a NodeElement);

impl AttributeReader<'_> {
    fn text(&self, name: &str) -> Option<&str> {
        self.0.attributes.get(name).map(String::as_str)
    }

    fn invalid(&self, name: &str, value: &str) -> SceneError {
        SceneError::invalid_attribute(&self.0.tag, name, value)
    }

    fn reference(&self, name: &str) -> Option<NodeId> {
        self.text(name)
            .filter(|id| !id.is_empty())
            .map(NodeId::from)
    }

    fn parse<T: FromStr>(&self, name: &str, default: T) -> Result<T, SceneError> {
        match self.text(name) {
            Some(value) => value.trim().parse().map_err(|_| self.invalid(name, value)),
            None => Ok(default),
        }
    }

    fn flag(&self, name: &str, default: bool) -> Result<bool, SceneError> {
        match self.text(name) {
            Some("true") | Some("1") => Ok(true),
            Some("false") | Some("0") => Ok(false),
            Some(value) => Err(self.invalid(name, value)),
            None => Ok(default),
        }
    }

    fn float_list(&self, name: &str) -> Result<Vec<f64>, SceneError> {
        let value = self.text(name).unwrap_or_default();

        value
            .split_whitespace()
            .map(|number| number.parse().map_err(|_| self.invalid(name, value)))
            .collect()
    }

    fn floats<const N: usize>(&self, name: &str, default: [f64; N]) -> Result<[f64; N], SceneError> {
        let value = match self.text(name) {
            Some(value) => value,
            None => return Ok(default),
        };

        let numbers = self.float_list(name)?;
        numbers
            .try_into()
            .map_err(|_| self.invalid(name, value))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use indexmap::indexmap;

    #[test]
    fn volume_attributes() {
        let node = Node::new(NodeKind::ScalarVolume(VolumeNode {
            display_node: Some("vtkMRMLScalarVolumeDisplayNode1".into()),
            spacing: [0.5, 0.5, 2.0],
            ..Default::default()
        }))
        .with_id("vtkMRMLScalarVolumeNode1")
        .name("Head")
        .attribute("Category", "MR");

        let element = write_node(&node);

        assert_eq!(element.tag, "Volume");
        assert_eq!(
            element.attributes,
            indexmap! {
                "id".to_owned() => "vtkMRMLScalarVolumeNode1".to_owned(),
                "name".to_owned() => "Head".to_owned(),
                "hideFromEditors".to_owned() => "false".to_owned(),
                "attributes".to_owned() => "Category:MR".to_owned(),
                "displayNodeRef".to_owned() => "vtkMRMLScalarVolumeDisplayNode1".to_owned(),
                "spacing".to_owned() => "0.5 0.5 2".to_owned(),
                "origin".to_owned() => "0 0 0".to_owned(),
            }
        );

        let read = read_node(&element, Path::new(".")).unwrap();
        assert_eq!(read, node);
        assert_eq!(read.id(), node.id());
    }

    #[test]
    fn unknown_tag_is_an_error() {
        let element = NodeElement::new("Fiducial");

        match read_node(&element, Path::new(".")) {
            Err(SceneError::UnknownNodeTag { tag }) => assert_eq!(tag, "Fiducial"),
            other => panic!("expected an unknown tag error, got {:?}", other),
        }
    }

    #[test]
    fn malformed_vector_is_an_error() {
        let mut element = NodeElement::new("Camera");
        element
            .attributes
            .insert("position".to_owned(), "1 2".to_owned());

        match read_node(&element, Path::new(".")) {
            Err(SceneError::InvalidAttribute { tag, name, value }) => {
                assert_eq!(tag, "Camera");
                assert_eq!(name, "position");
                assert_eq!(value, "1 2");
            }
            other => panic!("expected an invalid attribute error, got {:?}", other),
        }
    }

    #[test]
    fn missing_attributes_use_defaults() {
        let node = read_node(&NodeElement::new("LinearTransform"), Path::new(".")).unwrap();

        assert_eq!(node.kind, NodeKind::LinearTransform(TransformNode::default()));
        assert!(node.id().is_none());
        assert!(node.save_with_scene);
    }

    #[test]
    fn scene_view_children_keep_their_ids() {
        let mut nodes = SceneGraph::detached();
        nodes.adopt_node(Node::of_class(NodeClass::Camera).with_id("Cam").name("Front"));
        nodes.adopt_node(
            Node::of_class(NodeClass::Camera)
                .with_id("Scratch")
                .save_with_scene(false),
        );

        let mut view = SceneView::new().description("First line\nSecond line");
        view.set_nodes(nodes);

        let node = Node::new(NodeKind::SceneView(view)).with_id("vtkMRMLSceneViewNode1");
        let element = write_node(&node);

        assert_eq!(element.children.len(), 1);
        assert_eq!(
            element.attributes["sceneViewDescription"],
            "First line[br]Second line"
        );

        let read = read_node(&element, Path::new("/scenes")).unwrap();
        let view = read.kind.as_scene_view().unwrap();
        let captured = view.nodes().unwrap();

        assert_eq!(view.description, "First line\nSecond line");
        assert_eq!(captured.ids(), vec![NodeId::from("Cam")]);
        assert_eq!(captured.get("Cam").unwrap().name, "Front");
        assert_eq!(captured.root_directory(), Path::new("/scenes"));
        assert!(!captured.get("Cam").unwrap().is_pending_add());
    }
}
