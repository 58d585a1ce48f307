
use crate::{
    image::ImageData,
    node::{DisplayNode, Node, NodeClass, NodeKind, StorageNode, VolumeNode},
    node_id::NodeId,
    persist::{write_node, LoadOptions, SceneDocument},
    scene::SceneGraph,
};

/// Adds a display node, a storage node and then a volume that uses both,
/// returning the volume's identifier.
fn add_volume(scene: &mut SceneGraph, name: &str) -> NodeId {
    let display = scene.add_node(Node::new(NodeKind::VolumeDisplay(DisplayNode::default())));
    let storage = scene.add_node(Node::new(NodeKind::VolumeStorage(StorageNode {
        file_name: format!("{}.nrrd", name).into(),
    })));

    scene.add_node(
        Node::new(NodeKind::ScalarVolume(VolumeNode {
            display_node: Some(display),
            storage_node: Some(storage),
            image: ImageData::new([4, 4, 2], 1),
            ..Default::default()
        }))
        .name(name),
    )
}

fn volume_of(scene: &SceneGraph, id: &NodeId) -> VolumeNode {
    match &scene.get(id).expect("volume should be in the scene").kind {
        NodeKind::ScalarVolume(volume) => volume.clone(),
        other => panic!("expected a volume, found {:?}", other.class()),
    }
}

fn camera(id: &str, name: &str) -> Node {
    Node::of_class(NodeClass::Camera).with_id(id).name(name)
}

/// A document whose second storage node asks for an identifier the first
/// one already holds, with a volume and a scene view that both name it.
fn colliding_document() -> SceneDocument {
    let mut source = SceneGraph::new();
    source.add_node(
        Node::new(NodeKind::VolumeStorage(StorageNode {
            file_name: "first.nrrd".into(),
        }))
        .with_id("storage"),
    );
    source.add_node(
        Node::new(NodeKind::ScalarVolume(VolumeNode {
            storage_node: Some("storage".into()),
            ..Default::default()
        }))
        .with_id("vol"),
    );
    source.add_node(Node::of_class(NodeClass::SceneView).with_id("view"));
    source.store_scene_view("view");

    let mut document = source.to_document();
    document.nodes.insert(
        1,
        write_node(
            &Node::new(NodeKind::VolumeStorage(StorageNode {
                file_name: "second.nrrd".into(),
            }))
            .with_id("storage"),
        ),
    );

    document
}

fn load_without_screen_captures(document: &SceneDocument) -> SceneGraph {
    let options = LoadOptions {
        probe_legacy_screen_captures: false,
    };

    SceneGraph::from_document(document, ".", &options).unwrap()
}
