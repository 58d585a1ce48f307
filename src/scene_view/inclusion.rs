use crate::{
    node::{HierarchyNode, Node, NodeClass, NodeKind},
    scene::SceneGraph,
};

/// Attribute that tags hierarchy nodes used to organize scene views.
pub const SCENE_VIEW_HIERARCHY_ATTRIBUTE: &str = "SceneViewHierarchy";

const TOP_LEVEL_ID_PREFIX: &str = "vtkMRMLHierarchyNodeSceneViewTopLevel";
const LEGACY_TOP_LEVEL_NAME_PREFIX: &str = "SceneViewToplevel";
const SCENE_VIEW_ID_PREFIX: &str = "vtkMRMLSceneViewNode";

/// Tells whether a node takes part in scene views.
///
/// Scene views never capture or restore themselves, their storage, or the
/// hierarchy scaffolding that organizes them. `scene` is the graph that holds
/// `node`; it's used to look up what a hierarchy node is associated with.
///
/// The answer depends on the node's current state and is worked out fresh on
/// every call.
pub fn include_node_in_scene_view(node: &Node, scene: &SceneGraph) -> bool {
    let included = match &node.kind {
        NodeKind::SceneView(_) | NodeKind::SceneViewStorage(_) | NodeKind::SnapshotClip(_) => false,
        NodeKind::Hierarchy(hierarchy) => !is_scene_view_hierarchy(node, hierarchy, scene),
        _ => true,
    };

    log::trace!(
        "{} {} scene views",
        node.id(),
        if included { "included in" } else { "excluded from" }
    );

    included
}

fn is_scene_view_hierarchy(node: &Node, hierarchy: &HierarchyNode, scene: &SceneGraph) -> bool {
    if node.attribute_value(SCENE_VIEW_HIERARCHY_ATTRIBUTE).is_some() {
        return true;
    }

    if node.id().as_str().starts_with(TOP_LEVEL_ID_PREFIX) {
        return true;
    }

    // Older files named their top level node instead of tagging it.
    if node.name.starts_with(LEGACY_TOP_LEVEL_NAME_PREFIX) {
        return true;
    }

    let associated = match &hierarchy.associated_node {
        Some(associated) => associated,
        None => return false,
    };

    let resolves_to_scene_view = scene
        .get(associated)
        .map_or(false, |node| node.class() == NodeClass::SceneView);

    // The associated node may not resolve when a stray hierarchy node is
    // being restored out of a scene view, so fall back to its identifier.
    resolves_to_scene_view || associated.as_str().starts_with(SCENE_VIEW_ID_PREFIX)
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::node_id::NodeId;

    fn hierarchy(associated: Option<&str>) -> Node {
        Node::new(NodeKind::Hierarchy(HierarchyNode {
            associated_node: associated.map(NodeId::from),
            ..Default::default()
        }))
    }

    #[test]
    fn scene_view_classes_are_excluded() {
        let scene = SceneGraph::new();

        for class in [
            NodeClass::SceneView,
            NodeClass::SceneViewStorage,
            NodeClass::SnapshotClip,
        ] {
            assert!(!include_node_in_scene_view(&Node::of_class(class), &scene));
        }

        for class in [NodeClass::ScalarVolume, NodeClass::Camera, NodeClass::VolumeStorage] {
            assert!(include_node_in_scene_view(&Node::of_class(class), &scene));
        }
    }

    #[test]
    fn plain_hierarchy_is_included() {
        let mut scene = SceneGraph::new();
        let volume = scene.add_node(Node::of_class(NodeClass::ScalarVolume));

        assert!(include_node_in_scene_view(&hierarchy(None), &scene));
        assert!(include_node_in_scene_view(
            &hierarchy(Some(volume.as_str())),
            &scene
        ));
    }

    #[test]
    fn tagged_hierarchy_is_excluded() {
        let scene = SceneGraph::new();
        let node = hierarchy(None).attribute(SCENE_VIEW_HIERARCHY_ATTRIBUTE, "");

        assert!(!include_node_in_scene_view(&node, &scene));
    }

    #[test]
    fn top_level_hierarchy_is_excluded() {
        let scene = SceneGraph::new();

        let by_id = hierarchy(None).with_id("vtkMRMLHierarchyNodeSceneViewTopLevel");
        assert!(!include_node_in_scene_view(&by_id, &scene));

        let by_name = hierarchy(None).name("SceneViewToplevel 2");
        assert!(!include_node_in_scene_view(&by_name, &scene));
    }

    #[test]
    fn hierarchy_of_scene_view_is_excluded() {
        let mut scene = SceneGraph::new();
        let view = scene.add_node(Node::of_class(NodeClass::SceneView).with_id("MyView"));

        assert!(!include_node_in_scene_view(
            &hierarchy(Some(view.as_str())),
            &scene
        ));

        // Unresolvable, but the identifier gives it away.
        assert!(!include_node_in_scene_view(
            &hierarchy(Some("vtkMRMLSceneViewNode4")),
            &scene
        ));
    }

    #[test]
    fn decision_follows_current_state() {
        let mut scene = SceneGraph::new();
        let id = scene.add_node(hierarchy(None));

        assert!(include_node_in_scene_view(scene.get(&id).unwrap(), &scene));

        scene.modify_node(&id, |node| {
            node.attributes
                .insert(SCENE_VIEW_HIERARCHY_ATTRIBUTE.to_owned(), "1".to_owned());
        });

        assert!(!include_node_in_scene_view(scene.get(&id).unwrap(), &scene));
    }
}
