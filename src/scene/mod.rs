//! The scene graph: an ordered collection of nodes that owns them, hands out
//! their identifiers, and tells observers what changed.
//!
//! Nodes refer to one another by identifier only. When a node can't keep the
//! identifier it asked for, the graph records the old and new identifiers in
//! its changed-ID table so a later reference-resolution pass can rewrite
//! every stale reference in one go.

mod event;
mod state;

pub use event::SceneEvent;
pub use state::RestoreState;

use std::{
    borrow::Borrow,
    collections::{HashMap, HashSet},
    hash::Hash,
    mem,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;

use crate::{
    event_log::EventLog,
    node::{Node, NodeClass, NodeKind},
    node_id::{NodeId, SceneId},
    scene_view::SceneView,
};

#[derive(Debug)]
pub struct SceneGraph {
    id: SceneId,

    /// Base directory that relative storage paths are resolved against.
    root_directory: PathBuf,

    /// Every node in the graph, in insertion order. Removal preserves the
    /// order of the remaining nodes.
    nodes: IndexMap<NodeId, Node>,

    /// Identifiers that had to be replaced while importing a document, keyed
    /// by the identifier the node asked for. Empty outside of an import.
    changed_ids: HashMap<NodeId, NodeId>,

    /// Set while a document is being imported. Only then are replaced
    /// identifiers recorded, since only then do other incoming nodes still
    /// refer to the identifier that was asked for.
    importing: bool,

    /// Last counter handed out per class when generating identifiers.
    id_counters: HashMap<NodeClass, u32>,

    /// Graphs private to a scene view are never observed, so they don't
    /// record notifications at all.
    notifications: bool,

    restore_depth: u32,
    pending_events: Vec<SceneEvent>,
    events: EventLog<SceneEvent>,
}

impl SceneGraph {
    pub fn new() -> SceneGraph {
        SceneGraph {
            id: SceneId::new(),
            root_directory: PathBuf::from("."),
            nodes: IndexMap::new(),
            changed_ids: HashMap::new(),
            importing: false,
            id_counters: HashMap::new(),
            notifications: true,
            restore_depth: 0,
            pending_events: Vec::new(),
            events: EventLog::new(),
        }
    }

    /// A graph that records no notifications, used for scene view contents.
    pub(crate) fn detached() -> SceneGraph {
        SceneGraph {
            notifications: false,
            ..SceneGraph::new()
        }
    }

    pub fn id(&self) -> SceneId {
        self.id
    }

    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }

    pub fn set_root_directory(&mut self, root_directory: impl Into<PathBuf>) {
        self.root_directory = root_directory.into();
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains<Q>(&self, id: &Q) -> bool
    where
        NodeId: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.nodes.contains_key(id)
    }

    pub fn get<Q>(&self, id: &Q) -> Option<&Node>
    where
        NodeId: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.nodes.get(id)
    }

    /// Direct mutable access, bypassing notifications. Outside of the crate,
    /// mutation goes through `modify_node` so observers hear about it.
    pub(crate) fn get_mut<Q>(&mut self, id: &Q) -> Option<&mut Node>
    where
        NodeId: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.nodes.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn ids(&self) -> Vec<NodeId> {
        self.nodes.keys().cloned().collect()
    }

    pub fn nodes_by_class(&self, class: NodeClass) -> Vec<&Node> {
        self.nodes
            .values()
            .filter(|node| node.class() == class)
            .collect()
    }

    /// Whether `node` reports this graph as its owner.
    pub fn owns(&self, node: &Node) -> bool {
        node.scene == Some(self.id)
    }

    /// Adds a node and returns the identifier it ended up with.
    ///
    /// A requested identifier is kept if nothing else uses it. Otherwise a
    /// fresh one is generated. During an import the replacement is recorded
    /// in the changed-ID table so references from the rest of the document
    /// can follow it. Singletons are identified by class and singleton tag;
    /// adding one that already exists copies its state into the existing node.
    pub fn add_node(&mut self, mut node: Node) -> NodeId {
        if let Some(tag) = &node.singleton_tag {
            let singleton_id = NodeId::from(format!("{}{}", node.class().class_name(), tag));

            if self.importing && node.id.is_some() && node.id != singleton_id {
                self.changed_ids
                    .insert(mem::take(&mut node.id), singleton_id.clone());
            }

            if self.nodes.contains_key(&singleton_id) {
                log::debug!("Singleton {} already exists, copying into it", singleton_id);
                self.copy_node_state(&singleton_id, &node);
                return singleton_id;
            }

            node.id = singleton_id;
            return self.insert(node);
        }

        if node.id.is_none() || self.nodes.contains_key(&node.id) {
            let new_id = self.generate_id(node.class());

            if node.id.is_some() {
                log::debug!("Node ID {} is taken, using {} instead", node.id, new_id);

                if self.importing {
                    self.changed_ids.insert(node.id.clone(), new_id.clone());
                }
            }

            node.id = new_id;
        }

        self.insert(node)
    }

    /// Attaches a node under exactly the identifier it carries. Used when
    /// building a scene view's graph, where identifiers must match the live
    /// nodes they were copied from.
    pub(crate) fn adopt_node(&mut self, node: Node) -> NodeId {
        debug_assert!(node.id.is_some(), "adopted nodes must carry an identifier");

        if self.nodes.contains_key(&node.id) {
            log::warn!("Replacing node {} while adopting a copy", node.id);
        }

        self.insert(node)
    }

    fn insert(&mut self, mut node: Node) -> NodeId {
        let id = node.id.clone();
        node.scene = Some(self.id);

        self.nodes.insert(id.clone(), node);
        self.emit(SceneEvent::NodeAdded(id.clone()));

        id
    }

    fn generate_id(&mut self, class: NodeClass) -> NodeId {
        let counter = self.id_counters.entry(class).or_insert(0);

        loop {
            *counter += 1;
            let candidate = NodeId::from(format!("{}{}", class.class_name(), counter));

            if !self.nodes.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    /// Removes a node along with everything that cascades from it, returning
    /// the detached nodes in removal order.
    ///
    /// Removing a node also removes its owned dependents (display and storage
    /// nodes) that nothing remaining still refers to, and any hierarchy node
    /// associated with it. Removing an identifier that isn't in the graph
    /// does nothing.
    pub fn remove_node<Q>(&mut self, id: &Q) -> Vec<Node>
    where
        NodeId: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut pending = match self.nodes.get_key_value(id) {
            Some((id, _)) => vec![id.clone()],
            None => return Vec::new(),
        };

        let mut removed = Vec::new();

        while let Some(id) = pending.pop() {
            let mut node = match self.nodes.shift_remove(&id) {
                Some(node) => node,
                None => continue,
            };

            node.scene = None;
            node.add_to_scene = false;

            for dependent in node.kind.owned_dependents() {
                if !self.is_referenced(dependent) && !pending.contains(dependent) {
                    pending.push(dependent.clone());
                }
            }

            for (other_id, other) in &self.nodes {
                let associated = other
                    .kind
                    .as_hierarchy()
                    .and_then(|hierarchy| hierarchy.associated_node.as_ref());

                if associated == Some(&id) && !pending.contains(other_id) {
                    pending.push(other_id.clone());
                }
            }

            log::trace!("Removed node {}", id);
            self.emit(SceneEvent::NodeRemoved(id));
            removed.push(node);
        }

        removed
    }

    fn is_referenced(&self, id: &NodeId) -> bool {
        self.nodes
            .values()
            .any(|node| node.kind.references().into_iter().any(|reference| reference == id))
    }

    /// Removes every node and forgets the changed-ID table.
    pub fn clear(&mut self) {
        let nodes = mem::take(&mut self.nodes);

        for id in nodes.into_keys() {
            self.emit(SceneEvent::NodeRemoved(id));
        }

        self.changed_ids.clear();
        self.id_counters.clear();
    }

    /// Mutates a node and notifies observers once.
    pub fn modify_node<Q, F, R>(&mut self, id: &Q, modify: F) -> Option<R>
    where
        NodeId: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        F: FnOnce(&mut Node) -> R,
    {
        let node = self.nodes.get_mut(id)?;
        let result = modify(node);
        let id = node.id.clone();

        self.emit(SceneEvent::NodeModified(id));
        Some(result)
    }

    /// Overwrites a node's state with `source`'s, with a single notification
    /// instead of one per field. Returns false if there is no such node.
    pub fn copy_node_state<Q>(&mut self, id: &Q, source: &Node) -> bool
    where
        NodeId: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.modify_node(id, |node| node.copy_from(source)).is_some()
    }

    pub fn changed_id<Q>(&self, id: &Q) -> Option<&NodeId>
    where
        NodeId: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.changed_ids.get(id)
    }

    /// Imports another graph's changed-ID table, keeping entries this graph
    /// already has.
    pub fn copy_changed_ids(&mut self, other: &SceneGraph) {
        for (old, new) in &other.changed_ids {
            self.changed_ids
                .entry(old.clone())
                .or_insert_with(|| new.clone());
        }
    }

    pub fn clear_changed_ids(&mut self) {
        self.changed_ids.clear();
    }

    /// Starts recording replaced identifiers for a bulk import.
    pub(crate) fn begin_import(&mut self) {
        self.importing = true;
    }

    /// Stops recording and forgets the table. Every reference written by the
    /// import must have been resolved by now; any later remapping would hit
    /// references that point at nodes which legitimately kept their ID.
    pub(crate) fn end_import(&mut self) {
        self.importing = false;
        self.changed_ids.clear();
    }

    /// Rewrites every reference in the graph through the changed-ID table.
    pub fn update_node_references(&mut self) {
        if self.changed_ids.is_empty() {
            return;
        }

        let changed_ids = &self.changed_ids;

        for node in self.nodes.values_mut() {
            node.remap_references(|id| changed_ids.get(id).cloned());
        }
    }

    /// Runs a node's scene-update hook against this graph.
    ///
    /// The node's references are rewritten through the changed-ID table. If
    /// the node was just inserted and its storage node is in this graph, a
    /// read of its data is requested and the node stops being pending.
    pub fn update_node_scene<Q>(&mut self, id: &Q)
    where
        NodeId: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = match self.nodes.get_index_of(id) {
            Some(index) => index,
            None => return,
        };

        let read_from = {
            let node = &self.nodes[index];

            if node.add_to_scene {
                node.kind
                    .storage_node()
                    .map(|storage| self.changed_ids.get::<NodeId>(storage).unwrap_or(storage))
                    .filter(|storage| {
                        self.nodes
                            .get(*storage)
                            .map_or(false, |storage| storage.class().is_storage())
                    })
                    .cloned()
            } else {
                None
            }
        };

        let changed_ids = &self.changed_ids;
        let node = &mut self.nodes[index];
        node.remap_references(|id| changed_ids.get::<NodeId>(id).cloned());

        if let Some(storage) = read_from {
            node.add_to_scene = false;

            let node = node.id.clone();
            self.emit(SceneEvent::ReadDataRequested { node, storage });
        }
    }

    /// Lends out the payload of a scene view node together with the graph
    /// that holds it. The node keeps an empty payload for the duration of
    /// the call, which leaves its class, and therefore its eligibility,
    /// unchanged.
    pub(crate) fn with_scene_view<Q, F, R>(&mut self, id: &Q, action: F) -> Option<R>
    where
        NodeId: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        F: FnOnce(&mut SceneView, &mut SceneGraph) -> R,
    {
        let (id, node) = match self.nodes.get_full_mut(id) {
            Some((_, id, node)) => (id.clone(), node),
            None => {
                log::warn!("No scene view node with that ID in the scene");
                return None;
            }
        };

        let mut view = match &mut node.kind {
            NodeKind::SceneView(view) => mem::take(view),
            _ => {
                log::warn!("Node {} is not a scene view", id);
                return None;
            }
        };

        let result = action(&mut view, self);

        match self
            .nodes
            .get_mut(&id)
            .and_then(|node| node.kind.as_scene_view_mut())
        {
            Some(slot) => *slot = view,
            None => log::warn!("Scene view {} left the scene while in use", id),
        }

        Some(result)
    }

    /// Puts the graph into its restoring state until the returned guard is
    /// dropped.
    pub fn start_restore(&mut self) -> RestoreState<'_> {
        RestoreState::enter(self)
    }

    pub fn is_restoring(&self) -> bool {
        self.restore_depth > 0
    }

    pub fn events(&self) -> &EventLog<SceneEvent> {
        &self.events
    }

    fn emit(&mut self, event: SceneEvent) {
        if !self.notifications {
            return;
        }

        if self.restore_depth > 0 {
            self.pending_events.push(event);
        } else {
            self.events.push(event);
        }
    }

    fn begin_restore(&mut self) {
        if self.restore_depth == 0 && self.notifications {
            self.events.push(SceneEvent::RestoreStarted);
        }

        self.restore_depth += 1;
    }

    fn end_restore(&mut self) {
        self.restore_depth = self.restore_depth.saturating_sub(1);

        if self.restore_depth > 0 || !self.notifications {
            return;
        }

        let pending = coalesce_modifications(mem::take(&mut self.pending_events));
        log::trace!("Flushing {} batched scene events", pending.len());

        self.events.push_messages(&pending);
        self.events.push(SceneEvent::RestoreEnded);
    }
}

/// Drops every modification notification after the first one for the same
/// node.
fn coalesce_modifications(events: Vec<SceneEvent>) -> Vec<SceneEvent> {
    let mut modified = HashSet::new();

    events
        .into_iter()
        .filter(|event| match event {
            SceneEvent::NodeModified(id) => modified.insert(id.clone()),
            _ => true,
        })
        .collect()
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloning a graph deep-copies its nodes into a graph with a new identity.
/// The event history stays behind.
impl Clone for SceneGraph {
    fn clone(&self) -> Self {
        let id = SceneId::new();

        let nodes = self
            .nodes
            .iter()
            .map(|(node_id, node)| {
                let mut node = node.clone();
                node.scene = Some(id);
                (node_id.clone(), node)
            })
            .collect();

        SceneGraph {
            id,
            root_directory: self.root_directory.clone(),
            nodes,
            changed_ids: self.changed_ids.clone(),
            importing: false,
            id_counters: self.id_counters.clone(),
            notifications: self.notifications,
            restore_depth: 0,
            pending_events: Vec::new(),
            events: EventLog::new(),
        }
    }
}

/// Two graphs are equal when they hold the same identifiers, in the same
/// order, with equal node state.
impl PartialEq for SceneGraph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes.len() == other.nodes.len()
            && self
                .nodes
                .iter()
                .zip(other.nodes.iter())
                .all(|((id, node), (other_id, other_node))| id == other_id && node == other_node)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::node::{HierarchyNode, VolumeNode};

    fn volume(display: Option<&str>, storage: Option<&str>) -> Node {
        Node::new(NodeKind::ScalarVolume(VolumeNode {
            display_node: display.map(NodeId::from),
            storage_node: storage.map(NodeId::from),
            ..Default::default()
        }))
    }

    #[test]
    fn generated_ids_use_class_prefix() {
        let mut scene = SceneGraph::new();

        let first = scene.add_node(Node::of_class(NodeClass::Camera));
        let second = scene.add_node(Node::of_class(NodeClass::Camera));

        assert_eq!(first.as_str(), "vtkMRMLCameraNode1");
        assert_eq!(second.as_str(), "vtkMRMLCameraNode2");
        assert!(scene.owns(scene.get(&first).unwrap()));
    }

    #[test]
    fn taken_ids_are_recorded_while_importing() {
        let mut scene = SceneGraph::new();
        scene.begin_import();

        scene.add_node(Node::of_class(NodeClass::Camera).with_id("vtkMRMLCameraNode1"));
        let new_id = scene.add_node(Node::of_class(NodeClass::Camera).with_id("vtkMRMLCameraNode1"));

        assert_eq!(new_id.as_str(), "vtkMRMLCameraNode2");
        assert_eq!(scene.changed_id("vtkMRMLCameraNode1"), Some(&new_id));
    }

    #[test]
    fn taken_ids_outside_import_are_not_recorded() {
        let mut scene = SceneGraph::new();

        let kept = scene.add_node(Node::of_class(NodeClass::VolumeStorage).with_id("storage"));
        let volume = scene.add_node(volume(None, Some("storage")));
        let moved = scene.add_node(Node::of_class(NodeClass::VolumeStorage).with_id("storage"));

        assert_ne!(moved, kept);
        assert_eq!(scene.changed_id("storage"), None);

        scene.update_node_references();
        scene.update_node_scene(&volume);

        assert_eq!(scene.get(&volume).unwrap().kind.storage_node(), Some(&kept));
    }

    #[test]
    fn end_import_forgets_changed_ids() {
        let mut scene = SceneGraph::new();
        scene.begin_import();

        scene.add_node(Node::of_class(NodeClass::Camera).with_id("Cam"));
        scene.add_node(Node::of_class(NodeClass::Camera).with_id("Cam"));
        assert!(scene.changed_id("Cam").is_some());

        scene.end_import();
        scene.add_node(Node::of_class(NodeClass::Camera).with_id("Cam"));

        assert_eq!(scene.changed_id("Cam"), None);
    }

    #[test]
    fn generated_ids_skip_explicit_ones() {
        let mut scene = SceneGraph::new();

        scene.add_node(Node::of_class(NodeClass::Camera).with_id("vtkMRMLCameraNode1"));
        let generated = scene.add_node(Node::of_class(NodeClass::Camera));

        assert_eq!(generated.as_str(), "vtkMRMLCameraNode2");
    }

    #[test]
    fn singleton_copies_into_existing() {
        let mut scene = SceneGraph::new();

        let first = scene.add_node(
            Node::of_class(NodeClass::Hierarchy)
                .name("first")
                .singleton_tag("SceneViewTopLevel"),
        );
        let second = scene.add_node(
            Node::of_class(NodeClass::Hierarchy)
                .name("second")
                .singleton_tag("SceneViewTopLevel"),
        );

        assert_eq!(first.as_str(), "vtkMRMLHierarchyNodeSceneViewTopLevel");
        assert_eq!(first, second);
        assert_eq!(scene.len(), 1);
        assert_eq!(scene.get(&first).unwrap().name, "second");
    }

    #[test]
    fn remove_cascades_to_owned_dependents() {
        let mut scene = SceneGraph::new();

        let display = scene.add_node(Node::of_class(NodeClass::VolumeDisplay));
        let storage = scene.add_node(Node::of_class(NodeClass::VolumeStorage));
        let volume = scene.add_node(volume(Some(display.as_str()), Some(storage.as_str())));
        let hierarchy = scene.add_node(Node::new(NodeKind::Hierarchy(HierarchyNode {
            associated_node: Some(volume.clone()),
            ..Default::default()
        })));
        let camera = scene.add_node(Node::of_class(NodeClass::Camera));

        let removed: HashSet<NodeId> = scene
            .remove_node(&volume)
            .into_iter()
            .map(|node| {
                assert_eq!(node.scene_id(), None);
                node.id().clone()
            })
            .collect();

        let expected: HashSet<NodeId> = [volume, display, storage, hierarchy].into_iter().collect();
        assert_eq!(removed, expected);
        assert_eq!(scene.ids(), vec![camera]);
    }

    #[test]
    fn shared_dependents_survive_removal() {
        let mut scene = SceneGraph::new();

        let display = scene.add_node(Node::of_class(NodeClass::VolumeDisplay));
        let first = scene.add_node(volume(Some(display.as_str()), None));
        let second = scene.add_node(volume(Some(display.as_str()), None));

        let removed = scene.remove_node(&first);

        assert_eq!(removed.len(), 1);
        assert!(scene.contains(&display));
        assert!(scene.contains(&second));
    }

    #[test]
    fn removing_missing_node_is_a_no_op() {
        let mut scene = SceneGraph::new();
        let cursor = scene.events().cursor();

        assert!(scene.remove_node("vtkMRMLCameraNode7").is_empty());
        assert!(scene.events().since(cursor).is_empty());
    }

    #[test]
    fn removal_preserves_order() {
        let mut scene = SceneGraph::new();

        let a = scene.add_node(Node::of_class(NodeClass::Camera));
        let b = scene.add_node(Node::of_class(NodeClass::Camera));
        let c = scene.add_node(Node::of_class(NodeClass::Camera));

        scene.remove_node(&b);
        assert_eq!(scene.ids(), vec![a, c]);
    }

    #[test]
    fn update_node_references_remaps() {
        let mut scene = SceneGraph::new();
        scene.begin_import();

        scene.add_node(Node::of_class(NodeClass::VolumeDisplay).with_id("display"));
        let moved = scene.add_node(Node::of_class(NodeClass::VolumeDisplay).with_id("display"));
        let volume = scene.add_node(volume(Some("display"), None));

        scene.update_node_references();

        let node = scene.get(&volume).unwrap();
        assert_eq!(node.kind.references(), vec![&moved]);
    }

    #[test]
    fn modify_node_notifies_once() {
        let mut scene = SceneGraph::new();
        let camera = scene.add_node(Node::of_class(NodeClass::Camera));
        let cursor = scene.events().cursor();

        scene.modify_node(&camera, |node| {
            node.name = "Renamed".to_owned();
            node.hide_from_editors = true;
        });

        assert_eq!(
            scene.events().since(cursor),
            &[SceneEvent::NodeModified(camera)]
        );
    }

    #[test]
    fn restoring_state_batches_and_coalesces() {
        let mut scene = SceneGraph::new();
        let camera = scene.add_node(Node::of_class(NodeClass::Camera));
        let cursor = scene.events().cursor();

        {
            let mut restoring = scene.start_restore();
            assert!(restoring.is_restoring());

            restoring.modify_node(&camera, |node| node.name = "a".to_owned());
            restoring.modify_node(&camera, |node| node.name = "b".to_owned());

            {
                let mut nested = restoring.start_restore();
                nested.remove_node(&camera);
            }

            assert_eq!(restoring.events().since(cursor), &[SceneEvent::RestoreStarted]);
        }

        assert!(!scene.is_restoring());
        assert_eq!(
            scene.events().since(cursor),
            &[
                SceneEvent::RestoreStarted,
                SceneEvent::NodeModified(camera.clone()),
                SceneEvent::NodeRemoved(camera),
                SceneEvent::RestoreEnded,
            ]
        );
    }

    #[test]
    fn detached_graphs_record_nothing() {
        let mut scene = SceneGraph::detached();
        scene.add_node(Node::of_class(NodeClass::Camera));

        assert_eq!(scene.events().cursor(), 0);
    }

    #[test]
    fn clone_has_new_identity() {
        let mut scene = SceneGraph::new();
        let camera = scene.add_node(Node::of_class(NodeClass::Camera));

        let copy = scene.clone();

        assert_ne!(copy.id(), scene.id());
        assert!(copy.owns(copy.get(&camera).unwrap()));
        assert_eq!(copy, scene);
    }

    #[test]
    fn update_node_scene_requests_data_for_pending_nodes() {
        let mut scene = SceneGraph::new();
        let storage = scene.add_node(Node::of_class(NodeClass::VolumeStorage));

        let mut node = volume(None, Some(storage.as_str()));
        node.add_to_scene = true;
        let volume = scene.add_node(node);

        let cursor = scene.events().cursor();
        scene.update_node_scene(&volume);
        scene.update_node_scene(&volume);

        assert_eq!(
            scene.events().since(cursor),
            &[SceneEvent::ReadDataRequested {
                node: volume.clone(),
                storage,
            }]
        );
        assert!(!scene.get(&volume).unwrap().is_pending_add());
    }
}
