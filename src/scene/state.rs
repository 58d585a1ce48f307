use std::ops::{Deref, DerefMut};

use super::SceneGraph;

/// Keeps a scene graph in its restoring state for as long as it is alive.
///
/// While any guard exists, node notifications are queued instead of being
/// delivered. Dropping the outermost guard flushes the queue exactly once,
/// whichever way the scope was left.
#[must_use = "the restoring state ends as soon as the guard is dropped"]
pub struct RestoreState<'a> {
    scene: &'a mut SceneGraph,
}

impl<'a> RestoreState<'a> {
    pub(super) fn enter(scene: &'a mut SceneGraph) -> Self {
        scene.begin_restore();
        RestoreState { scene }
    }
}

impl Deref for RestoreState<'_> {
    type Target = SceneGraph;

    fn deref(&self) -> &SceneGraph {
        self.scene
    }
}

impl DerefMut for RestoreState<'_> {
    fn deref_mut(&mut self) -> &mut SceneGraph {
        self.scene
    }
}

impl Drop for RestoreState<'_> {
    fn drop(&mut self) {
        self.scene.end_restore();
    }
}
