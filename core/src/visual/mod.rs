//! Temporary visual feedback: guide lines and point markers displayed by the
//! renderer while a pick operation runs.
//!
//! The renderer is external. Snappers only see the [`VisualContext`] trait and
//! must remove every handle they create; [`TemporaryMeshes`] is the in-memory
//! implementation used by the backend session and by tests.

use crate::geometry::Point3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::warn;

/// Opaque handle of a temporary mesh owned by the component that displayed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TempMeshId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineStyle {
    Solid,
    Dashed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointStyle {
    /// Marker for the currently snapped point
    Snapped,
    /// Pinned object-tracking point
    Tracked,
    /// Non-selectable hint such as an arc center
    Hint,
}

/// Renderer-agnostic description of a temporary mesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum MeshData {
    Point {
        position: Point3,
        style: PointStyle,
        color: u32,
        size: f32,
    },
    Line {
        start: Point3,
        end: Point3,
        style: LineStyle,
        color: u32,
    },
}

pub const GUIDE_COLOR: u32 = 0x00ff_ff00;
pub const SNAP_COLOR: u32 = 0x00ff_aa00;
pub const HINT_COLOR: u32 = 0x0088_8888;

impl MeshData {
    pub fn point(position: Point3, style: PointStyle) -> Self {
        let (color, size) = match style {
            PointStyle::Snapped => (SNAP_COLOR, 5.0),
            PointStyle::Tracked => (GUIDE_COLOR, 5.0),
            PointStyle::Hint => (HINT_COLOR, 3.0),
        };
        MeshData::Point { position, style, color, size }
    }

    pub fn dashed_line(start: Point3, end: Point3) -> Self {
        MeshData::Line { start, end, style: LineStyle::Dashed, color: GUIDE_COLOR }
    }
}

/// Display surface for temporary meshes of one document.
pub trait VisualContext: Send {
    fn display_temporary_mesh(&mut self, mesh: MeshData) -> TempMeshId;

    /// Returns false if the handle was unknown.
    fn remove_temporary_mesh(&mut self, id: TempMeshId) -> bool;
}

pub type SharedVisual = Arc<Mutex<dyn VisualContext>>;

/// Runs `f` with exclusive access to a shared visual context. A poisoned lock
/// is recovered: temporary meshes carry no invariants worth aborting over.
pub fn with_visual<R>(visual: &SharedVisual, f: impl FnOnce(&mut dyn VisualContext) -> R) -> R {
    let mut guard = visual.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut *guard)
}

/// Meshes displayed by one component on one visual context.
#[derive(Clone)]
pub struct OwnedMeshes {
    visual: SharedVisual,
    ids: Vec<TempMeshId>,
}

impl OwnedMeshes {
    pub fn new(visual: SharedVisual) -> Self {
        Self { visual, ids: Vec::new() }
    }

    pub fn display(&mut self, mesh: MeshData) -> TempMeshId {
        let id = with_visual(&self.visual, |ctx| ctx.display_temporary_mesh(mesh));
        self.ids.push(id);
        id
    }

    pub fn remove_all(&mut self) {
        if self.ids.is_empty() {
            return;
        }
        let ids = std::mem::take(&mut self.ids);
        with_visual(&self.visual, |ctx| {
            for id in ids {
                ctx.remove_temporary_mesh(id);
            }
        });
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl std::fmt::Debug for OwnedMeshes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnedMeshes").field("ids", &self.ids).finish()
    }
}

/// A change to the set of displayed temporary meshes, forwarded to renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum VisualChange {
    Added { id: TempMeshId, mesh: MeshData },
    Removed { id: TempMeshId },
}

/// In-memory visual context: tracks the active meshes and logs every change.
#[derive(Debug, Default)]
pub struct TemporaryMeshes {
    next_id: u64,
    active: BTreeMap<TempMeshId, MeshData>,
    changes: Vec<VisualChange>,
}

impl TemporaryMeshes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Mutex<TemporaryMeshes>> {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn active(&self) -> impl Iterator<Item = (&TempMeshId, &MeshData)> {
        self.active.iter()
    }

    /// Every change since the last call, in order.
    pub fn take_changes(&mut self) -> Vec<VisualChange> {
        std::mem::take(&mut self.changes)
    }

    pub fn changes(&self) -> &[VisualChange] {
        &self.changes
    }
}

impl VisualContext for TemporaryMeshes {
    fn display_temporary_mesh(&mut self, mesh: MeshData) -> TempMeshId {
        self.next_id += 1;
        let id = TempMeshId(self.next_id);
        self.active.insert(id, mesh.clone());
        self.changes.push(VisualChange::Added { id, mesh });
        id
    }

    fn remove_temporary_mesh(&mut self, id: TempMeshId) -> bool {
        if self.active.remove(&id).is_none() {
            warn!("Removing unknown temporary mesh {:?}", id);
            return false;
        }
        self.changes.push(VisualChange::Removed { id });
        true
    }
}
