//! The modal point pick: a state machine fed pointer, keyboard and clock
//! events by its host. It owns one of each snapper and reports a terminal
//! [`PickStatus`] once the user commits or cancels. Firing the pick's
//! [`CancellationToken`] finishes it on the spot, from any thread.

use super::input::{InputContext, InputError};
use super::cancellation::CancelRegistration;
use super::{
    CancellationToken, Dimensions, ObjectSnap, PointerState, SnapResult, Snapper, TrackingSnap, WorkplaneSnap,
};
use crate::config::SnapSettings;
use crate::geometry::{Point3, Workplane};
use crate::view::{DocumentId, View};
use crate::visual::{MeshData, OwnedMeshes, PointStyle};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{debug, trace, warn};

pub type PointValidator = Box<dyn Fn(&Point3) -> bool + Send>;
pub type PreviewBuilder = Box<dyn Fn(&Point3) -> Vec<MeshData> + Send>;

/// What the caller of a pick asks for.
pub struct PointSnapData {
    pub dimension: Dimensions,
    /// Localization key shown while picking
    pub prompt: Option<String>,
    pub ref_point: Option<Point3>,
    /// Operation plane overriding the view workplane
    pub plane: Option<Workplane>,
    /// Temporary geometry drawn for the candidate point each frame
    pub preview: Option<PreviewBuilder>,
    pub validator: Option<PointValidator>,
}

impl Default for PointSnapData {
    fn default() -> Self {
        Self {
            dimension: Dimensions::D1D2D3,
            prompt: None,
            ref_point: None,
            plane: None,
            preview: None,
            validator: None,
        }
    }
}

impl PointSnapData {
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn with_dimension(mut self, dimension: Dimensions) -> Self {
        self.dimension = dimension;
        self
    }

    pub fn with_ref_point(mut self, point: Point3) -> Self {
        self.ref_point = Some(point);
        self
    }

    pub fn with_plane(mut self, plane: Workplane) -> Self {
        self.plane = Some(plane);
        self
    }

    pub fn with_preview(mut self, preview: impl Fn(&Point3) -> Vec<MeshData> + Send + 'static) -> Self {
        self.preview = Some(Box::new(preview));
        self
    }

    pub fn with_validator(mut self, validator: impl Fn(&Point3) -> bool + Send + 'static) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    /// Tracking along the plane normal only makes sense for free 3D picks.
    pub fn track_z(&self) -> bool {
        self.dimension.contains(Dimensions::D3) && self.plane.is_none()
    }

    fn accepts(&self, point: &Point3) -> bool {
        self.validator.as_ref().map_or(true, |validate| validate(point))
    }
}

impl fmt::Debug for PointSnapData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointSnapData")
            .field("dimension", &self.dimension)
            .field("prompt", &self.prompt)
            .field("ref_point", &self.ref_point)
            .field("plane", &self.plane)
            .field("preview", &self.preview.is_some())
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PickStatus {
    Active,
    /// Finished by click, Enter or numeric entry. `None` if nothing was
    /// ever snapped.
    Committed(Option<Point3>),
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Left,
    Middle,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Escape,
    Backspace,
    Other(String),
}

impl Key {
    /// Maps a DOM `KeyboardEvent.key` value.
    pub fn from_name(name: &str) -> Key {
        match name {
            "Enter" => Key::Enter,
            "Escape" => Key::Escape,
            "Backspace" => Key::Backspace,
            _ => {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Char(c),
                    _ => Key::Other(name.to_string()),
                }
            }
        }
    }
}

fn opens_input(c: char) -> bool {
    c.is_ascii_digit() || c == '-' || c == '.'
}

/// One interactive point pick.
pub struct SnapPointHandler {
    token: CancellationToken,
    registration: CancelRegistration,
    state: Arc<Mutex<PickState>>,
}

impl SnapPointHandler {
    pub fn new(settings: Arc<SnapSettings>, data: PointSnapData, token: CancellationToken) -> Self {
        let track_z = data.track_z();
        debug!("Begin point pick {:?}", data);
        let state = Arc::new(Mutex::new(PickState {
            object_snap: ObjectSnap::new(settings.clone(), data.ref_point),
            tracking_snap: TrackingSnap::new(settings, data.ref_point, track_z),
            workplane_snap: WorkplaneSnap::new(data.plane),
            data,
            snapped: None,
            input: None,
            input_error: None,
            feedback: None,
            status: PickStatus::Active,
        }));

        let weak = Arc::downgrade(&state);
        let registration = token.on_cancel(move || {
            if let Some(state) = weak.upgrade() {
                lock(&state).finish(PickStatus::Cancelled);
            }
        });
        Self {
            token,
            registration,
            state,
        }
    }

    fn state(&self) -> MutexGuard<'_, PickState> {
        lock(&self.state)
    }

    pub fn status(&self) -> PickStatus {
        self.state().status
    }

    pub fn is_active(&self) -> bool {
        self.state().is_active()
    }

    pub fn snapped(&self) -> Option<SnapResult> {
        self.state().snapped.clone()
    }

    pub fn prompt(&self) -> Option<String> {
        self.state().data.prompt.clone()
    }

    pub fn input_text(&self) -> Option<String> {
        self.state().input.clone()
    }

    pub fn input_error(&self) -> Option<InputError> {
        self.state().input_error.clone()
    }

    /// Points pinned for object tracking in `document`.
    pub fn tracked_count(&self, document: DocumentId) -> usize {
        self.state().tracking_snap.object_tracking().tracked_count(document)
    }

    /// Text for the floating tooltip: the input error while typing, otherwise
    /// the snapped point's label.
    pub fn tooltip(&self) -> Option<String> {
        let state = self.state();
        if state.input.is_some() {
            return state.input_error.as_ref().map(ToString::to_string);
        }
        state.snapped.as_ref().and_then(|s| s.info.clone())
    }

    pub fn on_pointer_move(&mut self, view: &dyn View, x: f64, y: f64, now: Instant) {
        self.state().on_pointer_move(view, x, y, now);
    }

    pub fn on_pointer_down(&mut self, button: PointerButton) {
        let mut state = self.state();
        if state.is_active() && button == PointerButton::Left {
            let point = state.snapped.as_ref().map(|s| s.point);
            state.finish(PickStatus::Committed(point));
        }
    }

    pub fn on_key_down(&mut self, view: &dyn View, key: Key) {
        let cancel = self.state().on_key_down(view, key);
        if cancel {
            self.cancel();
        }
    }

    /// Advances clock-driven state: the object tracking dwell timer.
    pub fn tick(&mut self, now: Instant) {
        let mut state = self.state();
        if state.is_active() {
            state.tracking_snap.poll(now);
        }
    }

    /// Fires the pick's token, which finishes the pick as cancelled.
    pub fn cancel(&mut self) {
        self.token.cancel();
    }
}

impl Drop for SnapPointHandler {
    fn drop(&mut self) {
        self.token.unregister(self.registration);
    }
}

fn lock(state: &Mutex<PickState>) -> MutexGuard<'_, PickState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

struct PickState {
    data: PointSnapData,
    object_snap: ObjectSnap,
    tracking_snap: TrackingSnap,
    workplane_snap: WorkplaneSnap,
    snapped: Option<SnapResult>,
    /// Open numeric entry buffer
    input: Option<String>,
    input_error: Option<InputError>,
    feedback: Option<OwnedMeshes>,
    status: PickStatus,
}

impl PickState {
    fn is_active(&self) -> bool {
        self.status == PickStatus::Active
    }

    fn on_pointer_move(&mut self, view: &dyn View, x: f64, y: f64, now: Instant) {
        if !self.is_active() {
            return;
        }
        self.remove_dynamic_objects(view);

        let state = PointerState::new(view, x, y);
        self.snapped = self.find_snapped(&state, now);
        if let Some(snapped) = &self.snapped {
            trace!("Snapped {:?} at {:?}", snapped.info, snapped.point);
        }
        self.show_feedback(view);
    }

    /// Returns true when the key asks to cancel the pick.
    fn on_key_down(&mut self, view: &dyn View, key: Key) -> bool {
        if !self.is_active() {
            return false;
        }
        if self.input.is_some() {
            self.on_input_key(view, key);
            return false;
        }
        match key {
            Key::Char(c) if opens_input(c) => {
                self.input = Some(c.to_string());
                self.input_error = None;
            }
            Key::Enter => {
                let point = self.snapped.as_ref().map(|s| s.point);
                self.finish(PickStatus::Committed(point));
            }
            Key::Escape => return true,
            _ => {}
        }
        false
    }

    fn on_input_key(&mut self, view: &dyn View, key: Key) {
        let Some(text) = self.input.as_mut() else {
            return;
        };
        match key {
            Key::Char(c) => {
                text.push(c);
                self.input_error = None;
            }
            Key::Backspace => {
                text.pop();
                if text.is_empty() {
                    self.input = None;
                }
                self.input_error = None;
            }
            Key::Enter => self.submit_input(view),
            Key::Escape => {
                self.input = None;
                self.input_error = None;
            }
            Key::Other(_) => {}
        }
    }

    fn submit_input(&mut self, view: &dyn View) {
        let Some(text) = self.input.clone() else {
            return;
        };
        let context = InputContext {
            dimension: self.data.dimension,
            ref_point: self.data.ref_point,
            last_point: self.snapped.as_ref().map(|s| s.point),
            plane: self.data.plane.unwrap_or_else(|| view.workplane()),
        };
        let resolved = context
            .resolve(&text)
            .and_then(|point| if self.data.accepts(&point) { Ok(point) } else { Err(InputError::Rejected) });
        match resolved {
            Ok(point) => self.finish(PickStatus::Committed(Some(point))),
            Err(error) => {
                warn!("Rejected numeric input {:?}: {}", text, error);
                self.input_error = Some(error);
            }
        }
    }

    /// Object snap, then tracking, then the workplane. A candidate the
    /// validator rejects passes the turn to the next snapper.
    fn find_snapped(&mut self, state: &PointerState<'_>, now: Instant) -> Option<SnapResult> {
        let object = self.object_snap.snap(state);
        self.tracking_snap.show_tracking_at_timeout(state.view, object.as_ref(), now);
        if let Some(result) = object.filter(|r| self.data.accepts(&r.point)) {
            return Some(result);
        }
        if let Some(result) = self.tracking_snap.snap(state).filter(|r| self.data.accepts(&r.point)) {
            return Some(result);
        }
        self.workplane_snap.snap(state).filter(|r| self.data.accepts(&r.point))
    }

    fn remove_dynamic_objects(&mut self, view: &dyn View) {
        let id = view.id();
        self.object_snap.remove_dynamic_object(id);
        self.tracking_snap.remove_dynamic_object(id);
        self.workplane_snap.remove_dynamic_object(id);
        self.clear_feedback();
    }

    fn show_feedback(&mut self, view: &dyn View) {
        let Some(point) = self.snapped.as_ref().map(|s| s.point) else {
            return;
        };
        let feedback = self.feedback.get_or_insert_with(|| OwnedMeshes::new(view.visual()));
        feedback.display(MeshData::point(point, PointStyle::Snapped));
        if let Some(preview) = &self.data.preview {
            for mesh in preview(&point) {
                feedback.display(mesh);
            }
        }
    }

    fn clear_feedback(&mut self) {
        if let Some(mut feedback) = self.feedback.take() {
            feedback.remove_all();
        }
    }

    fn finish(&mut self, status: PickStatus) {
        if !self.is_active() {
            return;
        }
        self.object_snap.clear();
        self.tracking_snap.clear();
        self.workplane_snap.clear();
        self.clear_feedback();
        self.input = None;
        self.input_error = None;
        self.status = status;
        debug!("Point pick finished: {:?}", status);
    }
}

impl Drop for PickState {
    fn drop(&mut self) {
        self.clear_feedback();
    }
}
