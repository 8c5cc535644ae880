//! One client's interactive pick session: the scene and camera mirrored from
//! the browser, the live snap settings and at most one running pick.

use serde::Deserialize;
use serde_json::json;
use snap_core::config::{ConfigError, ObjectSnapTypes, SnapConfig, SnapSettings};
use snap_core::geometry::{GeometryError, Point3, Vector3, Workplane, EPSILON};
use snap_core::kernel::{ArcCurve, Edge, LineCurve, Shape, ShapeId, ShapeRef};
use snap_core::snap::{
    CancellationToken, Dimensions, Key, PickStatus, PointSnapData, PointerButton, SnapPointHandler,
};
use snap_core::view::{Camera, CameraView, DocumentId, Projection};
use snap_core::visual::TemporaryMeshes;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Invalid {command} payload: {source}")]
    InvalidPayload {
        command: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid plane: {0}")]
    InvalidPlane(#[from] GeometryError),

    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),

    #[error("No pick in progress")]
    NoActivePick,
}

impl SessionError {
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::UnknownCommand(_) => "UNKNOWN_COMMAND",
            SessionError::InvalidPayload { .. } => "INVALID_PAYLOAD",
            SessionError::InvalidPlane(_) => "INVALID_PLANE",
            SessionError::InvalidConfig(_) => "INVALID_CONFIG",
            SessionError::NoActivePick => "NO_ACTIVE_PICK",
        }
    }

    pub fn severity(&self) -> &'static str {
        match self {
            SessionError::NoActivePick => "warning",
            _ => "error",
        }
    }
}

/// Format a session error as a JSON message for the frontend
pub fn format_error(code: &str, message: &str, severity: &str) -> String {
    format!(
        "ERROR_UPDATE:{}",
        json!({
            "code": code,
            "message": message,
            "severity": severity
        })
    )
}

fn parse<'a, T: Deserialize<'a>>(command: &'static str, payload: &'a str) -> Result<T, SessionError> {
    serde_json::from_str(payload).map_err(|source| SessionError::InvalidPayload { command, source })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SceneCmd {
    lines: Vec<LineCmd>,
    arcs: Vec<ArcCmd>,
    vertices: Vec<VertexCmd>,
}

#[derive(Debug, Deserialize)]
struct LineCmd {
    id: Option<String>,
    start: Point3,
    end: Point3,
}

#[derive(Debug, Deserialize)]
struct ArcCmd {
    id: Option<String>,
    center: Point3,
    #[serde(default = "Vector3::z")]
    normal: Vector3,
    #[serde(default = "Vector3::x")]
    x_axis: Vector3,
    radius: f64,
    #[serde(default)]
    start_angle: f64,
    #[serde(default = "full_turn")]
    end_angle: f64,
}

fn full_turn() -> f64 {
    std::f64::consts::TAU
}

#[derive(Debug, Deserialize)]
struct VertexCmd {
    id: Option<String>,
    position: Point3,
}

#[derive(Debug, Deserialize)]
struct CameraCmd {
    camera: Camera,
    width: f64,
    height: f64,
}

impl CameraCmd {
    /// Rejects viewports and projections that would make the screen scale
    /// zero or non-finite.
    fn validate(&self) -> Result<(), SessionError> {
        let positive = |field: &str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(invalid("CAMERA", format!("{} must be positive, got {}", field, value)))
            }
        };
        positive("width", self.width)?;
        positive("height", self.height)?;
        match self.camera.projection {
            Projection::Orthographic { height } => positive("projection height", height)?,
            Projection::Perspective { fov_y } => {
                positive("fov_y", fov_y)?;
                if fov_y >= std::f64::consts::PI {
                    return Err(invalid("CAMERA", format!("fov_y must be below pi, got {}", fov_y)));
                }
            }
        }
        if (self.camera.target - self.camera.eye).norm() < EPSILON {
            return Err(invalid("CAMERA", "eye and target coincide".to_string()));
        }
        Ok(())
    }
}

fn invalid(command: &'static str, reason: String) -> SessionError {
    SessionError::InvalidPayload {
        command,
        source: serde::de::Error::custom(reason),
    }
}

#[derive(Debug, Deserialize)]
struct PlaneCmd {
    origin: Point3,
    normal: Vector3,
    x_dir: Vector3,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BeginPickCmd {
    prompt: Option<String>,
    /// Dimension bits: 1, 2 and 4 for one, two and three numbers
    dimension: Option<u8>,
    ref_point: Option<Point3>,
    plane: Option<PlaneCmd>,
}

#[derive(Debug, Deserialize)]
struct PointerMoveCmd {
    x: f64,
    y: f64,
}

#[derive(Debug, Deserialize)]
struct PointerDownCmd {
    /// DOM `MouseEvent.button`
    button: u8,
}

#[derive(Debug, Deserialize)]
struct KeyCmd {
    key: String,
}

#[derive(Debug, Deserialize)]
struct SnapTypesCmd {
    bits: u16,
}

fn shape_id(id: &Option<String>, kind: &str, index: usize) -> ShapeId {
    match id {
        Some(id) => ShapeId::new_deterministic(id),
        None => ShapeId::new_deterministic(&format!("{}-{}", kind, index)),
    }
}

pub struct PickSession {
    settings: Arc<SnapSettings>,
    meshes: Arc<Mutex<TemporaryMeshes>>,
    view: CameraView,
    pick: Option<(SnapPointHandler, CancellationToken)>,
}

impl PickSession {
    pub fn new(config: SnapConfig) -> Self {
        let meshes = TemporaryMeshes::shared();
        let mut view = CameraView::new(
            DocumentId::new(),
            meshes.clone(),
            Camera::top(Point3::origin(), 100.0),
            800.0,
            600.0,
        );
        view.detect_tolerance = config.detect_tolerance;
        Self {
            settings: SnapSettings::shared(config),
            meshes,
            view,
            pick: None,
        }
    }

    pub fn is_picking(&self) -> bool {
        self.pick.is_some()
    }

    /// Handles one text frame and returns the frames to send back.
    pub fn handle_text(&mut self, text: &str, now: Instant) -> Vec<String> {
        match self.dispatch(text, now) {
            Ok(frames) => frames,
            Err(e) => {
                warn!("Rejected message {:?}: {}", text, e);
                vec![format_error(e.code(), &e.to_string(), e.severity())]
            }
        }
    }

    /// Advances dwell timers; sends visual diffs if anything changed.
    pub fn tick(&mut self, now: Instant) -> Vec<String> {
        let Some((handler, _)) = self.pick.as_mut() else {
            return Vec::new();
        };
        handler.tick(now);
        let mut frames = Vec::new();
        self.finish_if_done(&mut frames);
        self.push_visual_update(&mut frames);
        frames
    }

    fn dispatch(&mut self, text: &str, now: Instant) -> Result<Vec<String>, SessionError> {
        let (command, payload) = text.split_once(':').unwrap_or((text, ""));
        let mut frames = Vec::new();

        match command {
            "SCENE" => self.load_scene(parse("SCENE", payload)?),
            "CAMERA" => {
                let cmd: CameraCmd = parse("CAMERA", payload)?;
                cmd.validate()?;
                self.view.camera = cmd.camera;
                self.view.width = cmd.width;
                self.view.height = cmd.height;
                debug!("Camera updated: {:?}", cmd.camera);
            }
            "BEGIN_PICK" => {
                let cmd: BeginPickCmd = if payload.is_empty() {
                    BeginPickCmd::default()
                } else {
                    parse("BEGIN_PICK", payload)?
                };
                self.begin_pick(cmd, &mut frames)?;
            }
            "POINTER_MOVE" => {
                let cmd: PointerMoveCmd = parse("POINTER_MOVE", payload)?;
                let (handler, _) = self.pick.as_mut().ok_or(SessionError::NoActivePick)?;
                handler.on_pointer_move(&self.view, cmd.x, cmd.y, now);
                self.push_snap_update(&mut frames);
            }
            "POINTER_DOWN" => {
                let cmd: PointerDownCmd = parse("POINTER_DOWN", payload)?;
                let button = match cmd.button {
                    0 => PointerButton::Left,
                    1 => PointerButton::Middle,
                    _ => PointerButton::Right,
                };
                let (handler, _) = self.pick.as_mut().ok_or(SessionError::NoActivePick)?;
                handler.on_pointer_down(button);
            }
            "KEY" => {
                let cmd: KeyCmd = parse("KEY", payload)?;
                let (handler, _) = self.pick.as_mut().ok_or(SessionError::NoActivePick)?;
                handler.on_key_down(&self.view, Key::from_name(&cmd.key));
                self.push_snap_update(&mut frames);
            }
            "CANCEL" => {
                let (_, token) = self.pick.as_ref().ok_or(SessionError::NoActivePick)?;
                token.cancel();
            }
            "SET_SNAP_TYPES" => {
                let cmd: SnapTypesCmd = parse("SET_SNAP_TYPES", payload)?;
                self.settings.set_snap_types(ObjectSnapTypes::from_bits(cmd.bits));
                info!("Snap types set to {:#08b}", cmd.bits);
            }
            "SET_TRACKING" => {
                let enabled: bool = parse("SET_TRACKING", payload)?;
                self.settings.set_tracking_enabled(enabled);
                info!("Snap tracking {}", if enabled { "enabled" } else { "disabled" });
            }
            "SET_SNAP" => {
                let enabled: bool = parse("SET_SNAP", payload)?;
                self.settings.set_snap_enabled(enabled);
                info!("Object snap {}", if enabled { "enabled" } else { "disabled" });
            }
            "SET_CONFIG" => {
                let config = SnapConfig::from_json_str(payload)?;
                self.view.detect_tolerance = config.detect_tolerance;
                self.settings.replace(config);
                info!("Snap settings replaced");
            }
            _ => return Err(SessionError::UnknownCommand(command.to_string())),
        }

        self.finish_if_done(&mut frames);
        self.push_visual_update(&mut frames);
        Ok(frames)
    }

    fn load_scene(&mut self, scene: SceneCmd) {
        self.view.clear_shapes();
        for (i, line) in scene.lines.iter().enumerate() {
            let shape = Shape::Edge(Edge::new(LineCurve::new(line.start, line.end)));
            self.view.add_shape(ShapeRef::new(shape_id(&line.id, "line", i), shape));
        }
        for (i, arc) in scene.arcs.iter().enumerate() {
            let curve = ArcCurve::new(arc.center, arc.normal, arc.x_axis, arc.radius, arc.start_angle, arc.end_angle);
            self.view.add_shape(ShapeRef::new(shape_id(&arc.id, "arc", i), Shape::Edge(Edge::new(curve))));
        }
        for (i, vertex) in scene.vertices.iter().enumerate() {
            let shape = Shape::Vertex(vertex.position);
            self.view.add_shape(ShapeRef::new(shape_id(&vertex.id, "vertex", i), shape));
        }
        info!("Scene loaded with {} shapes", self.view.shapes().len());
    }

    fn begin_pick(&mut self, cmd: BeginPickCmd, frames: &mut Vec<String>) -> Result<(), SessionError> {
        let plane = cmd
            .plane
            .map(|p| Workplane::try_new(p.origin, p.normal, p.x_dir))
            .transpose()?;

        // A new pick replaces a running one
        if let Some((previous, token)) = self.pick.take() {
            token.cancel();
            frames.push(pick_result(&previous.status()));
        }

        let data = PointSnapData {
            prompt: cmd.prompt,
            ref_point: cmd.ref_point,
            plane,
            dimension: cmd.dimension.map(Dimensions::from_bits).unwrap_or_default(),
            ..Default::default()
        };

        let token = CancellationToken::new();
        let handler = SnapPointHandler::new(self.settings.clone(), data, token.clone());
        info!("Pick started: {:?}", handler.prompt());
        self.pick = Some((handler, token));
        Ok(())
    }

    fn push_snap_update(&self, frames: &mut Vec<String>) {
        let Some((handler, _)) = self.pick.as_ref() else {
            return;
        };
        if !handler.is_active() {
            return;
        }
        let point = handler.snapped().map(|s| [s.point.x, s.point.y, s.point.z]);
        frames.push(format!(
            "SNAP_UPDATE:{}",
            json!({
                "point": point,
                "info": handler.tooltip(),
                "input": handler.input_text(),
            })
        ));
    }

    fn finish_if_done(&mut self, frames: &mut Vec<String>) {
        let done = self.pick.as_ref().is_some_and(|(handler, _)| !handler.is_active());
        if !done {
            return;
        }
        if let Some((handler, _)) = self.pick.take() {
            info!("Pick finished: {:?}", handler.status());
            frames.push(pick_result(&handler.status()));
        }
    }

    fn push_visual_update(&self, frames: &mut Vec<String>) {
        let changes = self.meshes.lock().unwrap_or_else(PoisonError::into_inner).take_changes();
        if changes.is_empty() {
            return;
        }
        let json = serde_json::to_string(&changes).unwrap_or("[]".into());
        frames.push(format!("VISUAL_UPDATE:{}", json));
    }
}

fn pick_result(status: &PickStatus) -> String {
    let body = match status {
        PickStatus::Committed(point) => json!({
            "status": "committed",
            "point": point.map(|p| [p.x, p.y, p.z]),
        }),
        PickStatus::Cancelled => json!({ "status": "cancelled" }),
        PickStatus::Active => json!({ "status": "active" }),
    };
    format!("PICK_RESULT:{}", body)
}
