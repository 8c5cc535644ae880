//! Snap configuration: the object-snap type mask, feature toggles and
//! thresholds, plus [`SnapSettings`], the observable holder shared by every
//! snapper of an application.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use thiserror::Error;
use tracing::debug;

/// Types of object snaps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SnapType {
    /// Edge endpoints
    Endpoint,
    /// Parametric edge midpoints
    Midpoint,
    /// Circle/arc centers
    Center,
    /// Foot of the perpendicular from the reference point
    Perpendicular,
    /// Edge/edge intersections
    Intersection,
    /// Standalone vertices
    Vertex,
}

impl SnapType {
    pub const ALL: [SnapType; 6] = [
        SnapType::Endpoint,
        SnapType::Midpoint,
        SnapType::Center,
        SnapType::Perpendicular,
        SnapType::Intersection,
        SnapType::Vertex,
    ];

    fn bit(self) -> u16 {
        match self {
            SnapType::Endpoint => 1 << 0,
            SnapType::Midpoint => 1 << 1,
            SnapType::Center => 1 << 2,
            SnapType::Perpendicular => 1 << 3,
            SnapType::Intersection => 1 << 4,
            SnapType::Vertex => 1 << 5,
        }
    }
}

/// Bitmask of enabled object snap types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectSnapTypes {
    bits: u16,
}

impl ObjectSnapTypes {
    pub const NONE: ObjectSnapTypes = ObjectSnapTypes { bits: 0 };
    pub const ALL: ObjectSnapTypes = ObjectSnapTypes { bits: 0b11_1111 };

    pub fn from_bits(bits: u16) -> Self {
        Self { bits: bits & Self::ALL.bits }
    }

    pub fn bits(&self) -> u16 {
        self.bits
    }

    pub fn contains(&self, snap_type: SnapType) -> bool {
        self.bits & snap_type.bit() != 0
    }

    pub fn with(mut self, snap_type: SnapType) -> Self {
        self.bits |= snap_type.bit();
        self
    }

    pub fn without(mut self, snap_type: SnapType) -> Self {
        self.bits &= !snap_type.bit();
        self
    }

    pub fn toggled(self, snap_type: SnapType) -> Self {
        if self.contains(snap_type) {
            self.without(snap_type)
        } else {
            self.with(snap_type)
        }
    }
}

impl Default for ObjectSnapTypes {
    fn default() -> Self {
        Self::NONE
            .with(SnapType::Endpoint)
            .with(SnapType::Midpoint)
            .with(SnapType::Center)
            .with(SnapType::Perpendicular)
            .with(SnapType::Intersection)
            .with(SnapType::Vertex)
    }
}

impl FromIterator<SnapType> for ObjectSnapTypes {
    fn from_iter<I: IntoIterator<Item = SnapType>>(iter: I) -> Self {
        iter.into_iter().fold(Self::NONE, ObjectSnapTypes::with)
    }
}

/// Configuration for snap detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapConfig {
    pub snap_types: ObjectSnapTypes,
    /// Enable object snapping
    pub enable_snap: bool,
    /// Enable reference-point and object tracking
    pub enable_snap_tracking: bool,
    /// Maximum screen distance (pixels) for a snap or tracking axis to activate
    pub snap_distance: f64,
    /// Pixel radius used when detecting shapes under the cursor
    pub detect_tolerance: f64,
    /// Dwell time before a hovered snap point is pinned for object tracking
    pub dwell_millis: u64,
    /// Polar tracking step in degrees; None tracks the workplane axes only
    pub polar_angle: Option<f64>,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            snap_types: ObjectSnapTypes::default(),
            enable_snap: true,
            enable_snap_tracking: true,
            snap_distance: 5.0,
            detect_tolerance: 5.0,
            dwell_millis: 600,
            polar_angle: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl SnapConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SnapConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.snap_distance > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "snap_distance",
                reason: format!("must be positive, got {}", self.snap_distance),
            });
        }
        if !(self.detect_tolerance > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "detect_tolerance",
                reason: format!("must be positive, got {}", self.detect_tolerance),
            });
        }
        if let Some(angle) = self.polar_angle {
            if !(angle > 0.0 && angle < 360.0) {
                return Err(ConfigError::InvalidValue {
                    field: "polar_angle",
                    reason: format!("must be in (0, 360), got {}", angle),
                });
            }
        }
        Ok(())
    }
}

/// What changed in a settings update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapChange {
    SnapTypes,
    SnapEnabled,
    TrackingEnabled,
    /// The whole configuration was replaced
    Replaced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(SnapChange) + Send + Sync>;

/// Observable snap configuration. Components hold an `Arc<SnapSettings>` and
/// re-read the live values; caches are invalidated through subscriptions.
pub struct SnapSettings {
    config: RwLock<SnapConfig>,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    next_id: AtomicU64,
}

impl SnapSettings {
    pub fn new(config: SnapConfig) -> Self {
        Self {
            config: RwLock::new(config),
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn shared(config: SnapConfig) -> Arc<Self> {
        Arc::new(Self::new(config))
    }

    pub fn snapshot(&self) -> SnapConfig {
        self.config.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn snap_types(&self) -> ObjectSnapTypes {
        self.config.read().unwrap_or_else(PoisonError::into_inner).snap_types
    }

    pub fn snap_enabled(&self) -> bool {
        self.config.read().unwrap_or_else(PoisonError::into_inner).enable_snap
    }

    pub fn tracking_enabled(&self) -> bool {
        self.config.read().unwrap_or_else(PoisonError::into_inner).enable_snap_tracking
    }

    pub fn snap_distance(&self) -> f64 {
        self.config.read().unwrap_or_else(PoisonError::into_inner).snap_distance
    }

    /// Whether a candidate `distance` screen pixels from the cursor is close
    /// enough to snap to. The threshold itself counts as close enough.
    pub fn within_snap_distance(&self, distance: f64) -> bool {
        distance <= self.snap_distance()
    }

    pub fn polar_angle(&self) -> Option<f64> {
        self.config.read().unwrap_or_else(PoisonError::into_inner).polar_angle
    }

    pub fn set_snap_types(&self, snap_types: ObjectSnapTypes) {
        self.update(SnapChange::SnapTypes, |config| {
            let changed = config.snap_types != snap_types;
            config.snap_types = snap_types;
            changed
        });
    }

    pub fn toggle_snap_type(&self, snap_type: SnapType) {
        self.update(SnapChange::SnapTypes, |config| {
            config.snap_types = config.snap_types.toggled(snap_type);
            true
        });
    }

    pub fn set_snap_enabled(&self, enabled: bool) {
        self.update(SnapChange::SnapEnabled, |config| {
            let changed = config.enable_snap != enabled;
            config.enable_snap = enabled;
            changed
        });
    }

    pub fn set_tracking_enabled(&self, enabled: bool) {
        self.update(SnapChange::TrackingEnabled, |config| {
            let changed = config.enable_snap_tracking != enabled;
            config.enable_snap_tracking = enabled;
            changed
        });
    }

    pub fn replace(&self, config: SnapConfig) {
        self.update(SnapChange::Replaced, |current| {
            *current = config;
            true
        });
    }

    /// Applies `apply` under the write lock and notifies listeners if it
    /// reports a change. Listeners run after the lock is released.
    fn update(&self, change: SnapChange, apply: impl FnOnce(&mut SnapConfig) -> bool) {
        let changed = {
            let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
            apply(&mut config)
        };
        if !changed {
            return;
        }
        debug!("Snap settings changed: {:?}", change);
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(change);
        }
    }

    pub fn subscribe(&self, listener: impl Fn(SnapChange) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        id
    }

    /// Returns false if the subscription was already removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Subscribes a dirty flag raised on every change, for components that
    /// invalidate their caches lazily on the next evaluation.
    pub fn watch(&self) -> SettingsWatch {
        let flag = Arc::new(AtomicBool::new(false));
        let raised = flag.clone();
        let id = self.subscribe(move |_| raised.store(true, Ordering::Release));
        SettingsWatch { id, flag }
    }
}

impl Default for SnapSettings {
    fn default() -> Self {
        Self::new(SnapConfig::default())
    }
}

/// Dirty flag subscribed to a [`SnapSettings`].
#[derive(Debug)]
pub struct SettingsWatch {
    id: SubscriptionId,
    flag: Arc<AtomicBool>,
}

impl SettingsWatch {
    /// True once per batch of changes since the last call.
    pub fn take_changed(&self) -> bool {
        self.flag.swap(false, Ordering::AcqRel)
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}
