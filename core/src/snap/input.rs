//! Typed numeric entry during a pick: `"12"`, `"3,4"` or `"1,2,3"`.

use crate::geometry::{Point3, Vector3, Workplane, EPSILON};
use serde::{Deserialize, Serialize};
use std::ops::BitOr;
use thiserror::Error;

/// Which value counts a pick accepts: one number (distance along the current
/// direction), two (plane offset) or three (full coordinate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dimensions(u8);

impl Dimensions {
    pub const NONE: Dimensions = Dimensions(0);
    pub const D1: Dimensions = Dimensions(1);
    pub const D2: Dimensions = Dimensions(2);
    pub const D3: Dimensions = Dimensions(4);
    pub const D1D2: Dimensions = Dimensions(1 | 2);
    pub const D1D2D3: Dimensions = Dimensions(1 | 2 | 4);

    pub fn from_bits(bits: u8) -> Self {
        Self(bits & Self::D1D2D3.0)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn contains(&self, other: Dimensions) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    /// The flag for an entry of `count` numbers.
    pub fn from_count(count: usize) -> Option<Self> {
        match count {
            1 => Some(Self::D1),
            2 => Some(Self::D2),
            3 => Some(Self::D3),
            _ => None,
        }
    }
}

impl Default for Dimensions {
    fn default() -> Self {
        Self::D1D2D3
    }
}

impl BitOr for Dimensions {
    type Output = Dimensions;

    fn bitor(self, rhs: Self) -> Self {
        Dimensions(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("{count} values are not accepted here")]
    UnsupportedInputs { count: usize },

    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    #[error("Three numbers are required without a reference point")]
    ThreeNumbersRequired,

    #[error("A single number needs a direction from the reference point")]
    NoDirection,

    #[error("Point rejected by the current operation")]
    Rejected,
}

/// Splits `text` on commas and parses every part.
pub fn parse_numbers(text: &str) -> Result<Vec<f64>, InputError> {
    text.split(',')
        .map(str::trim)
        .map(|part| {
            part.parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| InputError::InvalidNumber(part.to_string()))
        })
        .collect()
}

/// Context a numeric entry is resolved against.
#[derive(Debug, Clone, Copy)]
pub struct InputContext {
    pub dimension: Dimensions,
    pub ref_point: Option<Point3>,
    /// Last snapped point; with the reference point it gives the direction
    /// for single-number entry
    pub last_point: Option<Point3>,
    pub plane: Workplane,
}

impl InputContext {
    /// Checks that `count` numbers may be entered here.
    pub fn validate(&self, count: usize) -> Result<(), InputError> {
        let accepted = Dimensions::from_count(count).is_some_and(|d| self.dimension.contains(d));
        if !accepted {
            return Err(InputError::UnsupportedInputs { count });
        }
        if count != 3 && self.ref_point.is_none() {
            return Err(InputError::ThreeNumbersRequired);
        }
        if count == 1 && self.direction().is_none() {
            return Err(InputError::NoDirection);
        }
        Ok(())
    }

    fn direction(&self) -> Option<Vector3> {
        let (reference, last) = (self.ref_point?, self.last_point?);
        (last - reference).try_normalize(EPSILON)
    }

    /// Parses, validates and resolves `text` to a world point.
    pub fn resolve(&self, text: &str) -> Result<Point3, InputError> {
        let values = parse_numbers(text)?;
        self.validate(values.len())?;

        let base = self.ref_point.unwrap_or(self.plane.origin);
        let plane = &self.plane;
        let point = match values.as_slice() {
            [distance] => {
                let direction = self.direction().ok_or(InputError::NoDirection)?;
                base + direction * *distance
            }
            [x, y] => base + plane.x_dir * *x + plane.y_dir * *y,
            [x, y, z] => base + plane.x_dir * *x + plane.y_dir * *y + plane.normal * *z,
            _ => return Err(InputError::UnsupportedInputs { count: values.len() }),
        };
        Ok(point)
    }
}
