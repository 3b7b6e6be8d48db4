//! Point-in-region hit testing for hotspot questions.

use serde::{Deserialize, Serialize};

/// A click location on question media, in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// A circular target region on question media.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

impl Hotspot {
    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// A click hits the hotspot when its distance to the center is within
    /// the radius (boundary inclusive).
    pub fn contains(&self, click: &Point) -> bool {
        self.center().distance(click) <= self.radius
    }
}
