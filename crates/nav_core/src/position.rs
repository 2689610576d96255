//! Position fix handed to the map once per tick.

use std::time::SystemTime;

use crate::geodesy::Point;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSnapshot {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    /// Direction of travel, clockwise from north.
    pub heading_deg: f64,
    pub velocity_m_s: f64,
    pub timestamp: SystemTime,
}

impl PositionSnapshot {
    pub fn new(latitude_deg: f64, longitude_deg: f64, heading_deg: f64) -> Self {
        Self {
            latitude_deg,
            longitude_deg,
            heading_deg,
            velocity_m_s: 0.0,
            timestamp: SystemTime::now(),
        }
    }

    pub fn point(&self) -> Point {
        Point::new(self.latitude_deg, self.longitude_deg)
    }

    pub fn heading_rad(&self) -> f64 {
        self.heading_deg.to_radians()
    }

    pub fn velocity_km_h(&self) -> f64 {
        self.velocity_m_s * 3.6
    }
}
