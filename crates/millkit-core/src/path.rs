//! Ordered waypoint sequences.

use crate::frame::OrientedFrame;
use crate::motion::MotionType;
use crate::waypoint::Waypoint;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// An ordered, mutable sequence of waypoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub waypoints: Vec<Waypoint>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            waypoints: Vec::with_capacity(capacity),
        }
    }

    pub fn from_waypoints(waypoints: Vec<Waypoint>) -> Self {
        Self { waypoints }
    }

    /// Builds a path by tagging every frame with the same motion type.
    pub fn from_frames(frames: impl IntoIterator<Item = OrientedFrame>, motion: MotionType) -> Self {
        Self {
            waypoints: frames
                .into_iter()
                .map(|f| Waypoint::new(f, motion))
                .collect(),
        }
    }

    /// Builds a world-aligned feed path through the given points.
    pub fn from_points(points: impl IntoIterator<Item = Point3<f64>>) -> Self {
        Self::from_frames(
            points.into_iter().map(OrientedFrame::world_xy),
            MotionType::Feed,
        )
    }

    pub fn push(&mut self, waypoint: Waypoint) {
        self.waypoints.push(waypoint);
    }

    pub fn push_frame(&mut self, frame: OrientedFrame, motion: MotionType) {
        self.waypoints.push(Waypoint::new(frame, motion));
    }

    /// Appends all waypoints of `other` after this path's last waypoint.
    pub fn join(&mut self, other: &Path) {
        self.waypoints.extend_from_slice(&other.waypoints);
    }

    /// Reverses waypoint order. Frame axes are not re-oriented.
    pub fn reverse(&mut self) {
        self.waypoints.reverse();
    }

    /// Deep copy; the result shares nothing with `self`.
    pub fn duplicate(&self) -> Path {
        self.clone()
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn first(&self) -> Option<&Waypoint> {
        self.waypoints.first()
    }

    pub fn last(&self) -> Option<&Waypoint> {
        self.waypoints.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Waypoint> {
        self.waypoints.iter()
    }

    pub fn positions(&self) -> impl Iterator<Item = Point3<f64>> + '_ {
        self.waypoints.iter().map(|w| w.frame.origin)
    }

    /// Total polyline length through the waypoint origins.
    pub fn length(&self) -> f64 {
        self.waypoints
            .windows(2)
            .map(|w| (w[1].frame.origin - w[0].frame.origin).norm())
            .sum()
    }

    /// Lengths of rapid and cutting motion, in that order. Each segment is
    /// charged to the motion type of the waypoint it ends at.
    pub fn motion_lengths(&self) -> (f64, f64) {
        self.waypoints
            .windows(2)
            .fold((0.0, 0.0), |(rapid, cut), w| {
                let d = (w[1].frame.origin - w[0].frame.origin).norm();
                if w[1].is_rapid() {
                    (rapid + d, cut)
                } else {
                    (rapid, cut + d)
                }
            })
    }
}

impl FromIterator<Waypoint> for Path {
    fn from_iter<I: IntoIterator<Item = Waypoint>>(iter: I) -> Self {
        Self {
            waypoints: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Path {
    type Item = Waypoint;
    type IntoIter = std::vec::IntoIter<Waypoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.waypoints.into_iter()
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a Waypoint;
    type IntoIter = std::slice::Iter<'a, Waypoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.waypoints.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: usize) -> Path {
        Path::from_points((0..n).map(|i| Point3::new(i as f64, 0.0, 0.0)))
    }

    #[test]
    fn test_join_concatenates() {
        let mut a = line(3);
        let b = line(2);
        a.join(&b);
        assert_eq!(a.len(), 5);
        assert_eq!(a.last().unwrap().position(), Point3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_reverse_keeps_axes() {
        let mut path = Path::new();
        let tilted = OrientedFrame::from_normal(Point3::origin(), nalgebra::Vector3::new(1.0, 0.0, 1.0))
            .unwrap();
        path.push_frame(tilted, MotionType::Feed);
        path.push_frame(OrientedFrame::world_xy(Point3::new(5.0, 0.0, 0.0)), MotionType::Rapid);
        path.reverse();
        assert_eq!(path.first().unwrap().position(), Point3::new(5.0, 0.0, 0.0));
        assert_eq!(path.last().unwrap().frame.z_axis, tilted.z_axis);
        assert_eq!(path.last().unwrap().motion(), MotionType::Feed);
    }

    #[test]
    fn test_length_and_motion_split() {
        let mut path = line(3);
        path.push(Waypoint::rapid(OrientedFrame::world_xy(Point3::new(2.0, 3.0, 0.0))));
        assert!((path.length() - 5.0).abs() < 1e-12);
        let (rapid, cut) = path.motion_lengths();
        assert!((rapid - 3.0).abs() < 1e-12);
        assert!((cut - 2.0).abs() < 1e-12);
    }
}
