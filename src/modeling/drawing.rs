// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Planar drawings.
//!
//! A drawing is a set of closed profiles in the XY plane. Polygons are stored
//! counter-clockwise so extrusion always yields outward-facing sides. SVG
//! output flips the Y axis to match screen coordinates.

use crate::kernel::FailureCode;
use crate::modeling::solid::{positive, Solid};
use nalgebra::{Point2, Similarity2, Translation2, UnitComplex};

const MIN_PROFILE_AREA: f64 = 1e-12;
/// Fraction of the larger extent added around the drawing in its viewbox.
const VIEWBOX_MARGIN: f64 = 0.05;

#[derive(Debug, Clone, PartialEq)]
pub enum Profile {
    Polygon(Vec<Point2<f64>>),
    Circle { center: Point2<f64>, radius: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Drawing {
    profiles: Vec<Profile>,
}

fn signed_area(points: &[Point2<f64>]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let (a, b) = (points[i], points[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum::<f64>()
        / 2.0
}

fn svg_number(value: f64) -> String {
    let rounded = (value * 1e4).round() / 1e4;
    // Avoid printing "-0".
    if rounded == 0.0 {
        "0".to_string()
    } else {
        format!("{}", rounded)
    }
}

impl Drawing {
    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    /// Rectangle centered on the origin.
    pub fn rectangle(width: f64, height: f64) -> Result<Self, FailureCode> {
        let (hw, hh) = (positive(width)? / 2.0, positive(height)? / 2.0);
        Self::polygon(vec![
            Point2::new(-hw, -hh),
            Point2::new(hw, -hh),
            Point2::new(hw, hh),
            Point2::new(-hw, hh),
        ])
    }

    pub fn circle(radius: f64) -> Result<Self, FailureCode> {
        Ok(Self {
            profiles: vec![Profile::Circle {
                center: Point2::origin(),
                radius: positive(radius)?,
            }],
        })
    }

    /// Closed polygon through `points`, in either winding.
    pub fn polygon(points: Vec<Point2<f64>>) -> Result<Self, FailureCode> {
        if points.iter().any(|p| !(p.x.is_finite() && p.y.is_finite())) {
            return Err(FailureCode::InvalidArgument);
        }

        let mut ring: Vec<Point2<f64>> = Vec::with_capacity(points.len());
        for point in points {
            if ring.last().map_or(true, |last| (last - point).norm() > 1e-9) {
                ring.push(point);
            }
        }
        while ring.len() > 1 && (ring[0] - ring[ring.len() - 1]).norm() <= 1e-9 {
            ring.pop();
        }

        if ring.len() < 3 {
            return Err(FailureCode::DegenerateProfile);
        }
        let area = signed_area(&ring);
        if area.abs() < MIN_PROFILE_AREA {
            return Err(FailureCode::DegenerateProfile);
        }
        if area < 0.0 {
            ring.reverse();
        }

        Ok(Self {
            profiles: vec![Profile::Polygon(ring)],
        })
    }

    pub fn translate(&self, x: f64, y: f64) -> Result<Self, FailureCode> {
        if !(x.is_finite() && y.is_finite()) {
            return Err(FailureCode::InvalidArgument);
        }
        Ok(self.transform(&Similarity2::from_parts(
            Translation2::new(x, y),
            UnitComplex::identity(),
            1.0,
        )))
    }

    /// Rotate about the origin, counter-clockwise in degrees.
    pub fn rotate(&self, degrees: f64) -> Result<Self, FailureCode> {
        if !degrees.is_finite() {
            return Err(FailureCode::InvalidArgument);
        }
        Ok(self.transform(&Similarity2::from_parts(
            Translation2::identity(),
            UnitComplex::new(degrees.to_radians()),
            1.0,
        )))
    }

    pub fn scale(&self, factor: f64) -> Result<Self, FailureCode> {
        Ok(self.transform(&Similarity2::from_scaling(positive(factor)?)))
    }

    fn transform(&self, sim: &Similarity2<f64>) -> Self {
        let profiles = self
            .profiles
            .iter()
            .map(|profile| match profile {
                Profile::Polygon(points) => {
                    Profile::Polygon(points.iter().map(|p| sim.transform_point(p)).collect())
                }
                Profile::Circle { center, radius } => Profile::Circle {
                    center: sim.transform_point(center),
                    radius: radius * sim.scaling(),
                },
            })
            .collect();
        Self { profiles }
    }

    /// Both drawings' profiles side by side.
    pub fn combine(&self, other: &Drawing) -> Self {
        let mut profiles = self.profiles.clone();
        profiles.extend(other.profiles.iter().cloned());
        Self { profiles }
    }

    pub fn extrude(&self, height: f64) -> Result<Solid, FailureCode> {
        let solids = self
            .profiles
            .iter()
            .map(|profile| match profile {
                Profile::Polygon(points) => Solid::prism(points, height),
                Profile::Circle { center, radius } => Solid::cylinder(*center, *radius, height),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Solid::compound(solids.iter())
    }

    pub fn svg_paths(&self) -> Vec<String> {
        self.profiles
            .iter()
            .map(|profile| match profile {
                Profile::Polygon(points) => {
                    let mut path = String::new();
                    for (i, p) in points.iter().enumerate() {
                        path.push_str(if i == 0 { "M " } else { " L " });
                        path.push_str(&format!("{} {}", svg_number(p.x), svg_number(-p.y)));
                    }
                    path.push_str(" Z");
                    path
                }
                Profile::Circle { center, radius } => {
                    let (left, right, y, r) = (
                        svg_number(center.x - radius),
                        svg_number(center.x + radius),
                        svg_number(-center.y),
                        svg_number(*radius),
                    );
                    format!(
                        "M {left} {y} A {r} {r} 0 1 0 {right} {y} A {r} {r} 0 1 0 {left} {y} Z"
                    )
                }
            })
            .collect()
    }

    /// `min-x min-y width height` in SVG coordinates, with a small margin.
    pub fn viewbox(&self) -> String {
        let mut min = Point2::new(f64::INFINITY, f64::INFINITY);
        let mut max = Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        let mut include = |x: f64, y: f64| {
            min.x = min.x.min(x);
            min.y = min.y.min(y);
            max.x = max.x.max(x);
            max.y = max.y.max(y);
        };
        for profile in &self.profiles {
            match profile {
                Profile::Polygon(points) => points.iter().for_each(|p| include(p.x, p.y)),
                Profile::Circle { center, radius } => {
                    include(center.x - radius, center.y - radius);
                    include(center.x + radius, center.y + radius);
                }
            }
        }
        if !min.x.is_finite() {
            return "0 0 0 0".to_string();
        }

        let (width, height) = (max.x - min.x, max.y - min.y);
        let extent = width.max(height);
        let margin = if extent > 0.0 {
            extent * VIEWBOX_MARGIN
        } else {
            1.0
        };
        format!(
            "{} {} {} {}",
            svg_number(min.x - margin),
            svg_number(-max.y - margin),
            svg_number(width + 2.0 * margin),
            svg_number(height + 2.0 * margin)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polygon_normalized_to_counter_clockwise() {
        let clockwise = vec![
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 1.0),
            Point2::new(1.0, 1.0),
            Point2::new(1.0, 0.0),
        ];
        let drawing = Drawing::polygon(clockwise).unwrap();
        match &drawing.profiles()[0] {
            Profile::Polygon(points) => assert!(signed_area(points) > 0.0),
            other => panic!("Expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_degenerate_polygons_rejected() {
        let collinear = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(2.0, 0.0),
        ];
        assert_eq!(
            Drawing::polygon(collinear),
            Err(FailureCode::DegenerateProfile)
        );
        let repeated = vec![Point2::new(1.0, 1.0); 4];
        assert_eq!(
            Drawing::polygon(repeated),
            Err(FailureCode::DegenerateProfile)
        );
    }

    #[test]
    fn test_rectangle_svg_flips_y() {
        let drawing = Drawing::rectangle(4.0, 2.0).unwrap().translate(0.0, 1.0).unwrap();
        assert_eq!(drawing.svg_paths(), vec!["M -2 0 L 2 0 L 2 -2 L -2 -2 Z"]);
        assert_eq!(drawing.viewbox(), "-2.2 -2.2 4.4 2.4");
    }

    #[test]
    fn test_circle_path_uses_two_arcs() {
        let paths = Drawing::circle(1.0).unwrap().svg_paths();
        assert_eq!(paths, vec!["M -1 0 A 1 1 0 1 0 1 0 A 1 1 0 1 0 -1 0 Z"]);
    }

    #[test]
    fn test_combine_and_extrude() {
        let drawing = Drawing::rectangle(2.0, 2.0)
            .unwrap()
            .combine(&Drawing::circle(1.0).unwrap().translate(5.0, 0.0).unwrap());
        assert_eq!(drawing.profiles().len(), 2);

        let solid = drawing.extrude(3.0).unwrap();
        // Rectangle prism has 6 faces, the cylinder 3.
        assert_eq!(solid.faces().len(), 9);
        assert_eq!(
            drawing.extrude(0.0),
            Err(FailureCode::InvalidDimension)
        );
    }
}
