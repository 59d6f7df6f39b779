// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Solid tessellation.
//!
//! Produces flat, transport-ready buffers: `vertices` and `normals` hold
//! `x, y, z` triples, `triangles` holds vertex indices, `lines` holds pairs of
//! segment endpoints. Group entries map ranges back to the face or edge they
//! came from (`faceGroups` in triangle-index units, `edgeGroups` in
//! line-vertex units). Vertices are not shared between faces so each face
//! keeps its own normals.

use crate::kernel::FailureCode;
use crate::modeling::solid::{plane_basis, Edge, Face, Solid};
use nalgebra::{Point2, Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

pub const MIN_SEGMENTS: usize = 3;
/// Upper bound on the segments used to approximate one full circle.
pub const MAX_SEGMENTS: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TessellationParams {
    /// Maximum chord deviation, in model units.
    pub tolerance: f64,
    /// Maximum angle between adjacent segments, in degrees.
    pub angular_tolerance: f64,
}

impl TessellationParams {
    pub fn new(tolerance: f64, angular_tolerance: f64) -> Self {
        Self {
            tolerance,
            angular_tolerance,
        }
    }

    /// Segments needed to approximate a full circle of `radius`.
    pub fn segments(&self, radius: f64) -> Result<usize, FailureCode> {
        if !(self.tolerance > 0.0 && self.angular_tolerance > 0.0) {
            return Err(FailureCode::InvalidArgument);
        }
        let angular_step = self.angular_tolerance.min(180.0).to_radians();
        let chord_step = if self.tolerance < radius {
            2.0 * (1.0 - self.tolerance / radius).acos()
        } else {
            PI
        };
        let step = angular_step.min(chord_step);
        let segments = (2.0 * PI / step).ceil();
        if !segments.is_finite() || segments > MAX_SEGMENTS as f64 {
            return Err(FailureCode::TessellationBudget);
        }
        Ok((segments as usize).max(MIN_SEGMENTS))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceGroup {
    pub start: usize,
    pub count: usize,
    pub face_id: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeGroup {
    pub start: usize,
    pub count: usize,
    pub edge_id: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceBuffers {
    pub vertices: Vec<f32>,
    pub triangles: Vec<u32>,
    pub normals: Vec<f32>,
    pub face_groups: Vec<FaceGroup>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeBuffers {
    pub lines: Vec<f32>,
    pub edge_groups: Vec<EdgeGroup>,
}

impl FaceBuffers {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }

    /// Vertex `index` as a point.
    pub fn vertex(&self, index: u32) -> [f32; 3] {
        let i = index as usize * 3;
        [self.vertices[i], self.vertices[i + 1], self.vertices[i + 2]]
    }

    fn push_vertex(&mut self, p: &Point3<f64>, n: &Vector3<f64>) -> u32 {
        let index = self.vertex_count() as u32;
        self.vertices
            .extend_from_slice(&[p.x as f32, p.y as f32, p.z as f32]);
        self.normals
            .extend_from_slice(&[n.x as f32, n.y as f32, n.z as f32]);
        index
    }
}

impl EdgeBuffers {
    fn push_segment(&mut self, a: &Point3<f64>, b: &Point3<f64>) {
        self.lines.extend_from_slice(&[
            a.x as f32, a.y as f32, a.z as f32, b.x as f32, b.y as f32, b.z as f32,
        ]);
    }
}

fn circle_point(
    center: &Point3<f64>,
    u: &Vector3<f64>,
    v: &Vector3<f64>,
    radius: f64,
    angle: f64,
) -> Point3<f64> {
    center + (u * angle.cos() + v * angle.sin()) * radius
}

fn is_convex(a: Point2<f64>, b: Point2<f64>, c: Point2<f64>) -> bool {
    (b - a).perp(&(c - b)) > 1e-12
}

fn contains(a: Point2<f64>, b: Point2<f64>, c: Point2<f64>, p: Point2<f64>) -> bool {
    let d1 = (b - a).perp(&(p - a));
    let d2 = (c - b).perp(&(p - b));
    let d3 = (a - c).perp(&(p - c));
    d1 >= 0.0 && d2 >= 0.0 && d3 >= 0.0
}

/// Ear-clip a counter-clockwise simple polygon into index triples.
///
/// Falls back to a fan when no ear can be found, which only happens for
/// self-intersecting input.
fn triangulate_polygon(points: &[Point2<f64>]) -> Vec<[usize; 3]> {
    let mut remaining: Vec<usize> = (0..points.len()).collect();
    let mut triangles = Vec::with_capacity(points.len().saturating_sub(2));

    while remaining.len() > 3 {
        let n = remaining.len();
        let ear = (0..n).find(|&i| {
            let (a, b, c) = (
                remaining[(i + n - 1) % n],
                remaining[i],
                remaining[(i + 1) % n],
            );
            is_convex(points[a], points[b], points[c])
                && remaining
                    .iter()
                    .filter(|&&k| k != a && k != b && k != c)
                    .all(|&k| !contains(points[a], points[b], points[c], points[k]))
        });

        match ear {
            Some(i) => {
                triangles.push([
                    remaining[(i + n - 1) % n],
                    remaining[i],
                    remaining[(i + 1) % n],
                ]);
                remaining.remove(i);
            }
            None => {
                for i in 1..n - 1 {
                    triangles.push([remaining[0], remaining[i], remaining[i + 1]]);
                }
                return triangles;
            }
        }
    }
    if remaining.len() == 3 {
        triangles.push([remaining[0], remaining[1], remaining[2]]);
    }
    triangles
}

fn tessellate_face(
    face: &Face,
    params: &TessellationParams,
    out: &mut FaceBuffers,
) -> Result<(), FailureCode> {
    match face {
        Face::Planar { outer, normal } => {
            let (u, v) = plane_basis(normal);
            let origin = outer.first().copied().unwrap_or_else(Point3::origin);
            let projected: Vec<Point2<f64>> = outer
                .iter()
                .map(|p| {
                    let d = p - origin;
                    Point2::new(d.dot(&u), d.dot(&v))
                })
                .collect();
            let base: Vec<u32> = outer
                .iter()
                .map(|p| out.push_vertex(p, normal))
                .collect();
            for [a, b, c] in triangulate_polygon(&projected) {
                out.triangles.extend_from_slice(&[base[a], base[b], base[c]]);
            }
        }
        Face::Disc {
            center,
            normal,
            reference,
            radius,
        } => {
            let segments = params.segments(*radius)?;
            let u = reference.into_inner();
            let v = normal.cross(&u);
            let hub = out.push_vertex(center, normal);
            let rim: Vec<u32> = (0..segments)
                .map(|i| {
                    let angle = 2.0 * PI * i as f64 / segments as f64;
                    out.push_vertex(&circle_point(center, &u, &v, *radius, angle), normal)
                })
                .collect();
            for i in 0..segments {
                out.triangles
                    .extend_from_slice(&[hub, rim[i], rim[(i + 1) % segments]]);
            }
        }
        Face::Cylindrical {
            base,
            axis,
            reference,
            radius,
            height,
        } => {
            let segments = params.segments(*radius)?;
            let u = reference.into_inner();
            let v = axis.cross(&u);
            let lift = axis.into_inner() * *height;
            let mut bottom = Vec::with_capacity(segments);
            let mut top = Vec::with_capacity(segments);
            for i in 0..segments {
                let angle = 2.0 * PI * i as f64 / segments as f64;
                let radial = u * angle.cos() + v * angle.sin();
                let p = base + radial * *radius;
                bottom.push(out.push_vertex(&p, &radial));
                top.push(out.push_vertex(&(p + lift), &radial));
            }
            for i in 0..segments {
                let j = (i + 1) % segments;
                out.triangles
                    .extend_from_slice(&[bottom[i], bottom[j], top[j], bottom[i], top[j], top[i]]);
            }
        }
        Face::Spherical {
            center,
            axis,
            reference,
            radius,
        } => {
            let segments = params.segments(*radius)?;
            let rings = (segments / 2).max(2);
            let u = reference.into_inner();
            let v = axis.cross(&u);
            let a = axis.into_inner();
            let mut grid = Vec::with_capacity(rings + 1);
            for ring in 0..=rings {
                let polar = PI * ring as f64 / rings as f64;
                let row: Vec<u32> = (0..segments)
                    .map(|i| {
                        let azimuth = 2.0 * PI * i as f64 / segments as f64;
                        let n = (u * azimuth.cos() + v * azimuth.sin()) * polar.sin()
                            + a * polar.cos();
                        out.push_vertex(&(center + n * *radius), &n)
                    })
                    .collect();
                grid.push(row);
            }
            for ring in 0..rings {
                for i in 0..segments {
                    let j = (i + 1) % segments;
                    // The pole rows collapse to a point; skip their zero-area halves.
                    if ring + 1 < rings {
                        out.triangles.extend_from_slice(&[
                            grid[ring][i],
                            grid[ring + 1][i],
                            grid[ring + 1][j],
                        ]);
                    }
                    if ring > 0 {
                        out.triangles.extend_from_slice(&[
                            grid[ring][i],
                            grid[ring + 1][j],
                            grid[ring][j],
                        ]);
                    }
                }
            }
        }
    }
    Ok(())
}

pub fn tessellate_faces(
    solid: &Solid,
    params: &TessellationParams,
) -> Result<FaceBuffers, FailureCode> {
    let mut out = FaceBuffers::default();
    for (face_id, face) in solid.faces().iter().enumerate() {
        let start = out.triangles.len();
        tessellate_face(face, params, &mut out)?;
        out.face_groups.push(FaceGroup {
            start,
            count: out.triangles.len() - start,
            face_id,
        });
    }
    Ok(out)
}

pub fn tessellate_edges(
    solid: &Solid,
    params: &TessellationParams,
) -> Result<EdgeBuffers, FailureCode> {
    let mut out = EdgeBuffers::default();
    for (edge_id, edge) in solid.edges().iter().enumerate() {
        let start = out.lines.len() / 3;
        match edge {
            Edge::Line { start, end } => out.push_segment(start, end),
            Edge::Circle {
                center,
                normal,
                reference,
                radius,
            } => {
                let segments = params.segments(*radius)?;
                let u = reference.into_inner();
                let v = normal.cross(&u);
                for i in 0..segments {
                    let a = 2.0 * PI * i as f64 / segments as f64;
                    let b = 2.0 * PI * (i + 1) as f64 / segments as f64;
                    out.push_segment(
                        &circle_point(center, &u, &v, *radius, a),
                        &circle_point(center, &u, &v, *radius, b),
                    );
                }
            }
        }
        out.edge_groups.push(EdgeGroup {
            start,
            count: out.lines.len() / 3 - start,
            edge_id,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point2 as P2;

    fn preview() -> TessellationParams {
        TessellationParams::new(0.1, 30.0)
    }

    fn assert_well_formed(faces: &FaceBuffers) {
        assert_eq!(faces.vertices.len() % 3, 0);
        assert_eq!(faces.normals.len(), faces.vertices.len());
        assert_eq!(faces.triangles.len() % 3, 0);
        let count = faces.vertex_count() as u32;
        assert!(faces.triangles.iter().all(|&i| i < count));
        let grouped: usize = faces.face_groups.iter().map(|g| g.count).sum();
        assert_eq!(grouped, faces.triangles.len());
    }

    #[test]
    fn test_segments_respect_angular_tolerance() {
        // Coarse chord tolerance leaves the angular limit in charge: 360 / 30.
        assert_eq!(TessellationParams::new(10.0, 30.0).segments(1.0), Ok(12));
        assert_eq!(TessellationParams::new(10.0, 180.0).segments(1.0), Ok(3));
    }

    #[test]
    fn test_segments_budget() {
        let tight = TessellationParams::new(1e-9, 30.0);
        assert_eq!(tight.segments(1000.0), Err(FailureCode::TessellationBudget));
    }

    #[test]
    fn test_box_mesh() {
        let solid = Solid::make_box(1.0, 2.0, 3.0).unwrap();
        let faces = tessellate_faces(&solid, &preview()).unwrap();
        assert_well_formed(&faces);
        assert_eq!(faces.triangle_count(), 12);
        assert_eq!(faces.face_groups.len(), 6);
        assert_eq!(faces.face_groups[1].start, 6);

        let edges = tessellate_edges(&solid, &preview()).unwrap();
        assert_eq!(edges.lines.len(), 12 * 6);
        assert_eq!(edges.edge_groups[1].start, 2);
    }

    #[test]
    fn test_concave_profile_triangulates() {
        let profile = vec![
            P2::new(0.0, 0.0),
            P2::new(4.0, 0.0),
            P2::new(4.0, 4.0),
            P2::new(2.0, 1.0),
            P2::new(0.0, 4.0),
        ];
        let solid = Solid::prism(&profile, 1.0).unwrap();
        let faces = tessellate_faces(&solid, &preview()).unwrap();
        assert_well_formed(&faces);
        // Each cap has n - 2 triangles, each side 2.
        assert_eq!(faces.triangle_count(), 3 + 3 + 5 * 2);
    }

    #[test]
    fn test_curved_solids_are_well_formed() {
        let cylinder = Solid::cylinder(P2::origin(), 5.0, 2.0).unwrap();
        assert_well_formed(&tessellate_faces(&cylinder, &preview()).unwrap());

        let sphere = Solid::sphere(3.0).unwrap();
        let faces = tessellate_faces(&sphere, &preview()).unwrap();
        assert_well_formed(&faces);
        let segments = preview().segments(3.0).unwrap();
        let rings = (segments / 2).max(2);
        assert_eq!(faces.triangle_count(), segments * (2 * rings - 2));
    }
}
