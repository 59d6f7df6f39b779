// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Boundary representation of solids.
//!
//! A solid is a flat list of faces and edges. Faces carry exact surface data
//! (plane, disc, cylinder, sphere) so tessellation can refine curved surfaces
//! to any tolerance; edges are lines or full circles. Compounds simply
//! concatenate the boundaries of their members.

use crate::kernel::FailureCode;
use nalgebra::{Point2, Point3, Similarity3, Translation3, Unit, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

type Dir3 = Unit<Vector3<f64>>;

#[derive(Debug, Clone, PartialEq)]
pub enum Face {
    /// A flat polygon. `outer` winds counter-clockwise seen from the normal side.
    Planar { outer: Vec<Point3<f64>>, normal: Dir3 },
    Disc {
        center: Point3<f64>,
        normal: Dir3,
        reference: Dir3,
        radius: f64,
    },
    Cylindrical {
        base: Point3<f64>,
        axis: Dir3,
        reference: Dir3,
        radius: f64,
        height: f64,
    },
    Spherical {
        center: Point3<f64>,
        axis: Dir3,
        reference: Dir3,
        radius: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Edge {
    Line {
        start: Point3<f64>,
        end: Point3<f64>,
    },
    Circle {
        center: Point3<f64>,
        normal: Dir3,
        reference: Dir3,
        radius: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaceType {
    Plane,
    Cylinder,
    Sphere,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    Line,
    Circle,
}

/// Description of a single face for picking in the viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceInfo {
    #[serde(rename = "type")]
    pub face_type: FaceType,
    pub center: [f64; 3],
    pub normal: [f64; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeInfo {
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    pub start: [f64; 3],
    pub end: [f64; 3],
    pub direction: [f64; 3],
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Solid {
    faces: Vec<Face>,
    edges: Vec<Edge>,
}

pub(crate) fn positive(value: f64) -> Result<f64, FailureCode> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(FailureCode::InvalidDimension)
    }
}

/// Any unit vector perpendicular to `axis`.
fn perpendicular(axis: &Dir3) -> Dir3 {
    let candidate = if axis.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    Unit::new_normalize(axis.cross(&candidate).cross(&axis.into_inner()))
}

fn to_array(p: &Point3<f64>) -> [f64; 3] {
    [p.x, p.y, p.z]
}

fn dir_array(v: &Vector3<f64>) -> [f64; 3] {
    [v.x, v.y, v.z]
}

impl Solid {
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Axis-aligned box spanning `[0, w] x [0, d] x [0, h]`.
    pub fn make_box(width: f64, depth: f64, height: f64) -> Result<Self, FailureCode> {
        let (w, d) = (positive(width)?, positive(depth)?);
        let profile = [
            Point2::new(0.0, 0.0),
            Point2::new(w, 0.0),
            Point2::new(w, d),
            Point2::new(0.0, d),
        ];
        Self::prism(&profile, height)
    }

    /// Extrude a counter-clockwise polygon along +Z.
    pub fn prism(profile: &[Point2<f64>], height: f64) -> Result<Self, FailureCode> {
        let h = positive(height)?;
        if profile.len() < 3 {
            return Err(FailureCode::DegenerateProfile);
        }

        let bottom: Vec<Point3<f64>> = profile.iter().map(|p| Point3::new(p.x, p.y, 0.0)).collect();
        let top: Vec<Point3<f64>> = profile.iter().map(|p| Point3::new(p.x, p.y, h)).collect();

        let mut faces = Vec::with_capacity(profile.len() + 2);
        let mut edges = Vec::with_capacity(profile.len() * 3);

        faces.push(Face::Planar {
            outer: bottom.iter().rev().cloned().collect(),
            normal: -Vector3::z_axis(),
        });
        faces.push(Face::Planar {
            outer: top.clone(),
            normal: Vector3::z_axis(),
        });

        let n = profile.len();
        for i in 0..n {
            let j = (i + 1) % n;
            let along = profile[j] - profile[i];
            let outward = Unit::try_new(Vector3::new(along.y, -along.x, 0.0), 1e-12)
                .ok_or(FailureCode::DegenerateProfile)?;
            faces.push(Face::Planar {
                outer: vec![bottom[i], bottom[j], top[j], top[i]],
                normal: outward,
            });
            edges.push(Edge::Line {
                start: bottom[i],
                end: bottom[j],
            });
            edges.push(Edge::Line {
                start: top[i],
                end: top[j],
            });
            edges.push(Edge::Line {
                start: bottom[i],
                end: top[i],
            });
        }

        Ok(Self { faces, edges })
    }

    /// Cylinder along +Z with its base circle centered on `center`.
    pub fn cylinder(center: Point2<f64>, radius: f64, height: f64) -> Result<Self, FailureCode> {
        let (r, h) = (positive(radius)?, positive(height)?);
        let base = Point3::new(center.x, center.y, 0.0);
        let top = Point3::new(center.x, center.y, h);
        let axis = Vector3::z_axis();
        let reference = Vector3::x_axis();

        let faces = vec![
            Face::Disc {
                center: base,
                normal: -axis,
                reference,
                radius: r,
            },
            Face::Disc {
                center: top,
                normal: axis,
                reference,
                radius: r,
            },
            Face::Cylindrical {
                base,
                axis,
                reference,
                radius: r,
                height: h,
            },
        ];
        let seam = base + reference.into_inner() * r;
        let edges = vec![
            Edge::Circle {
                center: base,
                normal: axis,
                reference,
                radius: r,
            },
            Edge::Circle {
                center: top,
                normal: axis,
                reference,
                radius: r,
            },
            Edge::Line {
                start: seam,
                end: seam + axis.into_inner() * h,
            },
        ];
        Ok(Self { faces, edges })
    }

    pub fn sphere(radius: f64) -> Result<Self, FailureCode> {
        let r = positive(radius)?;
        Ok(Self {
            faces: vec![Face::Spherical {
                center: Point3::origin(),
                axis: Vector3::z_axis(),
                reference: Vector3::x_axis(),
                radius: r,
            }],
            edges: Vec::new(),
        })
    }

    pub fn compound<'a, I>(solids: I) -> Result<Self, FailureCode>
    where
        I: IntoIterator<Item = &'a Solid>,
    {
        let mut compound = Solid::default();
        let mut count = 0;
        for solid in solids {
            compound.faces.extend(solid.faces.iter().cloned());
            compound.edges.extend(solid.edges.iter().cloned());
            count += 1;
        }
        if count == 0 {
            return Err(FailureCode::EmptyCompound);
        }
        Ok(compound)
    }

    pub fn translate(&self, x: f64, y: f64, z: f64) -> Result<Self, FailureCode> {
        if !(x.is_finite() && y.is_finite() && z.is_finite()) {
            return Err(FailureCode::InvalidArgument);
        }
        Ok(self.transform(&Similarity3::from_parts(
            Translation3::new(x, y, z),
            UnitQuaternion::identity(),
            1.0,
        )))
    }

    /// Rotate about an axis through the origin.
    pub fn rotate(&self, degrees: f64, axis: Vector3<f64>) -> Result<Self, FailureCode> {
        if !degrees.is_finite() {
            return Err(FailureCode::InvalidArgument);
        }
        let axis = Unit::try_new(axis, 1e-12).ok_or(FailureCode::InvalidAxis)?;
        Ok(self.transform(&Similarity3::from_parts(
            Translation3::identity(),
            UnitQuaternion::from_axis_angle(&axis, degrees.to_radians()),
            1.0,
        )))
    }

    /// Uniform scale about the origin.
    pub fn scale(&self, factor: f64) -> Result<Self, FailureCode> {
        Ok(self.transform(&Similarity3::from_scaling(positive(factor)?)))
    }

    pub fn transform(&self, sim: &Similarity3<f64>) -> Self {
        let point = |p: &Point3<f64>| sim.transform_point(p);
        let dir = |d: &Dir3| Unit::new_normalize(sim.isometry.rotation * d.into_inner());
        let s = sim.scaling();

        let faces = self
            .faces
            .iter()
            .map(|face| match face {
                Face::Planar { outer, normal } => Face::Planar {
                    outer: outer.iter().map(point).collect(),
                    normal: dir(normal),
                },
                Face::Disc {
                    center,
                    normal,
                    reference,
                    radius,
                } => Face::Disc {
                    center: point(center),
                    normal: dir(normal),
                    reference: dir(reference),
                    radius: radius * s,
                },
                Face::Cylindrical {
                    base,
                    axis,
                    reference,
                    radius,
                    height,
                } => Face::Cylindrical {
                    base: point(base),
                    axis: dir(axis),
                    reference: dir(reference),
                    radius: radius * s,
                    height: height * s,
                },
                Face::Spherical {
                    center,
                    axis,
                    reference,
                    radius,
                } => Face::Spherical {
                    center: point(center),
                    axis: dir(axis),
                    reference: dir(reference),
                    radius: radius * s,
                },
            })
            .collect();

        let edges = self
            .edges
            .iter()
            .map(|edge| match edge {
                Edge::Line { start, end } => Edge::Line {
                    start: point(start),
                    end: point(end),
                },
                Edge::Circle {
                    center,
                    normal,
                    reference,
                    radius,
                } => Edge::Circle {
                    center: point(center),
                    normal: dir(normal),
                    reference: dir(reference),
                    radius: radius * s,
                },
            })
            .collect();

        Self { faces, edges }
    }

    pub fn face_info(&self, index: usize) -> Option<FaceInfo> {
        let info = match self.faces.get(index)? {
            Face::Planar { outer, normal } => {
                let sum = outer
                    .iter()
                    .fold(Vector3::zeros(), |acc, p| acc + p.coords);
                let centroid = sum / outer.len().max(1) as f64;
                FaceInfo {
                    face_type: FaceType::Plane,
                    center: dir_array(&centroid),
                    normal: dir_array(normal),
                }
            }
            Face::Disc { center, normal, .. } => FaceInfo {
                face_type: FaceType::Plane,
                center: to_array(center),
                normal: dir_array(normal),
            },
            Face::Cylindrical {
                base,
                axis,
                reference,
                radius,
                height,
            } => {
                let mid = base + axis.into_inner() * (height / 2.0) + reference.into_inner() * *radius;
                FaceInfo {
                    face_type: FaceType::Cylinder,
                    center: to_array(&mid),
                    normal: dir_array(reference),
                }
            }
            Face::Spherical {
                center,
                reference,
                radius,
                ..
            } => FaceInfo {
                face_type: FaceType::Sphere,
                center: to_array(&(center + reference.into_inner() * *radius)),
                normal: dir_array(reference),
            },
        };
        Some(info)
    }

    pub fn edge_info(&self, index: usize) -> Option<EdgeInfo> {
        let info = match self.edges.get(index)? {
            Edge::Line { start, end } => {
                let direction = Unit::try_new(end - start, 1e-12)
                    .map(|d| d.into_inner())
                    .unwrap_or_else(Vector3::zeros);
                EdgeInfo {
                    edge_type: EdgeType::Line,
                    start: to_array(start),
                    end: to_array(end),
                    direction: dir_array(&direction),
                }
            }
            Edge::Circle {
                center,
                normal,
                reference,
                radius,
            } => {
                let seam = center + reference.into_inner() * *radius;
                let tangent = normal.cross(&reference.into_inner());
                EdgeInfo {
                    edge_type: EdgeType::Circle,
                    start: to_array(&seam),
                    end: to_array(&seam),
                    direction: dir_array(&tangent),
                }
            }
        };
        Some(info)
    }
}

/// Basis `(u, v)` spanning the plane of `normal`, with `u x v = normal`.
pub(crate) fn plane_basis(normal: &Dir3) -> (Vector3<f64>, Vector3<f64>) {
    let u = perpendicular(normal).into_inner();
    let v = normal.cross(&u);
    (u, v)
}
