// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Transport-safe render descriptors.

use crate::modeling::{EdgeBuffers, FaceBuffers};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshGeometry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    pub faces: FaceBuffers,
    pub edges: EdgeBuffers,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SvgGeometry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_type: Option<String>,
    pub paths: Vec<String>,
    pub viewbox: String,
}

/// One rendered shape, tagged `"3d"` for meshes and `"2d"` for SVG drawings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum GeometryResult {
    #[serde(rename = "3d")]
    Mesh(MeshGeometry),
    #[serde(rename = "2d")]
    Svg(SvgGeometry),
}

impl GeometryResult {
    pub fn name(&self) -> &str {
        match self {
            GeometryResult::Mesh(mesh) => &mesh.name,
            GeometryResult::Svg(svg) => &svg.name,
        }
    }

    /// True when there is nothing to draw, as after a failed tessellation.
    pub fn is_empty(&self) -> bool {
        match self {
            GeometryResult::Mesh(mesh) => mesh.faces.triangles.is_empty() && mesh.edges.lines.is_empty(),
            GeometryResult::Svg(svg) => svg.paths.is_empty(),
        }
    }

    pub fn as_mesh(&self) -> Option<&MeshGeometry> {
        match self {
            GeometryResult::Mesh(mesh) => Some(mesh),
            GeometryResult::Svg(_) => None,
        }
    }
}
