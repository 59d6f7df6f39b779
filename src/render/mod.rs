// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Shape normalization and rendering.
//!
//! Evaluator output is coerced into [`NormalizedShape`]s, then each shape is
//! turned into a [`GeometryResult`]: solids are tessellated into mesh and
//! edge buffers, drawings become SVG paths. Tessellation failures are
//! isolated per shape; the failing shape renders as empty geometry.

pub mod color;
pub mod geometry;
pub mod normalize;

pub use geometry::{GeometryResult, MeshGeometry, SvgGeometry};
pub use normalize::{
    coerce_shape_configs, normalize_shapes, normalize_with, NormalizedShape, ShapeConfig,
    DEFAULT_BASE_NAME,
};

use crate::kernel::FailureCode;
use crate::modeling::tessellate::{tessellate_edges, tessellate_faces};
use crate::modeling::{EdgeBuffers, FaceBuffers, Shape, TessellationParams};
use crate::observability::messages::worker::ShapeTessellationFailed;
use crate::observability::messages::StructuredLog;

fn mesh_of(shape: &NormalizedShape, faces: FaceBuffers, edges: EdgeBuffers) -> GeometryResult {
    GeometryResult::Mesh(MeshGeometry {
        name: shape.name.clone(),
        color: shape.color.clone(),
        opacity: shape.opacity,
        faces,
        edges,
    })
}

/// Render one shape. Only solids can fail.
pub fn render_shape(
    shape: &NormalizedShape,
    params: &TessellationParams,
) -> Result<GeometryResult, FailureCode> {
    match &shape.shape {
        Shape::Solid(solid) => {
            let faces = tessellate_faces(solid, params)?;
            let edges = tessellate_edges(solid, params)?;
            Ok(mesh_of(shape, faces, edges))
        }
        Shape::Drawing(drawing) => Ok(GeometryResult::Svg(SvgGeometry {
            name: shape.name.clone(),
            color: shape.color.clone(),
            opacity: shape.opacity,
            stroke_type: shape.stroke_type.clone(),
            paths: drawing.svg_paths(),
            viewbox: drawing.viewbox(),
        })),
    }
}

/// Render every shape, in order. Output length always equals input length.
pub fn render_shapes(shapes: &[NormalizedShape], params: &TessellationParams) -> Vec<GeometryResult> {
    shapes
        .iter()
        .map(|shape| {
            render_shape(shape, params).unwrap_or_else(|code| {
                ShapeTessellationFailed {
                    shape_name: &shape.name,
                    error: &code,
                }
                .log();
                mesh_of(shape, FaceBuffers::default(), EdgeBuffers::default())
            })
        })
        .collect()
}
