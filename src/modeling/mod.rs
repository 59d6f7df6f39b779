// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The modeling library user code builds geometry with.
//!
//! Shapes are immutable values behind `Arc`s so they can be cloned freely into
//! and out of the script engine. Capability is fixed when a shape is created:
//! a [`Shape::Solid`] can be meshed and exported, a [`Shape::Drawing`] can be
//! rendered to SVG paths or extruded into a solid.
//!
//! * `solid` - boundary representation of 3D solids
//! * `drawing` - planar profiles and their SVG extraction
//! * `tessellate` - solid to triangle mesh and edge polylines
//! * `api` - script bindings for constructors and shape methods
//! * `library` - binding of the script surface to a kernel session

pub mod api;
pub mod drawing;
pub mod library;
pub mod solid;
pub mod tessellate;

use std::sync::Arc;

pub use drawing::{Drawing, Profile};
pub use library::{KernelHandle, ModelingLibrary};
pub use solid::{EdgeInfo, EdgeType, FaceInfo, FaceType, Solid};
pub use tessellate::{EdgeBuffers, FaceBuffers, TessellationParams};

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Solid(Arc<Solid>),
    Drawing(Arc<Drawing>),
}

impl Shape {
    pub fn solid(solid: Solid) -> Self {
        Shape::Solid(Arc::new(solid))
    }

    pub fn drawing(drawing: Drawing) -> Self {
        Shape::Drawing(Arc::new(drawing))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Shape::Solid(_) => "Solid",
            Shape::Drawing(_) => "Drawing",
        }
    }

    pub fn as_solid(&self) -> Option<&Solid> {
        match self {
            Shape::Solid(solid) => Some(solid),
            Shape::Drawing(_) => None,
        }
    }
}
