// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Interchange-format export of built shapes.
//!
//! * `stl` - ASCII and binary STL from the tessellated mesh
//! * `step` - faceted B-rep STEP, one file per shape or one assembly
//!
//! Only solids can be exported; drawings have no volume.

pub mod step;
pub mod stl;

use crate::config::consts::{DEFAULT_EXPORT_ANGULAR_TOLERANCE, DEFAULT_EXPORT_TOLERANCE};
use crate::errors::ExportError;
use crate::modeling::tessellate::tessellate_faces;
use crate::modeling::{FaceBuffers, TessellationParams};
use crate::render::NormalizedShape;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use step::StepBody;

const ASSEMBLY_NAME: &str = "Assembly";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    #[serde(rename = "stl")]
    Stl,
    #[serde(rename = "stl-binary")]
    StlBinary,
    #[serde(rename = "step")]
    Step,
    #[serde(rename = "step-assembly")]
    StepAssembly,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Stl => "stl",
            ExportFormat::StlBinary => "stl-binary",
            ExportFormat::Step => "step",
            ExportFormat::StepAssembly => "step-assembly",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Stl | ExportFormat::StlBinary => "stl",
            ExportFormat::Step | ExportFormat::StepAssembly => "step",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stl" => Ok(ExportFormat::Stl),
            "stl-binary" => Ok(ExportFormat::StlBinary),
            "step" | "stp" => Ok(ExportFormat::Step),
            "step-assembly" => Ok(ExportFormat::StepAssembly),
            other => Err(ExportError::UnknownFormat(other.to_string())),
        }
    }
}

/// Tessellation tolerances used for export.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshConfig {
    pub tolerance: f64,
    pub angular_tolerance: f64,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_EXPORT_TOLERANCE,
            angular_tolerance: DEFAULT_EXPORT_ANGULAR_TOLERANCE,
        }
    }
}

impl From<MeshConfig> for TessellationParams {
    fn from(config: MeshConfig) -> Self {
        TessellationParams::new(config.tolerance, config.angular_tolerance)
    }
}

/// One exported file. The blob travels as base64 in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportArtifact {
    #[serde(serialize_with = "blob_to_base64", deserialize_with = "blob_from_base64")]
    pub blob: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ExportArtifact {
    /// File name for writing the artifact to disk.
    pub fn file_name(&self, format: ExportFormat) -> String {
        let stem: String = self
            .name
            .as_deref()
            .unwrap_or("shape")
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        format!("{}.{}", stem, format.extension())
    }
}

fn blob_to_base64<S: Serializer>(blob: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(blob))
}

fn blob_from_base64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    STANDARD.decode(encoded).map_err(serde::de::Error::custom)
}

fn mesh_for_export(
    shape: &NormalizedShape,
    format: ExportFormat,
    params: &TessellationParams,
) -> Result<FaceBuffers, ExportError> {
    let solid = shape
        .shape
        .as_solid()
        .ok_or_else(|| ExportError::UnsupportedShape {
            name: shape.name.clone(),
            format: format.to_string(),
        })?;
    tessellate_faces(solid, params).map_err(|code| ExportError::Tessellation {
        name: shape.name.clone(),
        message: code.to_string(),
    })
}

/// Export `shapes` in `format`. `step-assembly` yields one artifact holding
/// every shape; other formats yield one artifact per shape.
pub fn export_shapes(
    shapes: &[NormalizedShape],
    format: ExportFormat,
    mesh: MeshConfig,
) -> Result<Vec<ExportArtifact>, ExportError> {
    let params = TessellationParams::from(mesh);
    let meshes = shapes
        .iter()
        .map(|shape| mesh_for_export(shape, format, &params))
        .collect::<Result<Vec<_>, _>>()?;

    if format == ExportFormat::StepAssembly {
        let bodies: Vec<StepBody<'_>> = shapes
            .iter()
            .zip(&meshes)
            .map(|(shape, faces)| StepBody {
                name: &shape.name,
                faces,
            })
            .collect();
        return Ok(vec![ExportArtifact {
            blob: step::write_step(ASSEMBLY_NAME, &bodies),
            name: Some(ASSEMBLY_NAME.to_string()),
        }]);
    }

    Ok(shapes
        .iter()
        .zip(&meshes)
        .map(|(shape, faces)| {
            let blob = match format {
                ExportFormat::Stl => stl::write_ascii(&shape.name, faces),
                ExportFormat::StlBinary => stl::write_binary(&shape.name, faces),
                _ => step::write_step(
                    &shape.name,
                    &[StepBody {
                        name: &shape.name,
                        faces,
                    }],
                ),
            };
            ExportArtifact {
                blob,
                name: Some(shape.name.clone()),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modeling::{Drawing, Shape, Solid};

    fn named(shape: Shape, name: &str) -> NormalizedShape {
        NormalizedShape {
            shape,
            name: name.to_string(),
            color: None,
            opacity: None,
            stroke_type: None,
        }
    }

    fn cubes(count: usize) -> Vec<NormalizedShape> {
        (0..count)
            .map(|i| {
                named(
                    Shape::solid(Solid::make_box(1.0, 1.0, 1.0).unwrap()),
                    &format!("Cube {}", i),
                )
            })
            .collect()
    }

    #[test]
    fn test_format_names() {
        assert_eq!("stl-binary".parse::<ExportFormat>().unwrap(), ExportFormat::StlBinary);
        assert_eq!("STEP".parse::<ExportFormat>().unwrap(), ExportFormat::Step);
        assert!(matches!(
            "obj".parse::<ExportFormat>(),
            Err(ExportError::UnknownFormat(_))
        ));
        assert_eq!(
            serde_json::to_value(ExportFormat::StepAssembly).unwrap(),
            "step-assembly"
        );
    }

    #[test]
    fn test_one_artifact_per_shape() {
        let artifacts = export_shapes(&cubes(2), ExportFormat::StlBinary, MeshConfig::default()).unwrap();
        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts[1].name.as_deref(), Some("Cube 1"));
        assert_eq!(artifacts[0].blob.len(), 84 + 50 * 12);
    }

    #[test]
    fn test_assembly_is_a_single_artifact() {
        let artifacts = export_shapes(&cubes(3), ExportFormat::StepAssembly, MeshConfig::default()).unwrap();
        assert_eq!(artifacts.len(), 1);
        let text = String::from_utf8(artifacts[0].blob.clone()).unwrap();
        assert_eq!(text.matches("FACETED_BREP(").count(), 3);
    }

    #[test]
    fn test_drawings_cannot_be_exported() {
        let shapes = vec![named(Shape::drawing(Drawing::circle(1.0).unwrap()), "Sketch")];
        let err = export_shapes(&shapes, ExportFormat::Stl, MeshConfig::default()).unwrap_err();
        assert!(matches!(err, ExportError::UnsupportedShape { ref name, .. } if name == "Sketch"));
    }

    #[test]
    fn test_blob_serializes_as_base64() {
        let artifact = ExportArtifact {
            blob: b"solid".to_vec(),
            name: None,
        };
        let json = serde_json::to_value(&artifact).unwrap();
        assert_eq!(json["blob"], "c29saWQ=");
        let back: ExportArtifact = serde_json::from_value(json).unwrap();
        assert_eq!(back, artifact);
        assert_eq!(artifact.file_name(ExportFormat::Stl), "shape.stl");
    }
}
