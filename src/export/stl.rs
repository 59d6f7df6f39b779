// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! STL writers over tessellated face buffers.

use crate::modeling::FaceBuffers;
use std::fmt::Write;

const HEADER_LEN: usize = 80;
const TRIANGLE_RECORD_LEN: usize = 50;

fn facet_normal(v0: [f32; 3], v1: [f32; 3], v2: [f32; 3]) -> [f32; 3] {
    let e1 = [v1[0] - v0[0], v1[1] - v0[1], v1[2] - v0[2]];
    let e2 = [v2[0] - v0[0], v2[1] - v0[1], v2[2] - v0[2]];
    let n = [
        e1[1] * e2[2] - e1[2] * e2[1],
        e1[2] * e2[0] - e1[0] * e2[2],
        e1[0] * e2[1] - e1[1] * e2[0],
    ];
    let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
    if len > 1e-10 {
        [n[0] / len, n[1] / len, n[2] / len]
    } else {
        [0.0, 0.0, 1.0]
    }
}

fn facets(faces: &FaceBuffers) -> impl Iterator<Item = ([f32; 3], [[f32; 3]; 3])> + '_ {
    faces.triangles.chunks_exact(3).map(|tri| {
        let corners = [
            faces.vertex(tri[0]),
            faces.vertex(tri[1]),
            faces.vertex(tri[2]),
        ];
        (facet_normal(corners[0], corners[1], corners[2]), corners)
    })
}

/// Solid names may not contain whitespace in ASCII STL.
fn solid_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_graphic() { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "shape".to_string()
    } else {
        cleaned
    }
}

pub fn write_ascii(name: &str, faces: &FaceBuffers) -> Vec<u8> {
    let name = solid_name(name);
    let mut out = String::new();
    let _ = writeln!(out, "solid {}", name);
    for (normal, corners) in facets(faces) {
        let _ = writeln!(
            out,
            "  facet normal {:e} {:e} {:e}",
            normal[0], normal[1], normal[2]
        );
        out.push_str("    outer loop\n");
        for v in corners {
            let _ = writeln!(out, "      vertex {:e} {:e} {:e}", v[0], v[1], v[2]);
        }
        out.push_str("    endloop\n  endfacet\n");
    }
    let _ = writeln!(out, "endsolid {}", name);
    out.into_bytes()
}

/// Binary STL: 80-byte header, little-endian triangle count, then one
/// 50-byte record per triangle.
pub fn write_binary(name: &str, faces: &FaceBuffers) -> Vec<u8> {
    let count = faces.triangles.len() / 3;
    let mut data = Vec::with_capacity(HEADER_LEN + 4 + count * TRIANGLE_RECORD_LEN);

    let mut header = [b' '; HEADER_LEN];
    let title = format!("shapeforge STL export: {}", name);
    for (slot, byte) in header.iter_mut().zip(title.bytes().filter(u8::is_ascii)) {
        *slot = byte;
    }
    data.extend_from_slice(&header);
    data.extend_from_slice(&(count as u32).to_le_bytes());

    for (normal, corners) in facets(faces) {
        for component in normal {
            data.extend_from_slice(&component.to_le_bytes());
        }
        for v in corners {
            for component in v {
                data.extend_from_slice(&component.to_le_bytes());
            }
        }
        data.extend_from_slice(&0u16.to_le_bytes());
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modeling::tessellate::tessellate_faces;
    use crate::modeling::{Solid, TessellationParams};

    fn cube_faces() -> FaceBuffers {
        let solid = Solid::make_box(2.0, 2.0, 2.0).unwrap();
        tessellate_faces(&solid, &TessellationParams::new(0.01, 30.0)).unwrap()
    }

    #[test]
    fn test_binary_size_matches_triangle_count() {
        let faces = cube_faces();
        let bytes = write_binary("Cube", &faces);
        assert_eq!(bytes.len(), 84 + 50 * faces.triangle_count());
        assert_eq!(u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]), 12);
        assert!(bytes.starts_with(b"shapeforge STL export: Cube"));
    }

    #[test]
    fn test_ascii_structure() {
        let text = String::from_utf8(write_ascii("My Part", &cube_faces())).unwrap();
        assert!(text.starts_with("solid My_Part\n"));
        assert!(text.trim_end().ends_with("endsolid My_Part"));
        assert_eq!(text.matches("facet normal").count(), 12);
        assert_eq!(text.matches("vertex").count(), 36);
    }

    #[test]
    fn test_degenerate_triangle_gets_default_normal() {
        let n = facet_normal([0.0; 3], [0.0; 3], [0.0; 3]);
        assert_eq!(n, [0.0, 0.0, 1.0]);
    }
}
