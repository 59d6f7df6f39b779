// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! STEP (ISO 10303-21, AP214) writer.
//!
//! Bodies are written as faceted B-reps: every triangle of the tessellation
//! becomes a `FACE` bounded by a `POLY_LOOP`. Coincident vertices are shared
//! within a body.

use crate::modeling::FaceBuffers;
use std::collections::HashMap;
use std::fmt::Write;

/// A named, tessellated body to place in the file.
pub struct StepBody<'a> {
    pub name: &'a str,
    pub faces: &'a FaceBuffers,
}

/// Quote a string for a STEP literal. Non-ASCII characters are replaced.
fn step_string(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('\'');
    for c in text.chars() {
        match c {
            '\'' => quoted.push_str("''"),
            '\\' => quoted.push_str("\\\\"),
            c if c.is_ascii() && !c.is_ascii_control() => quoted.push(c),
            _ => quoted.push('_'),
        }
    }
    quoted.push('\'');
    quoted
}

fn refs(ids: &[u64]) -> String {
    ids.iter()
        .map(|id| format!("#{id}"))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn write_cartesian_point(p: [f32; 3]) -> String {
    format!(
        "CARTESIAN_POINT('',({:.15E},{:.15E},{:.15E}))",
        p[0] as f64, p[1] as f64, p[2] as f64
    )
}

pub fn write_poly_loop(point_ids: &[u64]) -> String {
    format!("POLY_LOOP('',({}))", refs(point_ids))
}

pub fn write_face_outer_bound(loop_id: u64) -> String {
    format!("FACE_OUTER_BOUND('',#{},.T.)", loop_id)
}

pub fn write_face(bound_id: u64) -> String {
    format!("FACE('',(#{}))", bound_id)
}

pub fn write_closed_shell(face_ids: &[u64]) -> String {
    format!("CLOSED_SHELL('',({}))", refs(face_ids))
}

pub fn write_faceted_brep(name: &str, shell_id: u64) -> String {
    format!("FACETED_BREP({},#{})", step_string(name), shell_id)
}

/// Accumulates numbered entity instances for the DATA section.
struct StepWriter {
    next_id: u64,
    data: String,
}

impl StepWriter {
    fn new() -> Self {
        Self {
            next_id: 1,
            data: String::new(),
        }
    }

    fn add(&mut self, entity: impl AsRef<str>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let _ = writeln!(self.data, "#{}={};", id, entity.as_ref());
        id
    }

    fn write_body(&mut self, body: &StepBody<'_>) -> u64 {
        let mut points: HashMap<[u32; 3], u64> = HashMap::new();
        let mut face_ids = Vec::with_capacity(body.faces.triangle_count());

        for tri in body.faces.triangles.chunks_exact(3) {
            let corners: Vec<u64> = tri
                .iter()
                .map(|&index| {
                    let p = body.faces.vertex(index);
                    let key = p.map(f32::to_bits);
                    match points.get(&key) {
                        Some(&id) => id,
                        None => {
                            let id = self.add(write_cartesian_point(p));
                            points.insert(key, id);
                            id
                        }
                    }
                })
                .collect();
            let loop_id = self.add(write_poly_loop(&corners));
            let bound_id = self.add(write_face_outer_bound(loop_id));
            face_ids.push(self.add(write_face(bound_id)));
        }

        let shell_id = self.add(write_closed_shell(&face_ids));
        self.add(write_faceted_brep(body.name, shell_id))
    }

    /// Units, tolerances and the application context shared by every product.
    fn write_context(&mut self) -> (u64, u64) {
        let application = self.add("APPLICATION_CONTEXT('automotive design')");
        self.add(format!(
            "APPLICATION_PROTOCOL_DEFINITION('international standard','automotive_design',2000,#{})",
            application
        ));
        let length = self.add("(LENGTH_UNIT()NAMED_UNIT(*)SI_UNIT(.MILLI.,.METRE.))");
        let angle = self.add("(NAMED_UNIT(*)PLANE_ANGLE_UNIT()SI_UNIT($,.RADIAN.))");
        let solid_angle = self.add("(NAMED_UNIT(*)SI_UNIT($,.STERADIAN.)SOLID_ANGLE_UNIT())");
        let uncertainty = self.add(format!(
            "UNCERTAINTY_MEASURE_WITH_UNIT(LENGTH_MEASURE(1.E-07),#{},'distance_accuracy_value','confusion accuracy')",
            length
        ));
        let context = self.add(format!(
            "(GEOMETRIC_REPRESENTATION_CONTEXT(3)GLOBAL_UNCERTAINTY_ASSIGNED_CONTEXT((#{}))\
GLOBAL_UNIT_ASSIGNED_CONTEXT((#{},#{},#{}))REPRESENTATION_CONTEXT('',''))",
            uncertainty, length, angle, solid_angle
        ));
        (application, context)
    }

    fn write_product(&mut self, name: &str, bodies: &[StepBody<'_>], application: u64, context: u64) {
        let name = step_string(name);
        let product_context = self.add(format!("PRODUCT_CONTEXT('',#{},'mechanical')", application));
        let product = self.add(format!("PRODUCT({0},{0},'',(#{1}))", name, product_context));
        let formation = self.add(format!("PRODUCT_DEFINITION_FORMATION('','',#{})", product));
        let definition_context = self.add(format!(
            "PRODUCT_DEFINITION_CONTEXT('part definition',#{},'design')",
            application
        ));
        let definition = self.add(format!(
            "PRODUCT_DEFINITION('design','',#{},#{})",
            formation, definition_context
        ));
        let shape = self.add(format!("PRODUCT_DEFINITION_SHAPE('','',#{})", definition));

        let breps: Vec<u64> = bodies.iter().map(|body| self.write_body(body)).collect();
        let representation = self.add(format!(
            "FACETED_BREP_SHAPE_REPRESENTATION({},({}),#{})",
            name,
            refs(&breps),
            context
        ));
        self.add(format!(
            "SHAPE_DEFINITION_REPRESENTATION(#{},#{})",
            shape, representation
        ));
    }

    fn finish(self, file_name: &str) -> Vec<u8> {
        let mut out = String::with_capacity(self.data.len() + 512);
        out.push_str("ISO-10303-21;\nHEADER;\n");
        out.push_str("FILE_DESCRIPTION(('shapeforge export'),'2;1');\n");
        let _ = writeln!(
            out,
            "FILE_NAME({},'',(''),(''),'shapeforge','shapeforge','');",
            step_string(file_name)
        );
        out.push_str("FILE_SCHEMA(('AUTOMOTIVE_DESIGN { 1 0 10303 214 1 1 1 1 }'));\n");
        out.push_str("ENDSEC;\nDATA;\n");
        out.push_str(&self.data);
        out.push_str("ENDSEC;\nEND-ISO-10303-21;\n");
        out.into_bytes()
    }
}

/// Write `bodies` as a single product. One body gives a part file, several
/// give a multi-body assembly.
pub fn write_step(name: &str, bodies: &[StepBody<'_>]) -> Vec<u8> {
    let mut writer = StepWriter::new();
    let (application, context) = writer.write_context();
    writer.write_product(name, bodies, application, context);
    writer.finish(&format!("{}.step", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modeling::tessellate::tessellate_faces;
    use crate::modeling::{Solid, TessellationParams};

    fn cube_faces() -> FaceBuffers {
        let solid = Solid::make_box(1.0, 1.0, 1.0).unwrap();
        tessellate_faces(&solid, &TessellationParams::new(0.01, 30.0)).unwrap()
    }

    #[test]
    fn test_part_file_structure() {
        let faces = cube_faces();
        let text = String::from_utf8(write_step(
            "Cube",
            &[StepBody {
                name: "Cube",
                faces: &faces,
            }],
        ))
        .unwrap();
        assert!(text.starts_with("ISO-10303-21;\nHEADER;"));
        assert!(text.ends_with("END-ISO-10303-21;\n"));
        assert_eq!(text.matches("=FACE(").count(), 12);
        assert_eq!(text.matches("FACETED_BREP('Cube'").count(), 1);
        // A box has eight distinct corners.
        assert_eq!(text.matches("CARTESIAN_POINT").count(), 8);
    }

    #[test]
    fn test_assembly_holds_every_body() {
        let faces = cube_faces();
        let bodies = [
            StepBody { name: "A", faces: &faces },
            StepBody { name: "B", faces: &faces },
        ];
        let text = String::from_utf8(write_step("Assembly", &bodies)).unwrap();
        assert_eq!(text.matches("FACETED_BREP(").count(), 2);
        assert_eq!(text.matches("CLOSED_SHELL").count(), 2);
        assert_eq!(text.matches("SHAPE_DEFINITION_REPRESENTATION").count(), 1);
    }

    #[test]
    fn test_names_are_quoted() {
        assert_eq!(step_string("Bob's part"), "'Bob''s part'");
        assert_eq!(step_string("caf\u{e9}"), "'caf_'");
    }
}
