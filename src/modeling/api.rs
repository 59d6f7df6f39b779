// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Script bindings for the modeling library.
//!
//! Constructors are registered under bare names (`makeBox(10)`) and as
//! methods of the kernel handle (`k.makeBox(10)`). Geometry is built natively
//! either way; the handle only identifies the bound kernel session, which
//! scripts can read back as `k.variant`. Numeric arguments accept integers or
//! floats. Every modeling failure is thrown into the script as a
//! numeric [`FailureCode`], which the evaluator reports as a kernel error.

use crate::kernel::FailureCode;
use crate::modeling::{Drawing, KernelHandle, Shape, Solid};
use nalgebra::{Point2, Vector3};
use rhai::{Array, Dynamic, Engine, EvalAltResult, Position, INT};

type ApiResult<T> = Result<T, Box<EvalAltResult>>;

pub fn kernel_failure(code: FailureCode) -> Box<EvalAltResult> {
    EvalAltResult::ErrorRuntime(Dynamic::from(code.code() as INT), Position::NONE).into()
}

fn modeled<T>(result: Result<T, FailureCode>) -> ApiResult<T> {
    result.map_err(kernel_failure)
}

fn number(value: &Dynamic) -> ApiResult<f64> {
    if let Ok(float) = value.as_float() {
        return Ok(float);
    }
    value
        .as_int()
        .map(|int| int as f64)
        .map_err(|_| kernel_failure(FailureCode::InvalidArgument))
}

fn numbers(values: &Array) -> ApiResult<Vec<f64>> {
    values.iter().map(number).collect()
}

fn point2(value: &Dynamic) -> ApiResult<Point2<f64>> {
    let coords = value
        .clone()
        .try_cast::<Array>()
        .ok_or_else(|| kernel_failure(FailureCode::InvalidArgument))?;
    match numbers(&coords)?.as_slice() {
        [x, y] => Ok(Point2::new(*x, *y)),
        _ => Err(kernel_failure(FailureCode::InvalidArgument)),
    }
}

fn vector3(values: &Array) -> ApiResult<Vector3<f64>> {
    match numbers(values)?.as_slice() {
        [x, y, z] => Ok(Vector3::new(*x, *y, *z)),
        _ => Err(kernel_failure(FailureCode::InvalidAxis)),
    }
}

fn unsupported<T>() -> ApiResult<T> {
    Err(kernel_failure(FailureCode::UnsupportedOperation))
}

fn make_box(size: &Dynamic) -> ApiResult<Shape> {
    let s = number(size)?;
    modeled(Solid::make_box(s, s, s)).map(Shape::solid)
}

fn make_box3(w: &Dynamic, d: &Dynamic, h: &Dynamic) -> ApiResult<Shape> {
    modeled(Solid::make_box(number(w)?, number(d)?, number(h)?)).map(Shape::solid)
}

fn make_cylinder(radius: &Dynamic, height: &Dynamic) -> ApiResult<Shape> {
    modeled(Solid::cylinder(Point2::origin(), number(radius)?, number(height)?)).map(Shape::solid)
}

fn make_sphere(radius: &Dynamic) -> ApiResult<Shape> {
    modeled(Solid::sphere(number(radius)?)).map(Shape::solid)
}

fn make_compound(items: Array) -> ApiResult<Shape> {
    let shapes = items
        .into_iter()
        .map(|item| match item.try_cast::<Shape>() {
            Some(Shape::Solid(solid)) => Ok(solid),
            _ => Err(kernel_failure(FailureCode::InvalidArgument)),
        })
        .collect::<ApiResult<Vec<_>>>()?;
    modeled(Solid::compound(shapes.iter().map(|s| s.as_ref()))).map(Shape::solid)
}

fn draw_rectangle(width: &Dynamic, height: &Dynamic) -> ApiResult<Shape> {
    modeled(Drawing::rectangle(number(width)?, number(height)?)).map(Shape::drawing)
}

fn draw_circle(radius: &Dynamic) -> ApiResult<Shape> {
    modeled(Drawing::circle(number(radius)?)).map(Shape::drawing)
}

fn draw_polygon(points: Array) -> ApiResult<Shape> {
    let points = points.iter().map(point2).collect::<ApiResult<Vec<_>>>()?;
    modeled(Drawing::polygon(points)).map(Shape::drawing)
}

fn translate2(shape: Shape, x: &Dynamic, y: &Dynamic) -> ApiResult<Shape> {
    let (x, y) = (number(x)?, number(y)?);
    match shape {
        Shape::Solid(solid) => modeled(solid.translate(x, y, 0.0)).map(Shape::solid),
        Shape::Drawing(drawing) => modeled(drawing.translate(x, y)).map(Shape::drawing),
    }
}

fn translate3(shape: Shape, x: &Dynamic, y: &Dynamic, z: &Dynamic) -> ApiResult<Shape> {
    match shape {
        Shape::Solid(solid) => {
            modeled(solid.translate(number(x)?, number(y)?, number(z)?)).map(Shape::solid)
        }
        Shape::Drawing(_) => unsupported(),
    }
}

fn rotate(shape: Shape, degrees: &Dynamic) -> ApiResult<Shape> {
    let degrees = number(degrees)?;
    match shape {
        Shape::Solid(solid) => modeled(solid.rotate(degrees, Vector3::z())).map(Shape::solid),
        Shape::Drawing(drawing) => modeled(drawing.rotate(degrees)).map(Shape::drawing),
    }
}

fn rotate_about(shape: Shape, degrees: &Dynamic, axis: &Array) -> ApiResult<Shape> {
    match shape {
        Shape::Solid(solid) => {
            modeled(solid.rotate(number(degrees)?, vector3(axis)?)).map(Shape::solid)
        }
        Shape::Drawing(_) => unsupported(),
    }
}

fn scale(shape: Shape, factor: &Dynamic) -> ApiResult<Shape> {
    let factor = number(factor)?;
    match shape {
        Shape::Solid(solid) => modeled(solid.scale(factor)).map(Shape::solid),
        Shape::Drawing(drawing) => modeled(drawing.scale(factor)).map(Shape::drawing),
    }
}

fn extrude(shape: Shape, height: &Dynamic) -> ApiResult<Shape> {
    match shape {
        Shape::Drawing(drawing) => modeled(drawing.extrude(number(height)?)).map(Shape::solid),
        Shape::Solid(_) => unsupported(),
    }
}

fn combine(shape: Shape, other: Shape) -> ApiResult<Shape> {
    match (shape, other) {
        (Shape::Drawing(a), Shape::Drawing(b)) => Ok(Shape::drawing(a.combine(&b))),
        (Shape::Solid(a), Shape::Solid(b)) => {
            modeled(Solid::compound([a.as_ref(), b.as_ref()])).map(Shape::solid)
        }
        _ => unsupported(),
    }
}

/// Register the shape types, constructors and shape methods on `engine`.
pub fn register(engine: &mut Engine) {
    engine
        .register_type_with_name::<Shape>("Shape")
        .register_type_with_name::<KernelHandle>("Kernel")
        .register_get("kind", |shape: &mut Shape| shape.type_name().to_string())
        .register_get("variant", |kernel: &mut KernelHandle| {
            kernel.variant().as_str().to_string()
        });

    engine
        .register_fn("makeBox", |size: Dynamic| make_box(&size))
        .register_fn("makeBox", |w: Dynamic, d: Dynamic, h: Dynamic| {
            make_box3(&w, &d, &h)
        })
        .register_fn("makeCylinder", |r: Dynamic, h: Dynamic| make_cylinder(&r, &h))
        .register_fn("makeSphere", |r: Dynamic| make_sphere(&r))
        .register_fn("makeCompound", make_compound)
        .register_fn("drawRectangle", |w: Dynamic, h: Dynamic| {
            draw_rectangle(&w, &h)
        })
        .register_fn("drawCircle", |r: Dynamic| draw_circle(&r))
        .register_fn("drawPolygon", draw_polygon);

    engine
        .register_fn("makeBox", |_: KernelHandle, size: Dynamic| make_box(&size))
        .register_fn(
            "makeBox",
            |_: KernelHandle, w: Dynamic, d: Dynamic, h: Dynamic| make_box3(&w, &d, &h),
        )
        .register_fn("makeCylinder", |_: KernelHandle, r: Dynamic, h: Dynamic| {
            make_cylinder(&r, &h)
        })
        .register_fn("makeSphere", |_: KernelHandle, r: Dynamic| make_sphere(&r))
        .register_fn("makeCompound", |_: KernelHandle, items: Array| {
            make_compound(items)
        })
        .register_fn("drawRectangle", |_: KernelHandle, w: Dynamic, h: Dynamic| {
            draw_rectangle(&w, &h)
        })
        .register_fn("drawCircle", |_: KernelHandle, r: Dynamic| draw_circle(&r))
        .register_fn("drawPolygon", |_: KernelHandle, points: Array| {
            draw_polygon(points)
        });

    engine
        .register_fn("translate", |s: Shape, x: Dynamic, y: Dynamic| {
            translate2(s, &x, &y)
        })
        .register_fn(
            "translate",
            |s: Shape, x: Dynamic, y: Dynamic, z: Dynamic| translate3(s, &x, &y, &z),
        )
        .register_fn("rotate", |s: Shape, deg: Dynamic| rotate(s, &deg))
        .register_fn("rotate", |s: Shape, deg: Dynamic, axis: Array| {
            rotate_about(s, &deg, &axis)
        })
        .register_fn("scale", |s: Shape, f: Dynamic| scale(s, &f))
        .register_fn("extrude", |s: Shape, h: Dynamic| extrude(s, &h))
        .register_fn("combine", combine);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Engine {
        let mut engine = Engine::new();
        register(&mut engine);
        engine
    }

    fn thrown_code(err: Box<EvalAltResult>) -> Option<INT> {
        match *err {
            EvalAltResult::ErrorRuntime(value, _) => value.as_int().ok(),
            _ => None,
        }
    }

    #[test]
    fn test_constructors_accept_ints_and_floats() {
        let engine = engine();
        let shape = engine.eval::<Shape>("makeBox(1, 2.5, 3)").unwrap();
        assert_eq!(shape.as_solid().unwrap().faces().len(), 6);

        let drawing = engine
            .eval::<Shape>("drawPolygon([[0, 0], [1.0, 0], [0, 1]]).translate(1, 1)")
            .unwrap();
        assert_eq!(drawing.type_name(), "Drawing");
    }

    #[test]
    fn test_method_chain_builds_solid() {
        let engine = engine();
        let shape = engine
            .eval::<Shape>("drawRectangle(4, 2).extrude(3).rotate(90, [1, 0, 0]).scale(2)")
            .unwrap();
        assert!(shape.as_solid().is_some());
    }

    #[test]
    fn test_modeling_failures_throw_codes() {
        let engine = engine();
        let err = engine.eval::<Shape>("makeBox(-1)").unwrap_err();
        assert_eq!(thrown_code(err), Some(1));

        let err = engine.eval::<Shape>("makeCompound([])").unwrap_err();
        assert_eq!(thrown_code(err), Some(4));

        let err = engine
            .eval::<Shape>("makeBox(1).rotate(45, [0, 0, 0])")
            .unwrap_err();
        assert_eq!(thrown_code(err), Some(6));

        let err = engine.eval::<Shape>("makeBox(1).extrude(2)").unwrap_err();
        assert_eq!(thrown_code(err), Some(7));

        let err = engine.eval::<Shape>("makeBox(\"big\")").unwrap_err();
        assert_eq!(thrown_code(err), Some(2));
    }

    #[test]
    fn test_shapes_on_constants() {
        let engine = engine();
        let shape = engine
            .eval::<Shape>("const base = makeCylinder(1, 2); base.translate(0, 0, 5)")
            .unwrap();
        assert!(shape.as_solid().is_some());
    }
}
