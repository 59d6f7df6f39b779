// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Coercion of evaluator output into uniform, named shape descriptors.
//!
//! User code may return a bare shape, an array of shapes, a
//! `#{ shape, name?, color?, opacity?, strokeType? }` map or an array of such
//! maps. Everything else is rejected with [`RenderError::UnsupportedShape`].

use crate::errors::RenderError;
use crate::modeling::Shape;
use crate::render::color::normalize_color;
use rhai::{Array, Dynamic, Map};

pub const DEFAULT_BASE_NAME: &str = "AnyShape";

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeConfig {
    pub shape: Shape,
    pub name: Option<String>,
    pub color: Option<String>,
    pub opacity: Option<f64>,
    pub stroke_type: Option<String>,
}

impl ShapeConfig {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            name: None,
            color: None,
            opacity: None,
            stroke_type: None,
        }
    }
}

/// A shape ready to render: always named, color in `#rrggbb` form.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedShape {
    pub shape: Shape,
    pub name: String,
    pub color: Option<String>,
    pub opacity: Option<f64>,
    pub stroke_type: Option<String>,
}

fn unsupported(index: usize, value: &Dynamic) -> RenderError {
    RenderError::UnsupportedShape {
        index,
        type_name: value.type_name().to_string(),
    }
}

fn string_field(map: &Map, key: &str) -> Option<String> {
    map.get(key)
        .and_then(|value| value.clone().into_string().ok())
}

fn number_field(map: &Map, key: &str) -> Option<f64> {
    let value = map.get(key)?;
    value
        .as_float()
        .ok()
        .or_else(|| value.as_int().ok().map(|int| int as f64))
}

fn shape_config(index: usize, item: Dynamic) -> Result<ShapeConfig, RenderError> {
    let item = match item.try_cast_result::<Map>() {
        Ok(mut map) => {
            let Some(shape) = map.remove("shape") else {
                return Err(unsupported(index, &Dynamic::from_map(map)));
            };
            let shape = shape
                .try_cast_result::<Shape>()
                .map_err(|other| unsupported(index, &other))?;
            return Ok(ShapeConfig {
                shape,
                name: string_field(&map, "name"),
                color: string_field(&map, "color"),
                opacity: number_field(&map, "opacity").map(|o| o.clamp(0.0, 1.0)),
                stroke_type: string_field(&map, "strokeType"),
            });
        }
        Err(item) => item,
    };

    item.try_cast_result::<Shape>()
        .map(ShapeConfig::new)
        .map_err(|other| unsupported(index, &other))
}

/// Coerce the evaluator's return value to a list of shape descriptors.
pub fn coerce_shape_configs(result: Dynamic) -> Result<Vec<ShapeConfig>, RenderError> {
    let items = result
        .try_cast_result::<Array>()
        .unwrap_or_else(|single| vec![single]);
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| shape_config(index, item))
        .collect()
}

/// Name and color the configs. A lone unnamed shape takes the bare base
/// name; with several, unnamed shapes are suffixed with their index.
pub fn normalize_shapes(configs: Vec<ShapeConfig>, base_name: Option<&str>) -> Vec<NormalizedShape> {
    let base_name = base_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(DEFAULT_BASE_NAME);
    let multiple = configs.len() > 1;

    configs
        .into_iter()
        .enumerate()
        .map(|(index, config)| {
            let name = config.name.unwrap_or_else(|| {
                if multiple {
                    format!("{} {}", base_name, index)
                } else {
                    base_name.to_string()
                }
            });
            let (color, opacity) = match config.color {
                Some(color) => {
                    let (hex, opacity) = normalize_color(&color, config.opacity);
                    (Some(hex), opacity)
                }
                None => (None, config.opacity),
            };
            NormalizedShape {
                shape: config.shape,
                name,
                color,
                opacity,
                stroke_type: config.stroke_type,
            }
        })
        .collect()
}

/// Coerce and normalize, then let `hook` rewrite the list before rendering.
pub fn normalize_with<F>(
    result: Dynamic,
    base_name: Option<&str>,
    hook: F,
) -> Result<Vec<NormalizedShape>, RenderError>
where
    F: FnOnce(Vec<NormalizedShape>) -> Vec<NormalizedShape>,
{
    let configs = coerce_shape_configs(result)?;
    Ok(hook(normalize_shapes(configs, base_name)))
}
