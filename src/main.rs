// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::{anyhow, bail, Context};
use serde_json::Value;
use shapeforge::config::{load_and_validate_config, Config};
use shapeforge::export::ExportFormat;
use shapeforge::kernel::{KernelVariant, WasmKernelLoader};
use shapeforge::render::GeometryResult;
use shapeforge::traits::WorkerRpc;
use shapeforge::worker::{Parameters, RpcResponse, WorkerHandle};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: shapeforge <model.rhai> [--config file.yaml] [--param key=value]... \
[--exceptions] [--export <format> --out <dir>] [--json]";

#[derive(Debug, Default)]
struct CliArgs {
    model: PathBuf,
    config: Option<PathBuf>,
    params: Parameters,
    exceptions: bool,
    export: Option<ExportFormat>,
    out: Option<PathBuf>,
    json: bool,
}

/// Parameter values are read as JSON when they parse, otherwise as strings.
fn parse_param(pair: &str) -> anyhow::Result<(String, Value)> {
    let (key, raw) = pair
        .split_once('=')
        .ok_or_else(|| anyhow!("--param expects key=value, got '{}'", pair))?;
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

fn parse_args(args: &[String]) -> anyhow::Result<CliArgs> {
    let mut parsed = CliArgs::default();
    let mut model = None;
    let mut iter = args.iter().skip(1);

    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| anyhow!("{} requires a value", flag))
        };
        match arg.as_str() {
            "--config" => parsed.config = Some(PathBuf::from(value("--config")?)),
            "--param" => {
                let (key, value) = parse_param(&value("--param")?)?;
                parsed.params.insert(key, value);
            }
            "--exceptions" => parsed.exceptions = true,
            "--export" => parsed.export = Some(value("--export")?.parse()?),
            "--out" => parsed.out = Some(PathBuf::from(value("--out")?)),
            "--json" => parsed.json = true,
            flag if flag.starts_with("--") => bail!("Unknown option '{}'\n{}", flag, USAGE),
            path => model = Some(PathBuf::from(path)),
        }
    }

    parsed.model = model.ok_or_else(|| anyhow!(USAGE))?;
    if parsed.export.is_some() && parsed.out.is_none() {
        bail!("--export requires --out <dir>");
    }
    Ok(parsed)
}

fn describe(geometry: &GeometryResult) -> String {
    match geometry {
        GeometryResult::Mesh(mesh) => format!(
            "🧊 {} (3d): {} triangles, {} edges",
            mesh.name,
            mesh.faces.triangle_count(),
            mesh.edges.edge_groups.len()
        ),
        GeometryResult::Svg(svg) => format!(
            "✏️  {} (2d): {} paths, viewBox {}",
            svg.name,
            svg.paths.len(),
            svg.viewbox
        ),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let cli = parse_args(&args)?;

    let config = match &cli.config {
        Some(path) => load_and_validate_config(path)
            .with_context(|| format!("Loading {}", path.display()))?,
        None => Config::default(),
    };
    let code = std::fs::read_to_string(&cli.model)
        .with_context(|| format!("Reading {}", cli.model.display()))?;

    let loader = Arc::new(WasmKernelLoader::from_config(&config.kernel));
    let worker = WorkerHandle::spawn(Arc::new(config.clone()), loader)?;
    let variant = worker
        .initialize(cli.exceptions || config.kernel.exceptions)
        .await?;

    let start = Instant::now();
    let result = worker
        .build_shapes_from_code(code, cli.params.clone())
        .await?;
    let elapsed = start.elapsed();

    if cli.json {
        let response = RpcResponse::from(result.clone());
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("📋 Model: {}", cli.model.display());
        println!(
            "🔧 Kernel: {}",
            if variant == KernelVariant::WithExceptions {
                "withExceptions (diagnostic)"
            } else {
                "single"
            }
        );
        println!("⏱️  Build Time: {:?}", elapsed);
    }

    let geometry = match result {
        Ok(geometry) => geometry,
        Err(err) => {
            worker.terminate();
            if cli.json {
                std::process::exit(1);
            }
            let location = format!("{}:{}", err.start_line_number, err.start_column);
            bail!(
                "Build failed at {}: {}",
                location,
                err.stack.as_deref().unwrap_or(&err.message)
            );
        }
    };

    if !cli.json {
        println!("\n📊 Shapes: {}", geometry.len());
        for item in &geometry {
            println!("   {}", describe(item));
        }
    }

    if let (Some(format), Some(out)) = (cli.export, &cli.out) {
        let artifacts = worker.export_shape(format, None, None).await?;
        std::fs::create_dir_all(out)
            .with_context(|| format!("Creating {}", out.display()))?;
        for artifact in &artifacts {
            let path = out.join(artifact.file_name(format));
            std::fs::write(&path, &artifact.blob)
                .with_context(|| format!("Writing {}", path.display()))?;
            if !cli.json {
                println!("💾 Wrote {} ({} bytes)", path.display(), artifact.blob.len());
            }
        }
    }

    worker.terminate();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("shapeforge")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_full_command_line() {
        let cli = parse_args(&args(&[
            "model.rhai",
            "--param",
            "size=10",
            "--param",
            "label=plate",
            "--exceptions",
            "--export",
            "stp",
            "--out",
            "build",
        ]))
        .unwrap();

        assert_eq!(cli.model, PathBuf::from("model.rhai"));
        assert_eq!(cli.params["size"], 10);
        assert_eq!(cli.params["label"], "plate");
        assert!(cli.exceptions);
        assert_eq!(cli.export, Some(ExportFormat::Step));
        assert_eq!(cli.out, Some(PathBuf::from("build")));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse_args(&args(&[])).is_err());
        assert!(parse_args(&args(&["m.rhai", "--param", "novalue"])).is_err());
        assert!(parse_args(&args(&["m.rhai", "--export", "stl"])).is_err());
        assert!(parse_args(&args(&["m.rhai", "--frobnicate"])).is_err());
    }
}
