//! layerstack - image tarball assembly CLI
//!
//! Thin command layer over the library: flag parsing, `@file` value
//! resolution, and exit codes live here; all archive and manifest semantics
//! live in the library.
//!
//! ## Usage
//!
//! ```sh
//! layerstack assemble --output out.tar --image a.tar --image b.tar
//! layerstack create --output out.tar --id @id.txt --config cfg.json \
//!     --layer @sha.txt=layer.tar --tag repo/app:latest [--base base.tar]
//! layerstack fix --output out.tar --src layer.tar --rename /opt:/usr/opt
//! layerstack extract manifest.json config.out layers.out
//! layerstack image-config --output cfg.json --base parent.json \
//!     --layer <sha256> --env PATH=/bin --port 80
//! ```

use layerstack::config::load_parent_image;
use layerstack::{
    AssembleOptions, CreateOptions, ImagePatch, LayerFile, RenameRule, RewriteOptions,
    assemble_image, create_image, parse_manifest, rewrite_layer, write_image,
};
use std::path::PathBuf;
use std::process::ExitCode;

// =============================================================================
// CLI Parsing
// =============================================================================

#[derive(Debug)]
enum Command {
    Assemble {
        output: PathBuf,
        images: Vec<PathBuf>,
    },
    Create {
        output: PathBuf,
        id: String,
        config: PathBuf,
        layers: Vec<(String, PathBuf)>,
        tags: Vec<String>,
        base: Option<PathBuf>,
    },
    Fix {
        output: PathBuf,
        src: PathBuf,
        renames: Vec<String>,
    },
    Extract {
        manifest: PathBuf,
        config_out: PathBuf,
        layers_out: PathBuf,
    },
    ImageConfig {
        output: PathBuf,
        base: Option<PathBuf>,
        layers: Vec<String>,
        user: Option<String>,
        ports: Vec<String>,
        env: Vec<String>,
        entrypoint: Vec<String>,
        command: Vec<String>,
        volumes: Vec<String>,
        working_dir: Option<String>,
        labels: Vec<String>,
    },
    Version,
    Help,
}

fn flag_value(args: &[String], i: &mut usize, flag: &str) -> Result<String, String> {
    if *i + 1 < args.len() {
        let value = args[*i + 1].clone();
        *i += 2;
        Ok(value)
    } else {
        Err(format!("{} requires a value", flag))
    }
}

fn required<T>(value: Option<T>, flag: &str, cmd: &str) -> Result<T, String> {
    value.ok_or_else(|| format!("{} requires {}", cmd, flag))
}

fn parse_args() -> Result<Command, String> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        return Ok(Command::Help);
    }

    match args[1].as_str() {
        "assemble" => {
            let mut output = None;
            let mut images = Vec::new();
            let mut i = 2;
            while i < args.len() {
                match args[i].as_str() {
                    "--output" | "-o" => {
                        output = Some(PathBuf::from(flag_value(&args, &mut i, "--output")?));
                    }
                    "--image" => {
                        images.push(PathBuf::from(flag_value(&args, &mut i, "--image")?));
                    }
                    unknown => return Err(format!("unknown flag: {}", unknown)),
                }
            }
            Ok(Command::Assemble {
                output: required(output, "--output", "assemble")?,
                images,
            })
        }
        "create" => {
            let mut output = None;
            let mut id = None;
            let mut config = None;
            let mut layers = Vec::new();
            let mut tags = Vec::new();
            let mut base = None;
            let mut i = 2;
            while i < args.len() {
                match args[i].as_str() {
                    "--output" | "-o" => {
                        output = Some(PathBuf::from(flag_value(&args, &mut i, "--output")?));
                    }
                    "--id" => {
                        id = Some(resolve_value(&flag_value(&args, &mut i, "--id")?)?);
                    }
                    "--config" => {
                        config = Some(PathBuf::from(flag_value(&args, &mut i, "--config")?));
                    }
                    "--layer" => {
                        let spec = flag_value(&args, &mut i, "--layer")?;
                        let (name, path) = spec
                            .split_once('=')
                            .ok_or_else(|| format!("--layer value '{}' must be name=path", spec))?;
                        layers.push((resolve_value(name)?, PathBuf::from(path)));
                    }
                    "--tag" => {
                        tags.push(flag_value(&args, &mut i, "--tag")?);
                    }
                    "--base" => {
                        base = Some(PathBuf::from(flag_value(&args, &mut i, "--base")?));
                    }
                    unknown => return Err(format!("unknown flag: {}", unknown)),
                }
            }
            Ok(Command::Create {
                output: required(output, "--output", "create")?,
                id: required(id, "--id", "create")?,
                config: required(config, "--config", "create")?,
                layers,
                tags,
                base,
            })
        }
        "fix" => {
            let mut output = None;
            let mut src = None;
            let mut renames = Vec::new();
            let mut i = 2;
            while i < args.len() {
                match args[i].as_str() {
                    "--output" | "-o" => {
                        output = Some(PathBuf::from(flag_value(&args, &mut i, "--output")?));
                    }
                    "--src" => {
                        src = Some(PathBuf::from(flag_value(&args, &mut i, "--src")?));
                    }
                    "--rename" => {
                        renames.push(flag_value(&args, &mut i, "--rename")?);
                    }
                    unknown => return Err(format!("unknown flag: {}", unknown)),
                }
            }
            Ok(Command::Fix {
                output: required(output, "--output", "fix")?,
                src: required(src, "--src", "fix")?,
                renames,
            })
        }
        "extract" => {
            if args.len() < 5 {
                return Err("extract requires <manifest> <config-out> <layers-out>".to_string());
            }
            Ok(Command::Extract {
                manifest: PathBuf::from(&args[2]),
                config_out: PathBuf::from(&args[3]),
                layers_out: PathBuf::from(&args[4]),
            })
        }
        "image-config" => {
            let mut output = None;
            let mut base = None;
            let mut layers = Vec::new();
            let mut user = None;
            let mut ports = Vec::new();
            let mut env = Vec::new();
            let mut entrypoint = Vec::new();
            let mut command = Vec::new();
            let mut volumes = Vec::new();
            let mut working_dir = None;
            let mut labels = Vec::new();
            let mut i = 2;
            while i < args.len() {
                match args[i].as_str() {
                    "--output" | "-o" => {
                        output = Some(PathBuf::from(flag_value(&args, &mut i, "--output")?));
                    }
                    "--base" => {
                        base = Some(PathBuf::from(flag_value(&args, &mut i, "--base")?));
                    }
                    "--layer" => {
                        layers.push(resolve_value(&flag_value(&args, &mut i, "--layer")?)?);
                    }
                    "--user" => user = Some(flag_value(&args, &mut i, "--user")?),
                    "--port" => ports.push(flag_value(&args, &mut i, "--port")?),
                    "--env" => env.push(flag_value(&args, &mut i, "--env")?),
                    "--entry-point" => entrypoint.push(flag_value(&args, &mut i, "--entry-point")?),
                    "--command" => command.push(flag_value(&args, &mut i, "--command")?),
                    "--volume" => volumes.push(flag_value(&args, &mut i, "--volume")?),
                    "--working-dir" => working_dir = Some(flag_value(&args, &mut i, "--working-dir")?),
                    "--label" => labels.push(flag_value(&args, &mut i, "--label")?),
                    unknown => return Err(format!("unknown flag: {}", unknown)),
                }
            }
            Ok(Command::ImageConfig {
                output: required(output, "--output", "image-config")?,
                base,
                layers,
                user,
                ports,
                env,
                entrypoint,
                command,
                volumes,
                working_dir,
                labels,
            })
        }
        "version" | "--version" | "-v" => Ok(Command::Version),
        "help" | "--help" | "-h" => Ok(Command::Help),
        unknown => Err(format!("unknown command: {}", unknown)),
    }
}

/// Resolves a flag value that may be an indirect file reference (`@path`).
fn resolve_value(value: &str) -> Result<String, String> {
    match value.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .map(|contents| contents.trim().to_string())
            .map_err(|e| format!("cannot read {}: {}", path, e)),
        None => Ok(value.to_string()),
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

fn cmd_assemble(output: PathBuf, images: Vec<PathBuf>) -> Result<(), String> {
    assemble_image(&AssembleOptions { output, images }).map_err(|e| e.to_string())
}

fn cmd_create(
    output: PathBuf,
    id: String,
    config: PathBuf,
    layers: Vec<(String, PathBuf)>,
    tags: Vec<String>,
    base: Option<PathBuf>,
) -> Result<(), String> {
    let layers = layers
        .into_iter()
        .map(|(name, path)| LayerFile { name, path })
        .collect();
    create_image(&CreateOptions {
        output,
        identifier: id,
        layers,
        config,
        tags,
        base,
    })
    .map_err(|e| e.to_string())
}

fn cmd_fix(output: PathBuf, src: PathBuf, renames: Vec<String>) -> Result<(), String> {
    // Rules are validated before any archive is opened.
    let renames = renames
        .iter()
        .map(|rule| RenameRule::parse(rule))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;
    rewrite_layer(&RewriteOptions {
        output,
        source: src,
        renames,
    })
    .map_err(|e| e.to_string())
}

fn cmd_extract(manifest: PathBuf, config_out: PathBuf, layers_out: PathBuf) -> Result<(), String> {
    parse_manifest(&manifest, &config_out, &layers_out).map_err(|e| e.to_string())
}

#[allow(clippy::too_many_arguments)]
fn cmd_image_config(
    output: PathBuf,
    base: Option<PathBuf>,
    layers: Vec<String>,
    user: Option<String>,
    ports: Vec<String>,
    env: Vec<String>,
    entrypoint: Vec<String>,
    command: Vec<String>,
    volumes: Vec<String>,
    working_dir: Option<String>,
    labels: Vec<String>,
) -> Result<(), String> {
    let parent = load_parent_image(base.as_deref()).map_err(|e| e.to_string())?;
    let patch = ImagePatch {
        layers,
        user,
        ports,
        env,
        entrypoint,
        command,
        volumes,
        working_dir,
        labels,
    };
    let image = patch.apply(parent);
    write_image(&image, &output).map_err(|e| e.to_string())
}

fn cmd_version() {
    println!("layerstack version {}", env!("CARGO_PKG_VERSION"));
}

fn cmd_help() {
    println!(
        r#"layerstack - compose Docker/OCI image tarballs from pre-built layers

USAGE:
    layerstack <command> [options]

COMMANDS:
    assemble --output <file> --image <tar>...
        Merge partial image tarballs into one image

    create --output <file> --id <id|@file> --config <json>
           [--layer <name|@file>=<tar>]... [--tag <repo:tag>]... [--base <tar>]
        Build an image from a config and new layers, optionally on a base

    fix --output <file> --src <tar> [--rename <prefix>:<replacement>]...
        Rewrite entry paths inside a layer tarball

    extract <manifest> <config-out> <layers-out>
        Write an OCI manifest's config digest and layer digests to files

    image-config --output <json> [--base <json>] [--layer <sha256>]...
                 [--user <u>] [--port <p>]... [--env <k=v>]...
                 [--entry-point <arg>]... [--command <arg>]...
                 [--volume <path>]... [--working-dir <dir>] [--label <k=v>]...
        Derive a child image configuration from a parent

    version    Show version info
    help       Show this help

Values marked <x|@file> may name a file whose contents supply the value.
"#
    );
}

// =============================================================================
// Main
// =============================================================================

fn main() -> ExitCode {
    match parse_args() {
        Ok(cmd) => {
            let result = match cmd {
                Command::Assemble { output, images } => cmd_assemble(output, images),
                Command::Create {
                    output,
                    id,
                    config,
                    layers,
                    tags,
                    base,
                } => cmd_create(output, id, config, layers, tags, base),
                Command::Fix {
                    output,
                    src,
                    renames,
                } => cmd_fix(output, src, renames),
                Command::Extract {
                    manifest,
                    config_out,
                    layers_out,
                } => cmd_extract(manifest, config_out, layers_out),
                Command::ImageConfig {
                    output,
                    base,
                    layers,
                    user,
                    ports,
                    env,
                    entrypoint,
                    command,
                    volumes,
                    working_dir,
                    labels,
                } => cmd_image_config(
                    output,
                    base,
                    layers,
                    user,
                    ports,
                    env,
                    entrypoint,
                    command,
                    volumes,
                    working_dir,
                    labels,
                ),
                Command::Version => {
                    cmd_version();
                    Ok(())
                }
                Command::Help => {
                    cmd_help();
                    Ok(())
                }
            };

            match result {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("error: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
        Err(e) => {
            eprintln!("error: {}", e);
            cmd_help();
            ExitCode::FAILURE
        }
    }
}
