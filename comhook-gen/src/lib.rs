//! comhook-gen: C++ hook layer generator for COM interface declarations.
//!
//! Scans headers that declare COM interfaces with the
//! `DECLARE_INTERFACE_`/`STDMETHOD` macros (or their expanded
//! `Name : public Parent` form) and emits hook proxy classes, vtable mirrors
//! with per-slot trampolines, call-ID tables, an interface registry and a
//! factory list.
//!
//! # Quick start
//!
//! Generate and write every artifact from a config:
//!
//! ```no_run
//! use std::path::Path;
//!
//! // Reads config TOML, scans headers, writes the generated files.
//! let summary = comhook_gen::run(Path::new("comhook.toml"), None, None).unwrap();
//! println!("{} files written", summary.written.len());
//! ```
//!
//! Or keep the artifacts in memory:
//!
//! ```no_run
//! use std::path::Path;
//!
//! let generation = comhook_gen::generate(Path::new("comhook.toml")).unwrap();
//! for artifact in generation.artifacts.iter() {
//!     println!("{}: {} bytes", artifact.file_name, artifact.contents.len());
//! }
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{error, info, warn};

pub mod builder;
pub mod callid;
pub mod config;
pub mod emit;
pub mod error;
pub mod model;
pub mod param;
pub mod scan;

use builder::{BuildContext, BuildOptions};
use emit::{Artifacts, EmitOptions, HeaderInterfaces};
use error::{BuildError, ScanError};
use model::ROOT_INTERFACE;

/// An interface that was selected but could not be scanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedInterface {
    pub header: PathBuf,
    pub interface: String,
    pub reason: ScanError,
}

/// Result of one generation pass.
#[derive(Debug)]
pub struct Generation {
    pub artifacts: Artifacts,
    /// Interfaces left out because of scan errors.
    pub skipped: Vec<SkippedInterface>,
}

/// Result of [`run`].
#[derive(Debug)]
pub struct RunSummary {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<SkippedInterface>,
}

/// Run the full pipeline: load config, scan headers, emit every artifact and
/// write them into the output directory.
///
/// `output_dir` overrides `[output] dir`, `sdk_root` overrides the configured
/// SDK root.
pub fn run(
    config_path: &Path,
    output_dir: Option<&Path>,
    sdk_root: Option<&Path>,
) -> Result<RunSummary> {
    let cfg = config::load_config(config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    let generation = generate_from_config(&cfg, base_dir, sdk_root)?;

    let dir = match output_dir {
        Some(p) => p.to_path_buf(),
        None => base_dir.join(&cfg.output.dir),
    };
    let written = write_artifacts(&generation.artifacts, &dir)?;

    info!(
        dir = %dir.display(),
        files = written.len(),
        skipped = generation.skipped.len(),
        "wrote artifacts"
    );

    Ok(RunSummary {
        written,
        skipped: generation.skipped,
    })
}

/// Load a `comhook.toml` config file and generate the artifacts without
/// writing to disk.
pub fn generate(config_path: &Path) -> Result<Generation> {
    let cfg = config::load_config(config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    generate_from_config(&cfg, base_dir, None)
}

/// A header read into memory.
struct ScannedHeader {
    config_path: PathBuf,
    lines: Vec<String>,
    declared: Vec<String>,
    selected: Vec<String>,
}

/// Generate the artifacts from an already-loaded [`config::Config`].
///
/// `base_dir` is the directory relative to which paths in the config are
/// resolved (typically the parent directory of the TOML file).
pub fn generate_from_config(
    cfg: &config::Config,
    base_dir: &Path,
    sdk_root_override: Option<&Path>,
) -> Result<Generation> {
    info!(
        api = %cfg.output.api,
        headers = cfg.header.len(),
        "loaded configuration"
    );

    let sdk_include = config::resolve_sdk_include(cfg, base_dir, sdk_root_override)
        .context("resolving SDK root")?;

    // Read every header and gather its declarations up front: the full
    // interface set decides which parameter types are hooked.
    let mut headers = Vec::new();
    for h in &cfg.header {
        let path = config::resolve_header(
            &h.path,
            sdk_include.as_deref(),
            base_dir,
            &cfg.include_paths,
        );
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading header {}", path.display()))?;
        let lines: Vec<String> = text.lines().map(|l| l.trim().to_string()).collect();
        let declared: Vec<String> = scan::gather_interfaces(&lines)
            .into_iter()
            .map(|d| d.name)
            .collect();
        info!(header = %path.display(), interfaces = declared.len(), "scanned header");

        let selected = if h.interfaces.is_empty() {
            declared.clone()
        } else {
            h.interfaces.clone()
        };
        headers.push(ScannedHeader {
            config_path: h.path.clone(),
            lines,
            declared,
            selected,
        });
    }

    let mut ctx = BuildContext::new(BuildOptions {
        class_suffix: cfg.hook.class_suffix.clone(),
        hooked_type_prefixes: cfg.hook.hooked_type_prefixes.clone(),
    });
    ctx.learn_interfaces(headers.iter().flat_map(|h| h.declared.iter().cloned()));

    let mut skipped = Vec::new();
    for header in &headers {
        for name in &header.selected {
            if name == ROOT_INTERFACE {
                warn!(
                    header = %header.config_path.display(),
                    "{ROOT_INTERFACE} is built in; skipping"
                );
                continue;
            }
            match ctx.parse_interface(name, &header.lines) {
                Ok(_) => {}
                Err(BuildError::Scan(reason)) => {
                    error!(
                        header = %header.config_path.display(),
                        interface = %name,
                        err = %reason,
                        "skipping interface"
                    );
                    skipped.push(SkippedInterface {
                        header: header.config_path.clone(),
                        interface: name.clone(),
                        reason,
                    });
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!(
                            "modeling interface {name} from {}",
                            header.config_path.display()
                        )
                    });
                }
            }
        }
    }

    let (table, call_ids) = ctx.finish().context("closing call ID table")?;
    info!(
        interfaces = table.len(),
        call_ids = call_ids.total_count(),
        "built interface model"
    );

    let registry: Vec<HeaderInterfaces> = headers
        .iter()
        .map(|h| HeaderInterfaces {
            header: h.config_path.display().to_string(),
            interfaces: h.declared.clone(),
        })
        .collect();
    let artifacts = emit::emit_all(&table, &call_ids, &registry, &EmitOptions::from_config(cfg))
        .context("rendering artifacts")?;

    Ok(Generation { artifacts, skipped })
}

/// Write every artifact into `dir`, creating it if needed.  Existing files are
/// overwritten.  Returns the written paths in artifact order.
pub fn write_artifacts(artifacts: &Artifacts, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating output directory {}", dir.display()))?;

    let mut written = Vec::with_capacity(artifacts.len());
    for artifact in artifacts.iter() {
        let path = dir.join(&artifact.file_name);
        let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(artifact.contents.as_bytes())
            .and_then(|_| writer.flush())
            .with_context(|| format!("writing {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}
