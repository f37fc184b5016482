//! Configuration types for `comhook.toml`.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root configuration.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Where the SDK headers live.  Optional; without it headers are
    /// resolved relative to the TOML file and `include_paths` only.
    pub sdk: Option<SdkConfig>,
    /// Additional directories to search when resolving header paths.  Each
    /// entry is tried in order after the SDK include directory and
    /// `base_dir` (the TOML file's parent directory).
    #[serde(default)]
    pub include_paths: Vec<PathBuf>,
    pub output: OutputConfig,
    /// Headers to scan, in processing order.  Ancestors must come first.
    #[serde(default)]
    pub header: Vec<HeaderConfig>,
    #[serde(default)]
    pub hook: HookConfig,
    /// Output parameters translated by a dedicated routine instead of the
    /// generic real-to-hooked helper.
    #[serde(default = "default_special_outputs")]
    pub special_output: Vec<SpecialOutputConfig>,
}

/// SDK root discovery.
#[derive(Debug, Deserialize)]
pub struct SdkConfig {
    /// Explicit SDK root, relative to the TOML file's directory.
    pub root: Option<PathBuf>,
    /// Environment variable consulted when `root` is not set.
    #[serde(default = "default_root_env")]
    pub root_env: String,
    /// Header directory below the root.
    #[serde(default = "default_include_dir")]
    pub include_dir: PathBuf,
}

fn default_root_env() -> String {
    "DXSDK_DIR".to_string()
}

fn default_include_dir() -> PathBuf {
    PathBuf::from("include")
}

/// Output settings.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Output directory, relative to the TOML file's directory.
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    /// Symbol prefix of the generated code (e.g. `D3D9` gives
    /// `D3D9_CALL_ID` and `g_D3D9OriginVTables`).
    pub api: String,
    /// File-name prefix of every artifact.  Defaults to `api` lower-cased.
    pub file_prefix: Option<String>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("generated")
}

impl OutputConfig {
    pub fn file_prefix(&self) -> String {
        self.file_prefix
            .clone()
            .unwrap_or_else(|| self.api.to_lowercase())
    }
}

/// One header to scan.
#[derive(Debug, Deserialize)]
pub struct HeaderConfig {
    pub path: PathBuf,
    /// Interfaces to hook, in processing order.  Empty means every interface
    /// declared in the header, in declaration order.
    #[serde(default)]
    pub interfaces: Vec<String>,
    /// Header `#include`d by the generated hook source.
    pub include: Option<String>,
}

/// Hook class and vtable generation settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HookConfig {
    pub class_suffix: String,
    /// Parallel vtable instances per interface.
    pub vtable_slots: usize,
    /// Function template turning a real interface pointer into its hook.
    pub real_to_hooked: String,
    /// Function unwrapping a hook into the real interface pointer.
    pub hooked_to_real: String,
    /// Type-name prefixes treated as hooked interfaces even when the type is
    /// not declared in any scanned header.
    pub hooked_type_prefixes: Vec<String>,
}

impl Default for HookConfig {
    fn default() -> Self {
        HookConfig {
            class_suffix: "Hook".to_string(),
            vtable_slots: 16,
            real_to_hooked: "RealToHooked9".to_string(),
            hooked_to_real: "HookedToReal".to_string(),
            hooked_type_prefixes: Vec::new(),
        }
    }
}

/// An output parameter with its own translation routine.
///
/// ```toml
/// [[special_output]]
/// interface = "IDXGIObject"
/// method = "GetParent"
/// param = "ppParent"
/// translator = "DXGIRealToHooked"
/// iid_param = "riid"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SpecialOutputConfig {
    pub interface: String,
    pub method: String,
    pub param: String,
    pub translator: String,
    /// Parameter carrying the requested IID, passed as the first argument.
    pub iid_param: Option<String>,
}

fn default_special_outputs() -> Vec<SpecialOutputConfig> {
    let dxgi = |interface: &str, method: &str, param: &str| SpecialOutputConfig {
        interface: interface.to_string(),
        method: method.to_string(),
        param: param.to_string(),
        translator: "DXGIRealToHooked".to_string(),
        iid_param: Some("riid".to_string()),
    };
    vec![
        dxgi("IDXGIObject", "GetParent", "ppParent"),
        dxgi("IDXGIDeviceSubObject", "GetDevice", "ppDevice"),
    ]
}

/// Resolve the SDK header directory.
///
/// `root_override` (the `--sdk-root` flag) wins over both configured sources.
/// Returns `Ok(None)` when neither an override nor an `[sdk]` table is
/// present.  An SDK root that cannot be found is an error.
pub fn resolve_sdk_include(
    cfg: &Config,
    base_dir: &Path,
    root_override: Option<&Path>,
) -> anyhow::Result<Option<PathBuf>> {
    let include_dir = cfg
        .sdk
        .as_ref()
        .map(|sdk| sdk.include_dir.clone())
        .unwrap_or_else(default_include_dir);
    let root = match (root_override, &cfg.sdk) {
        (Some(root), _) => root.to_path_buf(),
        (None, None) => return Ok(None),
        (None, Some(sdk)) => sdk_root(sdk, base_dir)?,
    };
    if !root.is_dir() {
        anyhow::bail!("SDK root {} is not a directory", root.display());
    }
    Ok(Some(root.join(include_dir)))
}

fn sdk_root(sdk: &SdkConfig, base_dir: &Path) -> anyhow::Result<PathBuf> {
    match &sdk.root {
        Some(root) => Ok(base_dir.join(root)),
        None => match std::env::var_os(&sdk.root_env) {
            Some(root) => Ok(PathBuf::from(root)),
            None => anyhow::bail!(
                "SDK root is not configured: set `sdk.root`, the {} environment variable, or --sdk-root",
                sdk.root_env
            ),
        },
    }
}

/// Resolve a header path.  Absolute paths are returned as-is; otherwise the
/// SDK include directory, `base_dir` and each `include_paths` entry are
/// searched in that order.  If the file is not found anywhere, falls back to
/// `base_dir.join(path)` so that the read error names a meaningful path.
pub fn resolve_header(
    path: &Path,
    sdk_include: Option<&Path>,
    base_dir: &Path,
    include_paths: &[PathBuf],
) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    let search = sdk_include
        .into_iter()
        .chain(std::iter::once(base_dir))
        .chain(include_paths.iter().map(PathBuf::as_path));
    for dir in search {
        let candidate = dir.join(path);
        if candidate.exists() {
            return candidate;
        }
    }
    base_dir.join(path)
}

/// Load and parse a `comhook.toml` configuration file.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let config: Config = toml::from_str(&content)
        .map_err(|e| anyhow::anyhow!("failed to parse config file {}: {}", path.display(), e))?;
    Ok(config)
}
