//! Code emission: completed model to C++ artifact texts.
//!
//! Every emitter is a pure function of the interface table (and, for the
//! call-ID artifacts, the closed call-ID table). Artifacts are rendered into
//! memory with `std::fmt::Write`; writing them to disk is the driver's job.

use std::fmt;

use tracing::{debug, warn};

use crate::callid::CallIdTable;
use crate::config::{Config, SpecialOutputConfig};
use crate::model::InterfaceTable;

pub mod callid;
pub mod hooks;
pub mod params;
pub mod registry;
pub mod vtable;

/// First line of every artifact.
pub const BANNER: &str = "// Generated by comhook-gen. DO NOT EDIT.";

/// Section separator used throughout the generated code.
pub const SEPARATOR: &str =
    "// -----------------------------------------------------------------------------";

/// Artifact file-name suffixes, appended to the configured file prefix.
pub const INTERFACES_INL: &str = "interfaces.inl";
pub const CID_HEADER: &str = "cid_def.h";
pub const CID_SOURCE: &str = "cid_def.cpp";
pub const HOOKS_INL: &str = "hooks.inl";
pub const HOOKS_CPP: &str = "hooks.cpp";
pub const VTABLE_INL: &str = "vtable.inl";
pub const VTABLE_CPP: &str = "vtable.cpp";
pub const FACTORIES_INL: &str = "factories.inl";

/// Naming and translation settings shared by the emitters.
#[derive(Debug, Clone)]
pub struct EmitOptions {
    /// Symbol prefix, e.g. `D3D9`.
    pub api: String,
    pub file_prefix: String,
    pub vtable_slots: usize,
    pub real_to_hooked: String,
    pub hooked_to_real: String,
    /// Extra headers included by the hooks source, in order, without duplicates.
    pub hook_includes: Vec<String>,
    pub special_outputs: Vec<SpecialOutputConfig>,
}

impl EmitOptions {
    /// Options with the stock hook settings for `api`.
    pub fn new(api: &str) -> Self {
        EmitOptions {
            api: api.to_string(),
            file_prefix: api.to_lowercase(),
            vtable_slots: 16,
            real_to_hooked: "RealToHooked9".to_string(),
            hooked_to_real: "HookedToReal".to_string(),
            hook_includes: Vec::new(),
            special_outputs: Vec::new(),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        let mut hook_includes: Vec<String> = Vec::new();
        for include in cfg.header.iter().filter_map(|h| h.include.as_ref()) {
            if !hook_includes.contains(include) {
                hook_includes.push(include.clone());
            }
        }
        EmitOptions {
            api: cfg.output.api.clone(),
            file_prefix: cfg.output.file_prefix(),
            vtable_slots: cfg.hook.vtable_slots,
            real_to_hooked: cfg.hook.real_to_hooked.clone(),
            hooked_to_real: cfg.hook.hooked_to_real.clone(),
            hook_includes,
            special_outputs: cfg.special_output.clone(),
        }
    }

    /// `{file_prefix}{suffix}`.
    pub fn file_name(&self, suffix: &str) -> String {
        format!("{}{}", self.file_prefix, suffix)
    }

    pub fn special_output(
        &self,
        interface: &str,
        method: &str,
        param: &str,
    ) -> Option<&SpecialOutputConfig> {
        self.special_outputs
            .iter()
            .find(|s| s.interface == interface && s.method == method && s.param == param)
    }
}

/// Interfaces declared by one scanned header, for the registry artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderInterfaces {
    /// Header path as written in the configuration.
    pub header: String,
    pub interfaces: Vec<String>,
}

/// One generated file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub contents: String,
}

/// Every generated file of a run, in a fixed order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Artifacts {
    items: Vec<Artifact>,
}

impl Artifacts {
    pub fn push(&mut self, file_name: String, contents: String) {
        debug!(file = %file_name, size = contents.len(), "rendered artifact");
        self.items.push(Artifact {
            file_name,
            contents,
        });
    }

    /// Contents of the artifact named `file_name`.
    pub fn get(&self, file_name: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|a| a.file_name == file_name)
            .map(|a| a.contents.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Render all eight artifacts.
pub fn emit_all(
    table: &InterfaceTable,
    call_ids: &CallIdTable,
    headers: &[HeaderInterfaces],
    opts: &EmitOptions,
) -> Result<Artifacts, fmt::Error> {
    check_special_outputs(table, opts);

    let mut artifacts = Artifacts::default();
    artifacts.push(
        opts.file_name(INTERFACES_INL),
        registry::emit_interface_list(headers, opts)?,
    );
    let (cid_header, cid_source) = callid::emit_call_ids(call_ids, opts)?;
    artifacts.push(opts.file_name(CID_HEADER), cid_header);
    artifacts.push(opts.file_name(CID_SOURCE), cid_source);
    artifacts.push(opts.file_name(HOOKS_INL), hooks::emit_hook_classes(table)?);
    artifacts.push(opts.file_name(HOOKS_CPP), hooks::emit_hook_methods(table, opts)?);
    artifacts.push(opts.file_name(VTABLE_INL), vtable::emit_vtable_structs(table, opts)?);
    artifacts.push(opts.file_name(VTABLE_CPP), vtable::emit_vtable_hooks(table, opts)?);
    artifacts.push(opts.file_name(FACTORIES_INL), registry::emit_factories(table)?);
    Ok(artifacts)
}

/// Warn about special output parameters that match nothing in the model.
fn check_special_outputs(table: &InterfaceTable, opts: &EmitOptions) {
    for special in &opts.special_outputs {
        let Some(iface) = table.get(&special.interface) else {
            debug!(
                interface = %special.interface,
                "special output for an interface that is not hooked"
            );
            continue;
        };
        let found = iface
            .methods
            .iter()
            .filter(|m| m.name == special.method)
            .any(|m| m.params.iter().any(|p| p.name == special.param));
        if !found {
            warn!(
                interface = %special.interface,
                method = %special.method,
                param = %special.param,
                "special output parameter not found; it will not be translated"
            );
        }
    }
}
