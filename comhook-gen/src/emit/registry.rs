//! Interface-name registry and factory registration list.

use std::fmt::{self, Write};

use super::{BANNER, EmitOptions, HeaderInterfaces};
use crate::model::InterfaceTable;

/// Render `interfaces.inl`: every interface declared in each scanned header.
pub fn emit_interface_list(
    headers: &[HeaderInterfaces],
    opts: &EmitOptions,
) -> Result<String, fmt::Error> {
    let mut out = String::new();
    writeln!(out, "{BANNER}")?;
    for header in headers {
        writeln!(out)?;
        writeln!(out, "// {}", header.header)?;
        for name in &header.interfaces {
            writeln!(out, "DECLARE_{}_INTERFACE( {name} )", opts.api)?;
        }
    }
    Ok(out)
}

/// Render `factories.inl`: one factory per registered interface, in
/// registration order.
pub fn emit_factories(table: &InterfaceTable) -> Result<String, fmt::Error> {
    let mut out = String::new();
    writeln!(out, "{BANNER}")?;
    writeln!(out)?;
    for iface in table.hooked() {
        writeln!(
            out,
            "registerFactory<{}>({1}::sNewInstance, {1}::sDeleteInstance, nullptr);",
            iface.name, iface.hooked_class_name
        )?;
    }
    Ok(out)
}
