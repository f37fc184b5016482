//! Vtable mirror emission: `vtable.inl` structs and `vtable.cpp` trampolines.
//!
//! A mirrored vtable lists every COM slot of the interface in binary order:
//! `QueryInterface`, `AddRef`, `Release`, then each ancestor's own methods
//! root-first, then the interface's own methods. Each slot gets one hooked
//! trampoline per vtable instance index.

use std::fmt::{self, Write};

use super::params::{ParamStyle, render_params};
use super::{BANNER, EmitOptions, SEPARATOR};
use crate::model::{CALL_CONV, Interface, InterfaceTable, Method};

/// One entry of a mirrored vtable.
#[derive(Debug, Clone, Copy)]
enum Slot<'a> {
    QueryInterface,
    AddRef,
    Release,
    Method(&'a Method),
}

impl Slot<'_> {
    fn name(&self) -> &str {
        match self {
            Slot::QueryInterface => "QueryInterface",
            Slot::AddRef => "AddRef",
            Slot::Release => "Release",
            Slot::Method(m) => &m.name,
        }
    }
}

fn slots<'a>(table: &'a InterfaceTable, iface: &'a Interface) -> Vec<Slot<'a>> {
    let mut slots = vec![Slot::QueryInterface, Slot::AddRef, Slot::Release];
    for owner in table.ancestors(&iface.name).into_iter().chain([iface]) {
        slots.extend(owner.methods.iter().map(Slot::Method));
    }
    slots
}

/// Render `vtable.inl`.
pub fn emit_vtable_structs(
    table: &InterfaceTable,
    opts: &EmitOptions,
) -> Result<String, fmt::Error> {
    let api = &opts.api;
    let mut out = String::new();
    writeln!(out, "{BANNER}")?;
    writeln!(out)?;

    for iface in table.hooked() {
        write_vtable_struct(&mut out, table, iface)?;
    }

    writeln!(out, "{SEPARATOR}")?;
    writeln!(out, "// Global vtables for all {api} interfaces")?;
    writeln!(out, "{SEPARATOR}")?;
    writeln!(out)?;
    writeln!(out, "struct {api}VTables")?;
    writeln!(out, "{{")?;
    for iface in table.hooked() {
        writeln!(out, "    VTable<{0}Vtbl> _{0};", iface.name)?;
    }
    writeln!(out, "}};")?;
    writeln!(out)?;
    writeln!(out, "extern {api}VTables g_{api}OriginVTables;")?;
    writeln!(out, "extern {api}VTables g_{api}HookedVTables;")?;
    writeln!(out)?;
    writeln!(out, "{SEPARATOR}")?;
    writeln!(out, "// Real -> Hook Functions")?;
    writeln!(out, "{SEPARATOR}")?;
    writeln!(out)?;
    for iface in table.hooked() {
        write_real_to_hooked(&mut out, iface, opts)?;
    }
    Ok(out)
}

fn write_vtable_struct(out: &mut String, table: &InterfaceTable, iface: &Interface) -> fmt::Result {
    let name = &iface.name;
    writeln!(out, "{SEPARATOR}")?;
    writeln!(out, "// {name}")?;
    writeln!(out, "{SEPARATOR}")?;
    writeln!(out, "struct {name}Vtbl")?;
    writeln!(out, "{{")?;
    for slot in slots(table, iface) {
        match slot {
            Slot::QueryInterface => writeln!(
                out,
                "    HRESULT ({CALL_CONV} *QueryInterface)({name} * this_, REFIID riid, void ** ppvObj);"
            )?,
            Slot::AddRef | Slot::Release => writeln!(
                out,
                "    ULONG ({CALL_CONV} *{})({name} * this_);",
                slot.name()
            )?,
            Slot::Method(m) => {
                let mut params = format!("{name} * this_");
                if !m.params.is_empty() {
                    params.push_str(", ");
                    params.push_str(&render_params(&m.params, ParamStyle::DECL));
                }
                writeln!(out, "    {} ({CALL_CONV} *{})({params});", m.return_type, m.name)?;
            }
        }
    }
    writeln!(out, "}};")?;
    writeln!(out)
}

fn write_real_to_hooked(out: &mut String, iface: &Interface, opts: &EmitOptions) -> fmt::Result {
    let name = &iface.name;
    let api = &opts.api;
    let helper = &opts.real_to_hooked;
    writeln!(out, "{SEPARATOR}")?;
    writeln!(out, "inline void {helper}_{name}({name} * p)")?;
    writeln!(out, "{{")?;
    writeln!(
        out,
        "    if (p) RealToHooked_General(**({name}Vtbl**)p, g_{api}OriginVTables._{name}, g_{api}HookedVTables._{name}, \"{name}\");"
    )?;
    writeln!(out, "}}")?;
    writeln!(out, "template <> inline void {helper}<{name}>({name} * p)")?;
    writeln!(out, "{{")?;
    writeln!(out, "    return {helper}_{name}( p );")?;
    writeln!(out, "}}")?;
    writeln!(out)
}

/// Render `vtable.cpp`.
pub fn emit_vtable_hooks(table: &InterfaceTable, opts: &EmitOptions) -> Result<String, fmt::Error> {
    let api = &opts.api;
    let mut out = String::new();
    writeln!(out, "{BANNER}")?;
    writeln!(out)?;
    writeln!(out, "#include \"pch.h\"")?;
    writeln!(out, "#include \"{}vtable.h\"", opts.file_prefix)?;
    writeln!(out)?;
    writeln!(out, "{api}VTables g_{api}OriginVTables;")?;
    writeln!(out, "{api}VTables g_{api}HookedVTables;")?;
    writeln!(out)?;

    for iface in table.hooked() {
        writeln!(out, "{SEPARATOR}")?;
        writeln!(out, "// {}", iface.name)?;
        writeln!(out, "{SEPARATOR}")?;
        writeln!(out)?;
        for slot in slots(table, iface) {
            write_trampoline(&mut out, iface, slot, opts)?;
        }
    }

    // IID dispatch
    let helper = &opts.real_to_hooked;
    writeln!(out, "{SEPARATOR}")?;
    writeln!(out, "void {helper}(const IID & iid, void * p)")?;
    writeln!(out, "{{")?;
    writeln!(out, "    if (false) {{}}")?;
    for iface in table.hooked() {
        writeln!(
            out,
            "    else if (__uuidof({0}) == iid) {helper}_{0}(({0}*)p);",
            iface.name
        )?;
    }
    writeln!(out, "    else")?;
    writeln!(out, "    {{")?;
    writeln!(
        out,
        "        HOOK_WARN_LOG(\"unrecognized interface UUID: <xxxx-xxxx-xxxxx...>\");"
    )?;
    writeln!(out, "    }}")?;
    writeln!(out, "}}")?;
    writeln!(out)?;

    // Setup, one specialization per instance index
    writeln!(out, "{SEPARATOR}")?;
    writeln!(out, "template<UINT INDEX> static void Setup{api}HookedVTables()")?;
    writeln!(out, "{{")?;
    for iface in table.hooked() {
        for slot in slots(table, iface) {
            writeln!(
                out,
                "    g_{api}HookedVTables._{0}.tables[INDEX].{1} = {0}_{1}_Hooked<INDEX>;",
                iface.name,
                slot.name()
            )?;
        }
    }
    writeln!(out, "}}")?;
    writeln!(out)?;
    writeln!(out, "{SEPARATOR}")?;
    writeln!(out, "void Setup{api}HookedVTables()")?;
    writeln!(out, "{{")?;
    for index in 0..opts.vtable_slots {
        writeln!(out, "    Setup{api}HookedVTables<{index}>();")?;
    }
    writeln!(out, "}}")?;
    Ok(out)
}

fn write_trampoline(
    out: &mut String,
    iface: &Interface,
    slot: Slot<'_>,
    opts: &EmitOptions,
) -> fmt::Result {
    let name = &iface.name;
    let method = slot.name();
    let (return_type, params, args) = match slot {
        Slot::QueryInterface => (
            "HRESULT",
            ", const IID & iid, void ** pp".to_string(),
            ", iid, pp".to_string(),
        ),
        Slot::AddRef | Slot::Release => ("ULONG", String::new(), String::new()),
        Slot::Method(m) if m.params.is_empty() => {
            (m.return_type.as_str(), String::new(), String::new())
        }
        Slot::Method(m) => (
            m.return_type.as_str(),
            format!(", {}", render_params(&m.params, ParamStyle::DECL)),
            format!(", {}", render_params(&m.params, ParamStyle::NAMES)),
        ),
    };
    writeln!(out, "{SEPARATOR}")?;
    writeln!(
        out,
        "template<UINT INDEX> static {return_type} {CALL_CONV} {name}_{method}_Hooked({name} * ptr{params})"
    )?;
    writeln!(out, "{{")?;
    writeln!(out, "    calltrace::AutoTrace trace(\"{name}::{method}\");")?;
    writeln!(
        out,
        "    return g_{}OriginVTables._{name}.tables[INDEX].{method}(ptr{args});",
        opts.api
    )?;
    writeln!(out, "}}")?;
    writeln!(out)
}
