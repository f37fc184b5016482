//! Hook class emission: `hooks.inl` declarations and `hooks.cpp` bodies.

use std::fmt::{self, Write};

use super::params::{ParamStyle, render_params};
use super::{BANNER, EmitOptions, SEPARATOR};
use crate::model::{CALL_CONV, Interface, InterfaceTable, Method};

const CLASS_SEPARATOR: &str =
    "// ==============================================================================";

/// Render `hooks.inl`: one proxy class per registered interface.
pub fn emit_hook_classes(table: &InterfaceTable) -> Result<String, fmt::Error> {
    let mut out = String::new();
    writeln!(out, "{BANNER}")?;
    writeln!(out)?;
    for iface in table.hooked() {
        write_hook_class(&mut out, table, iface)?;
    }
    Ok(out)
}

/// Render `hooks.cpp`: the out-of-line body of every own method.
pub fn emit_hook_methods(table: &InterfaceTable, opts: &EmitOptions) -> Result<String, fmt::Error> {
    let mut out = String::new();
    writeln!(out, "{BANNER}")?;
    writeln!(out)?;
    writeln!(out, "#include \"pch.h\"")?;
    writeln!(out, "#include \"{}hooks.h\"", opts.file_prefix)?;
    for include in &opts.hook_includes {
        writeln!(out, "#include \"{include}\"")?;
    }
    writeln!(out)?;
    for iface in table.hooked() {
        for method in &iface.methods {
            write_implementation(&mut out, iface, method, opts)?;
        }
    }
    Ok(out)
}

fn write_hook_class(out: &mut String, table: &InterfaceTable, iface: &Interface) -> fmt::Result {
    let class = &iface.hooked_class_name;
    let ancestors = table.ancestors(&iface.name);

    writeln!(out, "{CLASS_SEPARATOR}")?;
    writeln!(out, "// {}", iface.name)?;
    writeln!(out, "{CLASS_SEPARATOR}")?;
    writeln!(out, "class {class} : public HookBase<{}>", iface.name)?;
    writeln!(out, "{{")?;
    for a in &ancestors {
        writeln!(out, "    {} & _{};", a.hooked_class_name, a.short_name())?;
    }
    writeln!(out)?;

    // Construction
    writeln!(out, "protected:")?;
    writeln!(out)?;
    write!(out, "    {class}(UnknownBase & unknown, ")?;
    for a in &ancestors {
        write!(out, "{} & {}, ", a.hooked_class_name, a.short_name())?;
    }
    writeln!(out, "IUnknown * realobj)")?;
    writeln!(out, "        : BASE_CLASS(unknown, realobj)")?;
    for a in &ancestors {
        writeln!(out, "        , _{0}({0})", a.short_name())?;
    }
    writeln!(out, "    {{")?;
    writeln!(out, "    }}")?;
    writeln!(out)?;
    writeln!(out, "    ~{class}() {{}}")?;
    writeln!(out)?;

    // Factory entry points
    writeln!(out, "public:")?;
    writeln!(out)?;
    writeln!(
        out,
        "    static IUnknown * sNewInstance(void * context, UnknownBase & unknown, IUnknown * realobj)"
    )?;
    writeln!(out, "    {{")?;
    writeln!(out, "        UNREFERENCED_PARAMETER(context);")?;
    for a in &ancestors {
        let hook = &a.hooked_class_name;
        let object = a.short_name();
        writeln!(
            out,
            "        {hook} * {object} = ({hook} *)unknown.GetHookedParent(__uuidof({}), realobj);",
            a.name
        )?;
        writeln!(out, "        if (nullptr == {object}) return nullptr;")?;
        writeln!(out)?;
    }
    writeln!(out, "        try")?;
    writeln!(out, "        {{")?;
    write!(out, "            return new {class}(unknown")?;
    for a in &ancestors {
        write!(out, ", *{}", a.short_name())?;
    }
    writeln!(out, ", realobj);")?;
    writeln!(out, "        }}")?;
    writeln!(out, "        catch(std::bad_alloc&)")?;
    writeln!(out, "        {{")?;
    writeln!(out, "            HOOK_ERROR_LOG(\"Out of memory.\");")?;
    writeln!(out, "            return nullptr;")?;
    writeln!(out, "        }}")?;
    writeln!(out, "    }}")?;
    writeln!(out)?;
    writeln!(out, "    static void sDeleteInstance(void * context, void * ptr)")?;
    writeln!(out, "    {{")?;
    writeln!(out, "        UNREFERENCED_PARAMETER(context);")?;
    writeln!(out, "        {class} * typedPtr = ({class} *)ptr;")?;
    writeln!(out, "        delete typedPtr;")?;
    writeln!(out, "    }}")?;
    writeln!(out)?;

    for a in &ancestors {
        for method in &a.methods {
            write_call_base(out, a, method)?;
        }
    }
    for method in &iface.methods {
        write_prototype(out, class, method)?;
    }
    writeln!(out, "}};")?;
    writeln!(out)?;
    Ok(())
}

/// Inherited method routed to the hook object of the ancestor that declares it.
fn write_call_base(out: &mut String, owner: &Interface, method: &Method) -> fmt::Result {
    writeln!(out, "    {SEPARATOR}")?;
    writeln!(
        out,
        "    {} {CALL_CONV} {}({})",
        method.return_type,
        method.name,
        render_params(&method.params, ParamStyle::DECL)
    )?;
    writeln!(out, "    {{")?;
    writeln!(
        out,
        "        return _{}.{}({});",
        owner.short_name(),
        method.name,
        render_params(&method.params, ParamStyle::NAMES)
    )?;
    writeln!(out, "    }}")?;
    writeln!(out)
}

fn write_prototype(out: &mut String, class: &str, method: &Method) -> fmt::Result {
    writeln!(out, "    {SEPARATOR}")?;
    writeln!(
        out,
        "    virtual {} {CALL_CONV} {}({});",
        method.return_type,
        method.name,
        render_params(&method.params, ParamStyle::DECL)
    )?;
    writeln!(
        out,
        "    NullPtr<void ({class}::*)({})> _{}_pre_ptr;",
        render_params(&method.params, ParamStyle::PRE_TYPES),
        method.name
    )?;
    let mut post_types = Vec::new();
    if !method.returns_void() {
        post_types.push(method.return_type.clone());
    }
    if !method.params.is_empty() {
        post_types.push(render_params(&method.params, ParamStyle::TYPES));
    }
    writeln!(
        out,
        "    NullPtr<void ({class}::*)({})> _{}_post_ptr;",
        post_types.join(", "),
        method.name
    )?;
    writeln!(out)
}

fn write_implementation(
    out: &mut String,
    iface: &Interface,
    method: &Method,
    opts: &EmitOptions,
) -> fmt::Result {
    let class = &iface.hooked_class_name;
    let name = &method.name;

    writeln!(out, "{SEPARATOR}")?;
    write!(out, "{} {CALL_CONV} {class}::{name}(", method.return_type)?;
    if method.params.is_empty() {
        writeln!(out, ")")?;
    } else {
        let lines: Vec<String> = method
            .params
            .iter()
            .map(|p| match &p.array_arity {
                Some(n) => format!("    {} {}[{n}]", p.ty, p.name),
                None => format!("    {} {}", p.ty, p.name),
            })
            .collect();
        writeln!(out)?;
        writeln!(out, "{})", lines.join(",\n"))?;
    }
    writeln!(out, "{{")?;
    writeln!(out, "    calltrace::AutoTrace trace(L\"{class}::{name}\");")?;

    let names = render_params(&method.params, ParamStyle::NAMES);
    writeln!(
        out,
        "    if (_{name}_pre_ptr._value) {{ (this->*_{name}_pre_ptr._value)({names}); }}"
    )?;

    let forwarded = render_params(&method.params, ParamStyle::forward(&opts.hooked_to_real));
    if method.returns_void() {
        writeln!(out, "    GetRealObj()->{name}({forwarded});")?;
    } else {
        writeln!(
            out,
            "    {} ret = GetRealObj()->{name}({forwarded});",
            method.return_type
        )?;
    }

    write_output_translation(out, iface, method, opts)?;

    let post_args = match (method.returns_void(), names.is_empty()) {
        (true, _) => names.clone(),
        (false, true) => "ret".to_string(),
        (false, false) => format!("ret, {names}"),
    };
    writeln!(
        out,
        "    if (_{name}_post_ptr._value) {{ (this->*_{name}_post_ptr._value)({post_args}); }}"
    )?;
    if !method.returns_void() {
        writeln!(out, "    return ret;")?;
    }
    writeln!(out, "}}")?;
    writeln!(out)
}

/// Rewrite returned interface pointers from real to hooked objects.
fn write_output_translation(
    out: &mut String,
    iface: &Interface,
    method: &Method,
    opts: &EmitOptions,
) -> fmt::Result {
    for p in &method.params {
        let n = &p.name;
        if let Some(special) = opts.special_output(&iface.name, &method.name, n) {
            let args = match &special.iid_param {
                Some(iid) => format!("{iid}, *{n} "),
                None => format!("*{n} "),
            };
            let guard = if method.returns_status() {
                "SUCCEEDED(ret)".to_string()
            } else {
                format!("{n} && *{n}")
            };
            writeln!(out, "    if ({guard}) {{ *{n} = {}({args}); }}", special.translator)?;
        } else if p.is_output && p.is_hooked_interface {
            let guard = if method.returns_status() {
                format!("SUCCEEDED(ret) && {n} && *{n}")
            } else {
                format!("{n} && *{n}")
            };
            writeln!(
                out,
                "    if ({guard}) {{ *{n} = {}( *{n} ); }}",
                opts.real_to_hooked
            )?;
        }
    }
    Ok(())
}
