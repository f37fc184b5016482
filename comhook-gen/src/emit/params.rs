//! Parameter list rendering shared by every emitter.

use crate::model::Parameter;

/// How a parameter list is rendered.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParamStyle<'a> {
    pub types: bool,
    pub names: bool,
    /// Decorate non-reference types with `&` (or `*` for arrays), as used by
    /// the pre-call callback signature.
    pub make_ref: bool,
    /// Wrap hooked-interface inputs in this hooked-to-real function.
    pub translate: Option<&'a str>,
}

impl<'a> ParamStyle<'a> {
    /// `T name` pairs, as in a declaration.
    pub const DECL: ParamStyle<'static> = ParamStyle {
        types: true,
        names: true,
        make_ref: false,
        translate: None,
    };

    /// Names only, as in a call.
    pub const NAMES: ParamStyle<'static> = ParamStyle {
        types: false,
        names: true,
        make_ref: false,
        translate: None,
    };

    /// Types only, as in a member-function-pointer type.
    pub const TYPES: ParamStyle<'static> = ParamStyle {
        types: true,
        names: false,
        make_ref: false,
        translate: None,
    };

    /// Reference-decorated types of the pre-call callback.
    pub const PRE_TYPES: ParamStyle<'static> = ParamStyle {
        types: true,
        names: false,
        make_ref: true,
        translate: None,
    };

    /// Names of a forwarded call, translating hooked inputs with `hooked_to_real`.
    pub fn forward(hooked_to_real: &'a str) -> Self {
        ParamStyle {
            translate: Some(hooked_to_real),
            ..ParamStyle::NAMES
        }
    }
}

/// Render one parameter.
pub fn render_param(p: &Parameter, style: ParamStyle<'_>) -> String {
    let mut s = String::new();
    if style.types {
        s.push_str(&p.ty);
        if style.make_ref && !p.is_reference {
            s.push_str(if p.is_array() { " *" } else { " &" });
        }
    }
    if style.names {
        if style.types {
            s.push(' ');
        }
        match style.translate {
            Some(func) if p.is_hooked_interface && !p.is_output && !p.is_array() => {
                s.push_str(&format!("{func}({})", p.name));
            }
            _ => s.push_str(&p.name),
        }
    }
    if style.types
        && !style.make_ref
        && let Some(arity) = &p.array_arity
    {
        s.push_str(&format!(" [{arity}]"));
    }
    s
}

/// Render a comma-separated list.
pub fn render_params(params: &[Parameter], style: ParamStyle<'_>) -> String {
    params
        .iter()
        .map(|p| render_param(p, style))
        .collect::<Vec<_>>()
        .join(", ")
}
