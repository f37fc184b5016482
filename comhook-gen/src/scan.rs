//! Declaration scanning: header lines to interface blocks and method records.
//!
//! Only a closed vocabulary is recognized: `DECLARE_INTERFACE_(Name, Parent)`
//! or `Name : public Parent` opens a block, a line consisting of `};` closes it,
//! and `STDMETHOD(M)`, `STDMETHOD_(T, M)` or `virtual T STDMETHODCALLTYPE M(`
//! starts a method. Everything else is either a parameter line of the method
//! being read or non-substantive.

use tracing::{error, trace};

use crate::error::ScanError;
use crate::model::{CALL_CONV, Method, Parameter, STATUS_TYPE};
use crate::param::{self, ParameterLine};

/// Line that closes an interface block.
pub const BLOCK_END: &str = "};";

/// An interface declaration found by [`gather_interfaces`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredInterface {
    pub name: String,
    pub parent: Option<String>,
}

/// The lines of one interface declaration.
#[derive(Debug)]
pub struct InterfaceBlock<'a> {
    /// Parent named by the opening marker.
    pub parent: Option<String>,
    /// Lines strictly between the opening marker and the block end.
    pub body: &'a [String],
}

/// Parse an opening marker line into `(name, parent)`.
pub fn parse_open_marker(line: &str) -> Option<DeclaredInterface> {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix("DECLARE_INTERFACE_(") {
        let args = &rest[..rest.find(')')?];
        let (name, parent) = args.split_once(',')?;
        return declared(name, Some(parent));
    }
    if let Some(rest) = line.strip_prefix("DECLARE_INTERFACE(") {
        let name = &rest[..rest.find(')')?];
        return declared(name, None);
    }
    // Expanded C++ form: `ID3D11Device : public ID3D11DeviceChild`
    let line = line.strip_suffix('{').unwrap_or(line).trim_end();
    let (name, parent) = line.split_once(':')?;
    let parent = parent.trim().strip_prefix("public")?;
    if !parent.starts_with(char::is_whitespace) {
        return None;
    }
    declared(name, Some(parent))
}

fn declared(name: &str, parent: Option<&str>) -> Option<DeclaredInterface> {
    let name = name.trim();
    let parent = parent.map(str::trim);
    if !is_identifier(name) || parent.is_some_and(|p| !is_identifier(p)) {
        return None;
    }
    Some(DeclaredInterface {
        name: name.to_string(),
        parent: parent.map(str::to_string),
    })
}

/// Every interface declared in `lines`, in declaration order.
pub fn gather_interfaces(lines: &[String]) -> Vec<DeclaredInterface> {
    lines.iter().filter_map(|l| parse_open_marker(l)).collect()
}

/// Locate the block of interface `name`.
pub fn find_interface_block<'a>(
    lines: &'a [String],
    name: &str,
) -> Result<InterfaceBlock<'a>, ScanError> {
    let (open, marker) = lines
        .iter()
        .enumerate()
        .find_map(|(i, l)| {
            parse_open_marker(l)
                .filter(|d| d.name == name)
                .map(|d| (i, d))
        })
        .ok_or_else(|| ScanError::InterfaceNotFound(name.to_string()))?;

    let end = lines[open + 1..]
        .iter()
        .position(|l| l.trim() == BLOCK_END)
        .map(|p| open + 1 + p)
        .ok_or_else(|| ScanError::UnterminatedInterface(name.to_string()))?;

    Ok(InterfaceBlock {
        parent: marker.parent,
        body: &lines[open + 1..end],
    })
}

/// A recognized method-declaration start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodHead {
    pub return_type: String,
    pub name: String,
    /// Parameters declared on the same line.
    pub params: Vec<Parameter>,
    /// The parameter list continues on the following lines.
    pub open: bool,
}

/// Classification of a line inside an interface block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    MethodStart(MethodHead),
    Parameter(&'a str),
    Blank,
    BlockEnd,
}

/// Classify one line. `in_params` tells whether a parameter list is open.
pub fn classify_line(line: &str, in_params: bool) -> LineKind<'_> {
    let line = line.trim();
    if line == BLOCK_END {
        LineKind::BlockEnd
    } else if let Some(head) = parse_method_head(line) {
        LineKind::MethodStart(head)
    } else if in_params && !line.is_empty() {
        LineKind::Parameter(line)
    } else {
        LineKind::Blank
    }
}

/// Try each method pattern in priority order.
pub fn parse_method_head(line: &str) -> Option<MethodHead> {
    if let Some(rest) = line.strip_prefix("STDMETHOD(") {
        let close = rest.find(')')?;
        let name = rest[..close].trim();
        return method_head(STATUS_TYPE, name, &rest[close + 1..]);
    }
    if let Some(rest) = line.strip_prefix("STDMETHOD_(") {
        let close = rest.find(')')?;
        let (ty, name) = rest[..close].rsplit_once(',')?;
        return method_head(ty.trim(), name.trim(), &rest[close + 1..]);
    }
    if let Some(rest) = line.strip_prefix("virtual ") {
        let marker = format!(" {CALL_CONV} ");
        let (ty, rest) = rest.split_once(&marker)?;
        let open = rest.find('(')?;
        return method_head(ty.trim(), rest[..open].trim(), &rest[open..]);
    }
    None
}

fn method_head(return_type: &str, name: &str, tail: &str) -> Option<MethodHead> {
    if !is_identifier(name) || return_type.is_empty() {
        return None;
    }
    let mut head = MethodHead {
        return_type: return_type.to_string(),
        name: name.to_string(),
        params: Vec::new(),
        open: false,
    };
    read_inline_list(&mut head, tail.trim());
    Some(head)
}

/// Read whatever part of the parameter list sits on the declaration line.
fn read_inline_list(head: &mut MethodHead, tail: &str) {
    let Some(inner) = tail.strip_prefix('(') else {
        // `STDMETHOD(Foo)` alone on its line: parameters follow.
        head.open = true;
        return;
    };
    let (inner, closed) = match closing_paren(inner) {
        Some(close) => (&inner[..close], true),
        None => (inner, false),
    };
    head.open = !closed;

    let list = inner.trim();
    let list = match list.strip_prefix("THIS_") {
        Some(rest) => rest,
        None if matches!(list, "THIS" | "void") => "",
        None => list,
    };
    for result in param::parse_inline_parameters(list) {
        match result {
            Ok(p) => head.params.push(p),
            Err(e) => error!(method = %head.name, err = %e, "dropping parameter"),
        }
    }
}

/// Index of the `)` that closes a list whose `(` was already consumed.
fn closing_paren(text: &str) -> Option<usize> {
    let mut depth = 1usize;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Walk the body of an interface block and collect its methods in order.
///
/// Once a method start is seen, following lines are parameter lines until the
/// list is terminated, a blank line appears, another method starts, or the
/// block ends. Unrecognized parameter lines are logged and dropped.
pub fn scan_methods(body: &[String]) -> Vec<Method> {
    let mut methods = Vec::new();
    let mut current: Option<MethodHead> = None;

    for line in body {
        let in_params = current.as_ref().is_some_and(|h| h.open);
        match classify_line(line, in_params) {
            LineKind::MethodStart(head) => {
                if let Some(done) = current.take() {
                    methods.push(finish(done));
                }
                trace!(method = %head.name, open = head.open, "method start");
                if head.open {
                    current = Some(head);
                } else {
                    methods.push(finish(head));
                }
            }
            LineKind::Parameter(text) => {
                let Some(head) = current.as_mut() else { continue };
                if LIST_CLOSERS.contains(&text) {
                    head.open = false;
                } else {
                    match param::parse_parameter_line(text) {
                        Ok(ParameterLine::Parameter { param, last }) => {
                            head.params.push(param);
                            head.open = !last;
                        }
                        Ok(ParameterLine::Comment) => {}
                        Err(e) => error!(method = %head.name, err = %e, "dropping parameter"),
                    }
                }
                if !head.open
                    && let Some(done) = current.take()
                {
                    methods.push(finish(done));
                }
            }
            LineKind::Blank => {
                if let Some(done) = current.take() {
                    methods.push(finish(done));
                }
            }
            LineKind::BlockEnd => break,
        }
    }

    if let Some(done) = current.take() {
        methods.push(finish(done));
    }
    methods
}

/// Lines that close a parameter list without declaring a parameter.
const LIST_CLOSERS: [&str; 4] = [") = 0;", ") PURE;", "void) = 0;", "void ) = 0;"];

fn finish(head: MethodHead) -> Method {
    Method {
        return_type: head.return_type,
        call_conv: CALL_CONV.to_string(),
        name: head.name,
        params: head.params,
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && !s.starts_with(|c: char| c.is_ascii_digit())
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(|l| l.trim().to_string()).collect()
    }

    const MACRO_HEADER: &str = r#"
#undef INTERFACE
#define INTERFACE IDirect3D9

DECLARE_INTERFACE_(IDirect3D9, IUnknown)
{
    /*** IUnknown methods ***/
    STDMETHOD(QueryInterface)(THIS_ REFIID riid, void** ppvObj) PURE;
    STDMETHOD_(ULONG,AddRef)(THIS) PURE;
    STDMETHOD_(ULONG,Release)(THIS) PURE;

    /*** IDirect3D9 methods ***/
    STDMETHOD(RegisterSoftwareDevice)(THIS_ void* pInitializeFunction) PURE;
    STDMETHOD_(UINT, GetAdapterCount)(THIS) PURE;
    STDMETHOD(CreateDevice)(THIS_ UINT Adapter,D3DDEVTYPE DeviceType,HWND hFocusWindow,DWORD BehaviorFlags,D3DPRESENT_PARAMETERS* pPresentationParameters,IDirect3DDevice9** ppReturnedDeviceInterface) PURE;

    #ifdef D3D_DEBUG_INFO
    LPCWSTR Version;
    #endif
};
"#;

    const CPP_HEADER: &str = r#"
    MIDL_INTERFACE("c0bfa96c-e089-44fb-8eaf-26f8796190da")
    ID3D11DeviceContext : public ID3D11DeviceChild
    {
    public:
        virtual void STDMETHODCALLTYPE VSSetConstantBuffers(
            /* [annotation] */
            __in_range( 0, D3D11_COMMONSHADER_CONSTANT_BUFFER_API_SLOT_COUNT - 1 )  UINT StartSlot,
            /* [annotation] */
            __in_ecount(NumBuffers)  ID3D11Buffer *const *ppConstantBuffers) = 0;

        virtual void STDMETHODCALLTYPE OMSetBlendState(
            __in_opt  ID3D11BlendState *pBlendState,
            __in_opt  const FLOAT BlendFactor[ 4 ],
            __in  UINT SampleMask) = 0;

        virtual void STDMETHODCALLTYPE ClearState( void) = 0;

        virtual UINT STDMETHODCALLTYPE GetContextFlags( void) = 0;

    };
"#;

    #[test]
    fn open_marker_shapes() {
        assert_eq!(
            parse_open_marker("DECLARE_INTERFACE_(IDirect3DDevice9, IUnknown)"),
            Some(DeclaredInterface {
                name: "IDirect3DDevice9".into(),
                parent: Some("IUnknown".into())
            })
        );
        assert_eq!(
            parse_open_marker("ID3D11Device : public IUnknown").unwrap().parent.as_deref(),
            Some("IUnknown")
        );
        assert_eq!(parse_open_marker("DECLARE_INTERFACE(IRoot)").unwrap().parent, None);
        assert_eq!(parse_open_marker("#define INTERFACE IDirect3D9"), None);
        assert_eq!(parse_open_marker("case 1: publicFoo"), None);
    }

    #[test]
    fn gather_keeps_declaration_order() {
        let text = lines(
            "DECLARE_INTERFACE_(IA, IUnknown)\n{\n};\nDECLARE_INTERFACE_(IB, IA)\n{\n};\n",
        );
        let names: Vec<String> = gather_interfaces(&text).into_iter().map(|d| d.name).collect();
        assert_eq!(names, ["IA", "IB"]);
    }

    #[test]
    fn block_bounds() {
        let text = lines(MACRO_HEADER);
        let block = find_interface_block(&text, "IDirect3D9").unwrap();
        assert_eq!(block.parent.as_deref(), Some("IUnknown"));
        assert_eq!(block.body.first().map(String::as_str), Some("{"));
        assert_eq!(block.body.last().map(String::as_str), Some("#endif"));
    }

    #[test]
    fn missing_markers() {
        let text = lines(MACRO_HEADER);
        assert_eq!(
            find_interface_block(&text, "IDirect3D8").unwrap_err(),
            ScanError::InterfaceNotFound("IDirect3D8".into())
        );
        let truncated: Vec<String> = text
            .iter()
            .filter(|l| l.as_str() != BLOCK_END)
            .cloned()
            .collect();
        assert_eq!(
            find_interface_block(&truncated, "IDirect3D9").unwrap_err(),
            ScanError::UnterminatedInterface("IDirect3D9".into())
        );
    }

    #[test]
    fn method_head_patterns() {
        let head = parse_method_head("STDMETHOD_(UINT, GetAdapterCount)(THIS) PURE;").unwrap();
        assert_eq!(head.return_type, "UINT");
        assert_eq!(head.name, "GetAdapterCount");
        assert!(head.params.is_empty());
        assert!(!head.open);

        let head = parse_method_head("virtual HRESULT STDMETHODCALLTYPE CreateBuffer(").unwrap();
        assert_eq!(head.return_type, "HRESULT");
        assert!(head.open);

        assert!(parse_method_head("LPCWSTR Version;").is_none());
    }

    #[test]
    fn classify() {
        assert_eq!(classify_line("};", true), LineKind::BlockEnd);
        assert_eq!(classify_line("", true), LineKind::Blank);
        assert_eq!(classify_line("{", false), LineKind::Blank);
        assert_eq!(classify_line("UINT x,", true), LineKind::Parameter("UINT x,"));
        assert!(matches!(
            classify_line("STDMETHOD(Reset)(THIS) PURE;", false),
            LineKind::MethodStart(_)
        ));
    }

    #[test]
    fn macro_dialect_methods() {
        let text = lines(MACRO_HEADER);
        let block = find_interface_block(&text, "IDirect3D9").unwrap();
        let methods = scan_methods(block.body);
        let names: Vec<&str> = methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "QueryInterface",
                "AddRef",
                "Release",
                "RegisterSoftwareDevice",
                "GetAdapterCount",
                "CreateDevice"
            ]
        );
        let create = &methods[5];
        assert_eq!(create.params.len(), 6);
        assert_eq!(create.params[5].name, "ppReturnedDeviceInterface");
        assert!(create.params[5].is_output);
        assert_eq!(methods[0].params[0].ty, "REFIID");
    }

    #[test]
    fn cpp_dialect_methods() {
        let text = lines(CPP_HEADER);
        let block = find_interface_block(&text, "ID3D11DeviceContext").unwrap();
        assert_eq!(block.parent.as_deref(), Some("ID3D11DeviceChild"));
        let methods = scan_methods(block.body);
        let names: Vec<&str> = methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(
            names,
            ["VSSetConstantBuffers", "OMSetBlendState", "ClearState", "GetContextFlags"]
        );
        assert_eq!(methods[0].params.len(), 2);
        assert_eq!(methods[0].params[1].name, "ppConstantBuffers");
        let blend = &methods[1];
        assert_eq!(blend.params[1].array_arity.as_deref(), Some("4"));
        assert_eq!(blend.params[2].name, "SampleMask");
        assert!(methods[2].params.is_empty());
        assert!(methods[2].returns_void());
        assert_eq!(methods[3].return_type, "UINT");
    }

    #[test]
    fn bad_parameter_line_is_dropped() {
        let text = lines(
            "virtual HRESULT STDMETHODCALLTYPE Foo(\nUINT a,\n???\nUINT b) = 0;\n",
        );
        let methods = scan_methods(&text);
        assert_eq!(methods.len(), 1);
        let names: Vec<&str> = methods[0].params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
    }
}
