//! Intermediate model types shared by header scanning and code emission.
//!
//! These types know nothing about header text or generated C++, which keeps the
//! scanner, the builder and each emitter testable in isolation.

use std::collections::{HashMap, HashSet};

use crate::error::ModelError;

/// Name of the inheritance root. It is pre-registered with no methods.
pub const ROOT_INTERFACE: &str = "IUnknown";

/// Methods that occupy fixed leading call-ID slots, in call-ID order.
pub const FIXED_METHODS: [&str; 3] = ["AddRef", "Release", "QueryInterface"];

/// Type names that behave like references even without a trailing `&`.
const REFERENCE_TYPES: [&str; 3] = ["REFGUID", "REFIID", "REFCLSID"];

/// Return type that carries a status code.
pub const STATUS_TYPE: &str = "HRESULT";

/// Calling convention written for every COM method.
pub const CALL_CONV: &str = "STDMETHODCALLTYPE";

/// Returns true for `AddRef`, `Release` and `QueryInterface`.
pub fn is_fixed_method(name: &str) -> bool {
    FIXED_METHODS.contains(&name)
}

/// One formal argument of a method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Type text with any annotation prefix removed (e.g. `const FLOAT`).
    pub ty: String,
    /// Annotation marker split off the type (e.g. `__in_opt`), if any.
    pub annotation: Option<String>,
    pub name: String,
    /// Immediate array length expression, `None` for scalars.
    pub array_arity: Option<String>,
    pub is_reference: bool,
    /// The type names another hooked interface.
    pub is_hooked_interface: bool,
    /// Double indirection: the callee writes back an interface pointer.
    pub is_output: bool,
}

impl Parameter {
    /// Build a parameter from its annotation-free type text.
    pub fn new(
        ty: impl Into<String>,
        annotation: Option<String>,
        name: impl Into<String>,
        array_arity: Option<String>,
    ) -> Self {
        let ty = ty.into();
        let compact: String = ty.chars().filter(|c| !c.is_whitespace()).collect();
        let is_reference =
            compact.ends_with('&') || REFERENCE_TYPES.iter().any(|r| ty.contains(r));
        let is_output = compact.ends_with("**");
        Parameter {
            ty,
            annotation,
            name: name.into(),
            array_arity,
            is_reference,
            is_hooked_interface: false,
            is_output,
        }
    }

    pub fn is_array(&self) -> bool {
        self.array_arity.is_some()
    }

    /// The identifier the type refers to, without qualifiers or indirection.
    pub fn base_type(&self) -> &str {
        self.ty
            .split(|c: char| c.is_whitespace() || c == '*' || c == '&')
            .filter(|tok| {
                !tok.is_empty()
                    && !matches!(*tok, "const" | "CONST" | "volatile" | "struct" | "interface")
            })
            .next_back()
            .unwrap_or("")
    }
}

/// One interface member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    pub return_type: String,
    pub call_conv: String,
    pub name: String,
    pub params: Vec<Parameter>,
}

impl Method {
    pub fn returns_void(&self) -> bool {
        self.return_type == "void"
    }

    pub fn returns_status(&self) -> bool {
        self.return_type == STATUS_TYPE
    }
}

/// A named COM interface with the methods it declares directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    /// `None` only for the root.
    pub parent: Option<String>,
    /// Own methods in declaration order; inherited and fixed methods excluded.
    pub methods: Vec<Method>,
    pub hooked_class_name: String,
}

impl Interface {
    pub fn new(
        name: impl Into<String>,
        parent: Option<String>,
        methods: Vec<Method>,
        class_suffix: &str,
    ) -> Self {
        let name = name.into();
        let hooked_class_name = hooked_class_name(&name, class_suffix);
        Interface {
            name,
            parent,
            methods,
            hooked_class_name,
        }
    }

    /// The pre-registered inheritance root. It never gets a hook class.
    pub fn root() -> Self {
        Interface {
            name: ROOT_INTERFACE.to_string(),
            parent: None,
            methods: Vec::new(),
            hooked_class_name: String::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.name == ROOT_INTERFACE
    }

    /// Interface name without its leading type-prefix character.
    pub fn short_name(&self) -> &str {
        strip_type_prefix(&self.name)
    }
}

fn strip_type_prefix(name: &str) -> &str {
    let mut chars = name.chars();
    match chars.next() {
        Some(_) => chars.as_str(),
        None => name,
    }
}

/// `IDirect3DDevice9` + `Hook` → `Direct3DDevice9Hook`.
pub fn hooked_class_name(interface_name: &str, suffix: &str) -> String {
    format!("{}{}", strip_type_prefix(interface_name), suffix)
}

/// Every registered interface, its parent edge and cached ancestor method sets.
///
/// Insertion order is preserved: it is the processing order that fixes call-ID
/// numbering and the order of every emitted section.
#[derive(Debug)]
pub struct InterfaceTable {
    interfaces: Vec<Interface>,
    index: HashMap<String, usize>,
    parents: HashMap<String, Option<String>>,
    /// Method names of an interface and all of its ancestors.
    method_names: HashMap<String, HashSet<String>>,
}

impl Default for InterfaceTable {
    fn default() -> Self {
        let mut table = InterfaceTable {
            interfaces: Vec::new(),
            index: HashMap::new(),
            parents: HashMap::new(),
            method_names: HashMap::new(),
        };
        table.push(Interface::root(), HashSet::new());
        table
    }
}

impl InterfaceTable {
    /// Register an interface. Its parent, if any, must already be present.
    pub fn insert(&mut self, iface: Interface) -> Result<&Interface, ModelError> {
        if self.contains(&iface.name) {
            return Err(ModelError::DuplicateInterface(iface.name));
        }
        let mut names = match &iface.parent {
            Some(parent) => self
                .method_names
                .get(parent)
                .cloned()
                .ok_or_else(|| ModelError::UnregisteredParent {
                    name: iface.name.clone(),
                    parent: parent.clone(),
                })?,
            None => HashSet::new(),
        };
        names.extend(iface.methods.iter().map(|m| m.name.clone()));
        let slot = self.push(iface, names);
        Ok(&self.interfaces[slot])
    }

    fn push(&mut self, iface: Interface, names: HashSet<String>) -> usize {
        let slot = self.interfaces.len();
        self.index.insert(iface.name.clone(), slot);
        self.parents.insert(iface.name.clone(), iface.parent.clone());
        self.method_names.insert(iface.name.clone(), names);
        self.interfaces.push(iface);
        slot
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Interface> {
        self.index.get(name).map(|&i| &self.interfaces[i])
    }

    pub fn parent_of(&self, name: &str) -> Option<&str> {
        self.parents.get(name).and_then(|p| p.as_deref())
    }

    /// Ancestors of `name`, root-first, excluding the root and `name` itself.
    pub fn ancestors(&self, name: &str) -> Vec<&Interface> {
        let mut chain = Vec::new();
        let mut cursor = self.parent_of(name);
        while let Some(parent) = cursor {
            if parent == ROOT_INTERFACE {
                break;
            }
            match self.get(parent) {
                Some(iface) => chain.push(iface),
                None => break,
            }
            cursor = self.parent_of(parent);
        }
        chain.reverse();
        chain
    }

    /// Names of every method declared on `name` or any of its ancestors.
    pub fn ancestor_method_names(&self, name: &str) -> Option<&HashSet<String>> {
        self.method_names.get(name)
    }

    /// Look a method up on the interface itself, then along its parent chain.
    pub fn find_method(&self, interface: &str, method: &str) -> Option<(&Interface, &Method)> {
        let mut cursor = Some(interface);
        while let Some(name) = cursor {
            let iface = self.get(name)?;
            if let Some(m) = iface.methods.iter().find(|m| m.name == method) {
                return Some((iface, m));
            }
            cursor = self.parent_of(name);
        }
        None
    }

    /// Every registered interface except the root, in registration order.
    pub fn hooked(&self) -> impl Iterator<Item = &Interface> {
        self.interfaces.iter().filter(|i| !i.is_root())
    }

    /// Number of registered interfaces, not counting the root.
    pub fn len(&self) -> usize {
        self.interfaces.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
