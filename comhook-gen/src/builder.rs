//! Interface model building.
//!
//! [`BuildContext`] owns every piece of mutable state of a generation pass: the
//! interface table, the call-ID allocator and the set of type names that count
//! as hooked interfaces. Interfaces must be fed to it ancestors-first.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::callid::{CallIdAllocator, CallIdTable};
use crate::error::{BuildError, ModelError};
use crate::model::{Interface, InterfaceTable, ROOT_INTERFACE, is_fixed_method};
use crate::scan;

/// Knobs that affect how interfaces are modeled.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Appended to the prefix-stripped interface name to form the hook class.
    pub class_suffix: String,
    /// Type names starting with one of these count as hooked interfaces.
    pub hooked_type_prefixes: Vec<String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            class_suffix: "Hook".to_string(),
            hooked_type_prefixes: Vec::new(),
        }
    }
}

/// State of one generation pass.
#[derive(Debug)]
pub struct BuildContext {
    table: InterfaceTable,
    call_ids: CallIdAllocator,
    known: HashSet<String>,
    options: BuildOptions,
}

impl BuildContext {
    pub fn new(options: BuildOptions) -> Self {
        BuildContext {
            table: InterfaceTable::default(),
            call_ids: CallIdAllocator::default(),
            known: HashSet::new(),
            options,
        }
    }

    /// Add interface names discovered anywhere in the header set. Parameters
    /// whose base type is one of them are translated at call boundaries.
    pub fn learn_interfaces<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known.extend(names.into_iter().map(Into::into));
    }

    pub fn is_hooked_type(&self, base_type: &str) -> bool {
        self.known.contains(base_type)
            || self
                .options
                .hooked_type_prefixes
                .iter()
                .any(|p| base_type.starts_with(p.as_str()))
    }

    /// Model interface `name` from the header `lines` and register it.
    ///
    /// Methods already declared by an ancestor and the fixed `IUnknown` methods
    /// are left out of the interface's own list. On error nothing is
    /// registered.
    pub fn parse_interface(
        &mut self,
        name: &str,
        lines: &[String],
    ) -> Result<&Interface, BuildError> {
        if self.table.contains(name) {
            return Err(ModelError::DuplicateInterface(name.to_string()).into());
        }

        let block = scan::find_interface_block(lines, name)?;
        let parent = block.parent.unwrap_or_else(|| ROOT_INTERFACE.to_string());
        let inherited = self.table.ancestor_method_names(&parent).ok_or_else(|| {
            ModelError::UnregisteredParent {
                name: name.to_string(),
                parent: parent.clone(),
            }
        })?;

        let mut methods = Vec::new();
        for mut method in scan::scan_methods(block.body) {
            if is_fixed_method(&method.name) || inherited.contains(&method.name) {
                continue;
            }
            for p in &mut method.params {
                p.is_hooked_interface = self.is_hooked_type(p.base_type());
            }
            debug!(interface = name, method = %method.name, params = method.params.len(), "method");
            methods.push(method);
        }

        info!(interface = name, parent = %parent, methods = methods.len(), "parsed interface");
        let iface = Interface::new(name, Some(parent), methods, &self.options.class_suffix);
        Ok(self.register(iface)?)
    }

    /// Insert an already-modeled interface and allocate its call IDs.
    pub fn register(&mut self, iface: Interface) -> Result<&Interface, ModelError> {
        let name = iface.name.clone();
        let labels: Vec<String> = iface
            .methods
            .iter()
            .map(|m| format!("{}_{}", name, m.name))
            .collect();
        let registered = self.table.insert(iface)?;
        self.call_ids.begin_interface(&name, labels.len());
        for (index, label) in labels.iter().enumerate() {
            self.call_ids.write_method(&name, index, label)?;
        }
        Ok(registered)
    }

    pub fn table(&self) -> &InterfaceTable {
        &self.table
    }

    /// Close the pass, handing back the finished model and call-ID table.
    pub fn finish(self) -> Result<(InterfaceTable, CallIdTable), ModelError> {
        let call_ids = self.call_ids.close()?;
        Ok((self.table, call_ids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(|l| l.trim().to_string()).collect()
    }

    const CHAIN: &str = r#"
DECLARE_INTERFACE_(IRoot, IUnknown)
{
    STDMETHOD(QueryInterface)(THIS_ REFIID riid, void** ppvObj) PURE;
    STDMETHOD_(ULONG,AddRef)(THIS) PURE;
    STDMETHOD_(ULONG,Release)(THIS) PURE;
    STDMETHOD(GetName)(THIS_ LPSTR pName) PURE;
};

DECLARE_INTERFACE_(IMid, IRoot)
{
    STDMETHOD(QueryInterface)(THIS_ REFIID riid, void** ppvObj) PURE;
    STDMETHOD_(ULONG,AddRef)(THIS) PURE;
    STDMETHOD_(ULONG,Release)(THIS) PURE;
    STDMETHOD(GetName)(THIS_ LPSTR pName) PURE;
    STDMETHOD(GetRoot)(THIS_ IRoot** ppRoot) PURE;
};

DECLARE_INTERFACE_(ILeaf, IMid)
{
    STDMETHOD(QueryInterface)(THIS_ REFIID riid, void** ppvObj) PURE;
    STDMETHOD_(ULONG,AddRef)(THIS) PURE;
    STDMETHOD_(ULONG,Release)(THIS) PURE;
    STDMETHOD(GetName)(THIS_ LPSTR pName) PURE;
    STDMETHOD(GetRoot)(THIS_ IRoot** ppRoot) PURE;
    STDMETHOD(SetMid)(THIS_ IMid* pMid) PURE;
};
"#;

    fn chain_context() -> BuildContext {
        let text = lines(CHAIN);
        let mut ctx = BuildContext::new(BuildOptions::default());
        ctx.learn_interfaces(scan::gather_interfaces(&text).into_iter().map(|d| d.name));
        for name in ["IRoot", "IMid", "ILeaf"] {
            ctx.parse_interface(name, &text).unwrap();
        }
        ctx
    }

    #[test]
    fn three_level_chain() {
        let ctx = chain_context();
        let table = ctx.table();
        let leaf = table.get("ILeaf").unwrap();
        let names: Vec<&str> = leaf.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["SetMid"]);
        assert_eq!(leaf.hooked_class_name, "LeafHook");

        let own: HashSet<String> = leaf.methods.iter().map(|m| m.name.clone()).collect();
        let inherited = table.ancestor_method_names("ILeaf").unwrap() - &own;
        assert_eq!(inherited.len(), 2);

        let (owner, _) = table.find_method("ILeaf", "GetName").unwrap();
        assert_eq!(owner.name, "IRoot");

        let (_, call_ids) = ctx.finish().unwrap();
        let mid = call_ids.block("IMid").unwrap();
        let leaf = call_ids.block("ILeaf").unwrap();
        assert_eq!(leaf.base, mid.base + mid.count);
        assert_eq!(call_ids.total_count(), 4 + 4 + 4);
        assert_eq!(call_ids.label(leaf.base + 3), Some("ILeaf_SetMid"));
    }

    #[test]
    fn hooked_parameters_are_marked() {
        let ctx = chain_context();
        let mid = ctx.table().get("IMid").unwrap();
        let p = &mid.methods[0].params[0];
        assert!(p.is_output && p.is_hooked_interface);

        let root = ctx.table().get("IRoot").unwrap();
        assert!(!root.methods[0].params[0].is_hooked_interface);
    }

    #[test]
    fn prefixes_mark_unknown_types() {
        let ctx = BuildContext::new(BuildOptions {
            class_suffix: "Hook".into(),
            hooked_type_prefixes: vec!["IDirect3D".into()],
        });
        assert!(ctx.is_hooked_type("IDirect3DSurface9"));
        assert!(!ctx.is_hooked_type("D3DSURFACE_DESC"));
    }

    #[test]
    fn query_interface_is_never_an_own_method() {
        let text = lines(
            "DECLARE_INTERFACE_(IA, IUnknown)\n{\nSTDMETHOD(QueryInterface)(THIS_ REFIID riid, void** ppvObj) PURE;\nSTDMETHOD(Foo)(THIS) PURE;\n};\n",
        );
        let mut ctx = BuildContext::new(BuildOptions::default());
        let iface = ctx.parse_interface("IA", &text).unwrap();
        assert_eq!(iface.methods.len(), 1);
        assert_eq!(iface.methods[0].name, "Foo");
    }

    #[test]
    fn register_hands_back_the_interface() {
        let mut ctx = BuildContext::new(BuildOptions {
            class_suffix: "Proxy".into(),
            hooked_type_prefixes: Vec::new(),
        });
        let iface = Interface::new("IWidget", Some(ROOT_INTERFACE.into()), Vec::new(), "Proxy");
        let registered = ctx.register(iface).unwrap();
        assert_eq!(registered.name, "IWidget");
        assert_eq!(registered.hooked_class_name, "WidgetProxy");

        // The root keeps no hook class whatever the suffix.
        assert_eq!(ctx.table().get(ROOT_INTERFACE).unwrap().hooked_class_name, "");

        let (_, call_ids) = ctx.finish().unwrap();
        assert_eq!(call_ids.block("IWidget").unwrap().count, 3);
    }

    #[test]
    fn duplicate_is_fatal() {
        let text = lines(CHAIN);
        let mut ctx = BuildContext::new(BuildOptions::default());
        ctx.parse_interface("IRoot", &text).unwrap();
        let err = ctx.parse_interface("IRoot", &text).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err, BuildError::Model(ModelError::DuplicateInterface("IRoot".into())));
        assert_eq!(ctx.table().len(), 1);
    }

    #[test]
    fn descendants_before_ancestors_is_fatal() {
        let text = lines(CHAIN);
        let mut ctx = BuildContext::new(BuildOptions::default());
        let err = ctx.parse_interface("IMid", &text).unwrap_err();
        assert!(err.is_fatal());
        assert!(!ctx.table().contains("IMid"));
    }

    #[test]
    fn missing_block_is_recoverable() {
        let mut ctx = BuildContext::new(BuildOptions::default());
        let err = ctx.parse_interface("INope", &lines(CHAIN)).unwrap_err();
        assert!(!err.is_fatal());
        assert!(ctx.table().is_empty());
    }
}
