//! Round-trip integration test: chain.h → model → artifacts.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use comhook_gen::Generation;
use comhook_gen::builder::{BuildContext, BuildOptions};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../tests/fixtures").join(name)
}

static CHAIN: LazyLock<Generation> =
    LazyLock::new(|| comhook_gen::generate(&fixture("chain.toml")).expect("generate chain"));

fn artifact(name: &str) -> &'static str {
    CHAIN
        .artifacts
        .get(name)
        .unwrap_or_else(|| panic!("{name} missing"))
}

#[test]
fn chain_model_excludes_inherited_methods() {
    let text = std::fs::read_to_string(fixture("chain.h")).unwrap();
    let lines: Vec<String> = text.lines().map(|l| l.trim().to_string()).collect();
    let mut ctx = BuildContext::new(BuildOptions::default());
    for name in ["IRoot", "IMid", "ILeaf"] {
        ctx.parse_interface(name, &lines).unwrap();
    }

    let table = ctx.table();
    let leaf = table.get("ILeaf").unwrap();
    let own: Vec<&str> = leaf.methods.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(own, ["SetMid"]);

    let own: HashSet<String> = own.iter().map(|s| s.to_string()).collect();
    let inherited = table.ancestor_method_names("ILeaf").unwrap() - &own;
    assert_eq!(inherited.len(), 2, "inherited: {inherited:?}");

    let (owner, _) = table.find_method("ILeaf", "GetRoot").unwrap();
    assert_eq!(owner.name, "IMid");

    let (_, call_ids) = ctx.finish().unwrap();
    let mid = call_ids.block("IMid").unwrap();
    let leaf = call_ids.block("ILeaf").unwrap();
    assert_eq!(leaf.base, mid.base + mid.count);
}

#[test]
fn chain_has_no_skipped_interfaces() {
    assert!(CHAIN.skipped.is_empty(), "skipped: {:?}", CHAIN.skipped);
    assert_eq!(CHAIN.artifacts.len(), 8);
}

#[test]
fn chain_call_ids() {
    let header = artifact("chaincid_def.h");
    assert!(header.contains("enum CHAIN_CALL_ID\n"));
    assert!(header.contains("    CID_IRoot_BASE = 0,\n    CID_IRoot_COUNT = 4,\n"));
    assert!(header.contains("    CID_IMid_BASE = 4,\n"));
    assert!(header.contains("    CID_ILeaf_BASE = 8,\n"));
    assert!(header.contains("    CID_ILeaf_SetMid = CID_ILeaf_BASE + 3,\n"));
    assert!(header.contains("    CID_TOTAL_COUNT = 12,\n"));
}

#[test]
fn chain_string_table_matches_enum() {
    let enum_ids: Vec<&str> = artifact("chaincid_def.h")
        .lines()
        .filter(|l| l.contains("_BASE + "))
        .filter_map(|l| l.split_whitespace().next())
        .collect();
    let strings: Vec<&str> = artifact("chaincid_def.cpp")
        .lines()
        .filter_map(|l| l.trim().strip_prefix('"')?.strip_suffix("\","))
        .collect();
    assert_eq!(enum_ids.len(), 12);
    assert_eq!(enum_ids, strings);
}

#[test]
fn chain_registry_and_factories() {
    let registry = artifact("chaininterfaces.inl");
    assert!(registry.contains(
        "// chain.h\nDECLARE_CHAIN_INTERFACE( IRoot )\nDECLARE_CHAIN_INTERFACE( IMid )\nDECLARE_CHAIN_INTERFACE( ILeaf )\n"
    ));

    let factories: Vec<&str> = artifact("chainfactories.inl")
        .lines()
        .filter(|l| l.starts_with("registerFactory"))
        .collect();
    assert_eq!(
        factories,
        [
            "registerFactory<IRoot>(RootHook::sNewInstance, RootHook::sDeleteInstance, nullptr);",
            "registerFactory<IMid>(MidHook::sNewInstance, MidHook::sDeleteInstance, nullptr);",
            "registerFactory<ILeaf>(LeafHook::sNewInstance, LeafHook::sDeleteInstance, nullptr);",
        ]
    );
}

#[test]
fn chain_hooks() {
    let decl = artifact("chainhooks.inl");
    assert!(
        decl.contains("class LeafHook : public HookBase<ILeaf>\n{\n    RootHook & _Root;\n    MidHook & _Mid;\n")
    );
    assert!(decl.contains("        return _Root.GetName(pName, cchName);\n"));

    let body = artifact("chainhooks.cpp");
    assert!(body.contains("#include \"chainhooks.h\"\n#include \"chainhook.h\"\n"));
    assert!(body.contains("    GetRealObj()->SetMid(HookedToReal(pMid));\n"));
    assert!(
        body.contains("    if (SUCCEEDED(ret) && ppRoot && *ppRoot) { *ppRoot = RealToHooked9( *ppRoot ); }\n")
    );
}

#[test]
fn chain_vtable_slot_order() {
    let structs = artifact("chainvtable.inl");
    let start = structs.find("struct ILeafVtbl").unwrap();
    let slots: Vec<&str> = structs[start..]
        .lines()
        .skip(2)
        .take_while(|l| *l != "};")
        .filter_map(|l| l.split('*').nth(1)?.split(')').next())
        .collect();
    assert_eq!(
        slots,
        ["QueryInterface", "AddRef", "Release", "GetName", "GetRoot", "SetMid"]
    );

    let hooks = artifact("chainvtable.cpp");
    let setup_calls = hooks
        .lines()
        .filter(|l| l.starts_with("    SetupCHAINHookedVTables<"))
        .count();
    assert_eq!(setup_calls, 16);
}

#[test]
fn generation_is_deterministic() {
    let again = comhook_gen::generate(&fixture("chain.toml")).unwrap();
    assert_eq!(again.artifacts, CHAIN.artifacts);
}
