//! Call-ID enumeration and string table.
//!
//! Both artifacts are written from the same walk over the call-ID table, so
//! entry `k` of the string table always names enum entry `k`.

use std::fmt::{self, Write};

use super::{BANNER, CID_HEADER, EmitOptions};
use crate::callid::CallIdTable;

/// Render `(cid_def.h, cid_def.cpp)`.
pub fn emit_call_ids(
    call_ids: &CallIdTable,
    opts: &EmitOptions,
) -> Result<(String, String), fmt::Error> {
    let api = &opts.api;
    let mut header = String::new();
    let mut source = String::new();

    writeln!(header, "{BANNER}")?;
    writeln!(header, "// Call IDs of every hooked {api} method.")?;
    writeln!(header, "#pragma once")?;
    writeln!(header)?;
    writeln!(header, "enum {api}_CALL_ID")?;
    writeln!(header, "{{")?;

    writeln!(source, "{BANNER}")?;
    writeln!(source, "#include \"pch.h\"")?;
    writeln!(source, "#include \"{}\"", opts.file_name(CID_HEADER))?;
    writeln!(source)?;
    writeln!(source, "const char * const g_{api}CallIDText[] =")?;
    writeln!(source, "{{")?;

    for block in call_ids.blocks() {
        let iface = &block.interface;
        writeln!(header)?;
        writeln!(header, "    // CID for {iface}")?;
        writeln!(header, "    CID_{iface}_BASE = {},", block.base)?;
        writeln!(header, "    CID_{iface}_COUNT = {},", block.count)?;
        writeln!(source)?;
        writeln!(source, "    // CID for {iface}")?;
        for (offset, label) in call_ids.block_labels(block).iter().enumerate() {
            writeln!(header, "    CID_{label} = CID_{iface}_BASE + {offset},")?;
            writeln!(source, "    \"CID_{label}\",")?;
        }
    }

    writeln!(header)?;
    writeln!(header, "    CID_TOTAL_COUNT = {},", call_ids.total_count())?;
    writeln!(header, "    CID_INVALID = 0xFFFFFFFF,")?;
    writeln!(header, "}}; // end of enum definition")?;
    writeln!(header)?;
    writeln!(header, "extern const char * const g_{api}CallIDText[];")?;

    writeln!(source, "}};")?;
    Ok((header, source))
}
