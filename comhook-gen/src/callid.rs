//! Call-ID allocation: a stable integer for every (interface, method) pair.
//!
//! Each interface gets a contiguous block of `3 + N` IDs: `AddRef`, `Release`
//! and `QueryInterface` at `base + 0..2`, then its own methods at `base + 3..`
//! in declaration order. Blocks are handed out in processing order and never
//! renumbered.

use crate::error::ModelError;
use crate::model::FIXED_METHODS;

/// Number of fixed leading slots in every block.
pub const FIXED_SLOTS: usize = FIXED_METHODS.len();

/// The ID range owned by one interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallIdBlock {
    pub interface: String,
    pub base: usize,
    /// Total IDs in the block, fixed slots included.
    pub count: usize,
}

impl CallIdBlock {
    pub fn method_count(&self) -> usize {
        self.count - FIXED_SLOTS
    }
}

/// Append-only allocator used while interfaces are being modeled.
#[derive(Debug, Default)]
pub struct CallIdAllocator {
    blocks: Vec<CallIdBlock>,
    labels: Vec<Option<String>>,
}

impl CallIdAllocator {
    /// Open a block sized `3 + method_count` and label its fixed slots.
    /// Returns the block's base ID.
    pub fn begin_interface(&mut self, name: &str, method_count: usize) -> usize {
        let base = self.labels.len();
        let count = FIXED_SLOTS + method_count;
        self.labels.resize(base + count, None);
        for (offset, method) in FIXED_METHODS.iter().enumerate() {
            self.labels[base + offset] = Some(format!("{name}_{method}"));
        }
        self.blocks.push(CallIdBlock {
            interface: name.to_string(),
            base,
            count,
        });
        base
    }

    /// Record `label` for the `index`-th own method of interface `name`.
    /// Returns the assigned ID.
    pub fn write_method(
        &mut self,
        name: &str,
        index: usize,
        label: &str,
    ) -> Result<usize, ModelError> {
        let block = self
            .blocks
            .iter()
            .rev()
            .find(|b| b.interface == name)
            .ok_or_else(|| ModelError::NoCallIdBlock(name.to_string()))?;
        if index >= block.method_count() {
            return Err(ModelError::CallIdOutOfRange {
                interface: name.to_string(),
                index,
                count: block.method_count(),
            });
        }
        let id = block.base + FIXED_SLOTS + index;
        self.labels[id] = Some(label.to_string());
        Ok(id)
    }

    /// IDs handed out so far.
    pub fn total_count(&self) -> usize {
        self.labels.len()
    }

    /// Freeze the table. Every allocated ID must carry a label.
    pub fn close(self) -> Result<CallIdTable, ModelError> {
        let labels = self
            .labels
            .into_iter()
            .enumerate()
            .map(|(id, label)| label.ok_or(ModelError::UnfilledCallId(id)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CallIdTable {
            blocks: self.blocks,
            labels,
        })
    }
}

/// The closed, read-only call-ID table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallIdTable {
    blocks: Vec<CallIdBlock>,
    labels: Vec<String>,
}

impl CallIdTable {
    pub fn blocks(&self) -> &[CallIdBlock] {
        &self.blocks
    }

    pub fn block(&self, interface: &str) -> Option<&CallIdBlock> {
        self.blocks.iter().find(|b| b.interface == interface)
    }

    /// Labels of one block, indexed by offset from its base.
    pub fn block_labels(&self, block: &CallIdBlock) -> &[String] {
        &self.labels[block.base..block.base + block.count]
    }

    /// Reverse table: ID → label.
    pub fn label(&self, id: usize) -> Option<&str> {
        self.labels.get(id).map(String::as_str)
    }

    pub fn id_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// Sum of `3 + N` over every block.
    pub fn total_count(&self) -> usize {
        self.labels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_are_contiguous() {
        let mut ids = CallIdAllocator::default();
        assert_eq!(ids.begin_interface("IA", 2), 0);
        assert_eq!(ids.write_method("IA", 0, "IA_Foo").unwrap(), 3);
        assert_eq!(ids.write_method("IA", 1, "IA_Bar").unwrap(), 4);
        assert_eq!(ids.begin_interface("IB", 0), 5);
        assert_eq!(ids.begin_interface("IC", 1), 8);
        ids.write_method("IC", 0, "IC_Baz").unwrap();
        assert_eq!(ids.total_count(), 12);

        let table = ids.close().unwrap();
        assert_eq!(table.total_count(), (2 + 3) + 3 + (1 + 3));
        assert_eq!(table.label(0), Some("IA_AddRef"));
        assert_eq!(table.label(1), Some("IA_Release"));
        assert_eq!(table.label(2), Some("IA_QueryInterface"));
        assert_eq!(table.label(5), Some("IB_AddRef"));
        assert_eq!(table.id_of("IC_Baz"), Some(11));
        let ic = table.block("IC").unwrap();
        assert_eq!((ic.base, ic.count), (8, 4));
        assert_eq!(table.block_labels(ic)[3], "IC_Baz");
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut ids = CallIdAllocator::default();
        ids.begin_interface("IA", 1);
        assert!(matches!(
            ids.write_method("IA", 1, "IA_Oops"),
            Err(ModelError::CallIdOutOfRange { index: 1, count: 1, .. })
        ));
        assert_eq!(
            ids.write_method("IZ", 0, "IZ_Foo"),
            Err(ModelError::NoCallIdBlock("IZ".into()))
        );
    }

    #[test]
    fn unlabelled_ids_fail_to_close() {
        let mut ids = CallIdAllocator::default();
        ids.begin_interface("IA", 1);
        assert_eq!(ids.close(), Err(ModelError::UnfilledCallId(3)));
    }
}
