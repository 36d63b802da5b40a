//! Decode dispatch over a validated collection of operations.
//!
//! [`InstructionSet`] owns the operations it was built from and a single-level dispatch table
//! keyed by the bits every operation keeps fixed. Each bucket lists candidates from most to
//! least specific so overlapping wildcard encodings resolve deterministically.

mod cache;
mod disassembly;

pub use cache::InstructionCache;
pub use disassembly::{DecodedInstruction, Disassembly};

use std::sync::Arc;

use ahash::AHashMap;
use smallvec::SmallVec;
use tracing::{debug, warn};

use super::error::IsaError;
use super::operation::{Operation, OperationDescriptor};
use super::word::w16;

/// Any of the accepted ways to hand an operation to [`InstructionSet::new`].
pub enum OperationSource {
    Shared(Arc<Operation>),
    Descriptor(OperationDescriptor),
    Factory(fn() -> Result<Operation, IsaError>),
}

impl OperationSource {
    pub fn factory(build: fn() -> Result<Operation, IsaError>) -> Self {
        OperationSource::Factory(build)
    }

    fn into_operation(self) -> Result<Arc<Operation>, IsaError> {
        match self {
            OperationSource::Shared(op) => Ok(op),
            OperationSource::Descriptor(desc) => Operation::from_descriptor(desc).map(Arc::new),
            OperationSource::Factory(build) => build().map(Arc::new),
        }
    }
}

impl From<Operation> for OperationSource {
    fn from(op: Operation) -> Self {
        OperationSource::Shared(Arc::new(op))
    }
}

impl From<Arc<Operation>> for OperationSource {
    fn from(op: Arc<Operation>) -> Self {
        OperationSource::Shared(op)
    }
}

impl From<&Arc<Operation>> for OperationSource {
    fn from(op: &Arc<Operation>) -> Self {
        OperationSource::Shared(Arc::clone(op))
    }
}

impl From<OperationDescriptor> for OperationSource {
    fn from(desc: OperationDescriptor) -> Self {
        OperationSource::Descriptor(desc)
    }
}

#[derive(Debug, Clone)]
pub struct InstructionSet {
    operations: Vec<Arc<Operation>>,
    mask: u16,
    mask_shift: u32,
    table: AHashMap<u16, SmallVec<[usize; 4]>>,
}

impl InstructionSet {
    pub fn new<I, S>(sources: I) -> Result<Self, IsaError>
    where
        I: IntoIterator<Item = S>,
        S: Into<OperationSource>,
    {
        let operations = sources
            .into_iter()
            .map(|source| source.into().into_operation())
            .collect::<Result<Vec<_>, _>>()?;

        let mask = operations
            .iter()
            .fold(w16::MAX, |acc, op| acc & op.mask().mask());
        let mask_shift = w16::bitscanf(mask);

        let mut table: AHashMap<u16, SmallVec<[usize; 4]>> = AHashMap::new();
        for (idx, op) in operations.iter().enumerate() {
            let key = (op.opcode() & mask) >> mask_shift;
            table.entry(key).or_default().push(idx);
        }
        for bucket in table.values_mut() {
            // Stable: equally specific operations keep declaration order.
            bucket.sort_by(|a, b| {
                operations[*b]
                    .specificity()
                    .cmp(&operations[*a].specificity())
            });
            warn_on_duplicates(&operations, bucket);
        }

        debug!(
            operations = operations.len(),
            mask = format_args!("{mask:#06x}"),
            buckets = table.len(),
            "built instruction set"
        );

        Ok(Self {
            operations,
            mask,
            mask_shift,
            table,
        })
    }

    pub fn operations(&self) -> &[Arc<Operation>] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Bits shared as fixed bits by every operation; the coarse dispatch key.
    pub fn mask(&self) -> u16 {
        self.mask
    }

    pub fn mask_shift(&self) -> u32 {
        self.mask_shift
    }

    pub fn dispatch_key(&self, word: u16) -> u16 {
        (word & self.mask) >> self.mask_shift
    }

    /// Candidates for a dispatch key, most specific first.
    pub fn bucket(&self, key: u16) -> impl Iterator<Item = &Arc<Operation>> + '_ {
        self.table
            .get(&key)
            .into_iter()
            .flatten()
            .map(|idx| &self.operations[*idx])
    }

    /// Index into [`InstructionSet::operations`] of the operation matching `word`.
    pub fn lookup_index(&self, word: u16) -> Option<usize> {
        let bucket = self.table.get(&self.dispatch_key(word))?;
        bucket
            .iter()
            .copied()
            .find(|idx| self.operations[*idx].matches(word))
    }

    pub fn lookup(&self, word: u16) -> Option<&Arc<Operation>> {
        self.lookup_index(word).map(|idx| &self.operations[idx])
    }

    pub fn decode(&self, word: u16) -> Option<DecodedInstruction> {
        self.lookup(word)
            .map(|op| DecodedInstruction::new(word, Arc::clone(op)))
    }

    /// All operations sharing `mnemonic`, in declaration order.
    pub fn find<'a>(&'a self, mnemonic: &'a str) -> impl Iterator<Item = &'a Arc<Operation>> + 'a {
        self.operations
            .iter()
            .filter(move |op| op.mnemonic() == mnemonic)
    }
}

fn warn_on_duplicates(operations: &[Arc<Operation>], bucket: &[usize]) {
    for (pos, a) in bucket.iter().enumerate() {
        for b in &bucket[pos + 1..] {
            let (first, second) = (&operations[*a], &operations[*b]);
            if first.mask() == second.mask() && first.opcode() == second.opcode() {
                warn!(
                    first = first.mnemonic(),
                    second = second.mnemonic(),
                    opcode = format_args!("{:#06x}", first.opcode()),
                    "duplicate encoding; the later operation is unreachable"
                );
            }
        }
    }
}
