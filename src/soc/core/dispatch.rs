use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::soc::isa::machine::{DecodedInstruction, InstructionCache, InstructionSet};
use crate::soc::isa::operation::Operation;
use crate::soc::isa::semantics::{CompileError, CompiledFn, Context, ExecError, Program, Value, compile};

/// A decoded word paired with the handler compiled for its operation, if any.
#[derive(Debug, Clone)]
pub struct ResolvedInstruction {
    pub decoded: DecodedInstruction,
    pub handler: Option<CompiledFn>,
}

impl ResolvedInstruction {
    pub fn mnemonic(&self) -> &str {
        self.decoded.mnemonic()
    }
}

/// Outcome of [`Dispatcher::execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Executed { word: u16, mnemonic: String },
    /// No operation matches the word; the caller maps this to its illegal-opcode behavior.
    Illegal { word: u16 },
    /// The word decodes but no semantics were supplied for its operation.
    Unimplemented { word: u16, mnemonic: String },
}

pub enum DispatchError {
    Compile(CompileError),
    Exec { word: u16, source: ExecError },
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Compile(err) => write!(f, "semantics error: {err}"),
            DispatchError::Exec { word, source } => {
                write!(f, "execution of {word:#06X} failed: {source}")
            }
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Compile(err) => Some(err),
            DispatchError::Exec { source, .. } => Some(source),
        }
    }
}

impl fmt::Debug for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl From<CompileError> for DispatchError {
    fn from(value: CompileError) -> Self {
        DispatchError::Compile(value)
    }
}

/// Decode/execute stage for one machine.
///
/// The instruction set is shared; the decode cache belongs to this dispatcher alone.
pub struct Dispatcher {
    isa: Arc<InstructionSet>,
    handlers: Vec<Option<CompiledFn>>,
    cache: InstructionCache<Arc<ResolvedInstruction>>,
}

impl Dispatcher {
    /// Compiles one handler per operation. `semantics` returns `None` for operations that
    /// have no behavior yet; executing those yields [`Step::Unimplemented`].
    pub fn new<F>(isa: Arc<InstructionSet>, mut semantics: F) -> Result<Self, DispatchError>
    where
        F: FnMut(&Operation) -> Option<Program>,
    {
        let handlers = isa
            .operations()
            .iter()
            .map(|operation| semantics(operation).map(|program| compile(&program)).transpose())
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            operations = handlers.len(),
            implemented = handlers.iter().filter(|handler| handler.is_some()).count(),
            "compiled dispatcher handlers"
        );
        Ok(Self {
            isa,
            handlers,
            cache: InstructionCache::new(),
        })
    }

    pub fn instruction_set(&self) -> &Arc<InstructionSet> {
        &self.isa
    }

    pub fn cache(&self) -> &InstructionCache<Arc<ResolvedInstruction>> {
        &self.cache
    }

    pub fn handler(&self, index: usize) -> Option<&CompiledFn> {
        self.handlers.get(index)?.as_ref()
    }

    /// Decodes `word`, consulting the cache first. Misses are not cached.
    pub fn resolve(&mut self, word: u16) -> Option<Arc<ResolvedInstruction>> {
        if let Some(hit) = self.cache.get(word) {
            return Some(Arc::clone(hit));
        }
        let index = self.isa.lookup_index(word)?;
        trace!(word = format_args!("{word:#06x}"), "decode cache miss");
        let operation = Arc::clone(&self.isa.operations()[index]);
        let resolved = Arc::new(ResolvedInstruction {
            decoded: DecodedInstruction::new(word, operation),
            handler: self.handlers[index].clone(),
        });
        self.cache.put(word, Arc::clone(&resolved));
        Some(resolved)
    }

    pub fn execute(&mut self, word: u16, ctx: &mut dyn Context) -> Result<Step, DispatchError> {
        let Some(resolved) = self.resolve(word) else {
            return Ok(Step::Illegal { word });
        };
        let mnemonic = resolved.mnemonic().to_string();
        let Some(handler) = &resolved.handler else {
            return Ok(Step::Unimplemented { word, mnemonic });
        };
        let mut operands: SmallVec<[Value; 4]> =
            resolved.decoded.operands.iter().copied().map(Value::from).collect();
        handler
            .call(ctx, &mut operands)
            .map_err(|source| DispatchError::Exec { word, source })?;
        Ok(Step::Executed { word, mnemonic })
    }

    /// Drops the cached decode for `word`, e.g. after program memory holding it was rewritten.
    pub fn invalidate(&mut self, word: u16) {
        self.cache.invalidate(word);
    }

    pub fn invalidate_all(&mut self) {
        self.cache.invalidate_all();
    }
}
