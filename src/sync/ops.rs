// Delta operations.
//
// The generator emits, and the applicator consumes, a stream of:
//   - Literal:    bytes copied verbatim into the output
//   - BlockCopy:  one old-content block copied verbatim
//   - BlockRange: consecutive old-content blocks `first..=last`
//
// Concatenating each operation's contribution in order yields exactly the
// new content. BlockRange is only produced when coalescing is enabled.

use crate::error::Result;

/// One reconstruction instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Raw bytes, at most `max_literal_run` long.
    Literal(Vec<u8>),
    /// Copy old block `index` (`block_size` bytes, or the short tail).
    BlockCopy { index: u64 },
    /// Copy old blocks `first..=last`.
    BlockRange { first: u64, last: u64 },
}

impl Operation {
    /// Whether this is a literal.
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    /// Number of old blocks referenced (0 for literals).
    pub fn block_count(&self) -> u64 {
        match self {
            Self::Literal(_) => 0,
            Self::BlockCopy { .. } => 1,
            Self::BlockRange { first, last } => last.saturating_sub(*first) + 1,
        }
    }
}

/// Copy for a contiguous run of blocks.
fn run_op(first: u64, last: u64) -> Operation {
    if first == last {
        Operation::BlockCopy { index: first }
    } else {
        Operation::BlockRange { first, last }
    }
}

/// Try to merge two adjacent operations into one.
///
/// Only block references merge; literals keep their bounded size.
pub fn try_coalesce(a: &Operation, b: &Operation) -> Option<Operation> {
    let (a_first, a_last) = match *a {
        Operation::BlockCopy { index } => (index, index),
        Operation::BlockRange { first, last } => (first, last),
        Operation::Literal(_) => return None,
    };
    let (b_first, b_last) = match *b {
        Operation::BlockCopy { index } => (index, index),
        Operation::BlockRange { first, last } => (first, last),
        Operation::Literal(_) => return None,
    };
    if a_last.checked_add(1) == Some(b_first) {
        Some(run_op(a_first, b_last))
    } else {
        None
    }
}

/// Merge contiguous block references in a finished operation list.
pub fn coalesce<I: IntoIterator<Item = Operation>>(ops: I) -> Vec<Operation> {
    let mut out: Vec<Operation> = Vec::new();
    for op in ops {
        if let Some(last) = out.last_mut() {
            if let Some(merged) = try_coalesce(last, &op) {
                *last = merged;
                continue;
            }
        }
        out.push(op);
    }
    out
}

/// Streaming block-run merger used by the generator.
#[derive(Debug, Default)]
pub(crate) struct Coalescer {
    pending: Option<(u64, u64)>,
}

impl Coalescer {
    /// Feed one operation; completed operations go to `emit`.
    pub(crate) fn push<F>(&mut self, op: Operation, emit: &mut F) -> Result<()>
    where
        F: FnMut(Operation) -> Result<()>,
    {
        match op {
            Operation::BlockCopy { index } => self.extend(index, index, emit),
            Operation::BlockRange { first, last } => self.extend(first, last, emit),
            literal @ Operation::Literal(_) => {
                self.finish(emit)?;
                emit(literal)
            }
        }
    }

    fn extend<F>(&mut self, first: u64, last: u64, emit: &mut F) -> Result<()>
    where
        F: FnMut(Operation) -> Result<()>,
    {
        match self.pending {
            Some((p_first, p_last)) if p_last.checked_add(1) == Some(first) => {
                self.pending = Some((p_first, last));
                Ok(())
            }
            _ => {
                self.finish(emit)?;
                self.pending = Some((first, last));
                Ok(())
            }
        }
    }

    /// Emit any pending run.
    pub(crate) fn finish<F>(&mut self, emit: &mut F) -> Result<()>
    where
        F: FnMut(Operation) -> Result<()>,
    {
        match self.pending.take() {
            Some((first, last)) => emit(run_op(first, last)),
            None => Ok(()),
        }
    }
}

/// Summary of an operation stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationStats {
    /// Total operations seen.
    pub operations: u64,
    /// Literal operations.
    pub literal_ops: u64,
    /// Literal payload bytes.
    pub literal_bytes: u64,
    /// Block copy/range operations.
    pub copy_ops: u64,
    /// Old blocks referenced.
    pub copied_blocks: u64,
}

impl OperationStats {
    /// Account for one operation.
    pub fn record(&mut self, op: &Operation) {
        self.operations += 1;
        match op {
            Operation::Literal(data) => {
                self.literal_ops += 1;
                self.literal_bytes += data.len() as u64;
            }
            _ => {
                self.copy_ops += 1;
                self.copied_blocks += op.block_count();
            }
        }
    }
}

impl<'a> FromIterator<&'a Operation> for OperationStats {
    fn from_iter<I: IntoIterator<Item = &'a Operation>>(iter: I) -> Self {
        let mut stats = Self::default();
        for op in iter {
            stats.record(op);
        }
        stats
    }
}
