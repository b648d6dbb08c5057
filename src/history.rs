//! Reversible history (4.K / spec numbering "K"): per-step deltas of
//! register and memory state, with undo and redo stacks.
//!
//! Grounded on the teacher's plain small-struct-plus-`Vec`-stack style
//! (no external crate needed for this — it's exactly the kind of
//! bookkeeping `processor/logic.rs`'s `TickResult` already did locally).

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RegisterBank {
    Gpr,
    Fpr,
    Csr,
}

#[derive(Clone, Debug)]
pub struct RegisterChange {
    pub bank: RegisterBank,
    pub index: usize,
    pub old_value: u64,
    pub new_value: u64,
}

#[derive(Clone, Debug)]
pub struct MemoryChange {
    pub address: u64,
    pub old_bytes: Vec<u8>,
    pub new_bytes: Vec<u8>,
}

/// Every architectural mutation produced by retiring one instruction.
#[derive(Clone, Debug, Default)]
pub struct StepDelta {
    pub old_pc: u64,
    pub new_pc: u64,
    pub register_changes: Vec<RegisterChange>,
    pub memory_changes: Vec<MemoryChange>,
}

impl StepDelta {
    pub fn new(old_pc: u64, new_pc: u64) -> StepDelta {
        StepDelta {
            old_pc,
            new_pc,
            register_changes: Vec::new(),
            memory_changes: Vec::new(),
        }
    }

    pub fn push_register_change(&mut self, bank: RegisterBank, index: usize, old_value: u64, new_value: u64) {
        if old_value != new_value {
            self.register_changes.push(RegisterChange { bank, index, old_value, new_value });
        }
    }

    pub fn push_memory_change(&mut self, address: u64, old_bytes: Vec<u8>, new_bytes: Vec<u8>) {
        if old_bytes != new_bytes {
            self.memory_changes.push(MemoryChange { address, old_bytes, new_bytes });
        }
    }
}

/// Owns the undo/redo stacks. Holds no reference to the register file or
/// memory it describes — the execution driver applies deltas itself.
#[derive(Default)]
pub struct History {
    undo: Vec<StepDelta>,
    redo: Vec<StepDelta>,
}

impl History {
    pub fn new() -> History {
        Default::default()
    }

    pub fn commit(&mut self, delta: StepDelta) {
        self.undo.push(delta);
        self.redo.clear();
    }

    pub fn pop_undo(&mut self) -> Option<StepDelta> {
        let delta = self.undo.pop()?;
        self.redo.push(delta.clone());
        Some(delta)
    }

    pub fn pop_redo(&mut self) -> Option<StepDelta> {
        let delta = self.redo.pop()?;
        self.undo.push(delta.clone());
        Some(delta)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn undo_then_redo_restores_to_the_same_delta() {
        let mut history = History::new();
        let mut delta = StepDelta::new(0, 4);
        delta.push_register_change(RegisterBank::Gpr, 1, 0, 42);
        history.commit(delta);

        let undone = history.pop_undo().unwrap();
        assert_eq!(undone.new_pc, 4);
        assert!(!history.can_undo());
        assert!(history.can_redo());

        let redone = history.pop_redo().unwrap();
        assert_eq!(redone.old_pc, 0);
        assert!(history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn commit_clears_redo_stack() {
        let mut history = History::new();
        history.commit(StepDelta::new(0, 4));
        history.pop_undo();
        assert!(history.can_redo());

        history.commit(StepDelta::new(0, 4));
        assert!(!history.can_redo());
    }

    #[test]
    fn no_op_changes_are_not_recorded() {
        let mut delta = StepDelta::new(0, 4);
        delta.push_register_change(RegisterBank::Gpr, 5, 7, 7);
        assert!(delta.register_changes.is_empty());
    }
}
