use std::collections::HashMap;

use tracing::trace;

use crate::analysis::scope::{ScopeTable, VariableState};

pub type StateSnapshot = HashMap<String, VariableState>;

pub fn snapshot(table: &ScopeTable) -> StateSnapshot {
    table
        .iter()
        .map(|record| (record.name.clone(), record.state))
        .collect()
}

/// Rewinds every record named in `snapshot`. Records declared after the
/// snapshot are left alone, and records that were already reported stay
/// `Unknown`.
pub fn restore(table: &mut ScopeTable, snapshot: &StateSnapshot) {
    for (name, state) in snapshot {
        if let Some(record) = table.get_mut(name) {
            if record.state != VariableState::Unknown {
                record.state = *state;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind {
    If,
}

/// Which part of the conditional the cursor is in, with the index of the
/// last token of that part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arm {
    Condition { ends_at: usize, then_ends_at: usize },
    Then { ends_at: usize },
    Else { ends_at: usize },
}

#[derive(Debug, Clone)]
pub struct BranchFrame {
    pub kind: BranchKind,
    pub pre_branch_snapshot: StateSnapshot,
    pub then_branch_snapshot: Option<StateSnapshot>,
    arm: Arm,
}

/// Open conditionals of one activation, innermost last.
#[derive(Debug, Default)]
pub struct BranchStack {
    frames: Vec<BranchFrame>,
    merge_else_branches: bool,
}

impl BranchStack {
    pub fn new(merge_else_branches: bool) -> Self {
        Self {
            frames: Vec::new(),
            merge_else_branches,
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Opens a frame for an `if` whose condition closes at `condition_end`
    /// and whose then-arm ends at `then_end`. The baseline snapshot is taken
    /// once the condition has been scanned.
    pub fn open_if(&mut self, condition_end: usize, then_end: usize) {
        self.frames.push(BranchFrame {
            kind: BranchKind::If,
            pre_branch_snapshot: StateSnapshot::new(),
            then_branch_snapshot: None,
            arm: Arm::Condition {
                ends_at: condition_end,
                then_ends_at: then_end,
            },
        });
    }

    /// Settles every frame whose current arm ended before `index`. A then-arm
    /// followed by `else` stays open for [`BranchStack::enter_else`].
    pub fn advance(&mut self, index: usize, at_else: bool, table: &mut ScopeTable) {
        while let Some(frame) = self.frames.last_mut() {
            let arm = frame.arm;
            match arm {
                Arm::Condition {
                    ends_at,
                    then_ends_at,
                } if index > ends_at => {
                    frame.pre_branch_snapshot = snapshot(table);
                    frame.arm = Arm::Then {
                        ends_at: then_ends_at,
                    };
                }
                Arm::Then { ends_at } if index > ends_at => {
                    if at_else {
                        break;
                    }
                    settle_without_else(table, &frame.pre_branch_snapshot);
                    self.frames.pop();
                }
                Arm::Else { ends_at } if index > ends_at => {
                    if self.merge_else_branches {
                        if let Some(then_snapshot) = &frame.then_branch_snapshot {
                            merge_arms(table, then_snapshot);
                        }
                    }
                    self.frames.pop();
                }
                _ => break,
            }
        }
    }

    /// Switches the innermost frame from its finished then-arm to the else-arm
    /// at `index`, rewinding to the pre-branch baseline. Returns `false` when
    /// no such frame is open.
    pub fn enter_else(&mut self, index: usize, else_end: usize, table: &mut ScopeTable) -> bool {
        let Some(frame) = self.frames.last_mut() else {
            return false;
        };
        let arm = frame.arm;
        match arm {
            Arm::Then { ends_at } if index > ends_at => {
                frame.then_branch_snapshot = Some(snapshot(table));
                restore(table, &frame.pre_branch_snapshot);
                frame.arm = Arm::Else { ends_at: else_end };
                true
            }
            _ => false,
        }
    }
}

/// An `if` without `else` may have been skipped: whatever the then-arm
/// initialized is only maybe initialized afterwards.
fn settle_without_else(table: &mut ScopeTable, pre_branch: &StateSnapshot) {
    for (name, before) in pre_branch {
        if !matches!(
            before,
            VariableState::Uninitialized | VariableState::MaybeInitialized
        ) {
            continue;
        }
        if let Some(record) = table.get_mut(name) {
            if record.state == VariableState::Initialized {
                trace!(variable = %name, "assigned in one arm only");
                record.state = VariableState::MaybeInitialized;
            }
        }
    }
}

/// Union of both arms: initialized only when both arms initialized.
fn merge_arms(table: &mut ScopeTable, then_arm: &StateSnapshot) {
    for (name, then_state) in then_arm {
        let Some(record) = table.get_mut(name) else {
            continue;
        };
        record.state = match (*then_state, record.state) {
            (_, VariableState::Unknown) => VariableState::Unknown,
            (VariableState::Initialized, VariableState::Initialized) => VariableState::Initialized,
            (VariableState::Initialized | VariableState::MaybeInitialized, _)
            | (_, VariableState::Initialized | VariableState::MaybeInitialized) => {
                VariableState::MaybeInitialized
            }
            (_, current) => current,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::scope::VariableRecord;

    fn table_with(name: &str, state: VariableState) -> ScopeTable {
        let mut table = ScopeTable::new();
        let mut record = VariableRecord::declared(name, "string", false, 1, 0, 0);
        record.state = state;
        table.declare(record);
        table
    }

    fn state_of(table: &ScopeTable, name: &str) -> Option<VariableState> {
        table.get(name).map(|record| record.state)
    }

    #[test]
    fn restore_keeps_reported_records_silent() {
        let mut table = table_with("s", VariableState::Uninitialized);
        let before = snapshot(&table);
        table.get_mut("s").expect("record").state = VariableState::Unknown;
        restore(&mut table, &before);
        assert_eq!(state_of(&table, "s"), Some(VariableState::Unknown));
    }

    #[test]
    fn then_arm_without_else_is_maybe() {
        let mut table = table_with("s", VariableState::Uninitialized);
        let mut branches = BranchStack::new(false);
        branches.open_if(2, 5);
        branches.advance(3, false, &mut table);
        table.mark_initialized("s");
        branches.advance(6, false, &mut table);
        assert_eq!(branches.depth(), 0);
        assert_eq!(state_of(&table, "s"), Some(VariableState::MaybeInitialized));
    }

    #[test]
    fn merge_requires_both_arms() {
        let mut table = table_with("s", VariableState::Uninitialized);
        let mut branches = BranchStack::new(true);
        branches.open_if(2, 5);
        branches.advance(3, false, &mut table);
        table.mark_initialized("s");
        branches.advance(6, true, &mut table);
        assert!(branches.enter_else(6, 9, &mut table));
        assert_eq!(state_of(&table, "s"), Some(VariableState::Uninitialized));
        branches.advance(10, false, &mut table);
        assert_eq!(state_of(&table, "s"), Some(VariableState::MaybeInitialized));
    }
}
