use std::collections::HashMap;

use crate::analysis::classify::needs_init_check;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableState {
    /// Declared, never assigned.
    Uninitialized,
    /// Assigned on some but not all paths reaching the current point.
    MaybeInitialized,
    /// Assigned on every path reaching the current point.
    Initialized,
    /// Already reported once; further reads stay silent.
    Unknown,
}

impl VariableState {
    pub fn describe(self) -> &'static str {
        match self {
            VariableState::Uninitialized => "uninitialized",
            VariableState::MaybeInitialized => "maybe initialized",
            VariableState::Initialized => "initialized",
            VariableState::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableRecord {
    pub name: String,
    pub declared_type: String,
    pub state: VariableState,
    pub declaration_line: usize,
    pub declaration_column: usize,
    pub scope_depth: usize,
    pub needs_init_check: bool,
}

impl VariableRecord {
    pub fn declared(
        name: &str,
        declared_type: &str,
        has_initializer: bool,
        line: usize,
        column: usize,
        scope_depth: usize,
    ) -> Self {
        Self {
            name: name.to_string(),
            declared_type: declared_type.to_string(),
            state: if has_initializer {
                VariableState::Initialized
            } else {
                VariableState::Uninitialized
            },
            declaration_line: line,
            declaration_column: column,
            scope_depth,
            needs_init_check: needs_init_check(declared_type),
        }
    }

    /// Parameters live in the function's own top scope and are never
    /// reported.
    pub fn parameter(name: &str, declared_type: &str, line: usize, column: usize) -> Self {
        Self {
            name: name.to_string(),
            declared_type: declared_type.to_string(),
            state: VariableState::Initialized,
            declaration_line: line,
            declaration_column: column,
            scope_depth: 1,
            needs_init_check: false,
        }
    }
}

/// Live variables of one activation.
///
/// A name maps to a stack of records so an inner declaration shadows an
/// outer one and the outer record becomes visible again when the inner
/// block closes. Lookups always see the innermost record.
#[derive(Debug, Clone, Default)]
pub struct ScopeTable {
    records: HashMap<String, Vec<VariableRecord>>,
}

impl ScopeTable {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    pub fn with_parameters(parameters: Vec<VariableRecord>) -> Self {
        let mut table = Self::new();
        for parameter in parameters {
            table.declare(parameter);
        }
        table
    }

    pub fn declare(&mut self, record: VariableRecord) {
        self.records
            .entry(record.name.clone())
            .or_default()
            .push(record);
    }

    /// Drops every record declared at `scope_depth` or deeper.
    pub fn remove_at_or_below(&mut self, scope_depth: usize) {
        self.records.retain(|_, shadows| {
            shadows.retain(|record| record.scope_depth < scope_depth);
            !shadows.is_empty()
        });
    }

    /// The visible records, moved to the outermost depth of a new activation
    /// so no block closing inside it can drop them.
    pub fn rebased(&self) -> ScopeTable {
        let mut table = ScopeTable::new();
        for record in self.iter() {
            table.declare(VariableRecord {
                scope_depth: 0,
                ..record.clone()
            });
        }
        table
    }

    /// Drops the visible record of `name` if it was declared at
    /// `scope_depth`, revealing whatever it shadowed.
    pub fn release(&mut self, name: &str, scope_depth: usize) {
        let Some(shadows) = self.records.get_mut(name) else {
            return;
        };
        if shadows.last().map(|record| record.scope_depth) == Some(scope_depth) {
            shadows.pop();
        }
        if shadows.is_empty() {
            self.records.remove(name);
        }
    }

    /// Records an assignment. A record that was already reported stays
    /// `Unknown` so a later branch restore cannot report it again.
    pub fn mark_initialized(&mut self, name: &str) {
        if let Some(record) = self.get_mut(name) {
            if record.state != VariableState::Unknown {
                record.state = VariableState::Initialized;
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&VariableRecord> {
        self.records.get(name).and_then(|shadows| shadows.last())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut VariableRecord> {
        self.records
            .get_mut(name)
            .and_then(|shadows| shadows.last_mut())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    /// The visible record of every tracked name.
    pub fn iter(&self) -> impl Iterator<Item = &VariableRecord> {
        self.records.values().filter_map(|shadows| shadows.last())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
