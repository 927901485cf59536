use std::collections::HashSet;
use std::ops::Range;

use tracing::{debug, trace};

use crate::analysis::branch::BranchStack;
use crate::analysis::classify::{
    is_assignment_operator, is_identifier, is_member_access, is_type_keyword,
};
use crate::analysis::declaration::{is_binding_name, try_parse_declaration, Declaration};
use crate::analysis::definitions::{
    class_body_at, extract_parameter_bindings, function_signature_at, lambda_signature_at,
    prototype_parameters_end_at,
};
use crate::analysis::navigator::{
    find_next_meaningful, find_next_token, find_prev_meaningful, is_meaningful, split_top_level,
    BracketIndex,
};
use crate::analysis::scope::{ScopeTable, VariableRecord, VariableState};
use crate::analysis::AnalyzeOptions;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::lexer::Token;
use crate::position::PositionResolver;

/// Arguments of `sscanf` from this index on are written, not read.
const SSCANF_FIRST_OUTPUT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActivationKind {
    /// The whole file. Runs to the end of its range.
    Global,
    /// A braced function, lambda or class body. Ends at its closing brace.
    Body,
}

/// Loop variables bound by a `foreach` whose body is a bare statement. No
/// closing brace removes them, so they are released once the cursor passes
/// the end of that statement.
struct LoopScope {
    ends_at: usize,
    scope_depth: usize,
    names: Vec<String>,
}

/// One pending activation: a token range and the table it starts with.
struct Job {
    range: Range<usize>,
    table: ScopeTable,
    kind: ActivationKind,
}

/// Single-pass uninitialized-use scanner.
///
/// Function, lambda and class bodies are not scanned in place. They are
/// queued as jobs with their own tables and processed from a work stack, so
/// nesting depth in the input never turns into call-stack depth.
pub struct FlowScanner<'a> {
    tokens: &'a [Token],
    positions: &'a dyn PositionResolver,
    options: &'a AnalyzeOptions,
    brackets: BracketIndex,
    jobs: Vec<Job>,
    diagnostics: Diagnostics,
}

impl<'a> FlowScanner<'a> {
    pub fn new(
        tokens: &'a [Token],
        positions: &'a dyn PositionResolver,
        options: &'a AnalyzeOptions,
    ) -> Self {
        Self {
            tokens,
            positions,
            options,
            brackets: BracketIndex::new(tokens),
            jobs: Vec::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn run(mut self) -> Diagnostics {
        self.jobs.push(Job {
            range: 0..self.tokens.len(),
            table: ScopeTable::new(),
            kind: ActivationKind::Global,
        });

        let mut activations = 0usize;
        while let Some(job) = self.jobs.pop() {
            activations += 1;
            Activation::new(&mut self, job).scan();
        }

        debug!(
            activations,
            diagnostics = self.diagnostics.len(),
            "flow scan finished"
        );
        self.diagnostics.sort_by_position();
        self.diagnostics
    }
}

struct Activation<'s, 'a> {
    scanner: &'s mut FlowScanner<'a>,
    tokens: &'a [Token],
    start: usize,
    end: usize,
    kind: ActivationKind,
    table: ScopeTable,
    depth: usize,
    branches: BranchStack,
    /// Name tokens of `T a, b;` continuations, which are not reads.
    binding_sites: HashSet<usize>,
    /// Innermost last; a nested bare loop never ends after its parent.
    loop_scopes: Vec<LoopScope>,
}

impl<'s, 'a> Activation<'s, 'a> {
    fn new(scanner: &'s mut FlowScanner<'a>, job: Job) -> Self {
        let tokens = scanner.tokens;
        let merge_else_branches = scanner.options.merge_else_branches;
        Self {
            scanner,
            tokens,
            start: job.range.start,
            end: job.range.end.min(tokens.len()),
            kind: job.kind,
            table: job.table,
            depth: 0,
            branches: BranchStack::new(merge_else_branches),
            binding_sites: HashSet::new(),
            loop_scopes: Vec::new(),
        }
    }

    fn scan(mut self) {
        debug!(
            kind = ?self.kind,
            start = self.start,
            end = self.end,
            seeded = self.table.len(),
            "scanning activation"
        );

        let mut index = self.start;
        while index < self.end {
            let token = &self.tokens[index];
            if !is_meaningful(token) {
                index += 1;
                continue;
            }
            self.release_loop_scopes(index);
            self.branches
                .advance(index, token.text == "else", &mut self.table);
            match self.step(index) {
                Some(next) => index = next.max(index + 1),
                None => break,
            }
        }
    }

    /// Handles the token at `index` and returns where to continue, or `None`
    /// when the activation is over.
    fn step(&mut self, index: usize) -> Option<usize> {
        let tokens = self.tokens;
        let text = tokens[index].text.as_str();
        match text {
            "{" => {
                self.depth += 1;
                return Some(index + 1);
            }
            "}" => return self.close_block(index),
            _ => {}
        }

        if let Some(next) = self.schedule_definition(index) {
            return Some(next);
        }
        if let Some(params_close) = prototype_parameters_end_at(tokens, index, self.end) {
            trace!(line = tokens[index].line, "skipping prototype parameters");
            return Some(params_close + 1);
        }
        if text == "class" {
            if let Some(next) = self.schedule_class(index) {
                return Some(next);
            }
        }
        if is_type_keyword(text) {
            if let Some(next) = self.declare(index) {
                return Some(next);
            }
        }

        match text {
            "if" => {
                self.open_if(index);
                Some(index + 1)
            }
            "else" => {
                self.enter_else(index);
                Some(index + 1)
            }
            "foreach" => Some(self.bind_foreach(index).unwrap_or(index + 1)),
            "sscanf" => Some(self.bind_sscanf_outputs(index).unwrap_or(index + 1)),
            _ if self.table.contains(text) => Some(self.visit_tracked(index)),
            _ => Some(index + 1),
        }
    }

    fn close_block(&mut self, index: usize) -> Option<usize> {
        if self.depth == 0 {
            // Stray closer: ends a body, ignored at file level.
            return match self.kind {
                ActivationKind::Body => None,
                ActivationKind::Global => Some(index + 1),
            };
        }
        self.table.remove_at_or_below(self.depth);
        self.depth -= 1;
        if self.kind == ActivationKind::Body && self.depth == 0 {
            return None;
        }
        Some(index + 1)
    }

    /// Queues a function or lambda body as its own activation, seeded with
    /// the parameters, and skips past it.
    fn schedule_definition(&mut self, index: usize) -> Option<usize> {
        let signature = lambda_signature_at(self.tokens, index, self.end)
            .or_else(|| function_signature_at(self.tokens, index, self.end))?;
        let body_close = self.scanner.brackets.closer(signature.body_open, self.end)?;
        let parameters = extract_parameter_bindings(
            self.tokens,
            signature.params_open,
            signature.params_close,
            self.scanner.positions,
        );
        trace!(
            line = self.tokens[index].line,
            parameters = parameters.len(),
            "queueing function body"
        );
        self.scanner.jobs.push(Job {
            range: signature.body_open..body_close + 1,
            table: ScopeTable::with_parameters(parameters),
            kind: ActivationKind::Body,
        });
        Some(body_close + 1)
    }

    /// Queues a class body seeded with the records visible here, so member
    /// initializers see enclosing declarations. Methods inside it are found
    /// by the definition rule when that activation runs.
    fn schedule_class(&mut self, index: usize) -> Option<usize> {
        let body_open = class_body_at(self.tokens, index, self.end)?;
        let body_close = self.scanner.brackets.closer(body_open, self.end)?;
        self.scanner.jobs.push(Job {
            range: body_open..body_close + 1,
            table: self.table.rebased(),
            kind: ActivationKind::Body,
        });
        Some(body_close + 1)
    }

    fn declare(&mut self, index: usize) -> Option<usize> {
        if self.follows_typedef(index) {
            // `typedef T Alias;` names a type, not a variable.
            let end = find_next_token(self.tokens, index, self.end, ";");
            return Some(end.map_or(index + 1, |semicolon| semicolon + 1));
        }
        let declaration = try_parse_declaration(self.tokens, index, self.end)?;
        self.register(
            &declaration.name,
            &declaration.declared_type,
            declaration.has_initializer,
            declaration.name_index,
        );
        for (name_index, has_initializer) in self.continuation_bindings(&declaration) {
            let name = self.tokens[name_index].text.clone();
            self.register(&name, &declaration.declared_type, has_initializer, name_index);
            self.binding_sites.insert(name_index);
        }
        Some(declaration.end_index)
    }

    fn follows_typedef(&self, index: usize) -> bool {
        index
            .checked_sub(1)
            .and_then(|previous| find_prev_meaningful(self.tokens, previous, self.start))
            .map(|previous| self.tokens[previous].text == "typedef")
            .unwrap_or(false)
    }

    fn register(
        &mut self,
        name: &str,
        declared_type: &str,
        has_initializer: bool,
        name_index: usize,
    ) {
        let position = self.scanner.positions.resolve(self.tokens, name_index);
        let record = VariableRecord::declared(
            name,
            declared_type,
            has_initializer,
            position.line,
            position.character,
            self.depth,
        );
        trace!(
            variable = %name,
            declared_type = %declared_type,
            state = record.state.describe(),
            depth = self.depth,
            "declared"
        );
        self.table.declare(record);
    }

    /// Further names in `T a = x, b, c = y;` after the first binding.
    fn continuation_bindings(&self, declaration: &Declaration) -> Vec<(usize, bool)> {
        let mut bindings = Vec::new();
        let mut depth = 0usize;
        let mut index = declaration.name_index + 1;
        while index < self.end {
            match self.tokens[index].text.as_str() {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                ";" if depth == 0 => break,
                "," if depth == 0 => {
                    let Some(name_index) = find_next_meaningful(self.tokens, index + 1, self.end)
                    else {
                        break;
                    };
                    if !is_binding_name(&self.tokens[name_index].text) {
                        break;
                    }
                    let has_initializer =
                        find_next_meaningful(self.tokens, name_index + 1, self.end)
                            .map(|next| self.tokens[next].text == "=")
                            .unwrap_or(false);
                    bindings.push((name_index, has_initializer));
                    index = name_index;
                }
                _ => {}
            }
            index += 1;
        }
        bindings
    }

    fn open_if(&mut self, index: usize) {
        let Some(open) = find_next_meaningful(self.tokens, index + 1, self.end) else {
            return;
        };
        if self.tokens[open].text != "(" {
            return;
        }
        let brackets = &self.scanner.brackets;
        let Some(close) = brackets.closer(open, self.end) else {
            return;
        };
        let Some(then_end) = brackets.statement_end(self.tokens, close + 1, self.end) else {
            return;
        };
        self.branches.open_if(close, then_end);
    }

    fn enter_else(&mut self, index: usize) {
        let else_end = self
            .scanner
            .brackets
            .statement_end(self.tokens, index + 1, self.end)
            .unwrap_or(usize::MAX);
        if self.branches.enter_else(index, else_end, &mut self.table) {
            trace!(line = self.tokens[index].line, "else arm restored pre-branch state");
        }
    }

    /// `foreach (expr; [type] index; [type] value)` and `foreach (expr, var)`.
    fn bind_foreach(&mut self, index: usize) -> Option<usize> {
        let open = find_next_meaningful(self.tokens, index + 1, self.end)?;
        if self.tokens[open].text != "(" {
            return None;
        }
        let close = self.scanner.brackets.closer(open, self.end)?;
        let segments = split_top_level(self.tokens, open + 1, close, &[";", ","]);
        if segments.len() < 2 {
            return None;
        }

        self.check_reads_in(segments[0].clone());
        let names: Vec<String> = segments[1..]
            .iter()
            .filter_map(|segment| self.bind_loop_variable(segment.clone()))
            .collect();

        let body_is_block = find_next_meaningful(self.tokens, close + 1, self.end)
            .map(|body| self.tokens[body].text == "{")
            .unwrap_or(false);
        if !body_is_block && !names.is_empty() {
            if let Some(ends_at) =
                self.scanner
                    .brackets
                    .statement_end(self.tokens, close + 1, self.end)
            {
                self.loop_scopes.push(LoopScope {
                    ends_at,
                    scope_depth: self.depth + 1,
                    names,
                });
            }
        }
        Some(close + 1)
    }

    /// Declares a typed loop binding and returns its name, or marks an
    /// existing variable as assigned.
    fn bind_loop_variable(&mut self, segment: Range<usize>) -> Option<String> {
        let first = find_next_meaningful(self.tokens, segment.start, segment.end)?;
        let text = self.tokens[first].text.as_str();
        if is_type_keyword(text) {
            let declaration = try_parse_declaration(self.tokens, first, segment.end)?;
            let position = self
                .scanner
                .positions
                .resolve(self.tokens, declaration.name_index);
            let mut record = VariableRecord::declared(
                &declaration.name,
                &declaration.declared_type,
                true,
                position.line,
                position.character,
                self.depth + 1,
            );
            record.needs_init_check = false;
            self.table.declare(record);
            return Some(declaration.name);
        }
        if is_identifier(text) {
            if let Some(record) = self.table.get_mut(text) {
                if record.state != VariableState::Unknown {
                    record.state = VariableState::Initialized;
                }
                record.needs_init_check = false;
            }
        }
        None
    }

    fn release_loop_scopes(&mut self, index: usize) {
        while let Some(scope) = self.loop_scopes.last() {
            if index <= scope.ends_at {
                break;
            }
            if let Some(scope) = self.loop_scopes.pop() {
                for name in &scope.names {
                    self.table.release(name, scope.scope_depth);
                }
            }
        }
    }

    /// `sscanf(input, format, out...)`: the first two arguments are read,
    /// the rest are written.
    fn bind_sscanf_outputs(&mut self, index: usize) -> Option<usize> {
        let open = find_next_meaningful(self.tokens, index + 1, self.end)?;
        if self.tokens[open].text != "(" {
            return None;
        }
        let close = self.scanner.brackets.closer(open, self.end)?;
        let arguments = split_top_level(self.tokens, open + 1, close, &[","]);

        for (position, argument) in arguments.into_iter().enumerate() {
            if position < SSCANF_FIRST_OUTPUT {
                self.check_reads_in(argument);
                continue;
            }
            match self.sole_meaningful(argument.clone()) {
                Some(target) if self.table.contains(&self.tokens[target].text) => {
                    let name = self.tokens[target].text.as_str();
                    trace!(variable = %name, "written by sscanf");
                    self.table.mark_initialized(name);
                }
                _ => self.check_reads_in(argument),
            }
        }
        Some(close + 1)
    }

    fn sole_meaningful(&self, range: Range<usize>) -> Option<usize> {
        let first = find_next_meaningful(self.tokens, range.start, range.end)?;
        match find_next_meaningful(self.tokens, first + 1, range.end) {
            Some(_) => None,
            None => Some(first),
        }
    }

    /// Applies the assignment and read rules to tracked identifiers in
    /// `range` without any of the structural rules.
    fn check_reads_in(&mut self, range: Range<usize>) {
        let mut index = range.start;
        while index < range.end {
            if self.table.contains(&self.tokens[index].text) {
                index = self.visit_tracked(index).max(index + 1);
            } else {
                index += 1;
            }
        }
    }

    /// A tracked identifier is either assigned, or read.
    fn visit_tracked(&mut self, index: usize) -> usize {
        let tokens = self.tokens;
        let name = tokens[index].text.as_str();

        if let Some(previous) = index
            .checked_sub(1)
            .and_then(|previous| find_prev_meaningful(tokens, previous, self.start))
        {
            let previous = tokens[previous].text.as_str();
            if is_member_access(previous) || is_type_keyword(previous) {
                return index + 1;
            }
        }

        if let Some(operator) = find_next_meaningful(tokens, index + 1, self.end) {
            if is_assignment_operator(&tokens[operator].text) {
                trace!(variable = %name, line = tokens[index].line, "assigned");
                self.table.mark_initialized(name);
                return operator + 1;
            }
        }

        if !self.binding_sites.contains(&index) {
            self.check_read(index);
        }
        index + 1
    }

    fn check_read(&mut self, index: usize) {
        let tokens = self.tokens;
        let name = tokens[index].text.as_str();
        let Some(record) = self.table.get_mut(name) else {
            return;
        };
        if !record.needs_init_check {
            return;
        }
        let maybe = match record.state {
            VariableState::Initialized | VariableState::Unknown => return,
            VariableState::MaybeInitialized if !self.scanner.options.report_maybe_initialized => {
                return
            }
            VariableState::MaybeInitialized => true,
            VariableState::Uninitialized => false,
        };
        record.state = VariableState::Unknown;

        let position = self.scanner.positions.resolve(tokens, index);
        debug!(
            variable = %name,
            line = position.line,
            character = position.character,
            maybe,
            "risky read"
        );
        let diagnostic = if maybe {
            Diagnostic::maybe_uninitialized(name, position)
        } else {
            Diagnostic::used_before_initialized(name, position)
        };
        self.scanner.diagnostics.push(diagnostic);
    }
}
