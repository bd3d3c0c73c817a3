//! Analysis context tracker.
//!
//! A stack machine the phases thread their position through: the current
//! module and phase, a span stack for diagnostic locations, a declaration
//! stack for self-initialization detection, an expression-context stack
//! for misplaced control statements, and the in-flight type keys of the
//! collection cycle guard. Every push must be matched by a pop;
//! [`ContextTracker::with_saved_state`] makes that hold across early
//! exits by snapshotting all depths and truncating back afterwards.

use crate::phase::AnalysisPhase;
use crate::scope::ScopeId;
use crate::symbols::SymbolId;
use drift_core::Span;
use rustc_hash::FxHashMap;

/// Where a declaration currently is in its own processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclPhase {
    /// The name is being declared; its initializer has not started.
    Declaring,
    /// The initializer expression is being walked. A reference to the
    /// declared name from here is self-initialization.
    Initializing,
}

/// One frame of the declaration stack.
#[derive(Debug, Clone)]
pub struct DeclFrame {
    pub name: String,
    pub symbol: Option<SymbolId>,
    pub phase: DeclPhase,
    pub span: Span,
    pub scope: ScopeId,
}

/// What kind of construct an expression-context frame models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprContext {
    Function,
    Loop,
    Conditional,
    Match,
    Catch,
    Initializer,
}

/// One frame of the expression-context stack.
#[derive(Debug, Clone)]
pub struct ExprFrame {
    pub context: ExprContext,
    pub related: Option<SymbolId>,
    /// Stack depth at push time.
    pub depth: usize,
    pub span: Span,
}

/// Snapshot of every stack depth, taken by [`ContextTracker::save`].
#[derive(Debug, Clone)]
pub struct ContextSnapshot {
    module: Option<String>,
    span_depth: usize,
    decl_depth: usize,
    expr_depth: usize,
    type_key_depth: usize,
}

#[derive(Debug)]
pub struct ContextTracker {
    module: Option<String>,
    phase: AnalysisPhase,
    span_stack: Vec<Span>,
    decl_stack: Vec<DeclFrame>,
    expr_stack: Vec<ExprFrame>,
    /// `(type name, scope name)` keys currently being collected; re-entry
    /// is a type cycle.
    type_keys: Vec<(String, String)>,
    /// Sibling parameter indices while a function's parameter list is
    /// being processed.
    param_indices: FxHashMap<String, usize>,
    /// Index of the parameter whose default value is being walked.
    current_param: Option<usize>,
}

impl ContextTracker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            module: None,
            phase: AnalysisPhase::Collection,
            span_stack: Vec::new(),
            decl_stack: Vec::new(),
            expr_stack: Vec::new(),
            type_keys: Vec::new(),
            param_indices: FxHashMap::default(),
            current_param: None,
        }
    }

    /// Clears every stack and register.
    pub fn reset(&mut self) {
        self.module = None;
        self.phase = AnalysisPhase::Collection;
        self.span_stack.clear();
        self.decl_stack.clear();
        self.expr_stack.clear();
        self.type_keys.clear();
        self.param_indices.clear();
        self.current_param = None;
    }

    pub fn set_phase(&mut self, phase: AnalysisPhase) {
        self.phase = phase;
    }

    #[must_use]
    pub fn phase(&self) -> AnalysisPhase {
        self.phase
    }

    pub fn enter_module(&mut self, name: impl Into<String>) {
        self.module = Some(name.into());
    }

    pub fn leave_module(&mut self) {
        self.module = None;
    }

    #[must_use]
    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    // --- span stack ---

    pub fn push_span(&mut self, span: Span) {
        self.span_stack.push(span);
    }

    pub fn pop_span(&mut self) {
        debug_assert!(!self.span_stack.is_empty(), "span stack underflow");
        self.span_stack.pop();
    }

    /// The innermost span, for diagnostics with no better location.
    #[must_use]
    pub fn current_span(&self) -> Span {
        self.span_stack.last().copied().unwrap_or(Span::SYNTHETIC)
    }

    // --- declaration stack ---

    pub fn push_decl(
        &mut self,
        name: impl Into<String>,
        symbol: Option<SymbolId>,
        span: Span,
        scope: ScopeId,
    ) {
        self.decl_stack.push(DeclFrame {
            name: name.into(),
            symbol,
            phase: DeclPhase::Declaring,
            span,
            scope,
        });
    }

    /// Marks the innermost declaration as walking its initializer.
    pub fn begin_initializer(&mut self) {
        if let Some(frame) = self.decl_stack.last_mut() {
            frame.phase = DeclPhase::Initializing;
        }
    }

    pub fn pop_decl(&mut self) {
        debug_assert!(!self.decl_stack.is_empty(), "declaration stack underflow");
        self.decl_stack.pop();
    }

    /// Whether `name` is currently having its own initializer walked.
    /// This is how `let x = x + 1` is caught without a data-flow pass.
    #[must_use]
    pub fn check_self_reference(&self, name: &str) -> Option<&DeclFrame> {
        self.decl_stack
            .iter()
            .rev()
            .find(|frame| frame.phase == DeclPhase::Initializing && frame.name == name)
    }

    // --- expression-context stack ---

    pub fn push_expr(&mut self, context: ExprContext, related: Option<SymbolId>, span: Span) {
        let depth = self.expr_stack.len();
        self.expr_stack.push(ExprFrame {
            context,
            related,
            depth,
            span,
        });
    }

    pub fn pop_expr(&mut self) {
        debug_assert!(!self.expr_stack.is_empty(), "expression stack underflow");
        self.expr_stack.pop();
    }

    /// The innermost frame of the given context kind.
    #[must_use]
    pub fn innermost(&self, context: ExprContext) -> Option<&ExprFrame> {
        self.expr_stack
            .iter()
            .rev()
            .find(|frame| frame.context == context)
    }

    #[must_use]
    pub fn in_context(&self, context: ExprContext) -> bool {
        self.innermost(context).is_some()
    }

    /// The function whose body is currently being walked.
    #[must_use]
    pub fn enclosing_function(&self) -> Option<SymbolId> {
        self.innermost(ExprContext::Function)?.related
    }

    // --- type cycle guard ---

    pub fn push_type_key(&mut self, ty: impl Into<String>, scope_name: impl Into<String>) {
        self.type_keys.push((ty.into(), scope_name.into()));
    }

    pub fn pop_type_key(&mut self) {
        debug_assert!(!self.type_keys.is_empty(), "type key stack underflow");
        self.type_keys.pop();
    }

    #[must_use]
    pub fn is_processing_type(&self, ty: &str, scope_name: &str) -> bool {
        self.type_keys
            .iter()
            .any(|(t, s)| t == ty && s == scope_name)
    }

    /// Current type-traversal nesting depth.
    #[must_use]
    pub fn type_depth(&self) -> usize {
        self.type_keys.len()
    }

    // --- parameter table ---

    /// Installs the sibling index table for one function's parameters.
    pub fn begin_params<I>(&mut self, names: I)
    where
        I: IntoIterator<Item = (String, usize)>,
    {
        self.param_indices.clear();
        self.param_indices.extend(names);
        self.current_param = None;
    }

    pub fn end_params(&mut self) {
        self.param_indices.clear();
        self.current_param = None;
    }

    /// Marks which parameter's default value is being walked.
    pub fn set_current_param(&mut self, index: Option<usize>) {
        self.current_param = index;
    }

    /// Inside a default value, a reference to a later sibling parameter
    /// is a forward reference. Returns `(referenced, current)` indices.
    #[must_use]
    pub fn forward_reference(&self, name: &str) -> Option<(usize, usize)> {
        let current = self.current_param?;
        let referenced = *self.param_indices.get(name)?;
        (referenced > current).then_some((referenced, current))
    }

    // --- checkpoint / restore ---

    #[must_use]
    pub fn save(&self) -> ContextSnapshot {
        ContextSnapshot {
            module: self.module.clone(),
            span_depth: self.span_stack.len(),
            decl_depth: self.decl_stack.len(),
            expr_depth: self.expr_stack.len(),
            type_key_depth: self.type_keys.len(),
        }
    }

    /// Truncates every stack back to the snapshot, dropping whatever was
    /// pushed since.
    pub fn restore(&mut self, snapshot: ContextSnapshot) {
        self.module = snapshot.module;
        self.span_stack.truncate(snapshot.span_depth);
        self.decl_stack.truncate(snapshot.decl_depth);
        self.expr_stack.truncate(snapshot.expr_depth);
        self.type_keys.truncate(snapshot.type_key_depth);
    }

    /// Runs `f`, restoring all stack depths afterwards no matter how it
    /// exits. Non-linear traversal (catch bodies, branch re-walks) wraps
    /// itself in this so a leaked frame cannot corrupt later diagnostics.
    pub fn with_saved_state<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let snapshot = self.save();
        let result = f(self);
        self.restore(snapshot);
        result
    }
}

impl Default for ContextTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ScopeStore;

    fn scope() -> ScopeId {
        ScopeStore::new().global()
    }

    #[test]
    fn current_span_is_the_top_of_stack() {
        let mut ctx = ContextTracker::new();
        assert_eq!(ctx.current_span(), Span::SYNTHETIC);

        ctx.push_span(Span::new(0, 10));
        ctx.push_span(Span::new(4, 8));
        assert_eq!(ctx.current_span(), Span::new(4, 8));

        ctx.pop_span();
        assert_eq!(ctx.current_span(), Span::new(0, 10));
    }

    #[test]
    fn self_reference_only_during_initializer() {
        let mut ctx = ContextTracker::new();
        ctx.push_decl("x", None, Span::new(0, 5), scope());

        assert!(ctx.check_self_reference("x").is_none());

        ctx.begin_initializer();
        assert!(ctx.check_self_reference("x").is_some());
        assert!(ctx.check_self_reference("y").is_none());

        ctx.pop_decl();
        assert!(ctx.check_self_reference("x").is_none());
    }

    #[test]
    fn forward_parameter_reference_detected() {
        let mut ctx = ContextTracker::new();
        ctx.begin_params([("a".to_string(), 0), ("b".to_string(), 1), ("c".to_string(), 2)]);

        // Inside b's default value: c is forward, a is not.
        ctx.set_current_param(Some(1));
        assert_eq!(ctx.forward_reference("c"), Some((2, 1)));
        assert_eq!(ctx.forward_reference("a"), None);
        assert_eq!(ctx.forward_reference("b"), None);
        assert_eq!(ctx.forward_reference("unknown"), None);

        ctx.end_params();
        assert_eq!(ctx.forward_reference("c"), None);
    }

    #[test]
    fn innermost_expression_context_wins() {
        let mut ctx = ContextTracker::new();
        ctx.push_expr(ExprContext::Function, None, Span::new(0, 100));
        ctx.push_expr(ExprContext::Loop, None, Span::new(10, 50));
        ctx.push_expr(ExprContext::Conditional, None, Span::new(20, 30));

        assert!(ctx.in_context(ExprContext::Loop));
        assert_eq!(ctx.innermost(ExprContext::Loop).unwrap().depth, 1);
        assert!(ctx.innermost(ExprContext::Match).is_none());
    }

    #[test]
    fn saved_state_truncates_leaked_frames() {
        let mut ctx = ContextTracker::new();
        ctx.push_span(Span::new(0, 1));

        ctx.with_saved_state(|ctx| {
            ctx.push_span(Span::new(2, 3));
            ctx.push_decl("x", None, Span::new(2, 3), scope());
            ctx.push_expr(ExprContext::Catch, None, Span::new(2, 3));
            ctx.push_type_key("Node", "main");
            // Frames deliberately not popped.
        });

        assert_eq!(ctx.current_span(), Span::new(0, 1));
        assert!(ctx.check_self_reference("x").is_none());
        assert!(!ctx.in_context(ExprContext::Catch));
        assert!(!ctx.is_processing_type("Node", "main"));
    }

    #[test]
    fn type_keys_track_in_flight_types() {
        let mut ctx = ContextTracker::new();
        ctx.push_type_key("Node", "main");
        ctx.push_type_key("Leaf", "main");

        assert!(ctx.is_processing_type("Node", "main"));
        assert!(!ctx.is_processing_type("Node", "other"));
        assert_eq!(ctx.type_depth(), 2);

        ctx.pop_type_key();
        assert!(!ctx.is_processing_type("Leaf", "main"));
    }
}
