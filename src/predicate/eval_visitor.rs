use super::{eval::MalformedComparison, Comparison};

/// Observes predicate evaluation.
///
/// The evaluator never fails: malformed comparisons evaluate to `false`. Callers that want to log
/// or record those data-integrity problems pass a visitor.
pub trait EvalVisitor {
    /// Called when `comparison` could not be applied to the resolved value and evaluated to
    /// `false`.
    #[allow(unused_variables)]
    #[inline]
    fn on_malformed(&mut self, comparison: &Comparison, reason: MalformedComparison) {}
}

/// Dummy visitor that does nothing.
///
/// It is designed so that all calls to it are optimized away (zero-cost).
pub struct NoopEvalVisitor;

impl EvalVisitor for NoopEvalVisitor {}

impl<V: EvalVisitor + ?Sized> EvalVisitor for &mut V {
    #[inline]
    fn on_malformed(&mut self, comparison: &Comparison, reason: MalformedComparison) {
        (**self).on_malformed(comparison, reason)
    }
}
