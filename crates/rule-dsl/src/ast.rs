//! Abstract syntax tree for a parsed rule expression.

/// A literal value: string, number, boolean, null, or a list of the above.
pub type Literal = serde_json::Value;

/// Something a comparison or membership test can be evaluated against.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A dotted field path into the evaluation context, e.g. `card.bin`.
    Field(Vec<String>),
    /// A literal value.
    Literal(Literal),
    /// A call to a recognised built-in, e.g. `velocity_24h('amount')`.
    Call {
        /// Built-in function name.
        name: String,
        /// Literal arguments.
        args: Vec<Literal>,
    },
}

/// A comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompOp {
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `>=`
    Ge,
    /// `<=`
    Le,
    /// `==`
    Eq,
    /// `!=`
    Ne,
}

/// A single predicate: a bare truthy operand, a comparison, or a membership
/// test.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// An operand evaluated for truthiness on its own, e.g. a bare
    /// `is_flagged` identifier with no comparison.
    Truthy(Operand),
    /// `left op right`.
    Compare {
        /// Left-hand operand.
        left: Operand,
        /// Comparison operator.
        op: CompOp,
        /// Right-hand operand.
        right: Operand,
    },
    /// `left IN [literal, literal, ...]`.
    In {
        /// Left-hand operand.
        left: Operand,
        /// Membership set.
        items: Vec<Literal>,
    },
}

/// A parsed rule expression: `OR` of `AND`s of (optionally negated)
/// predicates. The grammar is intentionally flat — no parenthesised
/// sub-expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `a OR b OR c`. Binds looser than `And`.
    Or(Vec<Expr>),
    /// `a AND b AND c`.
    And(Vec<Expr>),
    /// `NOT a`.
    Not(Box<Expr>),
    /// A leaf predicate.
    Pred(Predicate),
}
