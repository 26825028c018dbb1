//! Expression tree with resolved identities.

use serde::{Deserialize, Serialize};

use common_error::{TesselError, TesselResult};
use tessel_core::{ColumnId, DataType, ResourceRequest, Value};

use super::{BinaryOp, FuncExpr, ScalarFunc};

/// Unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Logical NOT.
    Not,
    /// Numeric negation.
    Neg,
    /// Is null check.
    IsNull,
    /// Is not null check.
    IsNotNull,
}

impl UnaryOp {
    /// Get the result type of this operator given the input type.
    pub fn result_type(&self, input: &DataType) -> Option<DataType> {
        match self {
            Self::Not => matches!(input, DataType::Bool | DataType::Null).then_some(DataType::Bool),
            Self::Neg => match input {
                t if t.is_numeric() => Some(t.clone()),
                DataType::Null => Some(DataType::Null),
                _ => None,
            },
            Self::IsNull | Self::IsNotNull => Some(DataType::Bool),
        }
    }
}

impl std::fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Not => write!(f, "NOT"),
            Self::Neg => write!(f, "-"),
            Self::IsNull => write!(f, "IS NULL"),
            Self::IsNotNull => write!(f, "IS NOT NULL"),
        }
    }
}

/// A reference to a column by name.
///
/// Once bound, the reference carries the type of the expression it points
/// to; the identity lives on the owning [`Expression`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRef {
    /// Column name.
    pub name: String,
    /// Resolved (or declared) type.
    pub dtype: Option<DataType>,
}

/// Node variants of an expression tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExprKind {
    /// Column reference.
    Column(ColumnRef),
    /// Literal value.
    Literal(Value),
    /// Unary operation.
    Unary { op: UnaryOp, expr: Box<Expression> },
    /// Binary operation.
    Binary {
        left: Box<Expression>,
        op: BinaryOp,
        right: Box<Expression>,
    },
    /// Function call.
    Call(FuncExpr),
    /// Renamed expression.
    Alias { expr: Box<Expression>, name: String },
}

/// An expression node with an optional resolved identity.
///
/// Identity rules:
/// - a column reference carries the identity of the expression it is bound to
/// - an alias shares the identity of its child
/// - every other node receives a fresh identity from [`Expression::assign_id`]
///
/// Two comparisons exist: [`is_same_as`](Self::is_same_as) compares
/// identities, [`is_equal_to`](Self::is_equal_to) (and `==`) compares
/// structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expression {
    id: Option<ColumnId>,
    kind: ExprKind,
}

impl Expression {
    fn from_kind(kind: ExprKind) -> Self {
        Self { id: None, kind }
    }

    /// Create an unbound column reference.
    pub fn column(name: impl Into<String>) -> Self {
        Self::from_kind(ExprKind::Column(ColumnRef {
            name: name.into(),
            dtype: None,
        }))
    }

    /// Create a source column with a declared type.
    ///
    /// Source columns are resolved without an input schema.
    pub fn typed_column(name: impl Into<String>, dtype: DataType) -> Self {
        Self::from_kind(ExprKind::Column(ColumnRef {
            name: name.into(),
            dtype: Some(dtype),
        }))
    }

    /// Create a literal expression.
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::from_kind(ExprKind::Literal(value.into()))
    }

    /// Create a unary expression.
    pub fn unary(op: UnaryOp, expr: Self) -> Self {
        Self::from_kind(ExprKind::Unary {
            op,
            expr: Box::new(expr),
        })
    }

    /// Create a binary expression.
    pub fn binary(left: Self, op: BinaryOp, right: Self) -> Self {
        Self::from_kind(ExprKind::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    /// Create a function call.
    pub fn call(func: ScalarFunc, args: Vec<Self>) -> Self {
        Self::from_kind(ExprKind::Call(FuncExpr::new(func, args)))
    }

    /// Create a function call that needs specific resources.
    pub fn call_with_resources(func: ScalarFunc, args: Vec<Self>, request: ResourceRequest) -> Self {
        Self::from_kind(ExprKind::Call(
            FuncExpr::new(func, args).with_resource_request(request),
        ))
    }

    /// Rename this expression.
    pub fn alias(self, name: impl Into<String>) -> Self {
        let id = self.id;
        Self {
            id,
            kind: ExprKind::Alias {
                expr: Box::new(self),
                name: name.into(),
            },
        }
    }

    // Comparison operators

    /// Equality comparison.
    pub fn eq(self, other: Self) -> Self {
        Self::binary(self, BinaryOp::Eq, other)
    }

    /// Inequality comparison.
    pub fn not_eq(self, other: Self) -> Self {
        Self::binary(self, BinaryOp::NotEq, other)
    }

    /// Less than comparison.
    pub fn lt(self, other: Self) -> Self {
        Self::binary(self, BinaryOp::Lt, other)
    }

    /// Less than or equal comparison.
    pub fn lt_eq(self, other: Self) -> Self {
        Self::binary(self, BinaryOp::LtEq, other)
    }

    /// Greater than comparison.
    pub fn gt(self, other: Self) -> Self {
        Self::binary(self, BinaryOp::Gt, other)
    }

    /// Greater than or equal comparison.
    pub fn gt_eq(self, other: Self) -> Self {
        Self::binary(self, BinaryOp::GtEq, other)
    }

    // Logical operators

    /// Logical AND.
    pub fn and(self, other: Self) -> Self {
        Self::binary(self, BinaryOp::And, other)
    }

    /// Logical OR.
    pub fn or(self, other: Self) -> Self {
        Self::binary(self, BinaryOp::Or, other)
    }

    /// Logical NOT.
    pub fn logical_not(self) -> Self {
        Self::unary(UnaryOp::Not, self)
    }

    // Null checks

    /// Is null check.
    pub fn is_null(self) -> Self {
        Self::unary(UnaryOp::IsNull, self)
    }

    /// Is not null check.
    pub fn is_not_null(self) -> Self {
        Self::unary(UnaryOp::IsNotNull, self)
    }

    // Arithmetic operators

    /// Addition.
    pub fn add_expr(self, other: Self) -> Self {
        Self::binary(self, BinaryOp::Add, other)
    }

    /// Subtraction.
    pub fn sub_expr(self, other: Self) -> Self {
        Self::binary(self, BinaryOp::Subtract, other)
    }

    /// Multiplication.
    pub fn mul_expr(self, other: Self) -> Self {
        Self::binary(self, BinaryOp::Multiply, other)
    }

    /// True division.
    pub fn div_expr(self, other: Self) -> Self {
        Self::binary(self, BinaryOp::Divide, other)
    }

    /// Modulo.
    pub fn rem_expr(self, other: Self) -> Self {
        Self::binary(self, BinaryOp::Modulo, other)
    }

    /// Numeric negation.
    pub fn neg_expr(self) -> Self {
        Self::unary(UnaryOp::Neg, self)
    }

    /// String concatenation.
    pub fn concat(self, other: Self) -> Self {
        Self::binary(self, BinaryOp::Concat, other)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// The node variant.
    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }

    /// Resolved identity, if assigned.
    pub fn id(&self) -> Option<ColumnId> {
        self.id
    }

    /// Display name.
    ///
    /// Columns and aliases name themselves; literals have no name; every
    /// other node takes the name of its first named input.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Column(col) => Some(&col.name),
            ExprKind::Alias { name, .. } => Some(name),
            ExprKind::Literal(_) => None,
            _ => self.children().into_iter().find_map(Self::name),
        }
    }

    /// Whether this is a bare column reference.
    pub fn is_column(&self) -> bool {
        matches!(self.kind, ExprKind::Column(_))
    }

    /// Whether evaluating this expression computes anything.
    ///
    /// False only for a column reference or an alias of one.
    pub fn has_call(&self) -> bool {
        match &self.kind {
            ExprKind::Column(_) => false,
            ExprKind::Alias { expr, .. } => expr.has_call(),
            _ => true,
        }
    }

    /// Direct children.
    pub fn children(&self) -> Vec<&Self> {
        match &self.kind {
            ExprKind::Column(_) | ExprKind::Literal(_) => vec![],
            ExprKind::Unary { expr, .. } | ExprKind::Alias { expr, .. } => vec![expr.as_ref()],
            ExprKind::Binary { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            ExprKind::Call(func) => func.args.iter().collect(),
        }
    }

    fn children_mut(&mut self) -> Vec<&mut Self> {
        match &mut self.kind {
            ExprKind::Column(_) | ExprKind::Literal(_) => vec![],
            ExprKind::Unary { expr, .. } | ExprKind::Alias { expr, .. } => vec![expr.as_mut()],
            ExprKind::Binary { left, right, .. } => vec![left.as_mut(), right.as_mut()],
            ExprKind::Call(func) => func.args.iter_mut().collect(),
        }
    }

    /// Column references this expression reads, in tree order.
    ///
    /// With `unresolved_only`, references already bound to an identity are
    /// skipped.
    pub fn required_columns(&self, unresolved_only: bool) -> Vec<&Self> {
        let mut out = Vec::new();
        self.collect_columns(unresolved_only, &mut out);
        out
    }

    fn collect_columns<'a>(&'a self, unresolved_only: bool, out: &mut Vec<&'a Self>) {
        if self.is_column() {
            if !unresolved_only || self.id.is_none() {
                out.push(self);
            }
            return;
        }
        for child in self.children() {
            child.collect_columns(unresolved_only, out);
        }
    }

    /// Visit every column reference mutably, stopping at the first error.
    pub fn try_for_each_column_mut<F>(&mut self, f: &mut F) -> TesselResult<()>
    where
        F: FnMut(&mut Self) -> TesselResult<()>,
    {
        if self.is_column() {
            return f(self);
        }
        for child in self.children_mut() {
            child.try_for_each_column_mut(f)?;
        }
        // An alias mirrors its child's identity.
        if let ExprKind::Alias { expr, .. } = &self.kind {
            self.id = expr.id;
        }
        Ok(())
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Compute the value type of this expression.
    ///
    /// Fails with `UnresolvedColumn` for a reference with no type and with
    /// `TypeResolution` when an operator does not accept its inputs.
    pub fn resolved_type(&self) -> TesselResult<DataType> {
        match &self.kind {
            ExprKind::Column(col) => col.dtype.clone().ok_or_else(|| {
                TesselError::unresolved_column(format!("column '{}' is not bound", col.name))
            }),
            ExprKind::Literal(value) => Ok(value.data_type()),
            ExprKind::Unary { op, expr } => {
                let input = expr.resolved_type()?;
                op.result_type(&input).ok_or_else(|| {
                    TesselError::type_resolution(format!("{op} is not defined for {input}"))
                })
            }
            ExprKind::Binary { left, op, right } => {
                let l = left.resolved_type()?;
                let r = right.resolved_type()?;
                op.result_type(&l, &r).ok_or_else(|| {
                    TesselError::type_resolution(format!("{l} {op} {r} is not defined"))
                })
            }
            ExprKind::Call(func) => {
                let args = func
                    .args
                    .iter()
                    .map(Self::resolved_type)
                    .collect::<TesselResult<Vec<_>>>()?;
                func.func.result_type(&args)
            }
            ExprKind::Alias { expr, .. } => expr.resolved_type(),
        }
    }

    /// Bind this column reference to a resolved expression.
    ///
    /// The reference takes the target's identity and resolved type.
    pub fn resolve_to_expression(&mut self, target: &Self) -> TesselResult<()> {
        let id = target.id.ok_or_else(|| {
            TesselError::internal(format!("cannot bind to unresolved expression {target}"))
        })?;
        let dtype = target.resolved_type()?;
        match &mut self.kind {
            ExprKind::Column(col) => {
                col.dtype = Some(dtype);
                self.id = Some(id);
                Ok(())
            }
            _ => Err(TesselError::internal(format!(
                "only column references can be bound, got {self}"
            ))),
        }
    }

    /// Assign an identity to this node.
    ///
    /// Non-strict assignment is idempotent. Strict assignment fails if an
    /// identity already exists.
    pub fn assign_id(&mut self, strict: bool) -> TesselResult<ColumnId> {
        if let ExprKind::Alias { expr, .. } = &mut self.kind {
            let id = expr.assign_id(strict)?;
            self.id = Some(id);
            return Ok(id);
        }
        match self.id {
            Some(id) if strict => Err(TesselError::internal(format!(
                "identity {id} already assigned to {self}"
            ))),
            Some(id) => Ok(id),
            None => {
                let id = ColumnId::next();
                self.id = Some(id);
                Ok(id)
            }
        }
    }

    /// A copy of this expression with every identity removed.
    ///
    /// Declared column types are kept so source columns can be resolved again.
    #[must_use]
    pub fn unresolve(&self) -> Self {
        let mut out = self.clone();
        out.clear_ids();
        out
    }

    fn clear_ids(&mut self) {
        self.id = None;
        for child in self.children_mut() {
            child.clear_ids();
        }
    }

    /// A bare column reference to this (resolved) expression's output.
    pub fn to_column_expression(&self) -> TesselResult<Self> {
        let id = self.id.ok_or_else(|| {
            TesselError::internal(format!("expression {self} has no identity"))
        })?;
        let name = self.name().ok_or_else(|| {
            TesselError::internal(format!("expression {self} has no name"))
        })?;
        Ok(Self {
            id: Some(id),
            kind: ExprKind::Column(ColumnRef {
                name: name.to_string(),
                dtype: Some(self.resolved_type()?),
            }),
        })
    }

    // ========================================================================
    // Comparison
    // ========================================================================

    /// Identity equality: both sides resolved to the same column.
    pub fn is_same_as(&self, other: &Self) -> bool {
        matches!((self.id, other.id), (Some(a), Some(b)) if a == b)
    }

    /// Structural equality.
    ///
    /// Column references compare name and binding; identities of computed
    /// nodes are ignored.
    pub fn is_equal_to(&self, other: &Self) -> bool {
        match (&self.kind, &other.kind) {
            (ExprKind::Column(a), ExprKind::Column(b)) => a.name == b.name && self.id == other.id,
            (ExprKind::Literal(a), ExprKind::Literal(b)) => a.key_eq(b),
            (
                ExprKind::Unary { op: op_a, expr: a },
                ExprKind::Unary { op: op_b, expr: b },
            ) => op_a == op_b && a.is_equal_to(b),
            (
                ExprKind::Binary {
                    left: la,
                    op: op_a,
                    right: ra,
                },
                ExprKind::Binary {
                    left: lb,
                    op: op_b,
                    right: rb,
                },
            ) => op_a == op_b && la.is_equal_to(lb) && ra.is_equal_to(rb),
            (ExprKind::Call(a), ExprKind::Call(b)) => {
                a.func == b.func
                    && a.args.len() == b.args.len()
                    && a.args.iter().zip(&b.args).all(|(x, y)| x.is_equal_to(y))
            }
            (
                ExprKind::Alias { expr: a, name: na },
                ExprKind::Alias { expr: b, name: nb },
            ) => na == nb && a.is_equal_to(b),
            _ => false,
        }
    }

    /// Combined resource request of every call in this expression.
    pub fn resource_request(&self) -> ResourceRequest {
        let own = match &self.kind {
            ExprKind::Call(FuncExpr {
                resource_request: Some(req),
                ..
            }) => req.clone(),
            _ => ResourceRequest::default(),
        };
        self.children()
            .into_iter()
            .fold(own, |acc, child| acc.max(&child.resource_request()))
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        self.is_equal_to(other)
    }
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ExprKind::Column(col) => match self.id {
                Some(id) => write!(f, "{}{}", col.name, id),
                None => write!(f, "{}", col.name),
            },
            ExprKind::Literal(value) => write!(f, "{value}"),
            ExprKind::Unary { op, expr } => match op {
                UnaryOp::IsNull | UnaryOp::IsNotNull => write!(f, "{expr} {op}"),
                UnaryOp::Neg => write!(f, "-{expr}"),
                UnaryOp::Not => write!(f, "NOT {expr}"),
            },
            ExprKind::Binary { left, op, right } => write!(f, "({left} {op} {right})"),
            ExprKind::Call(func) => {
                write!(f, "{}(", func.func)?;
                for (i, arg) in func.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            ExprKind::Alias { expr, name } => write!(f, "{expr} AS {name}"),
        }
    }
}
