//! Named, resolved lists of expressions.
//!
//! An [`ExpressionList`] is both a schema (the columns a partition holds)
//! and a projection (the columns to compute from an input schema).

use std::collections::{BTreeSet, HashMap};

use common_error::{TesselError, TesselResult};
use tessel_core::{ColumnId, ResourceRequest};

use crate::expr::Expression;

/// An ordered list of expressions with unique display names.
///
/// `exprs` and `names` stay index-aligned. An entry without a name of its
/// own is named `col_{index}`.
#[derive(Debug, Clone)]
pub struct ExpressionList {
    exprs: Vec<Expression>,
    names: Vec<String>,
}

impl ExpressionList {
    /// Create a list, taking ownership of the expressions.
    ///
    /// Fails with `DuplicateName` if two entries share a name.
    pub fn new(exprs: Vec<Expression>) -> TesselResult<Self> {
        let mut names = Vec::with_capacity(exprs.len());
        let mut seen = HashMap::with_capacity(exprs.len());
        for (i, e) in exprs.iter().enumerate() {
            let name = e.name().map_or_else(|| format!("col_{i}"), str::to_string);
            if let Some(prev) = seen.insert(name.clone(), i) {
                return Err(TesselError::duplicate_name(format!(
                    "'{name}' is used by entries {prev} and {i}"
                )));
            }
            names.push(name);
        }
        Ok(Self { exprs, names })
    }

    /// Create an empty list.
    pub fn empty() -> Self {
        Self {
            exprs: Vec::new(),
            names: Vec::new(),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    /// Whether the list has no entries.
    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    /// Iterate over the expressions.
    pub fn iter(&self) -> std::slice::Iter<'_, Expression> {
        self.exprs.iter()
    }

    /// The expressions, in order.
    pub fn exprs(&self) -> &[Expression] {
        &self.exprs
    }

    /// The display names, in order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Whether an entry has the same identity as `column`.
    pub fn contains(&self, column: &Expression) -> bool {
        self.exprs.iter().any(|e| e.is_same_as(column))
    }

    /// Look up an entry by display name.
    pub fn get_expression_by_name(&self, name: &str) -> Option<&Expression> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.exprs[i])
    }

    /// Look up an entry by identity.
    pub fn get_expression_by_id(&self, id: ColumnId) -> Option<&Expression> {
        self.exprs.iter().find(|e| e.id() == Some(id))
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Resolve every entry and assign identities.
    ///
    /// Without an input schema every entry must be a source column with a
    /// declared type; an untyped bare column fails with `UnresolvedColumn`
    /// here rather than later at evaluation. With one, every unbound column
    /// reference is bound by name to the matching entry of `input_schema`.
    /// Resolving an already resolved list again is a no-op.
    pub fn resolve(mut self, input_schema: Option<&Self>) -> TesselResult<Self> {
        match input_schema {
            None => {
                for e in &mut self.exprs {
                    if !e.is_column() {
                        return Err(TesselError::invalid_parameter(format!(
                            "{e} is not a column; only columns resolve without an input schema"
                        )));
                    }
                    e.resolved_type()?;
                    e.assign_id(false)?;
                }
            }
            Some(input) => {
                for e in &mut self.exprs {
                    e.try_for_each_column_mut(&mut |column| {
                        if column.id().is_some() {
                            return Ok(());
                        }
                        let name = column.name().unwrap_or_default();
                        let target = input.get_expression_by_name(name).ok_or_else(|| {
                            TesselError::unresolved_column(format!(
                                "column '{name}' not found. Available columns: {}",
                                input.names.join(", ")
                            ))
                        })?;
                        column.resolve_to_expression(target)
                    })?;
                    e.resolved_type()?;
                    e.assign_id(false)?;
                }
            }
        }
        log::trace!("resolved expression list {self}");
        Ok(self)
    }

    /// A copy with every identity removed, ready to bind against another input.
    pub fn unresolve(&self) -> TesselResult<Self> {
        Self::new(self.exprs.iter().map(Expression::unresolve).collect())
    }

    // ========================================================================
    // Projection and merging
    // ========================================================================

    /// Project to exactly the named entries, in the requested order.
    ///
    /// Fails with `NotFound` if a name is absent.
    pub fn keep<S: AsRef<str>>(&self, to_keep: &[S]) -> TesselResult<Self> {
        let exprs = to_keep
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.get_expression_by_name(name).cloned().ok_or_else(|| {
                    TesselError::not_found(format!(
                        "'{name}' not in [{}]",
                        self.names.join(", ")
                    ))
                })
            })
            .collect::<TesselResult<Vec<_>>>()?;
        Self::new(exprs)
    }

    /// Merge two lists by name.
    ///
    /// Structurally equal entries with the same name are kept once. Different
    /// entries with the same name fail with `Conflict` when `strict`, and
    /// otherwise the right-hand entry is renamed to `rename_prefix + name`.
    /// Unnamed entries are always appended.
    pub fn union(&self, other: &Self, strict: bool, rename_prefix: &str) -> TesselResult<Self> {
        let mut deduped: Vec<Expression> = self.exprs.clone();
        let mut seen: HashMap<String, usize> = self
            .exprs
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.name().map(|n| (n.to_string(), i)))
            .collect();

        for e in &other.exprs {
            let Some(name) = e.name() else {
                deduped.push(e.clone());
                continue;
            };
            match seen.get(name) {
                Some(&idx) if deduped[idx].is_equal_to(e) => {}
                Some(_) if strict => {
                    return Err(TesselError::conflict(format!(
                        "'{name}' is bound to {} and {e}",
                        self.get_expression_by_name(name)
                            .map_or_else(String::new, ToString::to_string)
                    )));
                }
                Some(_) => {
                    let renamed = format!("{rename_prefix}{name}");
                    log::debug!("union renames '{name}' to '{renamed}'");
                    seen.insert(renamed.clone(), deduped.len());
                    deduped.push(e.clone().alias(renamed));
                }
                None => {
                    seen.insert(name.to_string(), deduped.len());
                    deduped.push(e.clone());
                }
            }
        }
        Self::new(deduped)
    }

    /// Bare column references to every entry's output.
    pub fn to_column_expressions(&self) -> TesselResult<Self> {
        Self::new(
            self.exprs
                .iter()
                .map(Expression::to_column_expression)
                .collect::<TesselResult<Vec<_>>>()?,
        )
    }

    /// Every column reference required by any entry, de-duplicated by name.
    ///
    /// The first occurrence of a name fixes its position and the last
    /// occurrence wins.
    pub fn required_columns(&self) -> TesselResult<Self> {
        let mut columns: Vec<Expression> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for e in &self.exprs {
            for column in e.required_columns(false) {
                let name = column.name().unwrap_or_default().to_string();
                match positions.get(&name) {
                    Some(&pos) => columns[pos] = column.clone(),
                    None => {
                        positions.insert(name, columns.len());
                        columns.push(column.clone());
                    }
                }
            }
        }
        Self::new(columns)
    }

    /// The identities of every entry.
    ///
    /// Fails if an entry is unresolved.
    pub fn to_id_set(&self) -> TesselResult<BTreeSet<ColumnId>> {
        self.exprs
            .iter()
            .map(|e| {
                e.id()
                    .ok_or_else(|| TesselError::internal(format!("{e} has no identity")))
            })
            .collect()
    }

    /// Element-wise maximum of every entry's resource request.
    pub fn resource_request(&self) -> ResourceRequest {
        let requests: Vec<ResourceRequest> =
            self.exprs.iter().map(Expression::resource_request).collect();
        ResourceRequest::max_resources(&requests)
    }
}

impl PartialEq for ExpressionList {
    fn eq(&self, other: &Self) -> bool {
        self.exprs.len() == other.exprs.len()
            && self
                .exprs
                .iter()
                .zip(&other.exprs)
                .all(|(a, b)| a.is_equal_to(b))
    }
}

impl<'a> IntoIterator for &'a ExpressionList {
    type Item = &'a Expression;
    type IntoIter = std::slice::Iter<'a, Expression>;

    fn into_iter(self) -> Self::IntoIter {
        self.exprs.iter()
    }
}

impl std::fmt::Display for ExpressionList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, e) in self.exprs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{e}")?;
        }
        write!(f, "]")
    }
}
