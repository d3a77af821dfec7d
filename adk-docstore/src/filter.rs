//! Metadata filter expressions and their compiled predicates.
//!
//! A [`FilterExpression`] is a JSON object whose entries are conjoined:
//!
//! - `{"topic": "rust"}` matches rows whose `topic` equals `"rust"`;
//! - `{"year": {"in": [2023, 2024]}}` matches rows whose `year` is one of the
//!   listed values.
//!
//! [`FilterCompiler`] turns an expression into a [`Predicate`], which can be
//! evaluated against in-memory metadata ([`Predicate::matches`]) or rendered
//! as a parameterized JSONB clause ([`Predicate::to_sql`]). Both evaluations
//! share the same semantics: comparisons are type-aware and a key missing from
//! a row's metadata never matches.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::document::Metadata;
use crate::error::{DocStoreError, FilterError, Result};

/// A declarative metadata filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterExpression(Map<String, Value>);

impl FilterExpression {
    /// An empty filter, matching every row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a filter from a JSON value.
    ///
    /// `null` yields an empty filter.
    ///
    /// # Errors
    ///
    /// Returns [`DocStoreError::ValidationError`] if the value is not an object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            other => Err(DocStoreError::ValidationError(format!(
                "filter must be a JSON object, got {}",
                kind_name(&other)
            ))),
        }
    }

    /// Add a plain equality entry, replacing any entry already set on `key`.
    pub fn equal(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Add an operator entry, conjoined with what is already set on `key`.
    ///
    /// An existing equality entry is kept as `{"in": [value]}`. Setting an
    /// operator that is already present on `key` replaces its operand.
    pub fn op(mut self, key: impl Into<String>, operator: FilterOperator, operand: Value) -> Self {
        let entry = self.0.entry(key.into()).or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            let value = entry.take();
            let mut ops = Map::new();
            ops.insert(FilterOperator::In.as_str().to_string(), Value::Array(vec![value]));
            *entry = Value::Object(ops);
        }
        if let Value::Object(ops) = entry {
            ops.insert(operator.as_str().to_string(), operand);
        }
        self
    }

    /// Whether the filter has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The raw entries.
    pub fn entries(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl TryFrom<Value> for FilterExpression {
    type Error = DocStoreError;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(value)
    }
}

impl From<Map<String, Value>> for FilterExpression {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Operators usable in `{key: {op: operand}}` entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    /// Value is one of the operand elements. Always enabled.
    In,
    /// Value is present and none of the operand elements.
    NotIn,
    /// Value is present and differs from the operand.
    Ne,
    /// Value is greater than the operand.
    Gt,
    /// Value is greater than or equal to the operand.
    Gte,
    /// Value is less than the operand.
    Lt,
    /// Value is less than or equal to the operand.
    Lte,
    /// Value is an array containing at least one of the operand elements.
    ArrayContains,
}

impl FilterOperator {
    /// Operators that must be enabled through configuration.
    pub const EXTENSIONS: [FilterOperator; 7] = [
        Self::NotIn,
        Self::Ne,
        Self::Gt,
        Self::Gte,
        Self::Lt,
        Self::Lte,
        Self::ArrayContains,
    ];

    /// The operator's name in filter expressions.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "in",
            Self::NotIn => "notIn",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::ArrayContains => "arrayContains",
        }
    }

    /// Look up an operator by name.
    pub fn parse(name: &str) -> Option<Self> {
        std::iter::once(Self::In).chain(Self::EXTENSIONS).find(|op| op.as_str() == name)
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scalar metadata value used as a filter operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// JSON `null`.
    Null,
    /// A boolean.
    Bool(bool),
    /// A number, compared numerically. Integers compare exactly.
    Number(Number),
    /// A string, compared exactly.
    String(String),
}

impl Scalar {
    /// Convert a JSON value, returning `None` for arrays and objects.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Self::Null),
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => Some(Self::Number(n.clone())),
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Convert back to a JSON value.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => Value::Number(n.clone()),
            Self::String(s) => Value::String(s.clone()),
        }
    }

    /// Type-aware equality against a stored value.
    pub fn equals(&self, stored: &Value) -> bool {
        match (self, stored) {
            (Self::Null, Value::Null) => true,
            (Self::Bool(a), Value::Bool(b)) => a == b,
            (Self::Number(a), Value::Number(b)) => {
                compare_numbers(b, a).is_some_and(|ordering| ordering == Ordering::Equal)
            }
            (Self::String(a), Value::String(b)) => a == b,
            _ => false,
        }
    }

    /// Ordering of a stored value relative to this operand, defined only
    /// between two numbers or two strings.
    fn compare_stored(&self, stored: &Value) -> Option<Ordering> {
        match (self, stored) {
            (Self::Number(a), Value::Number(b)) => compare_numbers(b, a),
            (Self::String(a), Value::String(b)) => Some(b.as_str().cmp(a.as_str())),
            _ => None,
        }
    }
}

/// Integers compare exactly across the `i64` and `u64` ranges; anything else
/// compares as `f64`.
fn compare_numbers(a: &Number, b: &Number) -> Option<Ordering> {
    fn integer(n: &Number) -> Option<i128> {
        n.as_i64().map(i128::from).or_else(|| n.as_u64().map(i128::from))
    }
    match (integer(a), integer(b)) {
        (Some(a), Some(b)) => Some(a.cmp(&b)),
        _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}

/// An ordered comparison used by [`Predicate::Compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
}

impl Comparison {
    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            Self::Gt => ordering == Ordering::Greater,
            Self::Gte => ordering != Ordering::Less,
            Self::Lt => ordering == Ordering::Less,
            Self::Lte => ordering != Ordering::Greater,
        }
    }

    fn sql(&self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }
}

/// A compiled predicate over row metadata.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every row.
    All,
    /// Matches when every inner predicate matches.
    And(Vec<Predicate>),
    /// `metadata[key] == value`
    Eq { key: String, value: Scalar },
    /// `metadata[key]` present and `!= value`
    Ne { key: String, value: Scalar },
    /// `metadata[key]` is one of `values`
    In { key: String, values: Vec<Scalar> },
    /// `metadata[key]` present and none of `values`
    NotIn { key: String, values: Vec<Scalar> },
    /// Ordered comparison between same-kind values.
    Compare { key: String, op: Comparison, value: Scalar },
    /// `metadata[key]` is an array containing any of `values`
    ArrayContains { key: String, values: Vec<Scalar> },
}

impl Predicate {
    /// Whether this predicate matches every row.
    pub fn is_all(&self) -> bool {
        match self {
            Self::All => true,
            Self::And(inner) => inner.iter().all(Predicate::is_all),
            _ => false,
        }
    }

    /// Evaluate the predicate against a row's metadata.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        match self {
            Self::All => true,
            Self::And(inner) => inner.iter().all(|p| p.matches(metadata)),
            Self::Eq { key, value } => metadata.get(key).is_some_and(|v| value.equals(v)),
            Self::Ne { key, value } => metadata.get(key).is_some_and(|v| !value.equals(v)),
            Self::In { key, values } => {
                metadata.get(key).is_some_and(|v| values.iter().any(|s| s.equals(v)))
            }
            Self::NotIn { key, values } => {
                metadata.get(key).is_some_and(|v| !values.iter().any(|s| s.equals(v)))
            }
            Self::Compare { key, op, value } => metadata
                .get(key)
                .and_then(|v| value.compare_stored(v))
                .is_some_and(|ordering| op.accepts(ordering)),
            Self::ArrayContains { key, values } => match metadata.get(key) {
                Some(Value::Array(items)) => {
                    items.iter().any(|item| values.iter().any(|s| s.equals(item)))
                }
                _ => false,
            },
        }
    }

    /// Render the predicate as a parameterized SQL clause over a JSONB column.
    ///
    /// Placeholders are numbered from `first_param`. Metadata keys and operand
    /// values are bound, never interpolated; `column` must already be a
    /// validated identifier.
    pub fn to_sql(&self, column: &str, first_param: usize) -> SqlFilter {
        let mut writer = SqlWriter { column, next_param: first_param, binds: Vec::new() };
        let clause = writer.write(self);
        SqlFilter { clause, binds: writer.binds }
    }
}

/// A value bound to a [`SqlFilter`] placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlBind {
    /// A text parameter (metadata keys).
    Text(String),
    /// A JSONB parameter (operand values).
    Json(Value),
}

/// A rendered SQL `WHERE` fragment and its bind values, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFilter {
    /// The clause, e.g. `((metadata -> $2::text) = $3)`.
    pub clause: String,
    /// Values for the clause's placeholders.
    pub binds: Vec<SqlBind>,
}

struct SqlWriter<'a> {
    column: &'a str,
    next_param: usize,
    binds: Vec<SqlBind>,
}

impl SqlWriter<'_> {
    fn bind(&mut self, value: SqlBind) -> String {
        let placeholder = format!("${}", self.next_param);
        self.next_param += 1;
        self.binds.push(value);
        placeholder
    }

    fn field(&mut self, key: &str) -> String {
        let param = self.bind(SqlBind::Text(key.to_string()));
        format!("({} -> {param}::text)", self.column)
    }

    fn values(&mut self, values: &[Scalar]) -> Vec<String> {
        values.iter().map(|s| self.bind(SqlBind::Json(s.to_value()))).collect()
    }

    fn write(&mut self, predicate: &Predicate) -> String {
        match predicate {
            Predicate::All => "TRUE".to_string(),
            Predicate::And(inner) if inner.is_empty() => "TRUE".to_string(),
            Predicate::And(inner) => {
                let parts: Vec<String> = inner.iter().map(|p| self.write(p)).collect();
                format!("({})", parts.join(" AND "))
            }
            Predicate::Eq { key, value } => {
                let field = self.field(key);
                let param = self.bind(SqlBind::Json(value.to_value()));
                format!("({field} = {param})")
            }
            Predicate::Ne { key, value } => {
                let field = self.field(key);
                let param = self.bind(SqlBind::Json(value.to_value()));
                format!("({field} <> {param})")
            }
            Predicate::In { key, values } => {
                let field = self.field(key);
                let params = self.values(values);
                format!("({field} IN ({}))", params.join(", "))
            }
            Predicate::NotIn { key, values } => {
                let field = self.field(key);
                let params = self.values(values);
                format!("({field} NOT IN ({}))", params.join(", "))
            }
            Predicate::Compare { key, op, value } => {
                let kind = match value {
                    Scalar::Number(_) => "number",
                    _ => "string",
                };
                let field = self.field(key);
                let param = self.bind(SqlBind::Json(value.to_value()));
                format!("(jsonb_typeof({field}) = '{kind}' AND {field} {} {param})", op.sql())
            }
            Predicate::ArrayContains { key, values } => {
                let field = self.field(key);
                let params = self.values(values);
                let any: Vec<String> =
                    params.iter().map(|p| format!("{field} @> jsonb_build_array({p})")).collect();
                format!("(jsonb_typeof({field}) = 'array' AND ({}))", any.join(" OR "))
            }
        }
    }
}

/// Compiles [`FilterExpression`]s into [`Predicate`]s.
///
/// The `in` operator is always available; the others must be enabled.
#[derive(Debug, Clone)]
pub struct FilterCompiler {
    enabled: Vec<FilterOperator>,
}

impl Default for FilterCompiler {
    fn default() -> Self {
        Self { enabled: vec![FilterOperator::In] }
    }
}

impl FilterCompiler {
    /// A compiler accepting equality entries and the `in` operator.
    pub fn new() -> Self {
        Self::default()
    }

    /// A compiler that additionally accepts the given operators.
    pub fn with_operators(operators: &[FilterOperator]) -> Self {
        let mut compiler = Self::default();
        for op in operators {
            if !compiler.enabled.contains(op) {
                compiler.enabled.push(*op);
            }
        }
        compiler
    }

    /// Whether `operator` is accepted by this compiler.
    pub fn is_enabled(&self, operator: FilterOperator) -> bool {
        self.enabled.contains(&operator)
    }

    /// Compile a filter. An absent or empty filter yields [`Predicate::All`].
    ///
    /// # Errors
    ///
    /// - [`DocStoreError::FilterError`] for unknown or disabled operators and
    ///   operands of the wrong type.
    /// - [`DocStoreError::ValidationError`] for empty operand lists and empty
    ///   operator objects.
    pub fn compile(&self, filter: Option<&FilterExpression>) -> Result<Predicate> {
        let Some(filter) = filter else {
            return Ok(Predicate::All);
        };

        let mut clauses = Vec::with_capacity(filter.0.len());
        for (key, value) in &filter.0 {
            match value {
                Value::Object(ops) => {
                    if ops.is_empty() {
                        return Err(DocStoreError::ValidationError(format!(
                            "empty operator object for filter key '{key}'"
                        )));
                    }
                    for (name, operand) in ops {
                        clauses.push(self.compile_operator(key, name, operand)?);
                    }
                }
                scalar => {
                    let value = Scalar::from_value(scalar).ok_or_else(|| {
                        FilterError::InvalidOperand {
                            key: key.clone(),
                            operator: "eq".to_string(),
                            message: format!("expected a scalar, got {}", kind_name(scalar)),
                        }
                    })?;
                    clauses.push(Predicate::Eq { key: key.clone(), value });
                }
            }
        }

        Ok(match clauses.len() {
            0 => Predicate::All,
            1 => clauses.remove(0),
            _ => Predicate::And(clauses),
        })
    }

    fn compile_operator(&self, key: &str, name: &str, operand: &Value) -> Result<Predicate> {
        let op = FilterOperator::parse(name)
            .filter(|op| self.is_enabled(*op))
            .ok_or_else(|| FilterError::UnknownOperator(name.to_string()))?;
        let key = key.to_string();

        Ok(match op {
            FilterOperator::In => Predicate::In { values: scalar_list(&key, op, operand)?, key },
            FilterOperator::NotIn => {
                Predicate::NotIn { values: scalar_list(&key, op, operand)?, key }
            }
            FilterOperator::ArrayContains => {
                Predicate::ArrayContains { values: scalar_list(&key, op, operand)?, key }
            }
            FilterOperator::Ne => Predicate::Ne { value: scalar(&key, op, operand)?, key },
            FilterOperator::Gt | FilterOperator::Gte | FilterOperator::Lt | FilterOperator::Lte => {
                let value = scalar(&key, op, operand)?;
                if !matches!(value, Scalar::Number(_) | Scalar::String(_)) {
                    return Err(invalid(&key, op, "expected a number or string").into());
                }
                let cmp = match op {
                    FilterOperator::Gt => Comparison::Gt,
                    FilterOperator::Gte => Comparison::Gte,
                    FilterOperator::Lt => Comparison::Lt,
                    _ => Comparison::Lte,
                };
                Predicate::Compare { key, op: cmp, value }
            }
        })
    }
}

fn invalid(key: &str, op: FilterOperator, message: impl Into<String>) -> FilterError {
    FilterError::InvalidOperand {
        key: key.to_string(),
        operator: op.to_string(),
        message: message.into(),
    }
}

fn scalar(key: &str, op: FilterOperator, operand: &Value) -> Result<Scalar> {
    Scalar::from_value(operand).ok_or_else(|| {
        DocStoreError::from(invalid(key, op, format!("expected a scalar, got {}", kind_name(operand))))
    })
}

fn scalar_list(key: &str, op: FilterOperator, operand: &Value) -> Result<Vec<Scalar>> {
    let Value::Array(items) = operand else {
        return Err(invalid(key, op, format!("expected an array, got {}", kind_name(operand))).into());
    };
    if items.is_empty() {
        return Err(DocStoreError::ValidationError(format!(
            "'{op}' on key '{key}' requires at least one value"
        )));
    }
    items
        .iter()
        .map(|item| {
            Scalar::from_value(item).ok_or_else(|| {
                DocStoreError::from(invalid(
                    key,
                    op,
                    format!("array elements must be scalars, got {}", kind_name(item)),
                ))
            })
        })
        .collect()
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
