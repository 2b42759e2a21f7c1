//! Named-parameter rewriting and binding.
//!
//! Statements are written with `:name` placeholders. Before preparation the
//! text is rewritten to `?` markers and the position of every name is
//! recorded in an [`OrdinalMap`]; binding then resolves each name to its
//! position. A positional parameter set bypasses the map and binds in order.

use crate::driver::PreparedStatement;
use crate::error::QueryError;
use crate::types::Value;
use regex::{Captures, Regex};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// Reserved key that marks a JSON parameter object as positional.
pub const POSITIONAL_KEY: &str = "positional";

/// Placeholder name to its 1-based position in rewritten statement text.
pub type OrdinalMap = HashMap<String, usize>;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r":\S+").expect("placeholder pattern is valid"))
}

/// Rewrite `:name` placeholders to `?` markers.
///
/// Placeholders are a colon followed by every non-whitespace character up to
/// the next whitespace, so `(:id)` names the placeholder `id)`. When a name
/// occurs more than once, the map keeps the ordinal of the last occurrence
/// while every occurrence is still replaced.
///
/// # Example
///
/// ```
/// use rowstream::query::rewrite;
///
/// let (sql, ordinals) = rewrite("SELECT * FROM t WHERE a = :x AND b = :y");
/// assert_eq!(sql, "SELECT * FROM t WHERE a = ? AND b = ?");
/// assert_eq!(ordinals["x"], 1);
/// assert_eq!(ordinals["y"], 2);
/// ```
pub fn rewrite(sql: &str) -> (String, OrdinalMap) {
    let mut ordinals = OrdinalMap::new();
    let mut position = 0;

    let rewritten = placeholder_pattern().replace_all(sql, |caps: &Captures<'_>| {
        position += 1;
        ordinals.insert(caps[0][1..].to_string(), position);
        "?"
    });

    (rewritten.into_owned(), ordinals)
}

/// Bind `parameters` into a prepared statement.
///
/// Positional sets bind at `1..=N` in order and ignore `ordinals`. Named sets
/// bind every name in `ordinals` at its recorded position; names missing from
/// the set bind as `NULL`.
///
/// # Errors
///
/// Returns `QueryError::ParameterBindingError` if the driver rejects a value.
pub fn bind(
    statement: &mut dyn PreparedStatement,
    parameters: &Parameters,
    ordinals: &OrdinalMap,
) -> Result<(), QueryError> {
    match parameters {
        Parameters::Positional(values) => {
            for (i, value) in values.iter().enumerate() {
                statement.bind(i + 1, value.clone())?;
            }
        }
        Parameters::Named(values) => {
            let mut slots: Vec<(&String, usize)> =
                ordinals.iter().map(|(name, &ordinal)| (name, ordinal)).collect();
            slots.sort_by_key(|&(_, ordinal)| ordinal);

            for (name, ordinal) in slots {
                let value = values.get(name).cloned().unwrap_or_default();
                statement.bind(ordinal, value)?;
            }
        }
    }
    Ok(())
}

/// Values for one statement, either positional or named.
#[derive(Debug, Clone, PartialEq)]
pub enum Parameters {
    /// Bound at positions `1..=N` in order
    Positional(Vec<Value>),
    /// Bound by placeholder name
    Named(HashMap<String, Value>),
}

impl Default for Parameters {
    fn default() -> Self {
        Parameters::Named(HashMap::new())
    }
}

impl Parameters {
    /// Positional parameters from a sequence of values.
    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Parameters::Positional(values.into_iter().map(Into::into).collect())
    }

    /// Named parameters from `(name, value)` pairs.
    pub fn named<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Parameters::Named(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build parameters from JSON.
    ///
    /// An array is positional. An object is named, unless its only key is
    /// [`POSITIONAL_KEY`] holding an array, which is positional. `null` is an
    /// empty named set.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::ParameterShape` if the positional key is combined
    /// with named keys, or the JSON is neither an array nor an object.
    pub fn from_json(json: serde_json::Value) -> Result<Self, QueryError> {
        match json {
            serde_json::Value::Null => Ok(Parameters::default()),
            serde_json::Value::Array(values) => {
                Ok(Parameters::Positional(values.into_iter().map(Value::from).collect()))
            }
            serde_json::Value::Object(mut map) => match map.remove(POSITIONAL_KEY) {
                None => Ok(Parameters::Named(
                    map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
                )),
                Some(_) if !map.is_empty() => Err(QueryError::ParameterShape(format!(
                    "'{}' cannot be combined with named parameters",
                    POSITIONAL_KEY
                ))),
                Some(serde_json::Value::Array(values)) => {
                    Ok(Parameters::Positional(values.into_iter().map(Value::from).collect()))
                }
                Some(_) => Err(QueryError::ParameterShape(format!(
                    "'{}' must hold an array",
                    POSITIONAL_KEY
                ))),
            },
            other => Err(QueryError::ParameterShape(format!(
                "Expected an array or an object, got {}",
                other
            ))),
        }
    }

    /// Build parameters from any serializable value via JSON.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, QueryError> {
        Self::from_json(serde_json::to_value(value)?)
    }

    /// Add a named value.
    ///
    /// An empty positional set turns into a named one.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::ParameterShape` if positional values are already present.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Result<(), QueryError> {
        let name = name.into();
        match self {
            Parameters::Named(values) => {
                values.insert(name, value.into());
                Ok(())
            }
            Parameters::Positional(values) if values.is_empty() => {
                *self = Parameters::Named(HashMap::from([(name, value.into())]));
                Ok(())
            }
            Parameters::Positional(_) => Err(QueryError::ParameterShape(format!(
                "Cannot bind named parameter '{}' into a positional parameter set",
                name
            ))),
        }
    }

    /// Append a positional value.
    ///
    /// An empty named set turns into a positional one.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::ParameterShape` if named values are already present.
    pub fn push(&mut self, value: impl Into<Value>) -> Result<(), QueryError> {
        match self {
            Parameters::Positional(values) => {
                values.push(value.into());
                Ok(())
            }
            Parameters::Named(values) if values.is_empty() => {
                *self = Parameters::Positional(vec![value.into()]);
                Ok(())
            }
            Parameters::Named(_) => Err(QueryError::ParameterShape(
                "Cannot bind a positional parameter into a named parameter set".to_string(),
            )),
        }
    }

    /// Look up a named value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Parameters::Named(values) => values.get(name),
            Parameters::Positional(_) => None,
        }
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        match self {
            Parameters::Positional(values) => values.len(),
            Parameters::Named(values) => values.len(),
        }
    }

    /// Check whether no values are set.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check whether this set binds positionally.
    pub fn is_positional(&self) -> bool {
        matches!(self, Parameters::Positional(_))
    }
}

impl From<Vec<Value>> for Parameters {
    fn from(values: Vec<Value>) -> Self {
        Parameters::Positional(values)
    }
}

impl From<HashMap<String, Value>> for Parameters {
    fn from(values: HashMap<String, Value>) -> Self {
        Parameters::Named(values)
    }
}

// Values are left out so logs never carry bound data.
impl fmt::Display for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parameters::Positional(values) => write!(f, "positional({})", values.len()),
            Parameters::Named(values) => {
                let mut names: Vec<&str> = values.keys().map(String::as_str).collect();
                names.sort_unstable();
                write!(f, "named({})", names.join(", "))
            }
        }
    }
}

/// Parameter set held by a fluent builder.
///
/// Builders cannot fail mid-chain, so a shape conflict is remembered and
/// reported when the statement runs.
#[derive(Debug, Clone, Default)]
pub(crate) struct ParameterSlot {
    parameters: Parameters,
    conflict: Option<String>,
}

impl ParameterSlot {
    pub(crate) fn replace(&mut self, parameters: Parameters) {
        self.parameters = parameters;
        self.conflict = None;
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        if let Err(e) = self.parameters.insert(name, value) {
            self.record(e);
        }
    }

    pub(crate) fn push(&mut self, value: impl Into<Value>) {
        if let Err(e) = self.parameters.push(value) {
            self.record(e);
        }
    }

    fn record(&mut self, err: QueryError) {
        if self.conflict.is_none() {
            self.conflict = Some(match err {
                QueryError::ParameterShape(message) => message,
                other => other.to_string(),
            });
        }
    }

    pub(crate) fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// The parameters, or the first shape conflict recorded while building.
    pub(crate) fn resolve(&self) -> Result<&Parameters, QueryError> {
        match &self.conflict {
            Some(message) => Err(QueryError::ParameterShape(message.clone())),
            None => Ok(&self.parameters),
        }
    }
}
