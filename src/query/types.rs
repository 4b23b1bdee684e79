use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{CvPomError, CvPomResult};

/// Element attributes a query can constrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Label,
    Text,
}

impl Attribute {
    pub fn as_str(&self) -> &'static str {
        match self {
            Attribute::Label => "label",
            Attribute::Text => "text",
        }
    }

    fn parse(key: &str) -> CvPomResult<Self> {
        match key {
            "label" => Ok(Attribute::Label),
            "text" => Ok(Attribute::Text),
            other => Err(CvPomError::InvalidQuery(format!(
                "unknown query key '{other}' (expected 'label' or 'text')"
            ))),
        }
    }
}

/// Predicate applied to one attribute.
///
/// Defaults to exact, case-sensitive equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryValue {
    pub value: String,
    #[serde(default = "default_case_sensitive")]
    pub case_sensitive: bool,
    #[serde(default)]
    pub contains: bool,
}

fn default_case_sensitive() -> bool {
    true
}

impl QueryValue {
    pub fn exact(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            case_sensitive: true,
            contains: false,
        }
    }

    pub fn containing(value: impl Into<String>) -> Self {
        Self {
            contains: true,
            ..Self::exact(value)
        }
    }

    pub fn ignore_case(mut self) -> Self {
        self.case_sensitive = false;
        self
    }

    /// `None` attributes never satisfy a predicate.
    pub fn matches(&self, actual: Option<&str>) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        if self.case_sensitive {
            self.compare(actual, &self.value)
        } else {
            self.compare(&actual.to_lowercase(), &self.value.to_lowercase())
        }
    }

    fn compare(&self, actual: &str, expected: &str) -> bool {
        if self.contains {
            actual.contains(expected)
        } else {
            actual == expected
        }
    }

    fn from_json(attr: Attribute, raw: &Value) -> CvPomResult<Self> {
        match raw {
            Value::String(s) => Ok(Self::exact(s.clone())),
            Value::Object(map) => {
                let mut qv = match map.get("value") {
                    Some(Value::String(s)) => Self::exact(s.clone()),
                    Some(other) => {
                        return Err(CvPomError::InvalidQuery(format!(
                            "'{}.value' must be a string, got {other}",
                            attr.as_str()
                        )))
                    }
                    None => {
                        return Err(CvPomError::InvalidQuery(format!(
                            "query object for '{}' doesn't have 'value' field",
                            attr.as_str()
                        )))
                    }
                };
                for (key, v) in map {
                    match key.as_str() {
                        "value" => {}
                        "contains" => qv.contains = expect_bool(attr, key, v)?,
                        "case_sensitive" => qv.case_sensitive = expect_bool(attr, key, v)?,
                        other => {
                            return Err(CvPomError::InvalidQuery(format!(
                                "unknown option '{other}' for '{}'",
                                attr.as_str()
                            )))
                        }
                    }
                }
                Ok(qv)
            }
            other => Err(CvPomError::InvalidQuery(format!(
                "'{}' must be a string or a predicate object, got {other}",
                attr.as_str()
            ))),
        }
    }

    fn to_json(&self) -> Value {
        if self.case_sensitive && !self.contains {
            Value::String(self.value.clone())
        } else {
            serde_json::json!({
                "value": self.value,
                "contains": self.contains,
                "case_sensitive": self.case_sensitive,
            })
        }
    }
}

fn expect_bool(attr: Attribute, key: &str, v: &Value) -> CvPomResult<bool> {
    v.as_bool().ok_or_else(|| {
        CvPomError::InvalidQuery(format!(
            "'{}.{key}' must be a boolean, got {v}",
            attr.as_str()
        ))
    })
}

/// Declarative element selector. Constraints are ANDed; an empty query
/// selects every element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Query {
    label: Option<QueryValue>,
    text: Option<QueryValue>,
}

impl Query {
    /// Matches every element.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn label(value: impl Into<String>) -> Self {
        Self::all().with_label(QueryValue::exact(value))
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::all().with_text(QueryValue::exact(value))
    }

    pub fn with_label(mut self, value: QueryValue) -> Self {
        self.label = Some(value);
        self
    }

    pub fn with_text(mut self, value: QueryValue) -> Self {
        self.text = Some(value);
        self
    }

    pub fn get(&self, attr: Attribute) -> Option<&QueryValue> {
        match attr {
            Attribute::Label => self.label.as_ref(),
            Attribute::Text => self.text.as_ref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.label.is_none() && self.text.is_none()
    }

    /// Whether answering this query needs text recognition.
    pub fn needs_text(&self, text_label: &str) -> bool {
        self.text.is_some()
            || self
                .label
                .as_ref()
                .is_some_and(|l| l.matches(Some(text_label)))
    }

    /// Parse and validate a JSON query. `null` and `{}` select everything.
    pub fn from_json(raw: &Value) -> CvPomResult<Self> {
        let map = match raw {
            Value::Null => return Ok(Self::all()),
            Value::Object(map) => map,
            other => {
                return Err(CvPomError::InvalidQuery(format!(
                    "query must be an object, got {other}"
                )))
            }
        };

        let mut query = Self::all();
        for (key, v) in map {
            let attr = Attribute::parse(key)?;
            let qv = QueryValue::from_json(attr, v)?;
            match attr {
                Attribute::Label => query.label = Some(qv),
                Attribute::Text => query.text = Some(qv),
            }
        }
        Ok(query)
    }

    pub fn parse(json: &str) -> CvPomResult<Self> {
        let raw: Value = serde_json::from_str(json)
            .map_err(|e| CvPomError::InvalidQuery(format!("malformed query JSON: {e}")))?;
        Self::from_json(&raw)
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        if let Some(l) = &self.label {
            map.insert("label".into(), l.to_json());
        }
        if let Some(t) = &self.text {
            map.insert("text".into(), t.to_json());
        }
        Value::Object(map)
    }
}

impl TryFrom<Value> for Query {
    type Error = CvPomError;

    fn try_from(raw: Value) -> Result<Self, Self::Error> {
        Self::from_json(&raw)
    }
}

impl From<Query> for Value {
    fn from(q: Query) -> Self {
        q.to_json()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}
