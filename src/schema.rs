//! Declarative parameter contracts.
//!
//! Each tool declares its fields once as a `&[FieldSpec]`. The same list is
//! used to check raw arguments before any upstream work and to publish the
//! JSON Schema advertised by `tools/list`.

use crate::error::GatewayError;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer { min: Option<i64>, max: Option<i64> },
    Boolean,
    TextList,
    Choice(&'static [&'static str]),
    /// RFC 3339 timestamp carried as a string.
    Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub description: &'static str,
}

impl FieldSpec {
    pub const fn text(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Text,
            required: false,
            description,
        }
    }

    pub const fn integer(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Integer {
                min: None,
                max: None,
            },
            required: false,
            description,
        }
    }

    pub const fn boolean(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Boolean,
            required: false,
            description,
        }
    }

    pub const fn text_list(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::TextList,
            required: false,
            description,
        }
    }

    pub const fn choice(
        name: &'static str,
        values: &'static [&'static str],
        description: &'static str,
    ) -> Self {
        Self {
            name,
            kind: FieldKind::Choice(values),
            required: false,
            description,
        }
    }

    pub const fn timestamp(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Timestamp,
            required: false,
            description,
        }
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Only meaningful for integer fields.
    pub const fn range(mut self, min: Option<i64>, max: Option<i64>) -> Self {
        if let FieldKind::Integer { .. } = self.kind {
            self.kind = FieldKind::Integer { min, max };
        }
        self
    }

    fn json_schema(&self) -> Value {
        let mut prop = match self.kind {
            FieldKind::Text => serde_json::json!({"type": "string"}),
            FieldKind::Integer { min, max } => {
                let mut v = serde_json::json!({"type": "integer"});
                if let Some(m) = min {
                    v["minimum"] = m.into();
                }
                if let Some(m) = max {
                    v["maximum"] = m.into();
                }
                v
            }
            FieldKind::Boolean => serde_json::json!({"type": "boolean"}),
            FieldKind::TextList => {
                serde_json::json!({"type": "array", "items": {"type": "string"}})
            }
            FieldKind::Choice(values) => serde_json::json!({"type": "string", "enum": values}),
            FieldKind::Timestamp => serde_json::json!({"type": "string", "format": "date-time"}),
        };
        if !self.description.is_empty() {
            prop["description"] = self.description.into();
        }
        prop
    }

    fn check(&self, value: &Value) -> Result<(), GatewayError> {
        let fail = |msg: &str| Err(GatewayError::validation(self.name, msg));
        match self.kind {
            FieldKind::Text => match value.as_str() {
                Some(s) if self.required && s.trim().is_empty() => fail("must not be empty"),
                Some(_) => Ok(()),
                None => fail("expected a string"),
            },
            FieldKind::Integer { min, max } => {
                let Some(n) = value.as_i64() else {
                    return fail("expected an integer");
                };
                if let Some(m) = min.filter(|m| n < *m) {
                    return fail(&format!("must be >= {m}"));
                }
                if let Some(m) = max.filter(|m| n > *m) {
                    return fail(&format!("must be <= {m}"));
                }
                Ok(())
            }
            FieldKind::Boolean => match value {
                Value::Bool(_) => Ok(()),
                _ => fail("expected a boolean"),
            },
            FieldKind::TextList => match value.as_array() {
                Some(items) if items.iter().all(Value::is_string) => Ok(()),
                _ => fail("expected an array of strings"),
            },
            FieldKind::Choice(values) => match value.as_str() {
                Some(s) if values.contains(&s) => Ok(()),
                Some(s) => fail(&format!("`{s}` is not one of {}", values.join(", "))),
                None => fail("expected a string"),
            },
            FieldKind::Timestamp => match value.as_str() {
                Some(s) if chrono::DateTime::parse_from_rfc3339(s).is_ok() => Ok(()),
                Some(_) => fail("expected an RFC 3339 timestamp"),
                None => fail("expected a string"),
            },
        }
    }
}

/// JSON Schema object for a field list.
pub fn input_schema(fields: &[FieldSpec]) -> Value {
    let mut properties = Map::new();
    for f in fields {
        properties.insert(f.name.to_string(), f.json_schema());
    }
    let required: Vec<&str> = fields.iter().filter(|f| f.required).map(|f| f.name).collect();
    let mut schema = serde_json::json!({"type": "object", "properties": properties});
    if !required.is_empty() {
        schema["required"] = required.into();
    }
    schema
}

/// Check raw arguments against `fields`.
///
/// Unknown keys are ignored. An explicit `null` counts as absent.
pub fn validate_args(fields: &[FieldSpec], args: &Value) -> Result<(), GatewayError> {
    let empty = Map::new();
    let obj = match args {
        Value::Object(map) => map,
        Value::Null => &empty,
        _ => return Err(GatewayError::validation("arguments", "expected an object")),
    };
    for f in fields {
        match obj.get(f.name) {
            None | Some(Value::Null) if f.required => {
                return Err(GatewayError::validation(f.name, "is required"));
            }
            None | Some(Value::Null) => {}
            Some(v) => f.check(v)?,
        }
    }
    Ok(())
}

/// Deserialize already-validated arguments into a typed input.
///
/// Explicit `null`s are dropped first so serde defaults apply to them.
pub fn decode<T: DeserializeOwned>(args: Value) -> Result<T, GatewayError> {
    let args = match args {
        Value::Object(mut map) => {
            map.retain(|_, v| !v.is_null());
            Value::Object(map)
        }
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    serde_json::from_value(args).map_err(|e| GatewayError::validation("arguments", e.to_string()))
}

/// Closed set of string values with a serde mapping and the list used by `FieldKind::Choice`.
macro_rules! choice_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(#[serde(rename = $wire)] $variant),+
        }

        impl $name {
            pub const VALUES: &'static [&'static str] = &[$($wire),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }
        }
    };
}

choice_enum!(IssueState { Open => "open", Closed => "closed", All => "all" });
choice_enum!(IssueSort { Created => "created", Updated => "updated", Comments => "comments" });
choice_enum!(PullState { Open => "open", Closed => "closed", All => "all" });
choice_enum!(
    /// States a pull request can be moved to.
    PullUpdateState { Open => "open", Closed => "closed" }
);
choice_enum!(PullSort {
    Created => "created",
    Updated => "updated",
    Popularity => "popularity",
    LongRunning => "long-running",
});
choice_enum!(Direction { Asc => "asc", Desc => "desc" });
choice_enum!(MergeMethod { Merge => "merge", Squash => "squash", Rebase => "rebase" });
choice_enum!(IssueSearchSort {
    Comments => "comments",
    Reactions => "reactions",
    Interactions => "interactions",
    Created => "created",
    Updated => "updated",
});
choice_enum!(CodeSearchSort { Indexed => "indexed" });
choice_enum!(UserSearchSort {
    Followers => "followers",
    Repositories => "repositories",
    Joined => "joined",
});

impl Default for IssueState {
    fn default() -> Self {
        Self::Open
    }
}

impl Default for PullState {
    fn default() -> Self {
        Self::Open
    }
}

impl Default for PullSort {
    fn default() -> Self {
        Self::Created
    }
}

impl Default for Direction {
    fn default() -> Self {
        Self::Desc
    }
}

impl Default for MergeMethod {
    fn default() -> Self {
        Self::Merge
    }
}
