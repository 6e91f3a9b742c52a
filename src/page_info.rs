//! Typed view of the page info document produced by the host.
//!
//! Every struct keeps the JSON object it was read from, so fields the filter
//! never looks at are written back untouched and in their original order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const KEY_WORKFLOWS: &str = "workflows";
pub const KEY_MODELS: &str = "models";
pub const KEY_WID: &str = "wid";

pub type WorkflowsByType = IndexMap<String, TypeEntry>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct PageInfo {
    pub workflows: Option<WorkflowsByType>,
    raw: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct TypeEntry {
    pub models: Vec<ModelEntry>,
    raw: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct ModelEntry {
    wid: String,
    raw: Map<String, Value>,
}

impl PageInfo {
    #[cfg(test)]
    fn has_workflows(&self) -> bool {
        self.workflows.is_some()
    }

    /// Any top-level field other than `workflows`.
    #[cfg(test)]
    fn get(&self, key: &str) -> Option<&Value> {
        if key == KEY_WORKFLOWS {
            return None;
        }
        self.raw.get(key)
    }
}

impl TypeEntry {
    #[cfg(test)]
    fn new(models: Vec<ModelEntry>) -> Self {
        let mut raw = Map::new();
        raw.insert(KEY_MODELS.to_string(), Value::Array(Vec::new()));
        Self { models, raw }
    }

    #[cfg(test)]
    fn get(&self, key: &str) -> Option<&Value> {
        if key == KEY_MODELS {
            return None;
        }
        self.raw.get(key)
    }
}

impl ModelEntry {
    #[cfg(test)]
    fn new<W: Into<String>>(wid: W) -> Self {
        let wid = wid.into();
        let mut raw = Map::new();
        raw.insert(KEY_WID.to_string(), Value::String(wid.clone()));
        Self { wid, raw }
    }

    pub fn wid(&self) -> &str {
        &self.wid
    }

    #[cfg(test)]
    fn get(&self, key: &str) -> Option<&Value> {
        self.raw.get(key)
    }
}

impl TryFrom<Map<String, Value>> for PageInfo {
    type Error = String;

    fn try_from(raw: Map<String, Value>) -> Result<Self, Self::Error> {
        let workflows = match raw.get(KEY_WORKFLOWS) {
            None => None,
            Some(Value::Object(types)) => {
                let mut workflows = WorkflowsByType::with_capacity(types.len());
                for (name, entry) in types {
                    let Value::Object(entry) = entry else {
                        return Err(format!("workflow type `{name}` must be an object"));
                    };
                    let entry = TypeEntry::try_from(entry.clone())
                        .map_err(|e| format!("workflow type `{name}`: {e}"))?;
                    workflows.insert(name.clone(), entry);
                }
                Some(workflows)
            }
            Some(other) => {
                return Err(format!(
                    "`{KEY_WORKFLOWS}` must be an object, found {}",
                    type_name(other)
                ));
            }
        };
        Ok(Self { workflows, raw })
    }
}

impl TryFrom<Map<String, Value>> for TypeEntry {
    type Error = String;

    fn try_from(raw: Map<String, Value>) -> Result<Self, Self::Error> {
        let models = match raw.get(KEY_MODELS) {
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Value::Object(model) => ModelEntry::try_from(model.clone())
                        .map_err(|e| format!("model #{i}: {e}")),
                    other => Err(format!("model #{i} must be an object, found {}", type_name(other))),
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(other) => {
                return Err(format!(
                    "`{KEY_MODELS}` must be an array, found {}",
                    type_name(other)
                ));
            }
            None => return Err(format!("missing `{KEY_MODELS}`")),
        };
        Ok(Self { models, raw })
    }
}

impl TryFrom<Map<String, Value>> for ModelEntry {
    type Error = String;

    fn try_from(raw: Map<String, Value>) -> Result<Self, Self::Error> {
        match raw.get(KEY_WID) {
            Some(Value::String(wid)) => Ok(Self { wid: wid.clone(), raw }),
            Some(other) => Err(format!("`{KEY_WID}` must be a string, found {}", type_name(other))),
            None => Err(format!("missing `{KEY_WID}`")),
        }
    }
}

impl From<PageInfo> for Map<String, Value> {
    fn from(info: PageInfo) -> Self {
        let mut raw = info.raw;
        if let Some(workflows) = info.workflows {
            let types = workflows
                .into_iter()
                .map(|(name, entry)| (name, Value::Object(entry.into())))
                .collect();
            // insert keeps the position of an existing key
            raw.insert(KEY_WORKFLOWS.to_string(), Value::Object(types));
        }
        raw
    }
}

impl From<TypeEntry> for Map<String, Value> {
    fn from(entry: TypeEntry) -> Self {
        let mut raw = entry.raw;
        let models = entry
            .models
            .into_iter()
            .map(|model| Value::Object(model.raw))
            .collect();
        raw.insert(KEY_MODELS.to_string(), Value::Array(models));
        raw
    }
}

impl From<ModelEntry> for Map<String, Value> {
    fn from(entry: ModelEntry) -> Self {
        entry.raw
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_round_trip_keeps_unknown_fields_and_order() {
        let input = json!({
            "status": {"locked": false},
            "workflows": {
                "dam": {
                    "label": "Assets",
                    "models": [
                        {"title": "Publish", "wid": "/etc/workflow/models/m1/jcr:content/model", "rank": 1.5}
                    ],
                    "extra": [1, 2, 3]
                }
            },
            "permissions": {"modify": true}
        });

        let info: PageInfo = serde_json::from_value(input.clone()).unwrap();
        assert!(info.has_workflows());
        assert_eq!(info.get("permissions"), Some(&json!({"modify": true})));

        let dam = &info.workflows.as_ref().unwrap()["dam"];
        assert_eq!(dam.get("label"), Some(&json!("Assets")));
        assert_eq!(dam.models[0].wid(), "/etc/workflow/models/m1/jcr:content/model");
        assert_eq!(dam.models[0].get("rank"), Some(&json!(1.5)));

        let output = serde_json::to_value(&info).unwrap();
        assert_eq!(output, input);
        let keys: Vec<&String> = output.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["status", "workflows", "permissions"]);
        let model_keys: Vec<&String> = output["workflows"]["dam"]["models"][0]
            .as_object()
            .unwrap()
            .keys()
            .collect();
        assert_eq!(model_keys, ["title", "wid", "rank"]);
    }

    #[test]
    fn test_missing_workflows_is_not_an_error() {
        let info: PageInfo = serde_json::from_value(json!({"status": {}})).unwrap();
        assert!(!info.has_workflows());
        assert_eq!(serde_json::to_value(&info).unwrap(), json!({"status": {}}));
    }

    #[test]
    fn test_malformed_shapes_are_rejected() {
        let cases = [
            (json!({"workflows": []}), "must be an object"),
            (json!({"workflows": {"dam": 1}}), "workflow type `dam` must be an object"),
            (json!({"workflows": {"dam": {}}}), "missing `models`"),
            (json!({"workflows": {"dam": {"models": {}}}}), "must be an array"),
            (json!({"workflows": {"dam": {"models": ["x"]}}}), "model #0 must be an object"),
            (json!({"workflows": {"dam": {"models": [{}]}}}), "missing `wid`"),
            (json!({"workflows": {"dam": {"models": [{"wid": 7}]}}}), "`wid` must be a string"),
        ];
        for (input, expected) in cases {
            let err = serde_json::from_value::<PageInfo>(input.clone()).unwrap_err();
            assert!(
                err.to_string().contains(expected),
                "{input}: `{err}` does not mention `{expected}`"
            );
        }
    }

    #[test]
    fn test_built_entries_serialize_with_required_keys() {
        let entry = TypeEntry::new(vec![ModelEntry::new("/etc/workflow/models/a/jcr:content/model")]);
        let value = serde_json::to_value(Map::from(entry)).unwrap();
        assert_eq!(
            value,
            json!({"models": [{"wid": "/etc/workflow/models/a/jcr:content/model"}]})
        );
    }
}
