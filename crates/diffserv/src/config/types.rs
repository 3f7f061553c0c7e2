//! Configuration schema.
//!
//! Every attribute is kept as written (string or integer) and only parsed
//! when the conditioner is built, so errors can name the element and
//! attribute they come from.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A scalar attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl AttrValue {
    /// Get the value as text, the form every attribute parser reads.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Int(v) => Cow::Owned(v.to_string()),
            Self::Float(v) => Cow::Owned(v.to_string()),
            Self::Text(s) => Cow::Borrowed(s),
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

/// Root of a conditioner configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConditionerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<ClassifierConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub meters: Vec<MeterConfig>,
    #[serde(
        default,
        rename = "traffic-profiles",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub traffic_profiles: Vec<TrafficProfileConfig>,
    /// `None` means no action table: every packet passes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<ActionConfig>>,
}

/// Classifier element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassifierConfig {
    /// Classifier type; multi-field when absent.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FilterConfig>,
}

/// One multi-field classifier rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FilterConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dscp: Option<AttrValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_address: Option<AttrValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_prefix_length: Option<AttrValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_address: Option<AttrValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_prefix_length: Option<AttrValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<AttrValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tos: Option<AttrValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tos_mask: Option<AttrValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_port: Option<AttrValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_port: Option<AttrValue>,
}

/// A named meter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MeterConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cir: Option<AttrValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cbs: Option<AttrValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ebs: Option<AttrValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pir: Option<AttrValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pbs: Option<AttrValue>,
}

/// Assignment of a meter to code points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrafficProfileConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meter: Option<String>,
    /// Space separated code points; all 64 when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dscp: Option<AttrValue>,
}

/// An action rule, tagged by its element name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionConfig {
    Drop(DropConfig),
    Mark(MarkConfig),
    Shape(ShapeConfig),
}

impl ActionConfig {
    /// Element name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Drop(_) => "drop",
            Self::Mark(_) => "mark",
            Self::Shape(_) => "shape",
        }
    }
}

/// `drop` rule. Absent selectors mean `*`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DropConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dscp: Option<AttrValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<AttrValue>,
}

/// `mark` rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarkConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dscp: Option<AttrValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<AttrValue>,
    /// Target code point, or `*` for the matched one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<AttrValue>,
}

/// `shape` rule. Keys other than the selectors and `type` configure the
/// shaper.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShapeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dscp: Option<AttrValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<AttrValue>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub params: BTreeMap<String, AttrValue>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_value_text() {
        assert_eq!(AttrValue::Int(46).as_text(), "46");
        assert_eq!(AttrValue::from("EF").as_text(), "EF");
        assert_eq!(AttrValue::Float(1.5).to_string(), "1.5");
    }

    #[test]
    fn test_deserialize_yaml() {
        let yaml = r#"
classifier:
  filters:
    - dscp: EF
      protocol: udp
      srcPort: 5060
    - dscp: 0
meters:
  - name: voice
    type: token-bucket
    cir: 64kbps
    cbs: 1500B
traffic-profiles:
  - meter: voice
    dscp: EF
actions:
  - drop: { dscp: EF, color: red }
  - mark: { value: AF11 }
  - shape: { type: pass, dscp: AF11, rate: 10mbps, depth: 32 }
"#;
        let config: ConditionerConfig = serde_yaml::from_str(yaml).unwrap();

        let classifier = config.classifier.unwrap();
        assert!(classifier.kind.is_none());
        assert_eq!(classifier.filters.len(), 2);
        assert_eq!(classifier.filters[0].src_port, Some(AttrValue::Int(5060)));
        assert_eq!(classifier.filters[1].dscp, Some(AttrValue::Int(0)));

        assert_eq!(config.meters[0].kind.as_deref(), Some("token-bucket"));
        assert_eq!(config.traffic_profiles[0].meter.as_deref(), Some("voice"));

        let actions = config.actions.unwrap();
        assert_eq!(actions.len(), 3);
        assert_eq!(actions[1].name(), "mark");
        match &actions[2] {
            ActionConfig::Shape(shape) => {
                assert_eq!(shape.kind.as_deref(), Some("pass"));
                assert_eq!(shape.params.get("rate"), Some(&AttrValue::from("10mbps")));
                assert_eq!(shape.params.get("depth"), Some(&AttrValue::Int(32)));
                assert!(!shape.params.contains_key("dscp"));
            }
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_filter_key_rejected() {
        let yaml = "classifier:\n  filters:\n    - dscp: EF\n      srcAdress: 10.0.0.1\n";
        assert!(serde_yaml::from_str::<ConditionerConfig>(yaml).is_err());
    }

    #[test]
    fn test_deserialize_json() {
        let json = r#"{"actions": [{"mark": {"dscp": "*", "color": "*", "value": "AF11"}}]}"#;
        let config: ConditionerConfig = serde_json::from_str(json).unwrap();
        assert!(config.classifier.is_none());
        assert_eq!(
            config.actions,
            Some(vec![ActionConfig::Mark(MarkConfig {
                dscp: Some("*".into()),
                color: Some("*".into()),
                value: Some("AF11".into()),
            })])
        );
    }

    #[test]
    fn test_empty_actions_differs_from_none() {
        let config: ConditionerConfig = serde_yaml::from_str("actions: []\n").unwrap();
        assert_eq!(config.actions, Some(vec![]));
        let config: ConditionerConfig = serde_yaml::from_str("meters: []\n").unwrap();
        assert_eq!(config.actions, None);
    }
}
