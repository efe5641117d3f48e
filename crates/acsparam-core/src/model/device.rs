// ── Device parameter tree ──
//
// A device is a flat mapping from dot-delimited parameter path to the
// attributes the ACS knows about it. The JSON form is the flattened
// device document: `{"Device.WiFi.1": {"object": true, "writable": true}}`.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

/// Well-known parameter carrying the device's external identifier.
pub const DEVICE_ID_KEY: &str = "DeviceID.ID";

// ── ParameterValue ──────────────────────────────────────────────────

/// The `[rawValue, type]` pair reported for a parameter.
///
/// `raw` is whatever JSON scalar the ACS stored; `kind` is the xsd type
/// name (e.g. `"xsd:string"`) when one was reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Value>", into = "Vec<Value>")]
pub struct ParameterValue {
    pub raw: Value,
    pub kind: Option<String>,
}

impl ParameterValue {
    pub fn new(raw: impl Into<Value>, kind: Option<&str>) -> Self {
        Self {
            raw: raw.into(),
            kind: kind.map(ToOwned::to_owned),
        }
    }

    /// Display text of the raw value, or `None` when the raw value is
    /// falsy (null, `false`, `0`, empty string).
    pub fn text(&self) -> Option<String> {
        match &self.raw {
            Value::Null | Value::Bool(false) => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) if n.as_f64() == Some(0.0) => None,
            Value::Number(n) => Some(n.to_string()),
            other => Some(other.to_string()),
        }
    }
}

impl TryFrom<Vec<Value>> for ParameterValue {
    type Error = String;

    fn try_from(items: Vec<Value>) -> Result<Self, Self::Error> {
        let mut items = items.into_iter();
        let raw = items
            .next()
            .ok_or_else(|| "parameter value must have at least one element".to_owned())?;
        let kind = match items.next() {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            Some(other) => return Err(format!("parameter value type must be a string, got {other}")),
        };
        Ok(Self { raw, kind })
    }
}

impl From<ParameterValue> for Vec<Value> {
    fn from(value: ParameterValue) -> Self {
        match value.kind {
            Some(kind) => vec![value.raw, Value::String(kind)],
            None => vec![value.raw],
        }
    }
}

// ── Parameter ───────────────────────────────────────────────────────

/// Attributes of a single parameter path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// `Some(false)` scalar, `Some(true)` object node, `None` not yet fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub writable: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ParameterValue>,
}

impl Parameter {
    /// A scalar leaf holding `raw`.
    pub fn scalar(raw: impl Into<Value>, kind: &str, writable: bool) -> Self {
        Self {
            object: Some(false),
            writable: Some(writable),
            value: Some(ParameterValue::new(raw, Some(kind))),
        }
    }

    /// An object node.
    pub fn object(writable: bool) -> Self {
        Self {
            object: Some(true),
            writable: Some(writable),
            value: None,
        }
    }

    pub fn is_object(&self) -> bool {
        self.object == Some(true)
    }

    pub fn is_scalar(&self) -> bool {
        self.object == Some(false)
    }

    pub fn is_writable(&self) -> bool {
        self.writable == Some(true)
    }

    /// Display text of `value[0]`, if it is present and truthy.
    pub fn value_text(&self) -> Option<String> {
        self.value.as_ref().and_then(ParameterValue::text)
    }

    /// Declared xsd type, if any.
    pub fn value_type(&self) -> Option<&str> {
        self.value.as_ref().and_then(|v| v.kind.as_deref())
    }
}

// ── Device ──────────────────────────────────────────────────────────

/// A managed device's parameters, keyed by full path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Device {
    parameters: HashMap<String, Parameter>,
}

impl Device {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a flattened device document and check it is addressable.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let device: Self = serde_json::from_str(json).map_err(|e| CoreError::InvalidDevice {
            message: e.to_string(),
        })?;
        device.id()?;
        Ok(device)
    }

    /// Read and parse a device document from disk.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let json = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// The device's external identifier (`DeviceID.ID` value).
    ///
    /// Every task and the CSV link are addressed with it, so a device
    /// without one is unusable; this fails rather than defaulting.
    pub fn id(&self) -> Result<&str, CoreError> {
        match self
            .parameters
            .get(DEVICE_ID_KEY)
            .and_then(|p| p.value.as_ref())
            .map(|v| &v.raw)
        {
            Some(Value::String(id)) if !id.is_empty() => Ok(id),
            _ => Err(CoreError::MissingDeviceId),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, parameter: Parameter) -> Option<Parameter> {
        self.parameters.insert(key.into(), parameter)
    }

    pub fn get(&self, key: &str) -> Option<&Parameter> {
        self.parameters.get(key)
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// All paths in ascending lexicographic order.
    pub fn sorted_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.parameters.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

impl<K: Into<String>> FromIterator<(K, Parameter)> for Device {
    fn from_iter<I: IntoIterator<Item = (K, Parameter)>>(iter: I) -> Self {
        Self {
            parameters: iter.into_iter().map(|(k, p)| (k.into(), p)).collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_flattened_document() {
        let device = Device::from_json(
            r#"{
                "DeviceID.ID": {"value": ["00259E-X-0000", "xsd:string"]},
                "Device.WiFi": {"object": true, "writable": true},
                "Device.WiFi.1.SSID": {"object": false, "writable": true, "value": ["home", "xsd:string"], "valueTimestamp": 1}
            }"#,
        )
        .unwrap();

        assert_eq!(device.len(), 3);
        assert_eq!(device.id().unwrap(), "00259E-X-0000");
        assert!(device.get("Device.WiFi").unwrap().is_object());
        let ssid = device.get("Device.WiFi.1.SSID").unwrap();
        assert!(ssid.is_scalar());
        assert_eq!(ssid.value_text().as_deref(), Some("home"));
        assert_eq!(ssid.value_type(), Some("xsd:string"));
    }

    #[test]
    fn missing_device_id_fails_loudly() {
        let err = Device::from_json(r#"{"Device.WiFi": {"object": true}}"#).unwrap_err();
        assert!(matches!(err, CoreError::MissingDeviceId));

        let empty = Device::from_json(r#"{"DeviceID.ID": {"value": [""]}}"#).unwrap_err();
        assert!(matches!(empty, CoreError::MissingDeviceId));
    }

    #[test]
    fn malformed_document_is_invalid() {
        let err = Device::from_json(r#"{"DeviceID.ID": {"value": []}}"#).unwrap_err();
        assert!(matches!(err, CoreError::InvalidDevice { .. }));
    }

    #[test]
    fn value_without_type_is_accepted() {
        let value: ParameterValue = serde_json::from_value(json!(["ABC"])).unwrap();
        assert_eq!(value.raw, json!("ABC"));
        assert!(value.kind.is_none());
    }

    #[test]
    fn falsy_raw_values_have_no_text() {
        for raw in [json!(null), json!(false), json!(0), json!(""), json!(0.0)] {
            assert_eq!(ParameterValue::new(raw.clone(), None).text(), None, "{raw}");
        }
        assert_eq!(ParameterValue::new(42, None).text().as_deref(), Some("42"));
        assert_eq!(ParameterValue::new(true, None).text().as_deref(), Some("true"));
    }

    #[test]
    fn sorted_keys_are_ascending() {
        let device: Device = [
            ("b", Parameter::default()),
            ("A.B.1", Parameter::default()),
            ("A.B", Parameter::default()),
            ("a", Parameter::default()),
        ]
        .into_iter()
        .collect();

        assert_eq!(device.sorted_keys(), vec!["A.B", "A.B.1", "a", "b"]);
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("device.json");
        std::fs::write(&path, r#"{"DeviceID.ID": {"value": ["ABC"]}}"#).unwrap();

        let device = Device::load(&path).unwrap();
        assert_eq!(device.id().unwrap(), "ABC");

        let missing = Device::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(missing, CoreError::Io { .. }));
    }
}
