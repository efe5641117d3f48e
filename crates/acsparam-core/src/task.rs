// ── Task descriptors ──
//
// Every operator action becomes an immutable `Task` value. The view only
// constructs them; delivery belongs to the dispatcher.

use serde::Serialize;
use serde_json::{Value, json};

/// A unit of work for the ACS to run against one device.
///
/// Serializes to the descriptor shape the task queue expects, e.g.
/// `{"name":"deleteObject","device":"…","objectName":"Device.WiFi.1"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, strum::IntoStaticStr)]
#[serde(tag = "name", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Task {
    #[strum(serialize = "deleteObject")]
    DeleteObject {
        device: String,
        object_name: String,
    },
    #[strum(serialize = "addObject")]
    AddObject {
        device: String,
        object_name: String,
    },
    #[strum(serialize = "getParameterValues")]
    GetParameterValues {
        device: String,
        parameter_names: Vec<String>,
    },
    /// `(path, value, xsd type)` triples.
    #[strum(serialize = "setParameterValues")]
    SetParameterValues {
        device: String,
        parameter_values: Vec<(String, String, String)>,
    },
}

impl Task {
    pub fn delete_object(device: &str, object_name: &str) -> Self {
        Self::DeleteObject {
            device: device.to_owned(),
            object_name: object_name.to_owned(),
        }
    }

    pub fn add_object(device: &str, object_name: &str) -> Self {
        Self::AddObject {
            device: device.to_owned(),
            object_name: object_name.to_owned(),
        }
    }

    pub fn refresh(device: &str, parameter_name: &str) -> Self {
        Self::GetParameterValues {
            device: device.to_owned(),
            parameter_names: vec![parameter_name.to_owned()],
        }
    }

    pub fn set_value(device: &str, path: &str, value: &str, kind: &str) -> Self {
        Self::SetParameterValues {
            device: device.to_owned(),
            parameter_values: vec![(path.to_owned(), value.to_owned(), kind.to_owned())],
        }
    }

    /// Task name as the queue knows it (`"addObject"`, ...).
    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// Identifier of the device this task is addressed to.
    pub fn device(&self) -> &str {
        match self {
            Self::DeleteObject { device, .. }
            | Self::AddObject { device, .. }
            | Self::GetParameterValues { device, .. }
            | Self::SetParameterValues { device, .. } => device,
        }
    }

    /// Short description of what the task touches, for logs and status.
    pub fn target(&self) -> String {
        match self {
            Self::DeleteObject { object_name, .. } | Self::AddObject { object_name, .. } => {
                object_name.clone()
            }
            Self::GetParameterValues {
                parameter_names, ..
            } => parameter_names.join(", "),
            Self::SetParameterValues {
                parameter_values, ..
            } => parameter_values
                .iter()
                .map(|(path, value, _)| format!("{path}={value}"))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// Request body for the NBI: the descriptor without `device`, which
    /// travels in the URL instead.
    pub fn nbi_body(&self) -> Value {
        match self {
            Self::DeleteObject { object_name, .. } | Self::AddObject { object_name, .. } => {
                json!({ "name": self.name(), "objectName": object_name })
            }
            Self::GetParameterValues {
                parameter_names, ..
            } => json!({ "name": self.name(), "parameterNames": parameter_names }),
            Self::SetParameterValues {
                parameter_values, ..
            } => json!({ "name": self.name(), "parameterValues": parameter_values }),
        }
    }
}
