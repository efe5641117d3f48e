// ── Row classification ──
//
// Decides which action controls a parameter row carries. Order matters:
// an explicit scalar gets the value editor; otherwise a writable object
// gets add or delete depending on whether its key names an instance.
// Every row gets refresh.

use crate::model::Parameter;
use crate::task::Task;

/// What kind of row a parameter renders as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowKind {
    /// `object == false`: value editor.
    Scalar,
    /// Writable object whose key ends in `.<digits>`: delete this instance.
    Instance,
    /// Writable object without an instance suffix: create a new instance.
    Template,
    /// Read-only object, or a node whose type is not known yet.
    Plain,
}

/// An action control on a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowControl {
    Edit,
    AddInstance,
    DeleteInstance,
    Refresh,
}

pub fn classify(key: &str, parameter: &Parameter) -> RowKind {
    if parameter.object == Some(false) {
        RowKind::Scalar
    } else if parameter.is_object() && parameter.is_writable() {
        if is_instance_key(key) {
            RowKind::Instance
        } else {
            RowKind::Template
        }
    } else {
        RowKind::Plain
    }
}

/// Whether `key` ends with a dot followed by one or more ASCII digits.
pub fn is_instance_key(key: &str) -> bool {
    key.rsplit_once('.')
        .is_some_and(|(_, suffix)| !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()))
}

impl RowKind {
    /// The control shown before refresh, if any.
    pub fn primary_control(self) -> Option<RowControl> {
        match self {
            Self::Scalar => Some(RowControl::Edit),
            Self::Instance => Some(RowControl::DeleteInstance),
            Self::Template => Some(RowControl::AddInstance),
            Self::Plain => None,
        }
    }

    /// All controls in display order; refresh is always last.
    pub fn controls(self) -> Vec<RowControl> {
        self.primary_control()
            .into_iter()
            .chain(std::iter::once(RowControl::Refresh))
            .collect()
    }
}

impl RowControl {
    /// The task this control enqueues for `key` on device `device_id`.
    ///
    /// `Edit` has no task of its own: the editor submits a value later.
    pub fn task(self, key: &str, device_id: &str) -> Option<Task> {
        match self {
            Self::Edit => None,
            Self::AddInstance => Some(Task::add_object(device_id, key)),
            Self::DeleteInstance => Some(Task::delete_object(device_id, key)),
            Self::Refresh => Some(Task::refresh(device_id, key)),
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            Self::Edit => "✎",
            Self::AddInstance => "🞢",
            Self::DeleteInstance => "✕",
            Self::Refresh => "↺",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Edit => "Edit value",
            Self::AddInstance => "Create a new instance",
            Self::DeleteInstance => "Delete this instance",
            Self::Refresh => "Refresh tree",
        }
    }
}
