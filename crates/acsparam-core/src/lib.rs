//! Parameter browsing logic shared by acsparam front ends.
//!
//! - **[`ParameterView`]**: turns a [`Device`] snapshot into sorted,
//!   classified [`ParameterRow`]s and applies a debounced keyword
//!   [`SearchFilter`] by hiding rows rather than removing them.
//!
//! - **[`Task`]**: immutable descriptors for operator actions
//!   (`addObject`, `deleteObject`, `getParameterValues`,
//!   `setParameterValues`). The view builds them; it never sends them.
//!
//! - **[`TaskDispatcher`]**: background loop that delivers queued tasks in
//!   order to a [`TaskSink`], either the ACS northbound interface
//!   ([`NbiSink`]) or a local record ([`StagedSink`]).
//!
//! - **[`ExpressionCache`]**: bounded, shared cache of parsed parameter
//!   path expressions.

pub mod classify;
pub mod debounce;
pub mod dispatch;
pub mod error;
pub mod expression;
pub mod model;
pub mod search;
pub mod task;
pub mod view;

// ── Primary re-exports ──────────────────────────────────────────────
pub use classify::{RowControl, RowKind, classify, is_instance_key};
pub use debounce::Debouncer;
pub use dispatch::{
    DeliveryStatus, NbiSink, StagedSink, StagedTask, TaskDispatcher, TaskOutcome, TaskQueue,
    TaskSink,
};
pub use error::CoreError;
pub use expression::{
    DEFAULT_CACHE_CAPACITY, Expression, ExpressionCache, ExpressionError, ExpressionParser,
    ParameterPath, PathParser, PathSegment,
};
pub use model::{DEVICE_ID_KEY, Device, Parameter, ParameterValue};
pub use search::{SearchFilter, search_text};
pub use task::Task;
pub use view::{DEFAULT_SEARCH_DEBOUNCE, ParameterRow, ParameterView, build_rows, csv_url};
