// ── All Parameters view ──
//
// Composes classification, visibility and expression lookup into the row
// model a front end draws. Rows are recomputed from the device on every
// render; search input only re-renders once typing has settled.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use url::Url;

use crate::classify::{RowControl, RowKind, classify};
use crate::debounce::Debouncer;
use crate::error::CoreError;
use crate::expression::{Expression, ExpressionCache};
use crate::model::Device;
use crate::search::SearchFilter;
use crate::task::Task;

/// Quiet period after the last keystroke before the rows are re-filtered.
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);

/// One rendered parameter row.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterRow {
    pub key: String,
    pub kind: RowKind,
    /// Hidden rows stay in the model so per-row state survives filtering.
    pub visible: bool,
    pub value: Option<String>,
    pub value_type: Option<String>,
    pub writable: bool,
    /// Parsed key, present for scalar rows (the value editor's address).
    pub expression: Option<Arc<Expression>>,
}

impl ParameterRow {
    pub fn controls(&self) -> Vec<RowControl> {
        self.kind.controls()
    }

    pub fn has_control(&self, control: RowControl) -> bool {
        self.kind.primary_control() == Some(control) || control == RowControl::Refresh
    }

    /// The task `control` enqueues for this row, if the row carries it.
    pub fn task(&self, control: RowControl, device_id: &str) -> Option<Task> {
        if self.has_control(control) {
            control.task(&self.key, device_id)
        } else {
            None
        }
    }
}

/// Build the row model for `device` under `filter`, in ascending key order.
pub fn build_rows<P>(
    device: &Device,
    filter: &SearchFilter,
    cache: &ExpressionCache<P>,
) -> Result<Vec<ParameterRow>, CoreError>
where
    P: crate::expression::ExpressionParser,
{
    device
        .sorted_keys()
        .into_iter()
        .filter_map(|key| device.get(key).map(|p| (key, p)))
        .map(|(key, parameter)| {
            let kind = classify(key, parameter);
            let expression = match kind {
                RowKind::Scalar => Some(cache.parse(key)?),
                _ => None,
            };
            Ok::<_, CoreError>(ParameterRow {
                key: key.to_owned(),
                kind,
                visible: filter.matches_parameter(key, parameter),
                value: parameter.value_text(),
                value_type: parameter.value_type().map(ToOwned::to_owned),
                writable: parameter.is_writable(),
                expression,
            })
        })
        .collect()
}

/// Link to the ACS CSV export for `device`, resolved against `base`.
pub fn csv_url(base: &Url, device: &Device) -> Result<Url, CoreError> {
    let id = device.id()?;
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| CoreError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(["api", "devices"])
        .push(&format!("{id}.csv"));
    Ok(url)
}

/// View state: the search string, its debounce timer, and the last
/// rendered rows.
pub struct ParameterView {
    cache: Arc<ExpressionCache>,
    search: String,
    debouncer: Debouncer,
    rows: Vec<ParameterRow>,
}

impl ParameterView {
    pub fn new(cache: Arc<ExpressionCache>, debounce: Duration) -> Self {
        Self {
            cache,
            search: String::new(),
            debouncer: Debouncer::new(debounce),
            rows: Vec::new(),
        }
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    /// Record new search text without re-rendering, and arrange for
    /// `on_settled` to run once input has been quiet for the debounce
    /// delay. The caller re-renders from `on_settled`.
    pub fn on_search_input<F>(&mut self, text: impl Into<String>, on_settled: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.search = text.into();
        self.debouncer.schedule(on_settled);
    }

    /// Drop a pending re-render (e.g. when the view is torn down).
    pub fn cancel_pending(&mut self) {
        self.debouncer.cancel();
    }

    /// Recompute rows from `device` under the current search string.
    pub fn render(&mut self, device: &Device) -> Result<&[ParameterRow], CoreError> {
        let filter = SearchFilter::new(&self.search);
        self.rows = build_rows(device, &filter, &self.cache)?;
        debug!(
            rows = self.rows.len(),
            visible = self.visible_count(),
            search = %self.search,
            "rendered parameter rows"
        );
        Ok(&self.rows)
    }

    /// Settle handler: the quiet period after the last keystroke has
    /// elapsed, so apply the stored search to `device`.
    pub fn on_search_settled(&mut self, device: &Device) -> Result<&[ParameterRow], CoreError> {
        self.render(device)
    }

    pub fn rows(&self) -> &[ParameterRow] {
        &self.rows
    }

    pub fn visible_rows(&self) -> impl Iterator<Item = &ParameterRow> {
        self.rows.iter().filter(|r| r.visible)
    }

    pub fn visible_count(&self) -> usize {
        self.visible_rows().count()
    }

    pub fn row(&self, key: &str) -> Option<&ParameterRow> {
        self.rows.iter().find(|r| r.key == key)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;

    use super::*;
    use crate::model::{Parameter, ParameterValue};

    fn scenario_device() -> Device {
        Device::from_json(
            r#"{
                "DeviceID.ID": {"value": ["ABC"]},
                "A.B": {"object": false, "value": ["v"]},
                "A.B.1": {"object": true, "writable": true}
            }"#,
        )
        .unwrap()
    }

    fn view() -> ParameterView {
        ParameterView::new(Arc::new(ExpressionCache::default()), DEFAULT_SEARCH_DEBOUNCE)
    }

    #[test]
    fn rows_are_sorted_and_classified() {
        let mut view = view();
        let rows = view.render(&scenario_device()).unwrap();

        let keys: Vec<&str> = rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["A.B", "A.B.1", "DeviceID.ID"]);
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
        assert!(rows.iter().all(|r| r.visible));

        let scalar = view.row("A.B").unwrap();
        assert_eq!(scalar.controls(), vec![RowControl::Edit, RowControl::Refresh]);
        assert_eq!(scalar.value.as_deref(), Some("v"));
        assert_eq!(scalar.expression.as_ref().unwrap().to_string(), "A.B");

        let instance = view.row("A.B.1").unwrap();
        assert_eq!(
            instance.controls(),
            vec![RowControl::DeleteInstance, RowControl::Refresh]
        );
        assert!(instance.expression.is_none());
    }

    #[test]
    fn search_hides_without_removing() {
        let device = scenario_device();
        let filter = SearchFilter::new("a.b.1");
        let rows = build_rows(&device, &filter, &ExpressionCache::default()).unwrap();

        assert_eq!(rows.len(), 3);
        let visible: Vec<&str> = rows
            .iter()
            .filter(|r| r.visible)
            .map(|r| r.key.as_str())
            .collect();
        assert_eq!(visible, vec!["A.B.1"]);
    }

    #[test]
    fn search_matches_values() {
        let mut device = scenario_device();
        device.insert(
            "Device.WiFi.1.SSID",
            Parameter {
                object: Some(false),
                writable: Some(true),
                value: Some(ParameterValue::new("CoffeeShop", Some("xsd:string"))),
            },
        );
        let rows = build_rows(&device, &SearchFilter::new("ssid coffee"), &ExpressionCache::default())
            .unwrap();

        let visible: Vec<&str> = rows
            .iter()
            .filter(|r| r.visible)
            .map(|r| r.key.as_str())
            .collect();
        assert_eq!(visible, vec!["Device.WiFi.1.SSID"]);
    }

    #[test]
    fn row_tasks_carry_device_id() {
        let mut view = view();
        let device = scenario_device();
        let id = device.id().unwrap().to_owned();
        view.render(&device).unwrap();

        let instance = view.row("A.B.1").unwrap();
        assert_eq!(
            instance.task(RowControl::DeleteInstance, &id),
            Some(Task::delete_object("ABC", "A.B.1"))
        );
        assert_eq!(instance.task(RowControl::AddInstance, &id), None);
        assert_eq!(
            instance.task(RowControl::Refresh, &id),
            Some(Task::refresh("ABC", "A.B.1"))
        );
    }

    #[test]
    fn delete_on_named_device_enqueues_exact_descriptor() {
        let device = Device::from_json(
            r#"{
                "DeviceID.ID": {"value": ["00259E-X-0000", "xsd:string"]},
                "Device.WiFi.1": {"object": true, "writable": true}
            }"#,
        )
        .unwrap();
        let mut view = view();
        view.render(&device).unwrap();

        let task = view
            .row("Device.WiFi.1")
            .unwrap()
            .task(RowControl::DeleteInstance, device.id().unwrap())
            .unwrap();
        assert_eq!(
            serde_json::to_value(task).unwrap(),
            serde_json::json!({
                "name": "deleteObject",
                "device": "00259E-X-0000",
                "objectName": "Device.WiFi.1"
            })
        );
    }

    #[test]
    fn rerender_reuses_parsed_expressions() {
        let device = scenario_device();
        let mut view = view();

        view.render(&device).unwrap();
        let first = view.row("A.B").unwrap().expression.clone().unwrap();
        view.render(&device).unwrap();
        let second = view.row("A.B").unwrap().expression.clone().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(view.row("A.B.1").unwrap().expression, None);
    }

    #[test]
    fn csv_link_points_at_export() {
        let base = Url::parse("http://acs.local:3000/").unwrap();
        let url = csv_url(&base, &scenario_device()).unwrap();
        assert_eq!(url.as_str(), "http://acs.local:3000/api/devices/ABC.csv");

        let mut odd = Device::new();
        odd.insert("DeviceID.ID", Parameter::scalar("A B/C", "xsd:string", false));
        let url = csv_url(&base, &odd).unwrap();
        assert_eq!(url.as_str(), "http://acs.local:3000/api/devices/A%20B%2FC.csv");
    }

    #[test]
    fn csv_link_requires_device_id() {
        let base = Url::parse("http://acs.local/").unwrap();
        let err = csv_url(&base, &Device::new()).unwrap_err();
        assert!(matches!(err, CoreError::MissingDeviceId));
    }

    #[tokio::test(start_paused = true)]
    async fn typing_defers_rerender_until_settled() {
        let device = scenario_device();
        let mut view = view();
        view.render(&device).unwrap();

        let renders = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::unbounded_channel();

        for text in ["a", "a.", "a.b.1"] {
            let tx = tx.clone();
            let renders = Arc::clone(&renders);
            view.on_search_input(text, move || {
                renders.fetch_add(1, Ordering::SeqCst);
                let _ = tx.send(());
            });
            tokio::time::advance(Duration::from_millis(100)).await;
        }

        // Input is stored immediately, rows are untouched until settle.
        assert_eq!(view.search(), "a.b.1");
        assert_eq!(view.visible_count(), 3);

        rx.recv().await.unwrap();
        view.render(&device).unwrap();
        assert_eq!(view.visible_count(), 1);

        tokio::time::sleep(DEFAULT_SEARCH_DEBOUNCE * 2).await;
        assert_eq!(renders.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn invalid_scalar_key_propagates_parse_error() {
        let mut device = scenario_device();
        device.insert("Broken..Key", Parameter::scalar("x", "xsd:string", true));
        let err = view().render(&device).unwrap_err();
        assert!(matches!(err, CoreError::Expression(_)));
    }
}
