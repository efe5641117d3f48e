// Remote sink: posts tasks to the ACS northbound interface.

use acsparam_api::{NbiClient, TaskOptions, TaskStatus};

use super::{DeliveryStatus, TaskSink};
use crate::error::CoreError;
use crate::task::Task;

/// Delivers each task to `POST /devices/{id}/tasks` on the NBI.
#[derive(Debug, Clone)]
pub struct NbiSink {
    client: NbiClient,
    options: TaskOptions,
}

impl NbiSink {
    pub fn new(client: NbiClient, options: TaskOptions) -> Self {
        Self { client, options }
    }
}

impl TaskSink for NbiSink {
    async fn deliver(&self, task: &Task) -> Result<DeliveryStatus, CoreError> {
        let status = self
            .client
            .post_task(task.device(), &task.nbi_body(), &self.options)
            .await?;

        Ok(match status {
            TaskStatus::Completed => DeliveryStatus::Completed,
            TaskStatus::Queued => DeliveryStatus::Queued,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use acsparam_api::TransportConfig;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn sink_for(server: &MockServer) -> NbiSink {
        let client = NbiClient::new(&server.uri(), &TransportConfig::default(), None).unwrap();
        NbiSink::new(
            client,
            TaskOptions {
                connection_request: true,
                timeout: Some(Duration::from_millis(3000)),
            },
        )
    }

    #[tokio::test]
    async fn posts_body_without_device() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/devices/00259E-X-0000/tasks"))
            .and(query_param("timeout", "3000"))
            .and(body_json(json!({
                "name": "deleteObject",
                "objectName": "Device.WiFi.1"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let sink = sink_for(&server).await;
        let status = sink
            .deliver(&Task::delete_object("00259E-X-0000", "Device.WiFi.1"))
            .await
            .unwrap();
        assert_eq!(status, DeliveryStatus::Completed);
    }

    #[tokio::test]
    async fn accepted_maps_to_queued() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({})))
            .mount(&server)
            .await;

        let sink = sink_for(&server).await;
        let status = sink.deliver(&Task::refresh("D", "Device.")).await.unwrap();
        assert_eq!(status, DeliveryStatus::Queued);
    }

    #[tokio::test]
    async fn unknown_device_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let sink = sink_for(&server).await;
        let err = sink.deliver(&Task::refresh("ghost", "Device.")).await.unwrap_err();
        assert!(matches!(err, CoreError::DeviceNotFound { ref identifier } if identifier == "ghost"));
    }
}
