//! Reqwest-backed direct-call detection transport.
//!
//! Owns transport details only: multipart request assembly, bearer
//! authorisation, HTTP error mapping and JSON decoding into domain batches.
//! Requests are issued sequentially, one call per image, stopping at the
//! first non-2xx response.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Url};

use super::dto::DetectResponseDto;
use crate::domain::detection::DetectionBatch;
use crate::domain::ports::{DetectionTransport, DetectionTransportError};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Direct-call adapter performing one `POST` per image against the
/// configured detection endpoint.
pub struct HttpDetectionTransport {
    client: Client,
    endpoint: Url,
    api_key: String,
}

impl HttpDetectionTransport {
    /// Build an adapter with the default request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(endpoint: Url, api_key: impl Into<String>) -> Result<Self, reqwest::Error> {
        Self::with_timeout(endpoint, api_key, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Build an adapter with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn with_timeout(
        endpoint: Url,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            api_key: api_key.into(),
        })
    }

    async fn detect_one(&self, image: &[u8]) -> Result<DetectionBatch, DetectionTransportError> {
        let part = Part::bytes(image.to_vec())
            .file_name("image.jpg")
            .mime_str("image/jpeg")
            .map_err(|err| DetectionTransportError::connection(err.to_string()))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(DetectionTransportError::upstream_status(status.as_u16()));
        }

        let dto: DetectResponseDto = response
            .json()
            .await
            .map_err(|err| DetectionTransportError::decode(err.to_string()))?;
        dto.into_domain().map_err(DetectionTransportError::decode)
    }
}

fn map_send_error(error: reqwest::Error) -> DetectionTransportError {
    if error.is_timeout() {
        DetectionTransportError::timeout(error.to_string())
    } else {
        DetectionTransportError::connection(error.to_string())
    }
}

#[async_trait]
impl DetectionTransport for HttpDetectionTransport {
    async fn recognize(
        &self,
        images: &[Vec<u8>],
    ) -> Result<Vec<DetectionBatch>, DetectionTransportError> {
        let mut results = Vec::with_capacity(images.len());
        for image in images {
            results.push(self.detect_one(image).await?);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport_for(server: &MockServer) -> HttpDetectionTransport {
        let endpoint = Url::parse(&format!("{}/detect", server.uri())).expect("valid url");
        HttpDetectionTransport::new(endpoint, "secret-token").expect("client builds")
    }

    fn response_with(class_name: &str) -> serde_json::Value {
        json!({
            "success": true,
            "detections": [{
                "class_id": 1,
                "class_name": class_name,
                "confidence": 0.9,
                "bbox": { "x1": 0.0, "y1": 0.0, "x2": 10.0, "y2": 10.0 }
            }],
            "total_detections": 1
        })
    }

    #[tokio::test]
    async fn sends_bearer_token_and_decodes_detections() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/detect"))
            .and(header("authorization", "Bearer secret-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(response_with("hammer")))
            .expect(1)
            .mount(&server)
            .await;

        let transport = transport_for(&server);
        let batches = transport
            .recognize(&[b"first image".to_vec()])
            .await
            .expect("recognition succeeds");
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].detections[0].class_name, "hammer");
    }

    #[tokio::test]
    async fn results_keep_the_order_of_the_input_images() {
        let server = MockServer::start().await;
        // Match each request on its multipart body so the two distinguishable
        // images get distinguishable responses.
        Mock::given(method("POST"))
            .and(path("/detect"))
            .and(body_string_contains("first image"))
            .respond_with(ResponseTemplate::new(200).set_body_json(response_with("hammer")))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/detect"))
            .and(body_string_contains("second image"))
            .respond_with(ResponseTemplate::new(200).set_body_json(response_with("wrench")))
            .expect(1)
            .mount(&server)
            .await;

        let transport = transport_for(&server);
        let batches = transport
            .recognize(&[b"first image".to_vec(), b"second image".to_vec()])
            .await
            .expect("recognition succeeds");
        let names: Vec<&str> = batches
            .iter()
            .map(|b| b.detections[0].class_name.as_str())
            .collect();
        assert_eq!(names, ["hammer", "wrench"]);
    }

    #[tokio::test]
    async fn first_upstream_failure_aborts_the_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/detect"))
            .respond_with(ResponseTemplate::new(502))
            .expect(1)
            .mount(&server)
            .await;

        let transport = transport_for(&server);
        let error = transport
            .recognize(&[b"only".to_vec(), b"never sent".to_vec()])
            .await
            .expect_err("bad gateway fails the call");
        assert!(matches!(
            error,
            DetectionTransportError::UpstreamStatus { status: 502 }
        ));
    }

    #[tokio::test]
    async fn garbage_body_maps_to_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/detect"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let transport = transport_for(&server);
        let error = transport
            .recognize(&[b"img".to_vec()])
            .await
            .expect_err("body is not json");
        assert!(matches!(error, DetectionTransportError::Decode { .. }));
    }
}
