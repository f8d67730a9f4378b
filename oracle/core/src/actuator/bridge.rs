//! HTTP Bridge SDK
//!
//! [`ControlSdk`] implementation that talks JSON to a bridge service running
//! next to the robot's native middleware.
//!
//! # Protocol
//!
//! - `GET /services` lists available service names (reachability probe)
//! - `GET /services/{name}` succeeds if one service is available
//! - `POST /call` with `{"service", "method", "args"}` returns
//!   `{"result": ...}` or `{"error": "..."}`
//!
//! Calls block until the robot finishes (speech, animations), so the client
//! timeout is generous.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::hardware::RobotEndpoint;
use super::sdk::{
    AnimatedSpeechProxy, AnimationProxy, ControlSdk, MotionProxy, RawFrame, SdkResult,
    SensorState, SpeechProxy, TouchProxy, VideoProxy,
};
use crate::error::ActuatorError;

const TEXT_TO_SPEECH: &str = "ALTextToSpeech";
const MOTION: &str = "ALMotion";
const ANIMATION_PLAYER: &str = "ALAnimationPlayer";
const ANIMATED_SPEECH: &str = "ALAnimatedSpeech";
const VIDEO_DEVICE: &str = "ALVideoDevice";
const TOUCH: &str = "ALTouch";

/// Timeout for the initial probe
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for blocking robot calls
const CALL_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Serialize)]
struct CallRequest<'a> {
    service: &'a str,
    method: &'a str,
    args: Value,
}

#[derive(Deserialize)]
struct CallResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct FrameBody {
    width: u32,
    height: u32,
    channels: u8,
    data: Vec<u8>,
}

/// Low-level bridge client
#[derive(Clone)]
pub struct BridgeClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl BridgeClient {
    /// Create a client for an endpoint
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built.
    pub fn new(endpoint: &RobotEndpoint) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(CALL_TIMEOUT)
            .build()
            .context("failed to create HTTP client")?;
        Ok(Self {
            base_url: format!("http://{endpoint}"),
            http_client,
        })
    }

    /// Base URL of the bridge
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List available services
    ///
    /// # Errors
    ///
    /// Fails on transport errors or a non-success status.
    pub async fn services(&self) -> anyhow::Result<Vec<String>> {
        let response = self
            .http_client
            .get(format!("{}/services", self.base_url))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await?;
        if !response.status().is_success() {
            anyhow::bail!("bridge returned {}", response.status());
        }
        Ok(response.json().await?)
    }

    /// Check that one service is available
    ///
    /// # Errors
    ///
    /// Fails if the service is missing or the bridge is unreachable.
    pub async fn require(&self, service: &str) -> anyhow::Result<()> {
        let response = self
            .http_client
            .get(format!("{}/services/{service}", self.base_url))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await?;
        if !response.status().is_success() {
            anyhow::bail!("service {service} unavailable ({})", response.status());
        }
        Ok(())
    }

    /// Invoke a service method
    ///
    /// # Errors
    ///
    /// Fails on transport errors, non-success status, or an `error` reply.
    pub async fn call(&self, service: &str, method: &str, args: Value) -> anyhow::Result<Value> {
        let request = CallRequest {
            service,
            method,
            args,
        };
        let response = self
            .http_client
            .post(format!("{}/call", self.base_url))
            .json(&request)
            .send()
            .await
            .with_context(|| format!("{service}.{method}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{service}.{method} returned {status}: {body}");
        }

        let reply: CallResponse = response.json().await?;
        match reply.error {
            Some(error) => anyhow::bail!("{service}.{method}: {error}"),
            None => Ok(reply.result),
        }
    }
}

/// [`ControlSdk`] over the HTTP bridge
pub struct BridgeSdk {
    client: BridgeClient,
}

impl BridgeSdk {
    /// Probe the bridge and return an SDK handle
    ///
    /// # Errors
    ///
    /// Returns [`ActuatorError::BackendUnavailable`] if the bridge cannot be
    /// reached.
    pub async fn connect(endpoint: &RobotEndpoint) -> Result<Self, ActuatorError> {
        let client = BridgeClient::new(endpoint)
            .map_err(|e| ActuatorError::BackendUnavailable(format!("{e:#}")))?;
        let services = client.services().await.map_err(|e| {
            ActuatorError::BackendUnavailable(format!("cannot reach robot at {endpoint}: {e:#}"))
        })?;
        tracing::info!(endpoint = %endpoint, services = services.len(), "Connected to robot bridge");
        Ok(Self { client })
    }

    async fn proxy(&self, service: &'static str) -> SdkResult<BridgeProxy> {
        self.client.require(service).await?;
        Ok(BridgeProxy {
            client: self.client.clone(),
            service,
        })
    }
}

/// One remote service
struct BridgeProxy {
    client: BridgeClient,
    service: &'static str,
}

impl BridgeProxy {
    async fn call(&self, method: &str, args: Value) -> SdkResult<Value> {
        self.client.call(self.service, method, args).await
    }
}

#[async_trait]
impl SpeechProxy for BridgeProxy {
    async fn say(&self, text: &str) -> SdkResult<()> {
        self.call("say", json!([text])).await.map(drop)
    }
}

#[async_trait]
impl AnimatedSpeechProxy for BridgeProxy {
    async fn say(&self, text: &str) -> SdkResult<()> {
        self.call("say", json!([text])).await.map(drop)
    }
}

#[async_trait]
impl MotionProxy for BridgeProxy {
    async fn wake_up(&self) -> SdkResult<()> {
        self.call("wakeUp", json!([])).await.map(drop)
    }

    async fn rest(&self) -> SdkResult<()> {
        self.call("rest", json!([])).await.map(drop)
    }

    async fn set_angles(&self, joint: &str, angle: f32, speed: f32) -> SdkResult<()> {
        self.call("setAngles", json!([joint, angle, speed]))
            .await
            .map(drop)
    }
}

#[async_trait]
impl AnimationProxy for BridgeProxy {
    async fn run(&self, asset: &str) -> SdkResult<()> {
        self.call("run", json!([asset])).await.map(drop)
    }
}

#[async_trait]
impl VideoProxy for BridgeProxy {
    async fn subscribe(
        &self,
        name: &str,
        camera: u8,
        resolution: u8,
        color_space: u8,
        fps: u8,
    ) -> SdkResult<String> {
        let handle = self
            .call(
                "subscribeCamera",
                json!([name, camera, resolution, color_space, fps]),
            )
            .await?;
        handle
            .as_str()
            .map(str::to_string)
            .context("subscribeCamera returned no client handle")
    }

    async fn frame(&self, client: &str) -> SdkResult<Option<RawFrame>> {
        let value = self.call("getImageRemote", json!([client])).await?;
        if value.is_null() {
            return Ok(None);
        }
        let body: FrameBody = serde_json::from_value(value).context("malformed camera frame")?;
        Ok(Some(RawFrame {
            width: body.width,
            height: body.height,
            channels: body.channels,
            data: body.data,
        }))
    }

    async fn unsubscribe(&self, client: &str) -> SdkResult<()> {
        self.call("unsubscribe", json!([client])).await.map(drop)
    }
}

/// Parse `[[name, active, ...], ...]` touch status rows
fn parse_touch_status(value: &Value) -> Vec<SensorState> {
    value
        .as_array()
        .map(|rows| {
            rows.iter()
                .filter_map(|row| {
                    let name = row.get(0)?.as_str()?.to_string();
                    let active = row.get(1)?.as_bool()?;
                    Some(SensorState { name, active })
                })
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl TouchProxy for BridgeProxy {
    async fn status(&self) -> SdkResult<Vec<SensorState>> {
        let value = self.call("getStatus", json!([])).await?;
        Ok(parse_touch_status(&value))
    }
}

#[async_trait]
impl ControlSdk for BridgeSdk {
    async fn speech(&self) -> SdkResult<Arc<dyn SpeechProxy>> {
        Ok(Arc::new(self.proxy(TEXT_TO_SPEECH).await?))
    }

    async fn motion(&self) -> SdkResult<Arc<dyn MotionProxy>> {
        Ok(Arc::new(self.proxy(MOTION).await?))
    }

    async fn animation_player(&self) -> SdkResult<Arc<dyn AnimationProxy>> {
        Ok(Arc::new(self.proxy(ANIMATION_PLAYER).await?))
    }

    async fn animated_speech(&self) -> SdkResult<Arc<dyn AnimatedSpeechProxy>> {
        Ok(Arc::new(self.proxy(ANIMATED_SPEECH).await?))
    }

    async fn video(&self) -> SdkResult<Arc<dyn VideoProxy>> {
        Ok(Arc::new(self.proxy(VIDEO_DEVICE).await?))
    }

    async fn touch(&self) -> SdkResult<Arc<dyn TouchProxy>> {
        Ok(Arc::new(self.proxy(TOUCH).await?))
    }
}
