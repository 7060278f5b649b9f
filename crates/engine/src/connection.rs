use crate::client::EngineClient;
use crate::error::{EngineError, Result};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tonic::transport::{Channel, Endpoint};

pub const DEFAULT_ENGINE_HOST: &str = "localhost";
pub const DEFAULT_ENGINE_PORT: u16 = 50051;
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 100 * 1024 * 1024;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Where and how to reach the analysis engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_message_size: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_ENGINE_HOST.to_string(),
            port: DEFAULT_ENGINE_PORT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl EngineSettings {
    pub fn endpoint_uri(&self) -> String {
        format!("http://{}:{}", self.host.trim(), self.port)
    }
}

/// Owns the single channel to the analysis engine.
///
/// Construction never touches the network. The channel is created on the first
/// [`connect`](Self::connect) and shared by every later call until
/// [`disconnect`](Self::disconnect).
pub struct ConnectionManager {
    settings: EngineSettings,
    channel: Mutex<Option<Arc<Channel>>>,
}

impl ConnectionManager {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            channel: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn endpoint(&self) -> String {
        self.settings.endpoint_uri()
    }

    /// Return the shared channel, creating it if absent.
    ///
    /// The presence check and creation happen under one lock, so concurrent first use yields
    /// one channel. The channel connects lazily: an unreachable engine is reported by the
    /// first RPC, an unparsable endpoint is reported here.
    pub fn connect(&self) -> Result<Arc<Channel>> {
        let mut guard = self.channel.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(channel) = guard.as_ref() {
            return Ok(Arc::clone(channel));
        }

        let uri = self.settings.endpoint_uri();
        let endpoint = Endpoint::from_shared(uri.clone())
            .map_err(|err| EngineError::Unavailable {
                endpoint: uri.clone(),
                message: format!("invalid endpoint: {err}"),
            })?
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout);

        let channel = Arc::new(endpoint.connect_lazy());
        log::info!("Analysis engine channel created for {uri}");
        *guard = Some(Arc::clone(&channel));
        Ok(channel)
    }

    /// Typed client over the shared channel.
    pub fn client(&self) -> Result<EngineClient> {
        let channel = self.connect()?;
        Ok(EngineClient::new(
            channel.as_ref().clone(),
            self.endpoint(),
            self.settings.max_message_size,
        ))
    }

    /// Drop the channel so the next [`connect`](Self::connect) builds a fresh one.
    pub fn disconnect(&self) {
        let previous = self
            .channel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            log::info!("Analysis engine channel closed ({})", self.endpoint());
        }
    }

    pub fn is_connected(&self) -> bool {
        self.channel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
