use crate::capture::AudioCapture;
use crate::config::UploadConfig;
use crate::error::upload::UploadError;

use common::{ErrorLocation, HttpStatusCode, RedactedToken};
use models::AudioSettings;

use std::panic::Location;

use log::{debug, info};
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use url::Url;

const AUDIO_PART_NAME: &str = "audio";
const AUDIO_FILE_NAME: &str = "recording.wav";
const SETTINGS_PART_NAME: &str = "settings";

/// Submits finalized captures to the tutoring server.
#[derive(Debug, Clone)]
pub struct AudioUploader {
    endpoint: Url,
    client: Client,
}

impl AudioUploader {
    /// `page_origin` is the same origin the channel is derived from; a
    /// `ws`/`wss` origin is mapped back to `http`/`https`.
    pub fn new(page_origin: &str, config: &UploadConfig) -> Result<Self, UploadError> {
        let mut origin = Url::parse(page_origin)?;
        let scheme = match origin.scheme() {
            "ws" => Some("http"),
            "wss" => Some("https"),
            _ => None,
        };
        if let Some(scheme) = scheme {
            origin.set_scheme(scheme).map_err(|()| UploadError::Validation {
                message: format!("Cannot derive an HTTP origin from {page_origin}"),
                location: ErrorLocation::from(Location::caller()),
            })?;
        }

        let endpoint = origin.join(&config.audio_path)?;
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self { endpoint, client })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Upload one capture with its playback settings.
    ///
    /// Returns the server's JSON response unmodified.
    ///
    /// # Errors
    ///
    /// - [`UploadError::Validation`] for invalid settings or an empty capture
    /// - [`UploadError::Server`] for a non-2xx response
    /// - [`UploadError::Http`] / [`UploadError::Json`] for transport or body failures
    pub async fn submit(
        &self,
        token: &RedactedToken,
        capture: &AudioCapture,
        settings: &AudioSettings,
    ) -> Result<Value, UploadError> {
        settings.validate()?;
        if capture.is_empty() {
            return Err(UploadError::Validation {
                message: String::from("Audio capture is empty"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let audio = Part::bytes(capture.data().to_vec())
            .file_name(AUDIO_FILE_NAME)
            .mime_str(capture.mime_type())?;
        let form = Form::new()
            .part(AUDIO_PART_NAME, audio)
            .text(SETTINGS_PART_NAME, serde_json::to_string(settings)?);

        debug!(
            "Uploading {} bytes of {} to {}",
            capture.len(),
            capture.mime_type(),
            self.endpoint
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(token.as_str())
            .multipart(form)
            .send()
            .await?;

        let status = HttpStatusCode(response.status().as_u16());
        if !status.is_success() {
            let message = response.text().await.unwrap_or_else(|e| {
                debug!("Could not read body of HTTP {status} upload response: {e}");
                String::new()
            });
            return Err(UploadError::Server {
                status,
                message,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let json: Value = response.json().await?;
        info!("Audio submission accepted (HTTP {status})");
        Ok(json)
    }
}
