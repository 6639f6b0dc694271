use std::fmt;
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::header::AUTHORIZATION;
use reqwest::{StatusCode, Url};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::model::{FlightRecord, StatesResponse};

pub const STATES_PATH: &str = "/api/states/all";

pub type FetchOutcome = Result<Vec<FlightRecord>, FetchError>;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Query pairs in the order the endpoint documents them.
    pub fn query_pairs(&self) -> [(&'static str, String); 4] {
        [
            ("lamin", self.min_lat.to_string()),
            ("lomin", self.min_lon.to_string()),
            ("lamax", self.max_lat.to_string()),
            ("lomax", self.max_lon.to_string()),
        ]
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    pub fn basic_auth_value(&self) -> String {
        let token = STANDARD.encode(format!("{}:{}", self.client_id, self.client_secret));
        format!("Basic {token}")
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FetchRequest {
    pub bbox: BoundingBox,
    pub credentials: Credentials,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Authentication failed: check your client ID and client secret")]
    Unauthorized,
    #[error("Request failed with status {0}")]
    Status(u16),
    #[error("Network error: {0}")]
    Transport(String),
}

pub fn build_client(timeout: Option<Duration>) -> reqwest::Result<reqwest::blocking::Client> {
    let mut builder = reqwest::blocking::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build()
}

pub fn states_url(api_base: &str, bbox: &BoundingBox) -> Result<Url, FetchError> {
    let endpoint = format!("{}{}", api_base.trim().trim_end_matches('/'), STATES_PATH);
    Url::parse_with_params(&endpoint, bbox.query_pairs())
        .map_err(|err| FetchError::Transport(format!("invalid URL {endpoint}: {err}")))
}

/// Issues one request and classifies the response. Never retries.
pub fn fetch_states(
    client: &reqwest::blocking::Client,
    api_base: &str,
    request: &FetchRequest,
) -> FetchOutcome {
    let url = states_url(api_base, &request.bbox)?;
    debug!("GET {url}");
    let resp = client
        .get(url)
        .header(AUTHORIZATION, request.credentials.basic_auth_value())
        .send()
        .map_err(|err| FetchError::Transport(err.to_string()))?;

    match resp.status() {
        StatusCode::OK => {}
        StatusCode::UNAUTHORIZED => return Err(FetchError::Unauthorized),
        other => return Err(FetchError::Status(other.as_u16())),
    }

    let data = resp
        .json::<StatesResponse>()
        .map_err(|err| FetchError::Transport(err.to_string()))?;
    let records = data.records();
    debug!(
        "decoded {} of {} state vectors (time={:?})",
        records.len(),
        data.states.as_ref().map(Vec::len).unwrap_or(0),
        data.time
    );
    Ok(records)
}

/// Runs one fetch off the UI thread and reports exactly one outcome.
pub fn spawn_fetch(
    client: reqwest::blocking::Client,
    api_base: String,
    request: FetchRequest,
    tx: Sender<FetchOutcome>,
) {
    thread::spawn(move || {
        info!(
            "fetch started client_id={} bbox={:?}",
            request.credentials.client_id, request.bbox
        );
        let outcome = fetch_states(&client, &api_base, &request);
        match &outcome {
            Ok(records) => info!("fetch finished records={}", records.len()),
            Err(err) => warn!("fetch failed: {err}"),
        }
        if tx.send(outcome).is_err() {
            debug!("receiver dropped, discarding fetch outcome");
        }
    });
}
