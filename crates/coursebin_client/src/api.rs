use std::time::Duration;

use coursebin_core::{
    CourseData, JobId, JobRecord, ProfileKind, SavedProfile, ScheduledSection, TaskRequest,
};
use coursebin_logging::{cb_debug, cb_info};
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::{ApiError, FailureKind};

const JSON: &str = "application/json";

#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Root of the REST API; endpoint paths are appended to it.
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_bytes: u64,
    /// Sent as `Authorization: Bearer <token>` when present.
    pub access_token: Option<String>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api/".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_bytes: 5 * 1024 * 1024,
            access_token: None,
        }
    }
}

/// The scheduler backend as seen by the client.
#[async_trait::async_trait]
pub trait SchedulerApi: Send + Sync {
    /// `PUT /courses/{term}/{course}/` asks the server to refresh and return
    /// the course.
    async fn fetch_course(&self, term: &str, course: &str) -> Result<CourseData, ApiError>;

    async fn submit_task(&self, request: &TaskRequest) -> Result<JobRecord, ApiError>;

    async fn get_task(&self, job_id: JobId) -> Result<JobRecord, ApiError>;

    async fn load_profile(&self, kind: ProfileKind, id: u64) -> Result<SavedProfile, ApiError>;

    async fn save_profile(
        &self,
        kind: ProfileKind,
        id: u64,
        profile: &SavedProfile,
    ) -> Result<(), ApiError>;

    /// Sections held by a saved schedule. A schedule without sections yields
    /// an empty list.
    async fn schedule_sections(&self, id: u64) -> Result<Vec<ScheduledSection>, ApiError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestApi {
    settings: ApiSettings,
    base: Url,
    client: reqwest::Client,
}

impl ReqwestApi {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        let mut base = Url::parse(&settings.base_url)
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::new(
                FailureKind::InvalidUrl,
                format!("{} cannot carry a path", settings.base_url),
            ));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            settings,
            base,
            client,
        })
    }

    /// Appends percent-encoded `segments` to the base URL, keeping the
    /// trailing slash the backend routes expect.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::new(FailureKind::InvalidUrl, "base url cannot carry a path"))?
            .pop_if_empty()
            .extend(segments)
            .push("");
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, ApiError> {
        cb_debug!("{} {}", method, url);
        let mut request = self.client.request(method, url.clone()).header(ACCEPT, JSON);
        if let Some(token) = &self.settings.access_token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, JSON).body(body);
        }

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::new(
                FailureKind::HttpStatus(status.as_u16()),
                format!("{url} returned {status}"),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(self.too_large(content_len));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(self.too_large(next_len));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let bytes = self.send(Method::GET, url, None).await?;
        decode(&bytes)
    }

    fn too_large(&self, actual: u64) -> ApiError {
        ApiError::new(
            FailureKind::TooLarge {
                max_bytes: self.settings.max_bytes,
                actual: Some(actual),
            },
            "response too large",
        )
    }
}

#[async_trait::async_trait]
impl SchedulerApi for ReqwestApi {
    async fn fetch_course(&self, term: &str, course: &str) -> Result<CourseData, ApiError> {
        let url = self.endpoint(&["courses", term, course])?;
        let bytes = self.send(Method::PUT, url, None).await?;
        let value: Value = decode(&bytes)?;
        let data = CourseData::from_value(value)
            .map_err(|err| ApiError::new(FailureKind::InvalidCourseData, err.to_string()))?;
        cb_info!(
            "Fetched {}:{} with {} sections",
            term,
            course,
            data.sections.len()
        );
        Ok(data)
    }

    async fn submit_task(&self, request: &TaskRequest) -> Result<JobRecord, ApiError> {
        let url = self.endpoint(&["tasks"])?;
        let body = encode(request)?;
        let bytes = self.send(Method::POST, url, Some(body)).await?;
        let record: JobRecord = decode(&bytes)?;
        cb_info!("Submitted job {} ({})", record.id, record.status);
        Ok(record)
    }

    async fn get_task(&self, job_id: JobId) -> Result<JobRecord, ApiError> {
        let id = job_id.to_string();
        let url = self.endpoint(&["tasks", &id])?;
        self.get_json(url).await
    }

    async fn load_profile(&self, kind: ProfileKind, id: u64) -> Result<SavedProfile, ApiError> {
        let id = id.to_string();
        let url = self.endpoint(&[kind.path_segment(), &id])?;
        self.get_json(url).await
    }

    async fn save_profile(
        &self,
        kind: ProfileKind,
        id: u64,
        profile: &SavedProfile,
    ) -> Result<(), ApiError> {
        let id = id.to_string();
        let url = self.endpoint(&[kind.path_segment(), &id])?;
        let body = encode(profile)?;
        self.send(Method::PATCH, url, Some(body)).await?;
        Ok(())
    }

    async fn schedule_sections(&self, id: u64) -> Result<Vec<ScheduledSection>, ApiError> {
        let id = id.to_string();
        let url = self.endpoint(&[ProfileKind::Schedule.path_segment(), &id])?;
        let mut schedule: Value = self.get_json(url).await?;
        match schedule.get_mut("sections").map(Value::take) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(sections) => serde_json::from_value(sections)
                .map_err(|err| ApiError::new(FailureKind::InvalidResponse, err.to_string())),
        }
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, ApiError> {
    serde_json::to_vec(value)
        .map_err(|err| ApiError::new(FailureKind::InvalidResponse, err.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(bytes)
        .map_err(|err| ApiError::new(FailureKind::InvalidResponse, err.to_string()))
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}
