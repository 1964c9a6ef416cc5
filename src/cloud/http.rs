// ABOUTME: HTTP implementation of CloudImageClient for Power Virtual Server.
// ABOUTME: Maps the pcloud REST API and its status codes onto CloudError.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use super::client::{CloudError, CloudImageClient, ImportJob, ImportJobRequest, JobRef, RemoteImage};
use crate::types::{ImageId, JobId, JobState, ServiceInstanceId};

/// REST client bound to one service instance.
#[derive(Clone)]
pub struct HttpCloudClient {
    http: reqwest::Client,
    endpoint: String,
    token: String,
    crn: String,
    instance: ServiceInstanceId,
}

impl std::fmt::Debug for HttpCloudClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCloudClient")
            .field("endpoint", &self.endpoint)
            .field("instance", &self.instance)
            .finish_non_exhaustive()
    }
}

impl HttpCloudClient {
    pub fn new(
        http: reqwest::Client,
        endpoint: impl Into<String>,
        token: impl Into<String>,
        crn: impl Into<String>,
        instance: ServiceInstanceId,
    ) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            token: token.into(),
            crn: crn.into(),
            instance,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn instance_url(&self, instance: &ServiceInstanceId, path: &str) -> String {
        instance_url(&self.endpoint, instance, path)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(&self.token)
            .header("CRN", &self.crn)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, CloudError> {
        let response = request
            .send()
            .await
            .map_err(|e| CloudError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(error_for_status(status, &body))
    }
}

#[async_trait]
impl CloudImageClient for HttpCloudClient {
    async fn list_images(&self) -> Result<Vec<RemoteImage>, CloudError> {
        let url = self.instance_url(&self.instance, "/images");
        tracing::debug!("GET {}", url);
        let response = self.send(self.request(Method::GET, &url)).await?;
        let body: ImagesBody = read_json(response).await?;
        body.into_remote_images()
    }

    async fn create_import_job(&self, request: &ImportJobRequest) -> Result<JobRef, CloudError> {
        let url = self.instance_url(&self.instance, "/cos-images");
        tracing::debug!("POST {} ({})", url, request.image_name);
        let response = self
            .send(self.request(Method::POST, &url).json(request))
            .await?;
        let body: JobReferenceBody = read_json(response).await?;
        body.into_job_ref()
    }

    async fn get_import_job(
        &self,
        instance: &ServiceInstanceId,
    ) -> Result<ImportJob, CloudError> {
        let url = self.instance_url(instance, "/cos-images");
        tracing::debug!("GET {}", url);
        let response = self.send(self.request(Method::GET, &url)).await?;
        let body: JobBody = read_json(response).await?;
        body.into_import_job()
    }

    async fn delete_image(&self, id: &ImageId) -> Result<(), CloudError> {
        let path = format!("/images/{}", urlencoding::encode(id.as_str()));
        let url = self.instance_url(&self.instance, &path);
        tracing::debug!("DELETE {}", url);
        self.send(self.request(Method::DELETE, &url)).await?;
        Ok(())
    }

    async fn delete_job(&self, id: &JobId) -> Result<(), CloudError> {
        let path = format!("/jobs/{}", urlencoding::encode(id.as_str()));
        let url = self.instance_url(&self.instance, &path);
        tracing::debug!("DELETE {}", url);
        self.send(self.request(Method::DELETE, &url)).await?;
        Ok(())
    }
}

fn instance_url(endpoint: &str, instance: &ServiceInstanceId, path: &str) -> String {
    format!(
        "{}/pcloud/v1/cloud-instances/{}{}",
        endpoint.trim_end_matches('/'),
        urlencoding::encode(instance.as_str()),
        path
    )
}

async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, CloudError> {
    response
        .json::<T>()
        .await
        .map_err(|e| CloudError::InvalidResponse(e.to_string()))
}

/// Translate a non-success response into the matching error variant.
pub(crate) fn error_for_status(status: StatusCode, body: &str) -> CloudError {
    let message = error_message(body);
    match status {
        StatusCode::NOT_FOUND => CloudError::NotFound(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CloudError::Unauthorized(message),
        _ => CloudError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

/// Pull a readable message out of an error body.
fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        description: Option<String>,
        message: Option<String>,
        error: Option<String>,
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body)
        && let Some(message) = parsed.description.or(parsed.message).or(parsed.error)
    {
        return message;
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        "no response body".to_string()
    } else {
        trimmed.to_string()
    }
}

#[derive(Debug, Deserialize)]
struct ImagesBody {
    #[serde(default)]
    images: Vec<ImageEntry>,
}

#[derive(Debug, Deserialize)]
struct ImageEntry {
    #[serde(rename = "imageID")]
    image_id: String,
    name: String,
    #[serde(default)]
    state: Option<String>,
}

impl ImagesBody {
    fn into_remote_images(self) -> Result<Vec<RemoteImage>, CloudError> {
        self.images
            .into_iter()
            .map(|entry| {
                let id = ImageId::new(entry.image_id).map_err(|_| {
                    CloudError::InvalidResponse(format!("image {} has no ID", entry.name))
                })?;
                Ok(RemoteImage {
                    name: entry.name,
                    id,
                    state: entry.state,
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct JobReferenceBody {
    id: String,
}

impl JobReferenceBody {
    fn into_job_ref(self) -> Result<JobRef, CloudError> {
        let id = JobId::new(self.id)
            .map_err(|_| CloudError::InvalidResponse("job reference has no ID".to_string()))?;
        Ok(JobRef { id })
    }
}

#[derive(Debug, Deserialize)]
struct JobBody {
    id: String,
    status: JobStatusBody,
}

#[derive(Debug, Deserialize)]
struct JobStatusBody {
    state: String,
    #[serde(default)]
    message: Option<String>,
}

impl JobBody {
    fn into_import_job(self) -> Result<ImportJob, CloudError> {
        let id = JobId::new(self.id)
            .map_err(|_| CloudError::InvalidResponse("import job has no ID".to_string()))?;
        Ok(ImportJob {
            id,
            state: JobState::from_remote(&self.status.state),
            message: self.status.message.filter(|m| !m.is_empty()),
        })
    }
}
