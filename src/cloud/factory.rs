// ABOUTME: Builds cloud clients for a service instance.
// ABOUTME: Exchanges the API key for a token and resolves account, zone, and region.

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;

use super::client::{CloudError, CloudImageClient};
use super::http::{HttpCloudClient, error_for_status};
use super::region::{endpoint_for_region, region_for_zone};
use crate::types::ServiceInstanceId;

pub const DEFAULT_IAM_ENDPOINT: &str = "https://iam.cloud.ibm.com";
pub const DEFAULT_RESOURCE_CONTROLLER_ENDPOINT: &str = "https://resource-controller.cloud.ibm.com";

const APIKEY_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

/// Produces a ready-to-use client for one service instance.
///
/// Any failure here is fatal for the reconcile pass that asked for the
/// client, so implementations report everything as `CloudError::Setup`.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    type Client: CloudImageClient;

    async fn build(&self, instance: &ServiceInstanceId) -> Result<Self::Client, CloudError>;
}

/// Resolved credentials and endpoints for the HTTP backend.
#[derive(Clone)]
pub struct CloudSettings {
    pub api_key: String,
    pub account: String,
    /// Workspace zone. Looked up through the resource controller when unset.
    pub zone: Option<String>,
    /// Overrides the region-derived API endpoint.
    pub endpoint: Option<String>,
    pub iam_endpoint: String,
    pub resource_controller_endpoint: String,
}

impl std::fmt::Debug for CloudSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudSettings")
            .field("account", &self.account)
            .field("zone", &self.zone)
            .field("endpoint", &self.endpoint)
            .field("iam_endpoint", &self.iam_endpoint)
            .field(
                "resource_controller_endpoint",
                &self.resource_controller_endpoint,
            )
            .finish_non_exhaustive()
    }
}

/// Factory for `HttpCloudClient`.
#[derive(Debug, Clone)]
pub struct HttpClientFactory {
    http: reqwest::Client,
    settings: CloudSettings,
}

impl HttpClientFactory {
    pub fn new(settings: CloudSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }

    async fn fetch_token(&self) -> Result<String, CloudError> {
        #[derive(Deserialize)]
        struct TokenBody {
            access_token: String,
        }

        let url = format!(
            "{}/identity/token",
            self.settings.iam_endpoint.trim_end_matches('/')
        );
        let response = self
            .http
            .post(&url)
            .header("Accept", "application/json")
            .form(&[
                ("grant_type", APIKEY_GRANT_TYPE),
                ("apikey", self.settings.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| setup("failed to get authenticator token", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(setup(
                "failed to get authenticator token",
                error_for_status(status, &body),
            ));
        }

        let body: TokenBody = response
            .json()
            .await
            .map_err(|e| setup("failed to decode token response", e))?;
        Ok(body.access_token)
    }

    async fn lookup_zone(
        &self,
        token: &str,
        instance: &ServiceInstanceId,
    ) -> Result<String, CloudError> {
        #[derive(Deserialize)]
        struct ResourceInstanceBody {
            region_id: Option<String>,
        }

        let url = format!(
            "{}/v2/resource_instances/{}",
            self.settings.resource_controller_endpoint.trim_end_matches('/'),
            urlencoding::encode(instance.as_str())
        );
        let response = self
            .http
            .request(Method::GET, &url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| setup("failed to get resource instance", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(setup(
                "failed to get resource instance",
                error_for_status(status, &body),
            ));
        }

        let body: ResourceInstanceBody = response
            .json()
            .await
            .map_err(|e| setup("failed to decode resource instance", e))?;
        body.region_id
            .filter(|zone| !zone.is_empty())
            .ok_or_else(|| CloudError::Setup(format!("resource instance {} has no region", instance)))
    }
}

#[async_trait]
impl ClientFactory for HttpClientFactory {
    type Client = HttpCloudClient;

    async fn build(&self, instance: &ServiceInstanceId) -> Result<HttpCloudClient, CloudError> {
        if self.settings.account.trim().is_empty() {
            return Err(CloudError::Setup("failed to get account".to_string()));
        }

        let token = self.fetch_token().await?;

        let zone = match &self.settings.zone {
            Some(zone) => zone.clone(),
            None => self.lookup_zone(&token, instance).await?,
        };

        let region = region_for_zone(&zone)
            .ok_or_else(|| CloudError::Setup(format!("failed to get region for zone {}", zone)))?;

        let endpoint = self
            .settings
            .endpoint
            .clone()
            .unwrap_or_else(|| endpoint_for_region(region));

        tracing::debug!(
            "Built client for instance {} (zone {}, endpoint {})",
            instance,
            zone,
            endpoint
        );

        Ok(HttpCloudClient::new(
            self.http.clone(),
            endpoint,
            token,
            instance_crn(&zone, &self.settings.account, instance),
            instance.clone(),
        ))
    }
}

/// CRN header value identifying the workspace to the API.
pub fn instance_crn(zone: &str, account: &str, instance: &ServiceInstanceId) -> String {
    format!(
        "crn:v1:bluemix:public:power-iaas:{}:a/{}:{}::",
        zone, account, instance
    )
}

fn setup(context: &str, err: impl std::fmt::Display) -> CloudError {
    CloudError::Setup(format!("{}: {}", context, err))
}
