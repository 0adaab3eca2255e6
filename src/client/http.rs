//! HTTP implementation of the deploy-manager gateway

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::DeployManagerApi;
use crate::error::{ApiError, Error, Result};
use crate::models::{DeployApplication, EnvResCompData, Environment};

/// Requests per second against any one instance
const RATE_LIMIT_PER_SECOND: u32 = 10;

/// Gateway over the deploy-manager REST surface
pub struct HttpDeployManagerClient {
    http: HttpClient,
    api_token: Option<String>,
    rate_limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

#[derive(Debug, Deserialize)]
struct ApplicationDto {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct EnvironmentDto {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvResCompDto {
    #[serde(default)]
    component_id: String,
    #[serde(default)]
    component_name: String,
    #[serde(default)]
    component_version: String,
    #[serde(default)]
    deployed: bool,
    #[serde(default)]
    environment_name: String,
    #[serde(default)]
    as_of_date: i64,
    #[serde(default)]
    online: bool,
    #[serde(default)]
    resource_name: String,
}

impl HttpDeployManagerClient {
    /// Create a new gateway client
    pub fn new(api_token: Option<String>, timeout: Duration) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let quota = Quota::per_second(NonZeroU32::new(RATE_LIMIT_PER_SECOND).unwrap());
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Ok(Self {
            http,
            api_token,
            rate_limiter,
        })
    }

    /// Make a rate-limited GET request and parse the JSON body
    async fn get_json<T: DeserializeOwned>(&self, instance_url: &str, path: &str) -> Result<T> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}{}", instance_url.trim_end_matches('/'), path);
        let mut request = self.http.get(&url);
        if let Some(token) = &self.api_token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request.send().await.map_err(ApiError::from)?;

        let status = response.status();
        match status {
            StatusCode::OK => {
                let data = response.json::<T>().await.map_err(|e| {
                    ApiError::InvalidResponse(format!("Failed to parse response: {}", e))
                })?;
                Ok(data)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(ApiError::Unauthorized(instance_url.to_string()).into())
            }
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(url).into()),
            StatusCode::BAD_REQUEST => {
                let msg = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Bad request".to_string());
                Err(ApiError::BadRequest(msg).into())
            }
            _ => Err(ApiError::ServerError(format!("{} returned {}", url, status)).into()),
        }
    }
}

#[async_trait]
impl DeployManagerApi for HttpDeployManagerClient {
    async fn list_applications(&self, instance_url: &str) -> Result<Vec<DeployApplication>> {
        let dtos: Vec<ApplicationDto> = self.get_json(instance_url, "/rest/applications").await?;

        Ok(dtos
            .into_iter()
            .map(|dto| DeployApplication::discovered(instance_url, &dto.id, &dto.name))
            .collect())
    }

    async fn list_environments(
        &self,
        application: &DeployApplication,
    ) -> Result<Vec<Environment>> {
        let path = format!("/rest/applications/{}/environments", application.application_id);
        let dtos: Vec<EnvironmentDto> = self.get_json(&application.instance_url, &path).await?;

        Ok(dtos
            .into_iter()
            .map(|dto| Environment {
                id: dto.id,
                name: dto.name,
            })
            .collect())
    }

    async fn fetch_env_resource_data(
        &self,
        application: &DeployApplication,
        environment: &Environment,
    ) -> Result<Vec<EnvResCompData>> {
        let owner = application.id.ok_or_else(|| {
            Error::Other(format!(
                "application {} has no stored id",
                application.application_id
            ))
        })?;

        let path = format!(
            "/rest/applications/{}/environments/{}/resources",
            application.application_id, environment.id
        );
        let dtos: Vec<EnvResCompDto> = self.get_json(&application.instance_url, &path).await?;

        Ok(dtos
            .into_iter()
            .map(|dto| EnvResCompData {
                collector_item_id: owner,
                component_id: dto.component_id,
                component_name: dto.component_name,
                component_version: dto.component_version,
                deployed: dto.deployed,
                environment_name: dto.environment_name,
                as_of: DateTime::<Utc>::from_timestamp_millis(dto.as_of_date)
                    .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
                online: dto.online,
                resource_name: dto.resource_name,
            })
            .collect())
    }
}
