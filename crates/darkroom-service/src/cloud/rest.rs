//! PostgREST-style HTTP client for the cloud store.

use std::time::Duration;

use async_trait::async_trait;
use darkroom_db::model::CloudRow;
use reqwest::header::HeaderValue;
use reqwest::{Client, Method, RequestBuilder, Response, Url};

use crate::cloud::{CloudError, CloudResult, CloudStore};

const REST_PREFIX: &str = "rest/v1/";
const PREFER: &str = "Prefer";

#[derive(Debug, Clone)]
pub struct RestCloud {
    client: Client,
    base: Url,
    api_key: Option<String>,
}

impl RestCloud {
    /// ## Summary
    /// Creates a client for the cloud at `url`.
    ///
    /// ## Errors
    /// Returns an error if the URL does not parse or the HTTP client cannot be built.
    pub fn new(url: &str, api_key: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let mut base = url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base)?.join(REST_PREFIX)?;
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base,
            api_key,
        })
    }

    fn table_url(&self, table: &str, id: Option<&str>) -> CloudResult<Url> {
        let mut url = self
            .base
            .join(table)
            .map_err(|err| CloudError::Unreachable(format!("bad table url: {err}")))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("select", "*");
            if let Some(id) = id {
                query.append_pair("id", &format!("eq.{id}"));
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.api_key {
            Some(key) => builder.header("apikey", key).bearer_auth(key),
            None => builder,
        }
    }

    async fn rows(response: Response) -> CloudResult<Vec<CloudRow>> {
        let response = check(response).await?;
        response
            .json::<Vec<CloudRow>>()
            .await
            .map_err(|err| CloudError::Decode(err.to_string()))
    }
}

fn transport(err: &reqwest::Error) -> CloudError {
    if err.is_decode() {
        CloudError::Decode(err.to_string())
    } else {
        CloudError::Unreachable(err.to_string())
    }
}

async fn check(response: Response) -> CloudResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(CloudError::Rejected {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl CloudStore for RestCloud {
    #[tracing::instrument(skip(self))]
    async fn fetch_all(&self, table: &str) -> CloudResult<Vec<CloudRow>> {
        let response = self
            .request(Method::GET, self.table_url(table, None)?)
            .send()
            .await
            .map_err(|err| transport(&err))?;
        Self::rows(response).await
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_one(&self, table: &str, id: &str) -> CloudResult<Option<CloudRow>> {
        let response = self
            .request(Method::GET, self.table_url(table, Some(id))?)
            .send()
            .await
            .map_err(|err| transport(&err))?;
        Ok(Self::rows(response).await?.into_iter().next())
    }

    #[tracing::instrument(skip(self, row))]
    async fn upsert(&self, table: &str, row: &CloudRow) -> CloudResult<()> {
        let response = self
            .request(Method::POST, self.table_url(table, None)?)
            .header(
                PREFER,
                HeaderValue::from_static("resolution=merge-duplicates,return=minimal"),
            )
            .json(&[row])
            .send()
            .await
            .map_err(|err| transport(&err))?;
        check(response).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, patch))]
    async fn update(&self, table: &str, id: &str, patch: &CloudRow) -> CloudResult<u64> {
        let response = self
            .request(Method::PATCH, self.table_url(table, Some(id))?)
            .header(PREFER, HeaderValue::from_static("return=representation"))
            .json(patch)
            .send()
            .await
            .map_err(|err| transport(&err))?;
        Ok(Self::rows(response).await?.len() as u64)
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, table: &str, id: &str) -> CloudResult<u64> {
        let response = self
            .request(Method::DELETE, self.table_url(table, Some(id))?)
            .header(PREFER, HeaderValue::from_static("return=representation"))
            .send()
            .await
            .map_err(|err| transport(&err))?;
        Ok(Self::rows(response).await?.len() as u64)
    }

    async fn ping(&self) -> CloudResult<()> {
        let response = self
            .request(Method::GET, self.base.clone())
            .send()
            .await
            .map_err(|err| transport(&err))?;
        if response.status().is_server_error() {
            return Err(CloudError::Unreachable(format!(
                "cloud answered {}",
                response.status()
            )));
        }
        Ok(())
    }
}
