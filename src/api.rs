use actix_web::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use actix_web::http::Method;
use actix_web::web::Bytes;
use awc::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::campaign::client::CampaignClient;
use crate::donation::client::DonationClient;
use crate::error::Error;
use crate::session::Session;
use crate::user::client::UserClient;

/// Largest upstream response body read before giving up.
pub const DEFAULT_BODY_LIMIT: usize = 8 * 1024 * 1024;

/// The remote portal api, one client per resource.
pub trait PortalApi {
    fn campaigns(&self) -> &dyn CampaignClient;
    fn donations(&self) -> &dyn DonationClient;
    fn users(&self) -> &dyn UserClient;
}

#[derive(Clone)]
pub struct HttpPortalApi {
    client: Client,
    base_url: String,
    body_limit: usize,
}

#[derive(Deserialize)]
struct RejectionBody {
    #[serde(default)]
    msg: Option<String>,
}

impl HttpPortalApi {
    pub fn new(base_url: impl Into<String>, body_limit: usize) -> HttpPortalApi {
        HttpPortalApi {
            client: Client::default(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            body_limit,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issues an authenticated `GET` for `path` and parses the json body.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        session: &Session,
        path: &str,
    ) -> Result<T, Error> {
        let body = self.request(session, Method::GET, path, None).await?;

        Ok(serde_json::from_slice(&body)?)
    }

    /// Sends `payload` as json with `method` and parses the json reply.
    pub(crate) async fn send<P: Serialize, T: DeserializeOwned>(
        &self,
        session: &Session,
        method: Method,
        path: &str,
        payload: &P,
    ) -> Result<T, Error> {
        let payload = serde_json::to_vec(payload)?;
        let body = self.request(session, method, path, Some(payload)).await?;

        Ok(serde_json::from_slice(&body)?)
    }

    /// Like [`HttpPortalApi::send`] for calls whose reply carries nothing
    /// needed. Only the status is checked.
    pub(crate) async fn execute(
        &self,
        session: &Session,
        method: Method,
        path: &str,
        payload: Option<&Value>,
    ) -> Result<(), Error> {
        let payload = payload.map(serde_json::to_vec).transpose()?;
        self.request(session, method, path, payload).await?;

        Ok(())
    }

    async fn request(
        &self,
        session: &Session,
        method: Method,
        path: &str,
        payload: Option<Vec<u8>>,
    ) -> Result<Bytes, Error> {
        let url = format!("{}{}", self.base_url, path);

        let request = self
            .client
            .request(method, url.as_str())
            .insert_header((AUTHORIZATION, session.authorization()))
            .insert_header((ACCEPT, "application/json"));

        let mut response = match payload {
            Some(payload) => {
                request
                    .insert_header((CONTENT_TYPE, "application/json"))
                    .send_body(payload)
                    .await?
            }
            None => request.send().await?,
        };

        let status = response.status();
        let body = response.body().limit(self.body_limit).await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<RejectionBody>(&body)
                .ok()
                .and_then(|body| body.msg)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());

            warn!(%url, status = status.as_u16(), %message, "portal api rejected request");
            return Err(Error::UpstreamRejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(body)
    }
}

impl PortalApi for HttpPortalApi {
    fn campaigns(&self) -> &dyn CampaignClient {
        self
    }

    fn donations(&self) -> &dyn DonationClient {
        self
    }

    fn users(&self) -> &dyn UserClient {
        self
    }
}

/// Parses each record on its own, dropping the ones that are malformed so a
/// single bad record does not fail the whole listing.
pub(crate) fn parse_records<T: DeserializeOwned>(records: Vec<Value>, kind: &'static str) -> Vec<T> {
    records
        .into_iter()
        .filter_map(|record| match serde_json::from_value(record) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(kind, error = %err, "dropping malformed record");
                None
            }
        })
        .collect()
}
