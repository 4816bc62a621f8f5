use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use url::Url;

use crate::api::{
    DeviceInfo, DeviceSummary, Listing, LoginRequest, LoginResponse, NotificationSettings,
    NotificationSettingsUpdate, PropertyDetails, PropertySettings, PropertySettingsUpdate,
    PropertySummary, Telemetry, ValveAction, ValveCommand,
};
use crate::error::{HeroLabsError, HeroLabsResult};

/// The operations the bridge needs from the Sonic cloud service.
///
/// Implementations must be safe to call concurrently; the bridge shares a
/// single instance between every coordinator and entity.
#[async_trait]
pub trait SonicApi: Send + Sync {
    /* account */
    async fn list_devices(&self) -> HeroLabsResult<Vec<DeviceSummary>>;
    async fn list_properties(&self) -> HeroLabsResult<Vec<PropertySummary>>;

    /* device */
    async fn device_details(&self, id: &str) -> HeroLabsResult<DeviceInfo>;
    async fn device_telemetry(&self, id: &str) -> HeroLabsResult<Telemetry>;
    async fn open_valve(&self, id: &str) -> HeroLabsResult<()>;
    async fn close_valve(&self, id: &str) -> HeroLabsResult<()>;

    /* property */
    async fn property_details(&self, id: &str) -> HeroLabsResult<PropertyDetails>;
    async fn property_settings(&self, id: &str) -> HeroLabsResult<PropertySettings>;
    async fn notification_settings(&self, id: &str) -> HeroLabsResult<NotificationSettings>;
    async fn update_property_settings(
        &self,
        id: &str,
        update: &PropertySettingsUpdate,
    ) -> HeroLabsResult<()>;
    async fn update_notification_settings(
        &self,
        id: &str,
        update: &NotificationSettingsUpdate,
    ) -> HeroLabsResult<()>;
}

/// HTTP client for the Sonic cloud API, holding an authenticated session.
///
/// The credentials are kept, so an expired session is replaced by logging in
/// again the first time a request is rejected.
pub struct HeroLabsClient {
    base_url: Url,
    http: reqwest::Client,
    username: String,
    password: String,
    token: RwLock<String>,
}

impl HeroLabsClient {
    pub const DEFAULT_URL: &'static str = "https://api.sonic.getsonic.io/api/v1/";
    const DEFAULT_TIMEOUT_SECS: u64 = 10;

    /// Log in with account credentials.
    ///
    /// Rejected credentials are reported as [`HeroLabsError::InvalidCredentials`].
    pub async fn login(base_url: &Url, username: &str, password: &str) -> HeroLabsResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS))
            .build()?;

        let token = Self::authenticate(&http, base_url, username, password).await?;
        log::debug!("Logged in to Sonic API at {base_url}");

        Ok(Self {
            base_url: base_url.clone(),
            http,
            username: username.to_string(),
            password: password.to_string(),
            token: RwLock::new(token),
        })
    }

    async fn authenticate(
        http: &reqwest::Client,
        base_url: &Url,
        username: &str,
        password: &str,
    ) -> HeroLabsResult<String> {
        let url = Self::join(base_url, "auth/login")?;
        let response = http
            .post(url)
            .json(&LoginRequest {
                email: username,
                password,
            })
            .send()
            .await?;

        match response.status() {
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(HeroLabsError::InvalidCredentials);
            }
            _ => {}
        }

        let response = Self::check_status(response, "POST auth/login").await?;
        let login: LoginResponse = response.json().await?;
        Ok(login.token)
    }

    /// Replace the session token, unless another request already replaced
    /// `stale` while this one waited for the lock.
    async fn relogin(&self, stale: &str) -> HeroLabsResult<()> {
        let mut token = self.token.write().await;
        if *token != stale {
            return Ok(());
        }
        *token =
            Self::authenticate(&self.http, &self.base_url, &self.username, &self.password).await?;
        log::info!("Logged in to Sonic API again");
        Ok(())
    }

    /// Run `call` with the session token. A rejected session is renewed and
    /// the call retried once.
    async fn with_session<T, F, Fut>(&self, call: F) -> HeroLabsResult<T>
    where
        F: Fn(String) -> Fut + Send + Sync,
        Fut: Future<Output = HeroLabsResult<T>> + Send,
    {
        let token = self.token.read().await.clone();
        match call(token.clone()).await {
            Err(HeroLabsError::Unauthorized(action)) => {
                log::warn!("Session rejected during {action}, logging in again");
                self.relogin(&token).await?;
                let token = self.token.read().await.clone();
                call(token).await
            }
            res => res,
        }
    }

    fn join(base_url: &Url, endpoint: &str) -> HeroLabsResult<Url> {
        let base = if base_url.path().ends_with('/') {
            base_url.clone()
        } else {
            Url::parse(&format!("{base_url}/"))?
        };
        Ok(base.join(endpoint.trim_start_matches('/'))?)
    }

    async fn check_status(
        response: reqwest::Response,
        action: &str,
    ) -> HeroLabsResult<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        Err(HeroLabsError::from_status(action, status, body))
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> HeroLabsResult<T> {
        let url = &Self::join(&self.base_url, endpoint)?;
        let action = &format!("GET {endpoint}");
        let value: serde_json::Value = self
            .with_session(|token| async move {
                let response = self.http.get(url.clone()).bearer_auth(token).send().await?;
                let response = Self::check_status(response, action).await?;
                Ok::<serde_json::Value, HeroLabsError>(response.json().await?)
            })
            .await?;
        log::trace!("GET {endpoint}: {value}");
        Ok(serde_json::from_value(value)?)
    }

    async fn put<T: Serialize + Sync>(&self, endpoint: &str, payload: &T) -> HeroLabsResult<()> {
        let url = &Self::join(&self.base_url, endpoint)?;
        let action = &format!("PUT {endpoint}");
        self.with_session(|token| async move {
            let response = self
                .http
                .put(url.clone())
                .bearer_auth(token)
                .json(payload)
                .send()
                .await?;
            Self::check_status(response, action).await?;
            Ok::<(), HeroLabsError>(())
        })
        .await
    }

    async fn valve(&self, id: &str, action: ValveAction) -> HeroLabsResult<()> {
        self.put(&format!("sonic/{id}/valve"), &ValveCommand { action })
            .await
    }
}

#[async_trait]
impl SonicApi for HeroLabsClient {
    async fn list_devices(&self) -> HeroLabsResult<Vec<DeviceSummary>> {
        let listing: Listing<DeviceSummary> = self.get("sonic").await?;
        Ok(listing.data)
    }

    async fn list_properties(&self) -> HeroLabsResult<Vec<PropertySummary>> {
        let listing: Listing<PropertySummary> = self.get("property").await?;
        Ok(listing.data)
    }

    async fn device_details(&self, id: &str) -> HeroLabsResult<DeviceInfo> {
        self.get(&format!("sonic/{id}")).await
    }

    async fn device_telemetry(&self, id: &str) -> HeroLabsResult<Telemetry> {
        self.get(&format!("sonic/{id}/telemetry")).await
    }

    async fn open_valve(&self, id: &str) -> HeroLabsResult<()> {
        self.valve(id, ValveAction::Open).await
    }

    async fn close_valve(&self, id: &str) -> HeroLabsResult<()> {
        self.valve(id, ValveAction::Close).await
    }

    async fn property_details(&self, id: &str) -> HeroLabsResult<PropertyDetails> {
        self.get(&format!("property/{id}")).await
    }

    async fn property_settings(&self, id: &str) -> HeroLabsResult<PropertySettings> {
        self.get(&format!("property/{id}/settings")).await
    }

    async fn notification_settings(&self, id: &str) -> HeroLabsResult<NotificationSettings> {
        self.get(&format!("property/{id}/notification_settings"))
            .await
    }

    async fn update_property_settings(
        &self,
        id: &str,
        update: &PropertySettingsUpdate,
    ) -> HeroLabsResult<()> {
        self.put(&format!("property/{id}/settings"), update).await
    }

    async fn update_notification_settings(
        &self,
        id: &str,
        update: &NotificationSettingsUpdate,
    ) -> HeroLabsResult<()> {
        self.put(&format!("property/{id}/notification_settings"), update)
            .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::client::{HeroLabsClient, SonicApi};
    use crate::error::HeroLabsError;

    /// Login hands out `token-1` once, then `token-2`.
    async fn mount_login(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "token-1"})))
            .up_to_n_times(1)
            .with_priority(1)
            .expect(1)
            .mount(server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/v1/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "token-2"})))
            .mount(server)
            .await;
    }

    async fn client(server: &MockServer) -> HeroLabsClient {
        let base = Url::parse(&format!("{}/api/v1/", server.uri())).unwrap();
        HeroLabsClient::login(&base, "user@example.com", "secret")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn expired_session_logs_in_again() {
        let server = MockServer::start().await;
        mount_login(&server).await;

        Mock::given(method("GET"))
            .and(path("/api/v1/sonic"))
            .and(header("authorization", "Bearer token-1"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/v1/sonic"))
            .and(header("authorization", "Bearer token-2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": [{"id": "dev1", "name": "Kitchen"}]})),
            )
            .expect(2)
            .mount(&server)
            .await;

        let client = client(&server).await;

        let devices = client.list_devices().await.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].id, "dev1");

        // the new session is kept
        assert_eq!(client.list_devices().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejected_session_is_retried_once() {
        let server = MockServer::start().await;
        mount_login(&server).await;

        Mock::given(method("PUT"))
            .and(path("/api/v1/sonic/dev1/valve"))
            .respond_with(ResponseTemplate::new(403))
            .expect(2)
            .mount(&server)
            .await;

        let client = client(&server).await;

        let err = client.close_valve("dev1").await.unwrap_err();
        assert!(matches!(err, HeroLabsError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn rejected_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/login"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let base = Url::parse(&format!("{}/api/v1/", server.uri())).unwrap();
        let err = HeroLabsClient::login(&base, "user@example.com", "wrong")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, HeroLabsError::InvalidCredentials));
    }

    #[test]
    fn join_without_trailing_slash() {
        let base = Url::parse("https://example.com/api/v1").unwrap();
        let url = HeroLabsClient::join(&base, "/sonic/abc/telemetry").unwrap();
        assert_eq!(url.as_str(), "https://example.com/api/v1/sonic/abc/telemetry");
    }

    #[test]
    fn join_with_trailing_slash() {
        let base = Url::parse(HeroLabsClient::DEFAULT_URL).unwrap();
        let url = HeroLabsClient::join(&base, "property").unwrap();
        assert_eq!(url.as_str(), "https://api.sonic.getsonic.io/api/v1/property");
    }
}
