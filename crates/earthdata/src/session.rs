//! Authenticated Earthdata session.
//!
//! The ordering and download services require an Earthdata login. A
//! session is created once, verified against the product's capabilities
//! URL, and then passed by reference to everything that issues
//! authenticated requests.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{debug, info};

use crate::endpoints::Endpoints;
use crate::error::{EarthdataError, EarthdataResult};

pub const USERNAME_ENV: &str = "EARTHDATA_USERNAME";
pub const PASSWORD_ENV: &str = "EARTHDATA_PASSWORD";
pub const EMAIL_ENV: &str = "EARTHDATA_EMAIL";

/// Earthdata login credentials.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
    email: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .field("email", &self.email)
            .finish()
    }
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            email: None,
        }
    }

    /// Address the ordering service notifies when an order completes.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Read `EARTHDATA_USERNAME`, `EARTHDATA_PASSWORD` and (optionally)
    /// `EARTHDATA_EMAIL` from the environment.
    pub fn from_env() -> EarthdataResult<Self> {
        let var = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.trim().is_empty())
        };

        let username = var(USERNAME_ENV)
            .ok_or_else(|| EarthdataError::Credentials(format!("{} is not set", USERNAME_ENV)))?;
        let password = var(PASSWORD_ENV)
            .ok_or_else(|| EarthdataError::Credentials(format!("{} is not set", PASSWORD_ENV)))?;

        let mut credentials = Self::new(username, password);
        credentials.email = var(EMAIL_ENV);
        Ok(credentials)
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}

/// Build the HTTP client shared by all requests of a session.
pub fn build_client() -> EarthdataResult<Client> {
    let client = Client::builder()
        .cookie_store(true)
        .timeout(Duration::from_secs(600))
        .connect_timeout(Duration::from_secs(30))
        .pool_max_idle_per_host(4)
        .build()?;
    Ok(client)
}

/// Turn a non-success response into [`EarthdataError::Status`].
pub(crate) fn check_status(response: Response) -> EarthdataResult<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(EarthdataError::Status {
            status: status.as_u16(),
            url: response.url().to_string(),
        })
    }
}

/// A logged-in Earthdata session.
#[derive(Debug, Clone)]
pub struct EarthdataSession {
    client: Client,
    credentials: Credentials,
    endpoints: Endpoints,
}

impl EarthdataSession {
    /// Log in by fetching `capability_url` with HTTP basic auth.
    ///
    /// The request doubles as a credential check: a 401 or 403 becomes
    /// [`EarthdataError::Auth`].
    pub async fn login(
        credentials: Credentials,
        endpoints: Endpoints,
        capability_url: &str,
    ) -> EarthdataResult<Self> {
        let client = build_client()?;

        debug!(url = %capability_url, user = %credentials.username, "Verifying Earthdata login");
        let response = client
            .get(capability_url)
            .basic_auth(&credentials.username, Some(&credentials.password))
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(EarthdataError::Auth(format!(
                    "credentials for '{}' were rejected",
                    credentials.username
                )));
            }
            _ => {
                check_status(response)?;
            }
        }

        info!(user = %credentials.username, "Logged in to Earthdata");
        Ok(Self {
            client,
            credentials,
            endpoints,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// An authenticated GET request.
    pub fn get(&self, url: &str) -> RequestBuilder {
        self.client
            .get(url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
    }

    /// Fetch a URL and return the body, failing on non-success statuses.
    pub async fn get_bytes(&self, url: &str) -> EarthdataResult<bytes::Bytes> {
        let response = check_status(self.get(url).send().await?)?;
        Ok(response.bytes().await?)
    }

    pub async fn get_text(&self, url: &str) -> EarthdataResult<String> {
        let response = check_status(self.get(url).send().await?)?;
        Ok(response.text().await?)
    }
}
