//! Presentator REST client: authentication, project/prototype listing, and
//! screen upload.
//!
//! The authenticated session is an explicit [`Session`] value handed to each
//! call; the client itself holds no mutable auth state.

use crate::{Error, Result};
use reqwest::blocking::{multipart, Client};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// An authenticated Presentator session.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: UserRecord,
}

/// The user record returned by password authentication.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectRecord {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrototypeRecord {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

/// A screen record created by a successful upload.
#[derive(Debug, Clone, Deserialize)]
pub struct ScreenRecord {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Deserialize)]
struct AuthResponse {
    token: String,
    record: UserRecord,
}

#[derive(Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

/// Blocking client for a Presentator server.
pub struct PresentatorClient {
    base_url: String,
    http: Client,
}

impl PresentatorClient {
    /// Create a client for `base_url` (a trailing slash is tolerated).
    pub fn new(base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Authenticate with email/password and return the session token.
    pub fn authenticate(&self, identity: &str, password: &str) -> Result<Session> {
        let resp = self
            .http
            .post(format!(
                "{}/api/collections/users/auth-with-password",
                self.base_url
            ))
            .json(&serde_json::json!({ "identity": identity, "password": password }))
            .send()
            .map_err(|e| Error::AuthFailed(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Error::AuthFailed(error_message(
                resp,
                "Authentication failed",
            )));
        }

        let auth: AuthResponse = resp
            .json()
            .map_err(|e| Error::AuthFailed(format!("Malformed auth response: {}", e)))?;

        Ok(Session {
            token: auth.token,
            user: auth.record,
        })
    }

    /// List the projects visible to the session.
    pub fn list_projects(&self, session: &Session) -> Result<Vec<ProjectRecord>> {
        let endpoint = format!("{}/api/collections/projects/records", self.base_url);
        self.get_list(session, &endpoint, None)
    }

    /// List the prototypes belonging to one project.
    pub fn list_prototypes(
        &self,
        session: &Session,
        project_id: &str,
    ) -> Result<Vec<PrototypeRecord>> {
        let endpoint = format!("{}/api/collections/prototypes/records", self.base_url);
        let filter = format!("(project=\"{}\")", project_id);
        self.get_list(session, &endpoint, Some(filter))
    }

    /// Upload a captured PNG as a new screen of a prototype.
    pub fn upload_screen(
        &self,
        session: &Session,
        prototype_id: &str,
        title: &str,
        png: Vec<u8>,
    ) -> Result<ScreenRecord> {
        let part = multipart::Part::bytes(png)
            .file_name(format!("{}.png", title))
            .mime_str("image/png")
            .map_err(|e| Error::ApiError(format!("Invalid upload part: {}", e)))?;

        let form = multipart::Form::new()
            .text("prototype", prototype_id.to_string())
            .text("title", title.to_string())
            .part("file", part);

        let resp = self
            .http
            .post(format!(
                "{}/api/collections/screens/records",
                self.base_url
            ))
            .bearer_auth(&session.token)
            .multipart(form)
            .send()
            .map_err(|e| Error::ApiError(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Error::ApiError(error_message(resp, "Screen upload failed")));
        }

        resp.json()
            .map_err(|e| Error::ApiError(format!("Malformed upload response: {}", e)))
    }

    fn get_list<T: DeserializeOwned>(
        &self,
        session: &Session,
        endpoint: &str,
        filter: Option<String>,
    ) -> Result<Vec<T>> {
        let mut url =
            Url::parse(endpoint).map_err(|e| Error::ApiError(format!("Invalid API URL: {}", e)))?;
        if let Some(f) = filter {
            url.query_pairs_mut().append_pair("filter", &f);
        }

        let resp = self
            .http
            .get(url)
            .bearer_auth(&session.token)
            .send()
            .map_err(|e| Error::ApiError(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Error::ApiError(error_message(resp, "List request failed")));
        }

        let list: ListResponse<T> = resp
            .json()
            .map_err(|e| Error::ApiError(format!("Malformed list response: {}", e)))?;
        Ok(list.items)
    }
}

// Prefer the API's own message field when the body parses as JSON.
fn error_message(resp: reqwest::blocking::Response, fallback: &str) -> String {
    let status = resp.status();
    let body = resp.text().unwrap_or_default();
    serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .and_then(|m| m.as_str())
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| format!("{} ({})", fallback, status))
}
