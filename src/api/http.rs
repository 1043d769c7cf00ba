use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::api::{ApiResponse, ListQuery, StoryApi};
use crate::app::{Result, StoryError};
use crate::config::ApiConfig;
use crate::domain::{NewStory, Story};
use crate::session::Session;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListBody {
    list_story: Option<Vec<Story>>,
}

#[derive(Deserialize)]
struct DetailBody {
    story: Option<Story>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginBody {
    login_result: Option<Session>,
}

#[derive(Deserialize)]
struct MessageBody {
    message: Option<String>,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct Registration<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

/// reqwest-backed client for the story service.
pub struct HttpStoryApi {
    client: Client,
    base_url: Url,
}

impl HttpStoryApi {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| StoryError::Config(format!("invalid base_url {}: {}", config.base_url, e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .brotli(true)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| StoryError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    /// Append path segments to the base URL, escaping each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoryError::Config(format!("base_url cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Exchange credentials for a session token.
    pub async fn login(&self, email: &str, password: &str) -> Result<ApiResponse<Session>> {
        let response = self
            .client
            .post(self.endpoint(&["login"])?)
            .json(&Credentials { email, password })
            .send()
            .await?;

        let (status, body) = read_body(response).await?;
        Ok(interpret(status, &body, |b: LoginBody| b.login_result, "loginResult"))
    }

    /// Create an account. Returns the server's confirmation message.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<ApiResponse<String>> {
        let response = self
            .client
            .post(self.endpoint(&["register"])?)
            .json(&Registration {
                name,
                email,
                password,
            })
            .send()
            .await?;

        let (status, body) = read_body(response).await?;
        Ok(interpret(status, &body, confirmation, "message"))
    }

    /// Upload a new story. Returns the server's confirmation message.
    pub async fn add_story(&self, token: &str, story: NewStory) -> Result<ApiResponse<String>> {
        let photo = Part::bytes(story.photo)
            .file_name(story.photo_name)
            .mime_str(&story.photo_content_type)
            .map_err(|e| StoryError::InvalidRecord(format!("bad photo content type: {}", e)))?;

        let mut form = Form::new()
            .text("description", story.description)
            .part("photo", photo);
        if let (Some(lat), Some(lon)) = (story.lat, story.lon) {
            form = form.text("lat", lat.to_string()).text("lon", lon.to_string());
        }

        let response = self
            .client
            .post(self.endpoint(&["stories"])?)
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await?;

        let (status, body) = read_body(response).await?;
        Ok(interpret(status, &body, confirmation, "message"))
    }
}

#[async_trait]
impl StoryApi for HttpStoryApi {
    async fn list_stories(
        &self,
        token: &str,
        query: &ListQuery,
    ) -> Result<ApiResponse<Vec<Story>>> {
        let location = if query.with_location { "1" } else { "0" };
        let response = self
            .client
            .get(self.endpoint(&["stories"])?)
            .bearer_auth(token)
            .query(&[
                ("page", query.page.to_string()),
                ("size", query.size.to_string()),
                ("location", location.to_string()),
            ])
            .send()
            .await?;

        let (status, body) = read_body(response).await?;
        Ok(interpret(status, &body, |b: ListBody| b.list_story, "listStory"))
    }

    async fn get_story(&self, token: &str, story_id: &str) -> Result<ApiResponse<Story>> {
        let response = self
            .client
            .get(self.endpoint(&["stories", story_id])?)
            .bearer_auth(token)
            .send()
            .await?;

        let (status, body) = read_body(response).await?;
        Ok(interpret(status, &body, |b: DetailBody| b.story, "story"))
    }
}

async fn read_body(response: Response) -> Result<(StatusCode, Vec<u8>)> {
    let status = response.status();
    let body = response.bytes().await?.to_vec();
    Ok((status, body))
}

fn confirmation(body: MessageBody) -> Option<String> {
    Some(body.message.unwrap_or_default())
}

/// Turn a completed response into an [`ApiResponse`].
///
/// A success status only counts when the body parses and carries `field`.
fn interpret<B, T>(
    status: StatusCode,
    body: &[u8],
    extract: impl FnOnce(B) -> Option<T>,
    field: &str,
) -> ApiResponse<T>
where
    B: DeserializeOwned,
{
    if !status.is_success() {
        let message = serde_json::from_slice::<MessageBody>(body)
            .ok()
            .and_then(|b| b.message)
            .unwrap_or_else(|| format!("HTTP {}", status));
        tracing::warn!("Story API returned {}: {}", status, message);
        return ApiResponse::Rejected {
            status: status.as_u16(),
            message,
        };
    }

    match serde_json::from_slice::<B>(body) {
        Ok(parsed) => match extract(parsed) {
            Some(value) => ApiResponse::Ok(value),
            None => ApiResponse::Rejected {
                status: status.as_u16(),
                message: format!("response does not contain \"{}\"", field),
            },
        },
        Err(e) => ApiResponse::Rejected {
            status: status.as_u16(),
            message: format!("malformed response: {}", e),
        },
    }
}
