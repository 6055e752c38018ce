use anyhow::{Context, Result, anyhow};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

use crate::settings::Settings;

pub const CREDENTIALS_JSON_ENV: &str = "OCR_TRANSLATOR_CREDENTIALS_JSON";
pub const CREDENTIALS_FILE_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: u64 = 3600;

/// How outbound Google API requests are authorized.
#[derive(Clone)]
pub enum Credentials {
    ApiKey(String),
    AccessToken(String),
    /// Service account key; a token is minted per request.
    ServiceAccount(Arc<ServiceAccount>),
    /// Ambient identity from the GCE metadata server, fetched per request.
    Metadata,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.kind())
    }
}

impl Credentials {
    pub fn kind(&self) -> &'static str {
        match self {
            Credentials::ApiKey(_) => "api_key",
            Credentials::AccessToken(_) => "access_token",
            Credentials::ServiceAccount(_) => "service_account",
            Credentials::Metadata => "metadata",
        }
    }

    pub(crate) async fn authorize(
        &self,
        client: &reqwest::Client,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder> {
        match self {
            Credentials::ApiKey(key) => Ok(request.header("x-goog-api-key", key.as_str())),
            Credentials::AccessToken(token) => Ok(request.bearer_auth(token)),
            Credentials::ServiceAccount(account) => {
                let token = account.fetch_token(client).await?;
                Ok(request.bearer_auth(token))
            }
            Credentials::Metadata => {
                let token = fetch_metadata_token(client).await?;
                Ok(request.bearer_auth(token))
            }
        }
    }
}

/// A parsed service account key (`"type": "service_account"`).
pub struct ServiceAccount {
    client_email: String,
    key_id: Option<String>,
    token_uri: String,
    key: EncodingKey,
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

impl ServiceAccount {
    fn from_key_file(file: CredentialFile) -> Result<Self> {
        let client_email =
            non_empty(file.client_email).ok_or_else(|| anyhow!("service account key has no client_email"))?;
        let private_key =
            non_empty(file.private_key).ok_or_else(|| anyhow!("service account key has no private_key"))?;
        let key = EncodingKey::from_rsa_pem(private_key.as_bytes())
            .with_context(|| "service account private_key is not a valid RSA PEM key")?;
        Ok(Self {
            client_email,
            key_id: non_empty(file.private_key_id),
            token_uri: non_empty(file.token_uri).unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
            key,
        })
    }

    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    /// Signed RS256 JWT exchanged for an access token at `token_uri`.
    pub(crate) fn assertion(&self, issued_at: u64) -> Result<String> {
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: CLOUD_PLATFORM_SCOPE,
            aud: &self.token_uri,
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key_id.clone();
        jsonwebtoken::encode(&header, &claims, &self.key)
            .with_context(|| "failed to sign service account assertion")
    }

    async fn fetch_token(&self, client: &reqwest::Client) -> Result<String> {
        let issued_at = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
        let assertion = self.assertion(issued_at)?;
        debug!("credentials: exchanging assertion for {}", self.client_email);
        let response = client
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .with_context(|| format!("failed to reach token endpoint: {}", self.token_uri))?;
        parse_token_response(response).await
    }
}

#[derive(Debug, Default)]
pub(crate) struct CredentialSources {
    pub(crate) env_json: Option<String>,
    pub(crate) file: Option<PathBuf>,
    pub(crate) api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CredentialFile {
    #[serde(rename = "type")]
    kind: Option<String>,
    api_key: Option<String>,
    access_token: Option<String>,
    client_email: Option<String>,
    private_key: Option<String>,
    private_key_id: Option<String>,
    token_uri: Option<String>,
}

/// Resolves credentials: env JSON blob, then a local file, then an API key
/// from the environment, then the ambient platform identity.
pub fn resolve_credentials(settings: &Settings, override_path: Option<&Path>) -> Result<Credentials> {
    let file = override_path
        .map(Path::to_path_buf)
        .or_else(|| settings.credentials_path.as_deref().map(PathBuf::from))
        .or_else(|| get_env(CREDENTIALS_FILE_ENV).map(PathBuf::from));
    let sources = CredentialSources {
        env_json: get_env(CREDENTIALS_JSON_ENV),
        file,
        api_key: get_env(API_KEY_ENV),
    };
    let credentials = resolve_from(sources)?;
    info!("credentials: using {}", credentials.kind());
    Ok(credentials)
}

pub(crate) fn resolve_from(sources: CredentialSources) -> Result<Credentials> {
    if let Some(blob) = sources.env_json {
        return parse_credentials(&blob)
            .with_context(|| format!("invalid credentials in {}", CREDENTIALS_JSON_ENV));
    }
    if let Some(path) = sources.file {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read credentials: {}", path.display()))?;
        return parse_credentials(&content)
            .with_context(|| format!("invalid credentials file: {}", path.display()));
    }
    if let Some(key) = sources.api_key {
        return Ok(Credentials::ApiKey(key));
    }
    Ok(Credentials::Metadata)
}

fn parse_credentials(content: &str) -> Result<Credentials> {
    let mut parsed: CredentialFile =
        serde_json::from_str(content).with_context(|| "credentials must be a JSON object")?;
    if let Some(key) = non_empty(parsed.api_key.take()) {
        return Ok(Credentials::ApiKey(key));
    }
    if let Some(token) = non_empty(parsed.access_token.take()) {
        return Ok(Credentials::AccessToken(token));
    }
    if parsed.kind.as_deref() == Some("service_account") {
        let account = ServiceAccount::from_key_file(parsed)?;
        return Ok(Credentials::ServiceAccount(Arc::new(account)));
    }
    Err(anyhow!(
        "credentials need an api_key, an access_token or a service account key"
    ))
}

async fn fetch_metadata_token(client: &reqwest::Client) -> Result<String> {
    let response = client
        .get(METADATA_TOKEN_URL)
        .header("Metadata-Flavor", "Google")
        .send()
        .await
        .with_context(|| "failed to reach the metadata server for an access token")?;
    parse_token_response(response).await
}

async fn parse_token_response(response: reqwest::Response) -> Result<String> {
    #[derive(Deserialize)]
    struct TokenResponse {
        access_token: String,
    }

    let status = response.status();
    let body = response
        .text()
        .await
        .with_context(|| "failed to read access token response")?;
    if !status.is_success() {
        return Err(anyhow!("access token request failed ({}): {}", status, body));
    }
    let token: TokenResponse =
        serde_json::from_str(&body).with_context(|| "failed to parse access token response")?;
    Ok(token.access_token)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn get_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::serve_stub;
    use axum::http::StatusCode;
    use jsonwebtoken::{DecodingKey, Validation};

    const SERVICE_ACCOUNT_KEY: &str = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/service_account.json"
    ));
    const SERVICE_ACCOUNT_PUBLIC_KEY: &[u8] = include_bytes!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/service_account_public.pem"
    ));
    const CLIENT_EMAIL: &str = "ocr-translator@ocr-translator-test.iam.gserviceaccount.com";

    fn service_account_path() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/service_account.json")
    }

    fn header_of(request: reqwest::RequestBuilder, name: &str) -> String {
        let request = request.build().unwrap();
        request.headers()[name].to_str().unwrap().to_string()
    }

    #[test]
    fn env_blob_wins_over_everything() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.json");
        fs::write(&path, r#"{"api_key": "from-file"}"#).unwrap();
        let credentials = resolve_from(CredentialSources {
            env_json: Some(r#"{"access_token": "from-env"}"#.to_string()),
            file: Some(path),
            api_key: Some("from-key".to_string()),
        })
        .unwrap();
        assert!(matches!(&credentials, Credentials::AccessToken(token) if token == "from-env"));
    }

    #[test]
    fn file_wins_over_api_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.json");
        fs::write(&path, r#"{"api_key": "from-file"}"#).unwrap();
        let credentials = resolve_from(CredentialSources {
            env_json: None,
            file: Some(path),
            api_key: Some("from-key".to_string()),
        })
        .unwrap();
        assert!(matches!(&credentials, Credentials::ApiKey(key) if key == "from-file"));
    }

    #[test]
    fn falls_back_to_api_key_then_metadata() {
        let credentials = resolve_from(CredentialSources {
            api_key: Some("from-key".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert!(matches!(&credentials, Credentials::ApiKey(key) if key == "from-key"));

        let credentials = resolve_from(CredentialSources::default()).unwrap();
        assert!(matches!(credentials, Credentials::Metadata));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = resolve_from(CredentialSources {
            file: Some(PathBuf::from("/nonexistent/creds.json")),
            ..Default::default()
        })
        .unwrap_err();
        assert!(err.to_string().contains("failed to read credentials"));
    }

    #[test]
    fn service_account_key_file_resolves() {
        let credentials = resolve_from(CredentialSources {
            file: Some(service_account_path()),
            api_key: Some("from-key".to_string()),
            ..Default::default()
        })
        .unwrap();
        let Credentials::ServiceAccount(account) = &credentials else {
            panic!("expected service account, got {:?}", credentials);
        };
        assert_eq!(account.client_email(), CLIENT_EMAIL);
        assert_eq!(credentials.kind(), "service_account");
    }

    #[test]
    fn service_account_without_private_key_is_rejected() {
        let blob = r#"{"type": "service_account", "client_email": "a@b.iam.gserviceaccount.com"}"#;
        let err = parse_credentials(blob).unwrap_err();
        assert!(err.to_string().contains("private_key"));

        let blob = r#"{"type": "service_account", "client_email": "a@b", "private_key": "not a key"}"#;
        assert!(parse_credentials(blob).is_err());
    }

    #[test]
    fn service_account_assertion_is_signed_for_the_token_endpoint() {
        let Credentials::ServiceAccount(account) = parse_credentials(SERVICE_ACCOUNT_KEY).unwrap()
        else {
            panic!("expected service account");
        };
        let assertion = account.assertion(1_700_000_000).unwrap();

        #[derive(Deserialize)]
        struct Claims {
            iss: String,
            scope: String,
            aud: String,
            iat: u64,
            exp: u64,
        }

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&["https://oauth2.googleapis.com/token"]);
        validation.validate_exp = false;
        let decoded = jsonwebtoken::decode::<Claims>(
            &assertion,
            &DecodingKey::from_rsa_pem(SERVICE_ACCOUNT_PUBLIC_KEY).unwrap(),
            &validation,
        )
        .unwrap();
        assert_eq!(decoded.header.kid.as_deref(), Some("0123456789abcdef"));
        assert_eq!(decoded.claims.iss, CLIENT_EMAIL);
        assert_eq!(decoded.claims.scope, CLOUD_PLATFORM_SCOPE);
        assert_eq!(decoded.claims.aud, "https://oauth2.googleapis.com/token");
        assert_eq!(decoded.claims.iat, 1_700_000_000);
        assert_eq!(decoded.claims.exp, 1_700_003_600);
    }

    #[tokio::test]
    async fn service_account_authorizes_with_exchanged_token() {
        let token_uri = serve_stub(
            StatusCode::OK,
            r#"{"access_token": "ya29.test", "expires_in": 3599, "token_type": "Bearer"}"#,
        )
        .await;
        let mut key: serde_json::Value = serde_json::from_str(SERVICE_ACCOUNT_KEY).unwrap();
        key["token_uri"] = serde_json::Value::String(format!("{}/token", token_uri));
        let credentials = parse_credentials(&key.to_string()).unwrap();

        let client = reqwest::Client::new();
        let request = credentials
            .authorize(&client, client.post("http://localhost/v1/images:annotate"))
            .await
            .unwrap();
        assert_eq!(header_of(request, "authorization"), "Bearer ya29.test");
    }

    #[tokio::test]
    async fn failed_token_exchange_is_an_error() {
        let token_uri = serve_stub(StatusCode::BAD_REQUEST, r#"{"error": "invalid_grant"}"#).await;
        let mut key: serde_json::Value = serde_json::from_str(SERVICE_ACCOUNT_KEY).unwrap();
        key["token_uri"] = serde_json::Value::String(token_uri);
        let credentials = parse_credentials(&key.to_string()).unwrap();

        let client = reqwest::Client::new();
        let err = credentials
            .authorize(&client, client.post("http://localhost/"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid_grant"));
    }

    #[tokio::test]
    async fn api_key_and_access_token_set_their_headers() {
        let client = reqwest::Client::new();
        let request = Credentials::ApiKey("secret-key".to_string())
            .authorize(&client, client.post("http://localhost/"))
            .await
            .unwrap();
        assert_eq!(header_of(request, "x-goog-api-key"), "secret-key");

        let request = Credentials::AccessToken("token-123".to_string())
            .authorize(&client, client.post("http://localhost/"))
            .await
            .unwrap();
        assert_eq!(header_of(request, "authorization"), "Bearer token-123");
    }

    #[test]
    fn debug_output_hides_secrets() {
        let credentials = Credentials::ApiKey("secret".to_string());
        assert_eq!(format!("{:?}", credentials), "api_key");
    }
}
