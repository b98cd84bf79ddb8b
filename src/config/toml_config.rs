use crate::adapters::connectsafely::{ConnectSafelyClient, DEFAULT_BASE_URL};
use crate::adapters::google_auth::{OAuthCredentials, RefreshTokenProvider, StaticToken, DEFAULT_TOKEN_URL};
use crate::adapters::google_sheets::DEFAULT_SHEETS_BASE_URL;
use crate::core::paginator::{PaginationOptions, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::core::TokenProvider;
use crate::utils::error::{ExportError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_SHEET_NAME: &str = "LinkedIn Members";

/// Credentials, endpoints and run defaults, injected into the adapters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub connectsafely: ConnectSafelyConfig,
    pub google: GoogleConfig,
    pub pagination: PaginationConfig,
    pub sheet: SheetConfig,
    pub json: JsonConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectSafelyConfig {
    pub base_url: String,
    pub api_token: Option<String>,
}

impl Default for ConnectSafelyConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    pub sheets_base_url: String,
    pub token_url: String,
    pub access_token: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            sheets_base_url: DEFAULT_SHEETS_BASE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            access_token: None,
            client_id: None,
            client_secret: None,
            refresh_token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub page_size: usize,
    pub max_records: Option<usize>,
    pub page_delay_ms: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_records: None,
            page_delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetConfig {
    pub spreadsheet_id: Option<String>,
    pub spreadsheet_title: Option<String>,
    pub sheet_name: String,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: None,
            spreadsheet_title: None,
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonConfig {
    pub output_dir: String,
    pub filename: Option<String>,
}

impl Default for JsonConfig {
    fn default() -> Self {
        Self {
            output_dir: ".".to_string(),
            filename: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub request_timeout_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: 30,
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl ExportConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置，先替換 ${VAR} 環境變數
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| ExportError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    // Unknown variables are left as-is so validation can point at them.
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        use std::sync::OnceLock;

        static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
        let re = PLACEHOLDER
            .get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is valid"));

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    pub fn pagination_options(&self) -> PaginationOptions {
        PaginationOptions {
            page_size: self.pagination.page_size,
            max_records: self.pagination.max_records,
            page_delay: Duration::from_millis(self.pagination.page_delay_ms),
        }
    }

    /// Shared reqwest client with an explicit request timeout.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.http.request_timeout_seconds))
            .user_agent(concat!("leads-export/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ExportError::Http)
    }

    pub fn connectsafely_client(&self, client: reqwest::Client) -> Result<ConnectSafelyClient> {
        let token = present(&self.connectsafely.api_token);
        let token = validation::validate_required_field(
            "connectsafely.api_token (CONNECTSAFELY_API_TOKEN)",
            &token,
        )?;
        Ok(ConnectSafelyClient::new(
            client,
            self.connectsafely.base_url.clone(),
            *token,
        ))
    }

    /// A pre-issued access token wins over refresh-token credentials.
    pub fn google_token_provider(&self, client: reqwest::Client) -> Result<Box<dyn TokenProvider>> {
        if let Some(token) = present(&self.google.access_token) {
            return Ok(Box::new(StaticToken::new(token)));
        }

        let (Some(client_id), Some(client_secret), Some(refresh_token)) = (
            present(&self.google.client_id),
            present(&self.google.client_secret),
            present(&self.google.refresh_token),
        ) else {
            return Err(ExportError::auth(
                "Google credentials are required: set GOOGLE_ACCESS_TOKEN or GOOGLE_CLIENT_ID, GOOGLE_CLIENT_SECRET and GOOGLE_REFRESH_TOKEN",
            ));
        };

        Ok(Box::new(RefreshTokenProvider::new(
            client,
            self.google.token_url.clone(),
            OAuthCredentials {
                client_id: client_id.to_string(),
                client_secret: client_secret.to_string(),
                refresh_token: refresh_token.to_string(),
            },
        )))
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("connectsafely.base_url", &self.connectsafely.base_url)?;
        validation::validate_url("google.sheets_base_url", &self.google.sheets_base_url)?;
        validation::validate_url("google.token_url", &self.google.token_url)?;
        validation::validate_range("pagination.page_size", self.pagination.page_size, 1, MAX_PAGE_SIZE)?;
        if let Some(max_records) = self.pagination.max_records {
            validation::validate_range("pagination.max_records", max_records, 1, usize::MAX)?;
        }
        validation::validate_non_empty_string("sheet.sheet_name", &self.sheet.sheet_name)?;
        validation::validate_path("json.output_dir", &self.json.output_dir)?;
        validation::validate_range(
            "http.request_timeout_seconds",
            self.http.request_timeout_seconds,
            1,
            600,
        )?;
        Ok(())
    }
}

impl Validate for ExportConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
