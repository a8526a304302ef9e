//! Call shapes for the transport aliases.
//!
//! `upload_file`, `download_file` and `connect_socket` accept either a full
//! [`RequestConfig`] or positional arguments with an optional trailing
//! config. Positional values win over the same fields in the config.

use crate::adapter::RequestKind;
use crate::{RequestConfig, Result, TetherError};

/// Arguments to `upload_file`.
#[derive(Debug, Clone)]
pub enum UploadCall {
    /// Everything, including `url`, `file_path` and `name`, comes from the config.
    Config(RequestConfig),
    Args {
        url: String,
        file_path: String,
        name: String,
        config: Option<RequestConfig>,
    },
}

impl UploadCall {
    /// Resolve into a request config, validating the upload fields.
    pub fn into_config(self) -> Result<RequestConfig> {
        let mut config = match self {
            UploadCall::Config(config) => config,
            UploadCall::Args {
                url,
                file_path,
                name,
                config,
            } => {
                let mut config = config.unwrap_or_default();
                config.url = Some(url);
                config.file_path = Some(file_path);
                config.name = Some(name);
                config
            }
        };

        let missing = |field: &Option<String>| field.as_deref().is_none_or(str::is_empty);
        if missing(&config.name) || missing(&config.file_path) {
            return Err(TetherError::config(
                "tether: uploadFile requires `name` and `filePath`",
            ));
        }
        config.kind = Some(RequestKind::Upload);
        Ok(config)
    }
}

impl From<RequestConfig> for UploadCall {
    fn from(config: RequestConfig) -> Self {
        Self::Config(config)
    }
}

impl<U, F, N> From<(U, F, N)> for UploadCall
where
    U: Into<String>,
    F: Into<String>,
    N: Into<String>,
{
    fn from((url, file_path, name): (U, F, N)) -> Self {
        Self::Args {
            url: url.into(),
            file_path: file_path.into(),
            name: name.into(),
            config: None,
        }
    }
}

impl<U, F, N> From<(U, F, N, RequestConfig)> for UploadCall
where
    U: Into<String>,
    F: Into<String>,
    N: Into<String>,
{
    fn from((url, file_path, name, config): (U, F, N, RequestConfig)) -> Self {
        Self::Args {
            url: url.into(),
            file_path: file_path.into(),
            name: name.into(),
            config: Some(config),
        }
    }
}

/// Arguments to `download_file`.
#[derive(Debug, Clone)]
pub enum DownloadCall {
    Config(RequestConfig),
    Args {
        url: String,
        /// Destination; the host picks a temporary file when unset.
        file_path: Option<String>,
        config: Option<RequestConfig>,
    },
}

impl DownloadCall {
    pub fn into_config(self) -> RequestConfig {
        let mut config = match self {
            DownloadCall::Config(config) => config,
            DownloadCall::Args {
                url,
                file_path,
                config,
            } => {
                let mut config = config.unwrap_or_default();
                config.url = Some(url);
                if file_path.is_some() {
                    config.file_path = file_path;
                }
                config
            }
        };
        config.kind = Some(RequestKind::Download);
        config
    }
}

impl From<RequestConfig> for DownloadCall {
    fn from(config: RequestConfig) -> Self {
        Self::Config(config)
    }
}

impl From<&str> for DownloadCall {
    fn from(url: &str) -> Self {
        Self::Args {
            url: url.to_string(),
            file_path: None,
            config: None,
        }
    }
}

impl From<String> for DownloadCall {
    fn from(url: String) -> Self {
        Self::Args {
            url,
            file_path: None,
            config: None,
        }
    }
}

impl<U: Into<String>, F: Into<String>> From<(U, F)> for DownloadCall {
    fn from((url, file_path): (U, F)) -> Self {
        Self::Args {
            url: url.into(),
            file_path: Some(file_path.into()),
            config: None,
        }
    }
}

impl<U: Into<String>, F: Into<String>> From<(U, F, RequestConfig)> for DownloadCall {
    fn from((url, file_path, config): (U, F, RequestConfig)) -> Self {
        Self::Args {
            url: url.into(),
            file_path: Some(file_path.into()),
            config: Some(config),
        }
    }
}

/// Arguments to `connect_socket`.
#[derive(Debug, Clone)]
pub enum SocketCall {
    Config(RequestConfig),
    Args {
        url: String,
        protocols: Option<Vec<String>>,
        config: Option<RequestConfig>,
    },
}

impl SocketCall {
    pub fn into_config(self) -> RequestConfig {
        let mut config = match self {
            SocketCall::Config(config) => config,
            SocketCall::Args {
                url,
                protocols,
                config,
            } => {
                let mut config = config.unwrap_or_default();
                config.url = Some(url);
                if protocols.is_some() {
                    config.protocols = protocols;
                }
                config
            }
        };
        config.kind = Some(RequestKind::Socket);
        config
    }
}

impl From<RequestConfig> for SocketCall {
    fn from(config: RequestConfig) -> Self {
        Self::Config(config)
    }
}

impl From<&str> for SocketCall {
    fn from(url: &str) -> Self {
        Self::Args {
            url: url.to_string(),
            protocols: None,
            config: None,
        }
    }
}

impl From<String> for SocketCall {
    fn from(url: String) -> Self {
        Self::Args {
            url,
            protocols: None,
            config: None,
        }
    }
}

impl<U: Into<String>, S: Into<String>> From<(U, Vec<S>)> for SocketCall {
    fn from((url, protocols): (U, Vec<S>)) -> Self {
        Self::Args {
            url: url.into(),
            protocols: Some(protocols.into_iter().map(Into::into).collect()),
            config: None,
        }
    }
}

impl<U: Into<String>> From<(U, RequestConfig)> for SocketCall {
    fn from((url, config): (U, RequestConfig)) -> Self {
        Self::Args {
            url: url.into(),
            protocols: None,
            config: Some(config),
        }
    }
}
