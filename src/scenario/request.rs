//! Request descriptor and response type tags

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::adapter::Headers;
use crate::common::{Error, Result};

/// Declared type of the resource a scenario loads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    /// HTML document
    #[default]
    Html,
    Json,
    Xml,
    Text,
    Image,
    Stylesheet,
    Script,
    Video,
    Audio,
    /// Any other resource, checked by status/headers only
    Resource,
    /// Page driven through a live browser session
    Browser,
    /// Browser page built on the ExtJS framework
    Extjs,
}

impl ResponseType {
    /// Whether this type must be fetched by a browser-capable adapter
    pub fn requires_browser(&self) -> bool {
        matches!(self, Self::Browser | Self::Extjs)
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Html => "html",
            Self::Json => "json",
            Self::Xml => "xml",
            Self::Text => "text",
            Self::Image => "image",
            Self::Stylesheet => "stylesheet",
            Self::Script => "script",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Resource => "resource",
            Self::Browser => "browser",
            Self::Extjs => "extjs",
        };
        write!(f, "{name}")
    }
}

impl FromStr for ResponseType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "html" | "document" => Ok(Self::Html),
            "json" => Ok(Self::Json),
            "xml" | "rss" | "atom" => Ok(Self::Xml),
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            "stylesheet" | "css" => Ok(Self::Stylesheet),
            "script" | "js" => Ok(Self::Script),
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            "resource" => Ok(Self::Resource),
            "browser" => Ok(Self::Browser),
            "extjs" => Ok(Self::Extjs),
            other => Err(Error::Config(format!("Unknown response type '{other}'"))),
        }
    }
}

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            other => Err(Error::Config(format!("Unknown HTTP method '{other}'"))),
        }
    }
}

/// Basic auth credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

/// Request payload
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Text(String),
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

/// Settings for browser-driven scenarios
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserOptions {
    pub headless: bool,
    pub width: u32,
    pub height: u32,
    /// Capture console messages into the scenario log
    pub record_console: bool,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            width: 1280,
            height: 800,
            record_console: false,
        }
    }
}

/// Everything an adapter needs to perform the fetch
#[derive(Debug, Clone)]
pub struct Request {
    /// Fully resolved URL; `None` until the scenario has a target
    pub url: Option<String>,
    pub method: Method,
    pub headers: Headers,
    pub body: Option<RequestBody>,
    pub auth: Option<BasicAuth>,
    pub proxy: Option<String>,
    pub timeout: Duration,
    /// Redirects followed before the fetch fails
    pub max_redirects: usize,
    pub browser: BrowserOptions,
    pub response_type: ResponseType,
}

impl Default for Request {
    fn default() -> Self {
        Self {
            url: None,
            method: Method::Get,
            headers: Headers::new(),
            body: None,
            auth: None,
            proxy: None,
            timeout: Duration::from_secs(30),
            max_redirects: 10,
            browser: BrowserOptions::default(),
            response_type: ResponseType::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_type_parse() {
        assert_eq!("document".parse::<ResponseType>().unwrap(), ResponseType::Html);
        assert_eq!("JSON".parse::<ResponseType>().unwrap(), ResponseType::Json);
        assert!("pdf".parse::<ResponseType>().is_err());
    }

    #[test]
    fn test_browser_types() {
        assert!(ResponseType::Browser.requires_browser());
        assert!(ResponseType::Extjs.requires_browser());
        assert!(!ResponseType::Html.requires_browser());
    }

    #[test]
    fn test_method_round_trip_display() {
        for method in ["get", "POST", "Delete"] {
            let parsed: Method = method.parse().unwrap();
            assert_eq!(parsed.to_string(), method.to_ascii_uppercase());
        }
    }
}
