use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::commands::{CommandEntry, Link};
use crate::error::ConfigError;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub whapi: WhapiConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub texts: TextsConfig,
    #[serde(default = "default_commands")]
    pub commands: Vec<CommandEntry>,
    #[serde(default = "default_files")]
    pub files: BTreeMap<String, FileConfig>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct WhapiConfig {
    #[serde(default)]
    pub api_url: String,
    #[serde(default)]
    pub token: String,
    /// Public callback URL registered with Whapi at startup.
    #[serde(default)]
    pub bot_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_openai_base_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: None,
        }
    }
}

/// The reserved document-submission command.
#[derive(Debug, Deserialize, Clone)]
pub struct WorkflowConfig {
    #[serde(default = "default_workflow_key")]
    pub key: String,
    /// Chat that receives the operator alert. The workflow is disabled without it.
    #[serde(default)]
    pub operator_chat_id: Option<String>,
    #[serde(default = "default_workflow_reply")]
    pub reply: String,
    /// `{sender}` is replaced with the chat id that triggered the workflow.
    #[serde(default = "default_workflow_notification")]
    pub notification: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            key: default_workflow_key(),
            operator_chat_id: None,
            reply: default_workflow_reply(),
            notification: default_workflow_notification(),
        }
    }
}

/// User-visible fixed strings.
#[derive(Debug, Deserialize, Clone)]
pub struct TextsConfig {
    #[serde(default = "default_ai_prompt_missing")]
    pub ai_prompt_missing: String,
    #[serde(default = "default_ai_error_prefix")]
    pub ai_error_prefix: String,
    #[serde(default = "default_entry_footer")]
    pub entry_footer: String,
    #[serde(default = "default_menu_header")]
    pub menu_header: String,
    #[serde(default = "default_menu_footer")]
    pub menu_footer: String,
}

impl Default for TextsConfig {
    fn default() -> Self {
        Self {
            ai_prompt_missing: default_ai_prompt_missing(),
            ai_error_prefix: default_ai_error_prefix(),
            entry_footer: default_entry_footer(),
            menu_header: default_menu_header(),
            menu_footer: default_menu_footer(),
        }
    }
}

/// A file that can be pushed to a chat through a Whapi media endpoint.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct FileConfig {
    pub path: PathBuf,
    pub mime: String,
    #[serde(default = "default_media_endpoint")]
    pub endpoint: String,
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_workflow_key() -> String {
    "12".to_string()
}

fn default_workflow_reply() -> String {
    "📄 *Pengajuan Dokumen*\n\n\
     Silakan kirim dokumen Anda di chat ini. Petugas kami akan segera memprosesnya.\n\n\
     Ketik *menu* untuk kembali ke daftar FAQ."
        .to_string()
}

fn default_workflow_notification() -> String {
    "📥 Permintaan pengajuan dokumen baru dari {sender}.".to_string()
}

fn default_ai_prompt_missing() -> String {
    "Please provide a prompt after /AI.".to_string()
}

fn default_ai_error_prefix() -> String {
    "OpenAI error: ".to_string()
}

fn default_entry_footer() -> String {
    "\n\nKetik *menu* untuk kembali ke daftar FAQ.".to_string()
}

fn default_menu_header() -> String {
    "📌 *Daftar FAQ*\n\n".to_string()
}

fn default_menu_footer() -> String {
    "\n\nKetik nomor (tanpa titik dan koma) untuk melihat info lebih lanjut.\n\
     Ketik */ai <pertanyaan>* untuk bertanya kepada AI."
        .to_string()
}

fn default_media_endpoint() -> String {
    "messages/document".to_string()
}

fn default_commands() -> Vec<CommandEntry> {
    vec![CommandEntry {
        key: "1".to_string(),
        primary: Link::new("text", "https://www.google.com"),
        secondary: Some(Link::new("text", "https://www.facebook.com")),
    }]
}

fn default_files() -> BTreeMap<String, FileConfig> {
    let file = |path: &str, mime: &str, endpoint: &str| FileConfig {
        path: PathBuf::from(path),
        mime: mime.to_string(),
        endpoint: endpoint.to_string(),
    };
    BTreeMap::from([
        (
            "IMAGE".to_string(),
            file("./files/file_example_JPG_100kB.jpg", "image/jpeg", "messages/image"),
        ),
        (
            "DOCUMENT".to_string(),
            file(
                "./files/file-example_PDF_500_kB.pdf",
                "application/pdf",
                "messages/document",
            ),
        ),
        (
            "VIDEO".to_string(),
            file("./files/file_example_MP4_480_1_5MG.mp4", "video/mp4", "messages/video"),
        ),
        (
            "VCARD".to_string(),
            file("./files/sample-vcard.txt", "text/vcard", "messages/document"),
        ),
    ])
}

impl Default for Config {
    fn default() -> Self {
        Self {
            whapi: WhapiConfig::default(),
            openai: OpenAiConfig::default(),
            server: ServerConfig::default(),
            workflow: WorkflowConfig::default(),
            texts: TextsConfig::default(),
            commands: default_commands(),
            files: default_files(),
        }
    }
}

impl Config {
    /// Read the TOML file, apply environment overrides and validate.
    ///
    /// A missing file is only an error when `required` is set; otherwise the
    /// defaults plus environment variables are used.
    pub fn load(path: &Path, required: bool) -> Result<Self> {
        let mut config = if path.exists() || required {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::parse(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Config::default()
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Override settings from environment-style variables.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("API_URL") {
            self.whapi.api_url = v;
        }
        if let Some(v) = non_empty("TOKEN") {
            self.whapi.token = v;
        }
        if let Some(v) = non_empty("BOT_URL") {
            self.whapi.bot_url = Some(v);
        }
        if let Some(v) = non_empty("OPENAI_API_KEY") {
            self.openai.api_key = v;
        }
        if let Some(v) = non_empty("OPENAI_MODEL") {
            self.openai.model = v;
        }
        if let Some(v) = non_empty("OPERATOR_CHAT_ID") {
            self.workflow.operator_chat_id = Some(v);
        }
        if let Some(v) = non_empty("PORT") {
            let port = v.trim().parse().map_err(|e| ConfigError::InvalidValue {
                key: "PORT".to_string(),
                message: format!("{v:?}: {e}"),
            })?;
            self.server.port = Some(port);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.whapi.api_url.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                key: "whapi.api_url".to_string(),
                hint: "Set it in the config file or via API_URL.".to_string(),
            });
        }
        if self.whapi.token.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                key: "whapi.token".to_string(),
                hint: "Set it in the config file or via TOKEN.".to_string(),
            });
        }
        crate::commands::CommandTable::new(self.commands.clone())?;

        let key = &self.workflow.key;
        if key.trim().is_empty() || key.trim() != key {
            return Err(ConfigError::InvalidValue {
                key: "workflow.key".to_string(),
                message: format!("{key:?} must be non-empty and without surrounding whitespace"),
            });
        }
        if let Some(operator) = &self.workflow.operator_chat_id {
            if operator.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "workflow.operator_chat_id".to_string(),
                    message: "must not be blank; omit it to disable the workflow".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Listening port: configured value, else 443 for an https callback URL, else 80.
    pub fn port(&self) -> u16 {
        if let Some(port) = self.server.port {
            return port;
        }
        match self.whapi.bot_url.as_deref() {
            Some(url) if url.starts_with("https:") => 443,
            _ => 80,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.port())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_keep_single_faq_entry() {
        let config = Config::default();
        assert_eq!(config.commands.len(), 1);
        assert_eq!(config.commands[0].key, "1");
        assert!(config.commands[0].secondary.is_some());
        assert_eq!(config.workflow.key, "12");
        assert!(config.workflow.operator_chat_id.is_none());
        assert_eq!(config.openai.model, "gpt-3.5-turbo");
        assert_eq!(config.files.len(), 4);
    }

    #[test]
    fn test_parse_commands_in_file_order() {
        let config = Config::parse(
            r#"
[whapi]
api_url = "https://gate.whapi.cloud"
token = "secret"

[[commands]]
key = "2"
primary = { label = "Jadwal", url = "https://example.com/jadwal" }

[[commands]]
key = "1"
primary = { label = "Biaya", url = "https://example.com/biaya" }
secondary = { label = "Beasiswa", url = "https://example.com/beasiswa" }
"#,
        )
        .unwrap();

        let keys: Vec<&str> = config.commands.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["2", "1"]);
        assert!(config.commands[0].secondary.is_none());
        assert_eq!(
            config.commands[1].secondary.as_ref().unwrap().label,
            "Beasiswa"
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = Config::parse(
            r#"
[whapi]
api_url = "https://file.example"
token = "file-token"
"#,
        )
        .unwrap();
        let vars = env(&[
            ("API_URL", "https://env.example"),
            ("TOKEN", ""),
            ("OPENAI_API_KEY", "sk-test"),
            ("OPERATOR_CHAT_ID", "6281234@s.whatsapp.net"),
            ("PORT", "8080"),
        ]);
        config.apply_env(|k| vars.get(k).cloned()).unwrap();

        assert_eq!(config.whapi.api_url, "https://env.example");
        // Empty values do not clobber the file.
        assert_eq!(config.whapi.token, "file-token");
        assert_eq!(config.openai.api_key, "sk-test");
        assert_eq!(
            config.workflow.operator_chat_id.as_deref(),
            Some("6281234@s.whatsapp.net")
        );
        assert_eq!(config.port(), 8080);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let mut config = Config::default();
        let vars = env(&[("PORT", "eighty")]);
        let err = config.apply_env(|k| vars.get(k).cloned()).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_port_falls_back_on_bot_url_scheme() {
        let mut config = Config::default();
        assert_eq!(config.port(), 80);
        config.whapi.bot_url = Some("https://bot.example/hook".to_string());
        assert_eq!(config.port(), 443);
        config.whapi.bot_url = Some("http://bot.example/hook".to_string());
        assert_eq!(config.port(), 80);
    }

    #[test]
    fn test_validate_requires_credentials() {
        let mut config = Config::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("whapi.api_url"));

        config.whapi.api_url = "https://gate.whapi.cloud".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("whapi.token"));

        config.whapi.token = "secret".to_string();
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_duplicate_keys() {
        let mut config = Config::default();
        config.whapi.api_url = "https://gate.whapi.cloud".to_string();
        config.whapi.token = "secret".to_string();
        config.commands.push(config.commands[0].clone());
        assert!(config.validate().is_err());
    }

    fn valid() -> Config {
        let mut config = Config::default();
        config.whapi.api_url = "https://gate.whapi.cloud".to_string();
        config.whapi.token = "secret".to_string();
        config
    }

    #[test]
    fn test_validate_rejects_blank_workflow_key() {
        let mut config = valid();
        config.workflow.key = String::new();
        config.workflow.operator_chat_id = Some("op".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("workflow.key"));
    }

    #[test]
    fn test_validate_rejects_padded_workflow_key() {
        let mut config = valid();
        config.workflow.key = " 12 ".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("workflow.key"));
    }

    #[test]
    fn test_validate_rejects_blank_operator() {
        let config = Config::parse(
            r#"
[whapi]
api_url = "https://gate.whapi.cloud"
token = "secret"

[workflow]
operator_chat_id = "  "
"#,
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("workflow.operator_chat_id"));

        let mut config = valid();
        config.workflow.operator_chat_id = Some("628000@s.whatsapp.net".to_string());
        config.validate().unwrap();
    }

    #[test]
    fn test_load_missing_required_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        assert!(Config::load(&path, true).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[whapi]
api_url = "https://gate.whapi.cloud"
token = "secret"

[server]
port = 9000

[files.BROCHURE]
path = "./files/brochure.pdf"
mime = "application/pdf"
"#
        )
        .unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        let mut config = Config::parse(&content).unwrap();
        config.apply_env(|_| None).unwrap();
        config.validate().unwrap();
        assert_eq!(config.server.port, Some(9000));
        assert_eq!(config.port(), 9000);
        let brochure = &config.files["BROCHURE"];
        assert_eq!(brochure.endpoint, "messages/document");
        assert_eq!(brochure.mime, "application/pdf");
    }
}
