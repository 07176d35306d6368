use anyhow::anyhow;
use ini::{Ini, ParseOption};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use url::Url;

pub(crate) const CONFIG_FILE_NAME: &str = ".iic1103src";
pub(crate) const SYSTEM_CONFIG_PATH: &str = "/usr/local/etc/iic1103src";

const SERVICE_SECTION: &str = "iic1103";
const USER_SECTION: &str = "user";
const DEFAULTS_SECTION: &str = "defaults";

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error(
        "I failed to read in a config file from your home directory or from the
same directory as this program. Please go to your iic1103 installation
to download a .iic1103src file.

The file should look something like this:
[user]
username: yourusername
token: *********

[iic1103]
loginurl: https://<iic1103>/login
submissionurl: https://<iic1103>/submit"
    )]
    NotFound,
    #[error("Failed to read config file {}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },
    #[error("Option '{option}' is missing from section [{section}] of your .iic1103src file")]
    MissingOption {
        section: &'static str,
        option: &'static str,
    },
    #[error(
        "Your .iic1103src file appears corrupted. It must provide a token (or a
iic1103 password).

Please download a new .iic1103src file"
    )]
    MissingCredentials,
    #[error("python-version in .iic1103src must be 2 or 3 (found '{0}')")]
    InvalidPythonVersion(String),
    #[error("Invalid URL in .iic1103src: {value}")]
    InvalidUrl { value: String },
}

/// Username plus whichever secrets the config provides. At least one of
/// `password` and `token` is always set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Credentials {
    pub(crate) username: String,
    pub(crate) password: Option<String>,
    pub(crate) token: Option<String>,
}

/// Merged view of every `.iic1103src` file that was read. Files read later
/// override keys from files read earlier.
#[derive(Debug, Default, Clone)]
pub(crate) struct Config {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl Config {
    /// Resolves the configuration from the standard locations, or from
    /// `explicit` instead of the per-user locations when given.
    pub(crate) fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let candidates = match explicit {
            Some(path) => vec![path.to_path_buf()],
            None => default_candidates(),
        };
        Self::load_from(Path::new(SYSTEM_CONFIG_PATH), &candidates)
    }

    fn load_from(system: &Path, candidates: &[PathBuf]) -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.merge_file(system)?;

        let mut found = false;
        for path in candidates {
            found |= config.merge_file(path)?;
        }
        if !found {
            return Err(ConfigError::NotFound);
        }
        Ok(config)
    }

    /// Returns `Ok(false)` when the file does not exist.
    fn merge_file(&mut self, path: &Path) -> Result<bool, ConfigError> {
        if !path.is_file() {
            return Ok(false);
        }
        let option = ParseOption {
            enabled_quote: false,
            enabled_escape: false,
            ..ParseOption::default()
        };
        let ini = Ini::load_from_file_opt(path, option).map_err(|source| {
            ConfigError::Unreadable {
                path: path.to_path_buf(),
                source,
            }
        })?;
        debug!("Read config file: {}", path.display());

        for (section, properties) in ini.iter() {
            let Some(section) = section else {
                continue;
            };
            let entries = self.sections.entry(section.to_string()).or_default();
            for (key, value) in properties.iter() {
                entries.insert(key.to_lowercase(), value.to_string());
            }
        }
        Ok(true)
    }

    pub(crate) fn get(&self, section: &str, option: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|entries| entries.get(option))
            .map(String::as_str)
    }

    fn get_non_empty(&self, section: &str, option: &str) -> Option<String> {
        self.get(section, option)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    pub(crate) fn credentials(&self) -> Result<Credentials, ConfigError> {
        let username = self
            .get_non_empty(USER_SECTION, "username")
            .ok_or(ConfigError::MissingOption {
                section: USER_SECTION,
                option: "username",
            })?;
        let password = self.get_non_empty(USER_SECTION, "password");
        let token = self.get_non_empty(USER_SECTION, "token");
        if password.is_none() && token.is_none() {
            return Err(ConfigError::MissingCredentials);
        }
        Ok(Credentials {
            username,
            password,
            token,
        })
    }

    /// `defaults.python-version`, validated to be `2` or `3`.
    pub(crate) fn python_version(&self) -> Result<Option<char>, ConfigError> {
        match self.get(DEFAULTS_SECTION, "python-version") {
            None => Ok(None),
            Some("2") => Ok(Some('2')),
            Some("3") => Ok(Some('3')),
            Some(other) => Err(ConfigError::InvalidPythonVersion(other.to_string())),
        }
    }

    /// The service URL stored under `option`, or `https://<hostname>/<default_path>`.
    pub(crate) fn get_url(&self, option: &str, default_path: &str) -> Result<Url, ConfigError> {
        if let Some(value) = self.get(SERVICE_SECTION, option) {
            return Url::parse(value).map_err(|_| ConfigError::InvalidUrl {
                value: value.to_string(),
            });
        }
        let hostname = self
            .get(SERVICE_SECTION, "hostname")
            .ok_or(ConfigError::MissingOption {
                section: SERVICE_SECTION,
                option: "hostname",
            })?;
        build_default_url(hostname, default_path).map_err(|_| ConfigError::InvalidUrl {
            value: hostname.to_string(),
        })
    }
}

fn default_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![];
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(CONFIG_FILE_NAME));
    }
    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        candidates.push(dir.join(CONFIG_FILE_NAME));
    }
    candidates
}

fn build_default_url(hostname: &str, default_path: &str) -> anyhow::Result<Url> {
    let mut url = Url::parse(&format!("https://{}", hostname))?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("Failed to set path segments"))?
        .pop_if_empty()
        .push(default_path);
    Ok(url)
}
