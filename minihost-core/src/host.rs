//! Host accessor interfaces.
//!
//! System information and permission settings are owned by the host. The core
//! consumes them through these traits, injected where needed rather than
//! reached through a global object. The in-memory implementations back the
//! CLI and tests.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

/// Device and platform metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    /// Device brand.
    pub brand: String,
    /// Device model.
    pub model: String,
    /// Device pixel ratio.
    pub pixel_ratio: f32,
    /// Screen width in logical pixels.
    pub screen_width: u32,
    /// Screen height in logical pixels.
    pub screen_height: u32,
    /// Usable window width in logical pixels.
    pub window_width: u32,
    /// Usable window height in logical pixels.
    pub window_height: u32,
    /// Status bar height in logical pixels.
    pub status_bar_height: u32,
    /// Host language.
    pub language: String,
    /// Host application version.
    pub version: String,
    /// Operating system name and version.
    pub system: String,
    /// Client platform.
    pub platform: String,
    /// User font size setting.
    pub font_size_setting: String,
    /// Base library version.
    #[serde(rename = "SDKVersion")]
    pub sdk_version: String,
}

impl Default for SystemInfo {
    fn default() -> Self {
        Self {
            brand: "generic".to_string(),
            model: "desktop".to_string(),
            pixel_ratio: 1.0,
            screen_width: 800,
            screen_height: 600,
            window_width: 800,
            window_height: 600,
            status_bar_height: 0,
            language: "en".to_string(),
            version: crate::VERSION.to_string(),
            system: std::env::consts::OS.to_string(),
            platform: "devtools".to_string(),
            font_size_setting: "16".to_string(),
            sdk_version: crate::VERSION.to_string(),
        }
    }
}

/// Source of device metadata.
#[async_trait]
pub trait SystemInfoAccessor: Send + Sync {
    /// Query system information synchronously.
    ///
    /// # Errors
    ///
    /// Returns an error if the host cannot provide the information.
    fn system_info_sync(&self) -> CoreResult<SystemInfo>;

    /// Query system information asynchronously.
    ///
    /// # Errors
    ///
    /// Returns an error if the host cannot provide the information.
    async fn system_info(&self) -> CoreResult<SystemInfo> {
        self.system_info_sync()
    }
}

/// A fixed system information snapshot.
#[derive(Debug, Clone, Default)]
pub struct StaticSystemInfo {
    info: SystemInfo,
}

impl StaticSystemInfo {
    /// Serve the given snapshot.
    #[must_use]
    pub fn new(info: SystemInfo) -> Self {
        Self { info }
    }
}

#[async_trait]
impl SystemInfoAccessor for StaticSystemInfo {
    fn system_info_sync(&self) -> CoreResult<SystemInfo> {
        Ok(self.info.clone())
    }
}

/// One named unit of user-grantable permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Scope {
    /// User profile information.
    #[serde(rename = "scope.userInfo")]
    UserInfo,
    /// Geographic location.
    #[serde(rename = "scope.userLocation")]
    UserLocation,
    /// Postal address.
    #[serde(rename = "scope.address")]
    Address,
    /// Invoice title.
    #[serde(rename = "scope.invoiceTitle")]
    InvoiceTitle,
    /// Fitness (step count) data.
    #[serde(rename = "scope.werun")]
    Werun,
    /// Audio recording.
    #[serde(rename = "scope.record")]
    Record,
    /// Writing to the photo album.
    #[serde(rename = "scope.writePhotosAlbum")]
    WritePhotosAlbum,
    /// Camera.
    #[serde(rename = "scope.camera")]
    Camera,
}

impl Scope {
    /// Every scope, in declaration order.
    pub const ALL: [Scope; 8] = [
        Self::UserInfo,
        Self::UserLocation,
        Self::Address,
        Self::InvoiceTitle,
        Self::Werun,
        Self::Record,
        Self::WritePhotosAlbum,
        Self::Camera,
    ];

    /// The wire name, e.g. `scope.camera`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserInfo => "scope.userInfo",
            Self::UserLocation => "scope.userLocation",
            Self::Address => "scope.address",
            Self::InvoiceTitle => "scope.invoiceTitle",
            Self::Werun => "scope.werun",
            Self::Record => "scope.record",
            Self::WritePhotosAlbum => "scope.writePhotosAlbum",
            Self::Camera => "scope.camera",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Scope {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|scope| scope.as_str() == s)
            .ok_or_else(|| CoreError::UnknownScope(s.to_string()))
    }
}

/// Scopes the user has decided on, with their grant flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthSetting(BTreeMap<Scope, bool>);

impl AuthSetting {
    /// The decision for a scope, if one was made.
    #[must_use]
    pub fn get(&self, scope: Scope) -> Option<bool> {
        self.0.get(&scope).copied()
    }

    /// Check if a scope is granted.
    #[must_use]
    pub fn is_granted(&self, scope: Scope) -> bool {
        self.get(scope).unwrap_or(false)
    }

    /// Record a decision.
    pub fn set(&mut self, scope: Scope, granted: bool) {
        self.0.insert(scope, granted);
    }

    /// Iterate decisions in scope order.
    pub fn iter(&self) -> impl Iterator<Item = (Scope, bool)> + '_ {
        self.0.iter().map(|(scope, granted)| (*scope, *granted))
    }
}

/// Source and sink of permission decisions.
#[async_trait]
pub trait PermissionAccessor: Send + Sync {
    /// Current decisions.
    ///
    /// # Errors
    ///
    /// Returns an error if the host cannot provide the settings.
    async fn get_setting(&self) -> CoreResult<AuthSetting>;

    /// Show the host's settings page and return the decisions afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the host cannot provide the settings.
    async fn open_setting(&self) -> CoreResult<AuthSetting>;

    /// Request a single scope.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AuthorizeDenied`] with a readable message if the
    /// scope is not granted.
    async fn authorize(&self, scope: Scope) -> CoreResult<()>;
}

type Prompt = Arc<dyn Fn(Scope) -> bool + Send + Sync>;

/// Permission decisions kept in memory.
///
/// Undecided scopes are resolved by a prompt callback on first `authorize`;
/// a recorded denial is final until changed with [`InMemoryPermissions::set`].
pub struct InMemoryPermissions {
    setting: Mutex<AuthSetting>,
    prompt: Prompt,
}

impl fmt::Debug for InMemoryPermissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryPermissions")
            .field("setting", &self.setting)
            .finish_non_exhaustive()
    }
}

impl Default for InMemoryPermissions {
    fn default() -> Self {
        Self::with_prompt(|_| true)
    }
}

impl InMemoryPermissions {
    /// Grant every undecided scope on request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve undecided scopes with a custom prompt.
    #[must_use]
    pub fn with_prompt<F>(prompt: F) -> Self
    where
        F: Fn(Scope) -> bool + Send + Sync + 'static,
    {
        Self {
            setting: Mutex::new(AuthSetting::default()),
            prompt: Arc::new(prompt),
        }
    }

    /// Record a decision, as if the user changed it in the settings page.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is poisoned.
    pub fn set(&self, scope: Scope, granted: bool) -> CoreResult<()> {
        self.lock()?.set(scope, granted);
        Ok(())
    }

    fn lock(&self) -> CoreResult<MutexGuard<'_, AuthSetting>> {
        self.setting
            .lock()
            .map_err(|_| CoreError::HostUnavailable("permission store poisoned".to_string()))
    }
}

#[async_trait]
impl PermissionAccessor for InMemoryPermissions {
    async fn get_setting(&self) -> CoreResult<AuthSetting> {
        Ok(self.lock()?.clone())
    }

    async fn open_setting(&self) -> CoreResult<AuthSetting> {
        Ok(self.lock()?.clone())
    }

    async fn authorize(&self, scope: Scope) -> CoreResult<()> {
        let mut setting = self.lock()?;
        let granted = match setting.get(scope) {
            Some(decided) => decided,
            None => {
                let decided = (self.prompt)(scope);
                setting.set(scope, decided);
                decided
            }
        };

        if granted {
            tracing::debug!("Scope {scope} authorized");
            Ok(())
        } else {
            tracing::debug!("Scope {scope} denied");
            Err(CoreError::AuthorizeDenied(format!(
                "authorize:fail auth deny {scope}"
            )))
        }
    }
}
