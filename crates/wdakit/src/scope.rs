//! Routes served both at the device root and under a session.
//!
//! The agent answers `wda/locked`, `screenshot`, `source` and friends on
//! either prefix, so [`Client`](crate::Client) and
//! [`Session`](crate::Session) share one implementation parameterized by
//! their endpoint.

use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::model::{AppInfo, SourceOptions};
use crate::screenshot::Screenshot;
use crate::transport::Transport;

pub(crate) struct Scope<'a> {
    pub endpoint: &'a Endpoint,
    pub transport: &'a Transport,
}

impl Scope<'_> {
    pub async fn is_locked(&self) -> Result<bool> {
        let url = self.endpoint.join_wda(&["locked"]);
        Ok(self.transport.get("IsLocked", &url).await?.value_bool())
    }

    pub async fn lock(&self) -> Result<()> {
        let url = self.endpoint.join_wda(&["lock"]);
        self.transport.post_empty("Lock", &url).await?;
        Ok(())
    }

    pub async fn unlock(&self) -> Result<()> {
        let url = self.endpoint.join_wda(&["unlock"]);
        self.transport.post_empty("Unlock", &url).await?;
        Ok(())
    }

    pub async fn screenshot(&self) -> Result<Screenshot> {
        let url = self.endpoint.join(&["screenshot"]);
        let env = self.transport.get("Screenshot", &url).await?;
        Ok(Screenshot::new(env.value_base64("Screenshot")?))
    }

    /// The UI tree as text. JSON trees are returned as JSON text.
    pub async fn source(&self, options: &SourceOptions) -> Result<String> {
        let pairs = options.query_pairs();
        let url = self
            .endpoint
            .with_query(pairs.iter().map(|(k, v)| (*k, v.as_str())))
            .join(&["source"]);
        let env = self.transport.get("Source", &url).await?;
        if options.is_json() {
            Ok(env.value().to_string())
        } else {
            Ok(env.value_string())
        }
    }

    pub async fn accessible_source(&self) -> Result<String> {
        let url = self.endpoint.join_wda(&["accessibleSource"]);
        Ok(self.transport.get("AccessibleSource", &url).await?.value_string())
    }

    pub async fn active_app_info(&self) -> Result<AppInfo> {
        let url = self.endpoint.join_wda(&["activeAppInfo"]);
        self.transport
            .get("ActiveAppInfo", &url)
            .await?
            .value_as("ActiveAppInfo")
    }
}
