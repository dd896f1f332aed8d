use anyhow::Result;
use serde::Serialize;

use super::daemon_path::to_daemon_path;

/// Host identifier the extension addresses its messages to.
pub const HOST_NAME: &str = "com.tabtime.tracker";

/// Native-messaging host manifest the browser uses to locate and launch the
/// daemon binary.
#[derive(Serialize)]
struct HostManifest {
    name: String,
    description: String,
    path: String,
    #[serde(rename = "type")]
    transport: String,
    allowed_origins: Vec<String>,
}

pub fn render_manifest(extension_id: &str) -> Result<String> {
    let daemon = to_daemon_path(std::env::current_exe()?);
    let manifest = HostManifest {
        name: HOST_NAME.to_owned(),
        description: "Per-domain browsing time tracker".to_owned(),
        path: daemon.to_string_lossy().into_owned(),
        transport: "stdio".to_owned(),
        allowed_origins: vec![format!("chrome-extension://{extension_id}/")],
    };
    Ok(serde_json::to_string_pretty(&manifest)?)
}
