use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use serde::Serialize;

/// Name the extension connects to with `runtime.connectNative`.
pub const HOST_NAME: &str = "com.sitewatch.host";

const HOST_EXECUTABLE: &str = "sitewatch-host";

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum Browser {
    #[default]
    Chrome,
    Firefox,
}

#[derive(Debug, Parser)]
pub struct ManifestCommand {
    #[arg(long, help = "Id of the installed extension")]
    extension_id: String,
    #[arg(long, value_enum, default_value_t = Browser::Chrome)]
    browser: Browser,
    #[arg(
        long,
        help = "Path to sitewatch-host. By default it's expected next to this executable"
    )]
    host_path: Option<PathBuf>,
}

/// Native messaging host manifest. Chrome lists allowed origins, Firefox lists extension ids.
#[derive(Debug, Serialize)]
pub struct NativeManifest {
    name: &'static str,
    description: &'static str,
    path: PathBuf,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    allowed_origins: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    allowed_extensions: Option<Vec<String>>,
}

impl NativeManifest {
    pub fn new(browser: Browser, extension_id: &str, host_path: PathBuf) -> Self {
        let (allowed_origins, allowed_extensions) = match browser {
            Browser::Chrome => (
                Some(vec![format!("chrome-extension://{extension_id}/")]),
                None,
            ),
            Browser::Firefox => (None, Some(vec![extension_id.to_owned()])),
        };
        Self {
            name: HOST_NAME,
            description: "Per-site browsing time tracker",
            path: host_path,
            kind: "stdio",
            allowed_origins,
            allowed_extensions,
        }
    }
}

/// The host binary is installed alongside the cli.
pub fn to_host_path(mut path: PathBuf) -> PathBuf {
    path.set_file_name(HOST_EXECUTABLE);
    #[cfg(windows)]
    {
        path.set_extension("exe");
    }
    path
}

/// Prints the manifest to stdout, ready to be saved where the browser looks for it.
pub fn process_manifest_command(command: ManifestCommand) -> Result<()> {
    let host_path = match command.host_path {
        Some(path) => path,
        None => to_host_path(std::env::current_exe()?),
    };
    let manifest = NativeManifest::new(command.browser, &command.extension_id, host_path);
    println!("{}", render(&manifest)?);
    Ok(())
}

fn render(manifest: &NativeManifest) -> Result<String> {
    Ok(serde_json::to_string_pretty(manifest)?)
}
