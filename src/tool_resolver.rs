//! # Tool Path Resolver
//!
//! Trova i decoder HEIC esterni nei diversi ambienti:
//! - Tool bundled in `TOOLS_DIR/<platform>/`
//! - Tool installati nel `PATH` di sistema

use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// External tools able to decode HEIC, in order of preference
pub const DECODER_TOOLS: &[&str] = &["heif-convert", "heif-dec", "magick", "convert", "vips"];

/// Tool path resolver for bundled and system tools
#[derive(Debug, Clone)]
pub struct ToolPathResolver {
    /// Directory where tools are bundled, from `TOOLS_DIR`
    tools_dir: Option<PathBuf>,
}

impl ToolPathResolver {
    /// Create a resolver honouring the `TOOLS_DIR` environment variable
    pub fn new() -> Self {
        let tools_dir = env::var_os("TOOLS_DIR")
            .map(PathBuf::from)
            .filter(|path| {
                let exists = path.exists();
                if !exists {
                    warn!("TOOLS_DIR points to a missing directory: {:?}", path);
                }
                exists
            });

        Self { tools_dir }
    }

    /// Create a resolver with an explicit bundled tools directory
    pub fn with_tools_dir(tools_dir: impl Into<PathBuf>) -> Self {
        Self {
            tools_dir: Some(tools_dir.into()),
        }
    }

    /// Resolve the path to a specific tool
    pub fn resolve_tool(&self, tool_name: &str) -> Option<PathBuf> {
        if let Some(ref tools_dir) = self.tools_dir {
            let bundled_path = Self::bundled_tool_path(tools_dir, tool_name);
            if bundled_path.is_file() {
                debug!("Using bundled tool: {} -> {:?}", tool_name, bundled_path);
                return Some(bundled_path);
            }
            debug!("Bundled path does not exist: {:?}", bundled_path);
        }

        if let Some(system_path) = Self::find_in_system_path(tool_name) {
            debug!("Using system tool: {} -> {:?}", tool_name, system_path);
            return Some(system_path);
        }

        debug!("Tool not found: {}", tool_name);
        None
    }

    /// Expected location of a bundled tool: `tools/{platform}/{tool_name}[.exe]`
    fn bundled_tool_path(tools_dir: &Path, tool_name: &str) -> PathBuf {
        let platform = if cfg!(target_os = "macos") {
            "darwin"
        } else {
            env::consts::OS
        };

        tools_dir.join(platform).join(Self::executable_name(tool_name))
    }

    fn executable_name(tool_name: &str) -> String {
        if cfg!(windows) {
            format!("{}.exe", tool_name)
        } else {
            tool_name.to_string()
        }
    }

    /// Find tool in system PATH
    fn find_in_system_path(tool_name: &str) -> Option<PathBuf> {
        let executable = Self::executable_name(tool_name);
        let path_var = env::var_os("PATH")?;

        env::split_paths(&path_var)
            .map(|dir| dir.join(&executable))
            .find(|path| path.is_file())
    }

    /// Check if a specific tool is available
    pub fn is_tool_available(&self, tool_name: &str) -> bool {
        self.resolve_tool(tool_name).is_some()
    }

    /// Decoder tools found on this system, in preference order
    pub fn available_decoders(&self) -> Vec<String> {
        DECODER_TOOLS
            .iter()
            .filter(|&&tool| self.is_tool_available(tool))
            .map(|&tool| tool.to_string())
            .collect()
    }

    /// Installation hint for a decoder tool on Debian-like systems
    pub fn install_instructions(tool_name: &str) -> String {
        match tool_name {
            "heif-convert" | "heif-dec" => "sudo apt-get install libheif-examples".to_string(),
            "magick" | "convert" => "sudo apt-get install imagemagick  # needs HEIC delegate (libheif)".to_string(),
            "vips" => "sudo apt-get install libvips-tools".to_string(),
            _ => format!("sudo apt-get install {}", tool_name),
        }
    }

    /// Get a report of decoder availability
    pub fn get_tools_report(&self) -> String {
        let mut report = String::new();
        report.push_str("HEIC decoder tools\n");
        report.push_str(&format!("Bundled tools dir: {:?}\n\n", self.tools_dir));

        for tool in DECODER_TOOLS {
            match self.resolve_tool(tool) {
                Some(path) => report.push_str(&format!("  ✅ {} -> {:?}\n", tool, path)),
                None => report.push_str(&format!(
                    "  ❌ {} (install with: {})\n",
                    tool,
                    Self::install_instructions(tool)
                )),
            }
        }

        report
    }
}

impl Default for ToolPathResolver {
    fn default() -> Self {
        Self::new()
    }
}
