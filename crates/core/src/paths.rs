use std::path::PathBuf;

/// Environment variable that relocates the base directory.
pub const HOME_ENV: &str = "RAPIDAPI_MCP_HOME";

#[derive(Debug, Clone)]
pub struct Paths {
    pub base: PathBuf,
}

impl Paths {
    pub fn new() -> Self {
        if let Ok(dir) = std::env::var(HOME_ENV) {
            if !dir.trim().is_empty() {
                return Self::with_base(PathBuf::from(dir));
            }
        }
        let base = dirs::home_dir()
            .map(|h| h.join(".rapidapi-mcp"))
            .unwrap_or_else(|| PathBuf::from(".rapidapi-mcp"));
        Self { base }
    }

    pub fn with_base(base: PathBuf) -> Self {
        Self { base }
    }

    pub fn config_file(&self) -> PathBuf {
        self.base.join("config.json")
    }

    /// Root for per-session Chrome user data directories.
    pub fn browser_dir(&self) -> PathBuf {
        self.base.join("browser")
    }

    pub fn session_profile_dir(&self, session_name: &str) -> PathBuf {
        let safe = session_name.replace([':', '/', '\\'], "_");
        self.browser_dir().join("sessions").join(safe)
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}
