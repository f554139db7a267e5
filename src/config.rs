use std::path::Path;

/// URL fragment that turns on the material debug panel.
pub const DEBUG_FRAGMENT: &str = "#debug";

/// Selector of the canvas the web build renders into.
pub const CANVAS_SELECTOR: &str = "canvas.webgl";

pub const BACKGROUND_TEXTURE: &str = "texture.jpg";
pub const NORMAL_TEXTURE: &str = "normal.jpg";
pub const ENVIRONMENT_MAP: &str = "empty_warehouse_01_2k.hdr";

/// Settings fixed for the lifetime of one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Derived once from the URL fragment; never toggled at runtime.
    pub debug: bool,
    /// Directory (native) or URL prefix (web) the three assets are read from.
    pub asset_root: String,
    /// Window size requested at startup, in logical pixels.
    pub initial_size: (u32, u32),
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debug: false,
            asset_root: default_asset_root().to_string(),
            initial_size: (1280, 720),
        }
    }
}

impl SessionConfig {
    /// Builds a config whose debug flag follows the given URL fragment.
    pub fn from_fragment(fragment: &str) -> Self {
        Self {
            debug: debug_enabled(fragment),
            ..Self::default()
        }
    }

    pub fn with_asset_root(mut self, root: impl Into<String>) -> Self {
        self.asset_root = root.into();
        self
    }

    pub fn with_initial_size(mut self, width: u32, height: u32) -> Self {
        self.initial_size = (width.max(1), height.max(1));
        self
    }

    /// Resolves an asset file name against the configured root.
    pub fn asset_location(&self, file: &str) -> String {
        let root = self.asset_root.trim_end_matches('/');
        if root.is_empty() {
            format!("/{file}")
        } else {
            format!("{root}/{file}")
        }
    }

    pub fn asset_root_exists(&self) -> bool {
        Path::new(&self.asset_root).is_dir()
    }
}

/// Returns true when the fragment is exactly the debug marker.
pub fn debug_enabled(fragment: &str) -> bool {
    fragment == DEBUG_FRAGMENT
}

#[cfg(not(target_arch = "wasm32"))]
fn default_asset_root() -> &'static str {
    "static"
}

#[cfg(target_arch = "wasm32")]
fn default_asset_root() -> &'static str {
    ""
}

#[cfg(not(target_arch = "wasm32"))]
pub use cli::CliOptions;

#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use clap::Parser;

    use super::SessionConfig;

    /// Frosted glass shapes with bloom.
    #[derive(Debug, Clone, Parser)]
    #[command(name = "frosted-glass", version, about)]
    pub struct CliOptions {
        /// URL-style fragment; `#debug` enables the material panel.
        #[arg(long, default_value = "")]
        pub fragment: String,

        /// Shorthand for `--fragment '#debug'`.
        #[arg(long)]
        pub debug: bool,

        /// Directory holding texture.jpg, normal.jpg and the HDR map.
        #[arg(long, default_value = "static")]
        pub assets: String,

        #[arg(long, default_value_t = 1280)]
        pub width: u32,

        #[arg(long, default_value_t = 720)]
        pub height: u32,

        /// Print the scene summary without opening a window.
        #[arg(long)]
        pub summary_only: bool,

        /// Number of frames to simulate in summary mode.
        #[arg(long, default_value_t = 1)]
        pub frames: u32,

        /// Simulated seconds per frame in summary mode.
        #[arg(long, default_value_t = 1.0 / 60.0)]
        pub frame_time: f64,
    }

    impl CliOptions {
        pub fn session_config(&self) -> SessionConfig {
            let fragment = if self.debug {
                super::DEBUG_FRAGMENT
            } else {
                self.fragment.as_str()
            };
            SessionConfig::from_fragment(fragment)
                .with_asset_root(self.assets.clone())
                .with_initial_size(self.width, self.height)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_flag_requires_exact_fragment() {
        assert!(SessionConfig::from_fragment("#debug").debug);
        assert!(!SessionConfig::from_fragment("").debug);
        assert!(!SessionConfig::from_fragment("#Debug").debug);
        assert!(!SessionConfig::from_fragment("#debug2").debug);
    }

    #[test]
    fn asset_location_joins_root() {
        let config = SessionConfig::default().with_asset_root("assets/");
        assert_eq!(config.asset_location(NORMAL_TEXTURE), "assets/normal.jpg");
        let web = SessionConfig::default().with_asset_root("");
        assert_eq!(web.asset_location(BACKGROUND_TEXTURE), "/texture.jpg");
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn cli_debug_switch_maps_to_fragment() {
        use clap::Parser;

        let options = CliOptions::parse_from(["frosted-glass", "--debug", "--width", "800"]);
        let config = options.session_config();
        assert!(config.debug);
        assert_eq!(config.initial_size, (800, 720));

        let options = CliOptions::parse_from(["frosted-glass", "--fragment", "#debug"]);
        assert!(options.session_config().debug);
    }
}
