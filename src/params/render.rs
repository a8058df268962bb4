//! Window, projection and orbit camera configuration.

/// Rendering configuration
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Window width (pixels)
    pub window_width: u32,

    /// Window height (pixels)
    pub window_height: u32,

    /// Start in borderless fullscreen
    pub launch_fullscreen: bool,

    /// Vertical field of view (degrees)
    pub fov_degrees: f32,

    /// Near clipping plane (world units)
    pub near_plane: f32,

    /// Far clipping plane (world units)
    pub far_plane: f32,

    /// Multiplier applied to every particle's sprite size
    pub point_scale: f32,

    /// Optional PNG used as the particle sprite (procedural glow otherwise)
    pub sprite_path: Option<String>,

    /// Draw the magnitude spectrum as bars along the bottom edge (toggle: S)
    pub spectrum_overlay: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_width: 1280,
            window_height: 720,
            launch_fullscreen: false,
            fov_degrees: 45.0,
            near_plane: 0.1,
            far_plane: 10_000.0,
            point_scale: 0.5,
            sprite_path: None,
            spectrum_overlay: false,
        }
    }
}

impl RenderConfig {
    pub fn aspect_ratio(&self) -> f32 {
        self.window_width as f32 / self.window_height.max(1) as f32
    }
}

/// Orbit camera controls
#[derive(Debug, Clone)]
pub struct OrbitControls {
    /// Radians of orbit per pixel of mouse drag
    pub orbit_sensitivity: f32,

    /// Fractional distance change per scroll line
    pub zoom_sensitivity: f32,

    /// Closest allowed distance to the target
    pub min_distance: f32,

    /// Pitch limit (radians) to keep the up vector stable
    pub max_pitch: f32,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            orbit_sensitivity: 0.005,
            zoom_sensitivity: 0.1,
            min_distance: 10.0,
            max_pitch: 1.5,
        }
    }
}
