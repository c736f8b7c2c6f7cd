//! Error types for backdrop.
//!
//! Only GPU setup and preset loading can fail. The kernel, projection,
//! profiler scoring and choreographer are infallible: bad parameters
//! degrade to an invisible or static effect instead of raising.

use thiserror::Error;

/// Errors that can occur during GPU initialization.
#[derive(Debug, Error)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    #[error("Failed to create GPU surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),

    /// No compatible GPU adapter found.
    #[error("No compatible GPU adapter found. The decorative layer will be disabled.")]
    NoAdapter,

    /// Failed to create GPU device.
    #[error("Failed to create GPU device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),

    /// The device was lost and must be recreated before further use.
    #[error("GPU device lost")]
    ContextLost,
}

/// Errors that can occur while loading or validating presets.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read preset: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse preset: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid preset: {0}")]
    Invalid(String),
}

/// Errors surfaced by the demo host.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Failed to create event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("Failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_from_toml() {
        let err = toml::from_str::<toml::Value>("= nope").unwrap_err();
        let err: ConfigError = err.into();
        assert!(err.to_string().starts_with("Failed to parse preset"));
    }

    #[test]
    fn test_app_error_wraps_gpu() {
        let err: AppError = GpuError::NoAdapter.into();
        assert!(err.to_string().contains("No compatible GPU adapter"));
    }
}
