// Configuration loading

pub mod error;
pub mod palette;
pub mod settings;

pub use error::{ConfigError, ConfigResult};
pub use palette::{load_palette, parse_palette};
pub use settings::Settings;
