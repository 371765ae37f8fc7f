//! Configuration loaded from `.stepmap.toml`.

mod core;
mod loader;

pub use self::core::{
    default_diagram_extension, default_framework_package, default_max_condition_len,
    StepmapConfig,
};
pub use loader::{
    directory_ancestors, discover_config, load_config, load_config_from,
    parse_and_validate_config, CONFIG_FILE_NAME,
};
