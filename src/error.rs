use thiserror::Error;

#[derive(Debug, Error)]
pub enum FramecraftError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Unknown wood tier: {0}")]
    UnknownWood(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
