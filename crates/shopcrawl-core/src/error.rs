use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read profiles file {path}: {source}")]
    ProfilesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse profiles file: {0}")]
    ProfilesFileParse(#[from] serde_yaml::Error),

    #[error("profile validation failed: {0}")]
    Validation(String),
}
