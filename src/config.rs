use std::env;
use std::path::PathBuf;

/// Runtime configuration, read once at startup. Every path has a literal
/// default matching the historical on-disk layout, so the server runs with
/// no environment at all.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model_path: PathBuf,
    pub labels_path: PathBuf,
    pub database_url: String,
    pub static_dir: PathBuf,
    pub upload_dir: PathBuf,
    pub report_dir: PathBuf,
    pub session_secret: String,
    pub port: u16,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl AppConfig {
    pub fn from_env() -> Self {
        let static_dir = PathBuf::from(var_or("STATIC_DIR", "static"));
        let session_secret = var_or("SESSION_SECRET", "change-me");
        if session_secret == "change-me" {
            log::warn!("SESSION_SECRET is not set; using the default development secret");
        }

        Self {
            model_path: PathBuf::from(var_or("MODEL_PATH", "assets/rice_disease_model.pt")),
            labels_path: PathBuf::from(var_or("LABELS_PATH", "assets/class_labels.txt")),
            database_url: var_or("DATABASE_URL", "sqlite://users.db"),
            upload_dir: static_dir.join("uploaded"),
            report_dir: static_dir.join("reports"),
            static_dir,
            session_secret,
            port: var_or("PORT", "8081").parse().unwrap_or(8081),
        }
    }
}
