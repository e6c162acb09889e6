use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub store: StoreSettings,
    pub dashboard: DashboardSettings,
    pub generator: GeneratorSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreSettings {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardSettings {
    pub line_series_limit: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneratorSettings {
    pub enabled: bool,
    pub interval_seconds: u64,
    pub seed_hours: u32,
    #[serde(default)]
    pub categories: Vec<String>,
}

pub fn load_settings() -> anyhow::Result<Settings> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/pulseboard"))
        .build()?;

    Ok(settings.try_deserialize()?)
}
