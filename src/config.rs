use fern::colors::{Color, ColoredLevelConfig};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};

/// Overrides the configuration file location.
pub const CONFIG_PATH_VARIABLE: &str = "DRIVETREE_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "drivetree.toml";

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    pub address: IpAddr,
    pub port: u16,
    /// JSON file holding instructors, applications, bookings and students
    pub database: String,
    /// Seed the demo instructors when the database file is created
    pub seed_fixtures: bool,
    pub log_level: String,
    pub log_file: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3030,
            database: "db.json".to_string(),
            seed_fixtures: true,
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

/// Loads the configuration, writing the defaults to disk on first start.
pub fn load() -> Result<Config, confy::ConfyError> {
    let path =
        std::env::var(CONFIG_PATH_VARIABLE).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    confy::load_path(path)
}

pub fn setup_logging(config: &Config) -> Result<(), fern::InitError> {
    let colors = ColoredLevelConfig::new().debug(Color::Magenta);
    let level = config
        .log_level
        .parse::<log::LevelFilter>()
        .unwrap_or(log::LevelFilter::Info);

    let mut dispatch = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{}{} {}",
                colors.color(record.level()),
                chrono::Local::now().format("[%H:%M:%S]"),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout());

    if let Some(log_file) = &config.log_file {
        dispatch = dispatch.chain(fern::log_file(log_file)?);
    }

    dispatch.apply()?;
    Ok(())
}
