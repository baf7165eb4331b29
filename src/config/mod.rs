use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use serde_yml;
use std::fs::File;
use std::io::prelude::*;

fn remo_api_url_default() -> String { return "https://api.nature.global/1".to_string() }
fn remo_interval_default() -> u64 { return 60 }

#[derive(Deserialize, Serialize, Clone)]
pub struct RemoConfig {
    pub access_token: String,
    #[serde(default="remo_api_url_default")]
    pub api_url: String,
    /// Seconds between polls of the appliances endpoint.
    #[serde(default="remo_interval_default")]
    pub interval: u64,
}

#[derive(Deserialize, Serialize, Clone)]
pub struct InfluxConfig {
    pub url: String,
    pub token: String,
    pub org: String,
    pub bucket: String,
}

#[derive(Deserialize, Serialize, Clone)]
pub struct Config {
    pub remo: RemoConfig,
    pub influx: InfluxConfig,
}

impl Config {
    pub fn load() -> Self {
        /* Check for the two paths of the config file */
        let file = File::open("config/r2i.yaml");
        let mut file = match file {
            Ok(f) => f,
            Err(_) => File::open("r2i.yaml").expect("Unable to read the config on config/r2i.yaml or r2i.yaml"),
        };

        let mut contents = String::new();
        file.read_to_string(&mut contents).expect("Unable to read config file");
        let c: Config = serde_yml::from_str(&contents).expect("Unable to parse config file");
        return c;
    }
}

lazy_static! {
    pub static ref CONFIG: Config = Config::load();
}
