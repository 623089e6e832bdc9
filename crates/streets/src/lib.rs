pub mod config;
pub mod persistence;
pub mod sim;

pub use config::{
    load_config_from_env, parse_config_json, ConfigError, PopulationConfig, SimConfig,
    WantedThresholds, WorldConfig, CONFIG_ENV_VAR,
};
pub use persistence::{
    decode_snapshot, encode_snapshot, read_snapshot, validate_snapshot, write_snapshot,
    PersistenceError, SaveSnapshot, SAVE_VERSION,
};
pub use sim::{ActionRejected, GameState};
