use std::path::PathBuf;
use std::sync::Once;

use scope_sim::{load_sim_config_from_env, SimConfig};

static INIT: Once = Once::new();

pub fn ensure_test_config() {
    INIT.call_once(|| {
        let config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join("test_sim_config.json");

        debug_assert!(
            config_path.exists(),
            "missing test sim config at {}",
            config_path.display()
        );

        std::env::set_var(scope_sim::config::CONFIG_ENV_VAR, &config_path);
    });
}

pub fn test_config() -> SimConfig {
    ensure_test_config();
    load_sim_config_from_env()
}
