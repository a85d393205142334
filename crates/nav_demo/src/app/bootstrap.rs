use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::str::FromStr;

use nav_engine::{load_scene_file, parse_scene_json, SceneDefinition, SceneLoadError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub(crate) const TICKS_PER_SECOND_ENV_VAR: &str = "NAV_DEMO_TPS";
pub(crate) const MAX_TICKS_ENV_VAR: &str = "NAV_DEMO_MAX_TICKS";
const DEFAULT_TICKS_PER_SECOND: u32 = 60;
const DEFAULT_MAX_TICKS: u64 = 3600;

const BUILTIN_SCENE: &str = include_str!("../../../../assets/scenes/demo.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LoopConfig {
    pub(crate) ticks_per_second: u32,
    pub(crate) max_ticks: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            ticks_per_second: DEFAULT_TICKS_PER_SECOND,
            max_ticks: DEFAULT_MAX_TICKS,
        }
    }
}

impl LoopConfig {
    pub(crate) fn fixed_dt_seconds(&self) -> f32 {
        1.0 / self.ticks_per_second as f32
    }
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: SceneDefinition,
}

/// Resolves the loop config and loads the scene named by the first argument,
/// or the built-in storeroom scene when none is given.
pub(crate) fn build_app(
    mut args: impl Iterator<Item = OsString>,
) -> Result<AppWiring, SceneLoadError> {
    info!("=== Nav Demo Startup ===");

    let scene = match args.next().map(PathBuf::from) {
        Some(path) => load_scene_file(&path)?,
        None => {
            info!("no scene path given; using built-in scene");
            builtin_scene()?
        }
    };
    let config = resolve_loop_config();
    info!(
        scene = scene.name.as_str(),
        ticks_per_second = config.ticks_per_second,
        max_ticks = config.max_ticks,
        "app_wired"
    );

    Ok(AppWiring { config, scene })
}

pub(crate) fn builtin_scene() -> Result<SceneDefinition, SceneLoadError> {
    parse_scene_json(BUILTIN_SCENE)
}

pub(crate) fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn resolve_loop_config() -> LoopConfig {
    let defaults = LoopConfig::default();
    let ticks_per_second = parse_env_override(
        TICKS_PER_SECOND_ENV_VAR,
        env::var(TICKS_PER_SECOND_ENV_VAR),
        defaults.ticks_per_second,
    );
    let max_ticks = parse_env_override(
        MAX_TICKS_ENV_VAR,
        env::var(MAX_TICKS_ENV_VAR),
        defaults.max_ticks,
    );
    LoopConfig {
        ticks_per_second: if ticks_per_second == 0 {
            warn!(
                env_var = TICKS_PER_SECOND_ENV_VAR,
                "tick rate must be positive; falling back to default"
            );
            defaults.ticks_per_second
        } else {
            ticks_per_second
        },
        max_ticks,
    }
}

fn parse_env_override<T: FromStr + Copy>(
    env_var: &str,
    lookup: Result<String, env::VarError>,
    default: T,
) -> T {
    match lookup {
        Ok(value) => match value.trim().parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(
                    env_var,
                    value = value.as_str(),
                    "invalid env var value; falling back to default"
                );
                default
            }
        },
        Err(env::VarError::NotPresent) => default,
        Err(err) => {
            warn!(
                env_var,
                error = %err,
                "unable to read env var; falling back to default"
            );
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_override_parses_valid_values() {
        let parsed = parse_env_override(TICKS_PER_SECOND_ENV_VAR, Ok(" 120 ".to_string()), 60u32);
        assert_eq!(parsed, 120);
    }

    #[test]
    fn env_override_falls_back_on_garbage_or_absence() {
        assert_eq!(
            parse_env_override(MAX_TICKS_ENV_VAR, Ok("lots".to_string()), 3600u64),
            3600
        );
        assert_eq!(
            parse_env_override(MAX_TICKS_ENV_VAR, Err(env::VarError::NotPresent), 3600u64),
            3600
        );
        assert_eq!(
            parse_env_override(
                MAX_TICKS_ENV_VAR,
                Err(env::VarError::NotUnicode(OsString::from("x"))),
                7u64
            ),
            7
        );
    }

    #[test]
    fn builtin_scene_parses() {
        let scene = builtin_scene().expect("built-in scene");
        assert_eq!(scene.name, "storeroom");
        assert_eq!(scene.commands.len(), 4);
        assert!(scene.agent.is_some());
    }

    #[test]
    fn build_app_without_args_uses_builtin_scene() {
        let wiring = build_app(std::iter::empty()).expect("wiring");
        assert_eq!(wiring.scene.name, "storeroom");
        assert!(wiring.config.ticks_per_second > 0);
    }

    #[test]
    fn build_app_reports_missing_scene_file() {
        let args = vec![OsString::from("/definitely/not/here/scene.json")];
        assert!(matches!(
            build_app(args.into_iter()),
            Err(SceneLoadError::ReadFile { .. })
        ));
    }

    #[test]
    fn fixed_dt_matches_tick_rate() {
        let config = LoopConfig {
            ticks_per_second: 50,
            max_ticks: 10,
        };
        assert!((config.fixed_dt_seconds() - 0.02).abs() < f32::EPSILON);
    }
}
