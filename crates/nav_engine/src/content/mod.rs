mod scene_file;
mod types;

pub use scene_file::{load_scene_file, parse_scene_json};
pub use types::{AgentDef, MoveCommandDef, RegionDef, SceneDefinition, SceneLoadError};
