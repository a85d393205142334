use std::fs;
use std::path::Path;

use tracing::info;

use super::types::{SceneDefinition, SceneLoadError};

pub fn load_scene_file(path: &Path) -> Result<SceneDefinition, SceneLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| SceneLoadError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let scene = parse_scene_json(&raw)?;
    info!(
        path = %path.display(),
        scene = scene.name.as_str(),
        regions = scene.regions.len(),
        commands = scene.commands.len(),
        "scene_loaded"
    );
    Ok(scene)
}

/// Parses and validates a scene. Parse errors name the JSON path of the
/// offending value.
pub fn parse_scene_json(raw: &str) -> Result<SceneDefinition, SceneLoadError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let scene = serde_path_to_error::deserialize::<_, SceneDefinition>(&mut deserializer)
        .map_err(|error| {
            let location = error.path().to_string();
            SceneLoadError::Parse {
                location: if location.is_empty() {
                    ".".to_string()
                } else {
                    location
                },
                source: error.into_inner(),
            }
        })?;
    scene.validate()?;
    Ok(scene)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::content::MoveCommandDef;
    use crate::geometry::Vec2;
    use crate::pathfinding::DiagonalPolicy;
    use crate::world::NavigationQuery;

    const ROOM_SCENE: &str = r#"{
        "name": "room",
        "world_width": 320,
        "world_height": 320,
        "navigation": { "cell_size": 16, "diagonal_policy": "require_both_flanks_open" },
        "regions": [
            { "id": "floor", "vertices": [[0,0],[320,0],[320,320],[0,320]] },
            { "id": "table", "walkable": false, "vertices": [[100,100],[140,100],[140,140],[100,140]] }
        ],
        "agent": {
            "position": [16, 16],
            "footprint": { "width": 24, "height": 48, "scale": 0.5 },
            "movement": { "speed": 90 }
        },
        "commands": [
            { "target": [300, 300] },
            { "target": [20, 300], "pathfinding": false },
            { "path": [[20, 300], [20, 20]] }
        ]
    }"#;

    #[test]
    fn parses_full_scene() {
        let scene = parse_scene_json(ROOM_SCENE).expect("scene");
        assert_eq!(scene.name, "room");
        assert_eq!(scene.navigation.cell_size, 16.0);
        assert_eq!(
            scene.navigation.diagonal_policy,
            DiagonalPolicy::RequireBothFlanksOpen
        );
        assert!(scene.regions[0].walkable);
        assert!(!scene.regions[1].walkable);
        assert_eq!(
            scene.commands[0],
            MoveCommandDef::MoveTo {
                target: [300.0, 300.0],
                pathfinding: true
            }
        );
        assert_eq!(
            scene.commands[2],
            MoveCommandDef::FollowPath {
                path: vec![[20.0, 300.0], [20.0, 20.0]]
            }
        );

        let world = scene.build_world();
        assert_eq!(world.agent_radius(), 6.0);
        assert!(!world.is_walkable(Vec2::new(120.0, 120.0)));

        let agent = scene.spawn_agent().expect("agent");
        assert_eq!(agent.position(), Vec2::new(16.0, 16.0));
        assert_eq!(agent.speed(), 90.0);
        assert_eq!(agent.config().arrival_threshold, 2.0);
    }

    #[test]
    fn parse_error_reports_json_path() {
        let raw = r#"{ "world_width": 10, "world_height": 10,
            "regions": [ { "id": "a", "vertices": [[0, "x"]] } ] }"#;
        let err = parse_scene_json(raw).expect_err("bad vertex");
        match err {
            SceneLoadError::Parse { location, .. } => {
                assert!(location.starts_with("regions[0].vertices"), "{location}");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn validation_rejects_duplicate_region_ids() {
        let raw = r#"{ "world_width": 10, "world_height": 10,
            "regions": [
                { "id": "a", "vertices": [] },
                { "id": "a", "vertices": [] }
            ] }"#;
        let err = parse_scene_json(raw).expect_err("duplicate");
        assert!(err.to_string().contains("duplicate region id 'a'"), "{err}");
    }

    #[test]
    fn validation_rejects_non_positive_sizes() {
        let raw = r#"{ "world_width": 0, "world_height": 10 }"#;
        assert!(matches!(
            parse_scene_json(raw),
            Err(SceneLoadError::Invalid { field, .. }) if field == "world_width"
        ));

        let raw = r#"{ "world_width": 10, "world_height": 10, "navigation": { "cell_size": -1 } }"#;
        assert!(matches!(
            parse_scene_json(raw),
            Err(SceneLoadError::Invalid { field, .. }) if field == "navigation.cell_size"
        ));
    }

    #[test]
    fn validation_rejects_grids_above_the_cell_limit() {
        let raw = r#"{ "world_width": 100000, "world_height": 100000,
            "navigation": { "cell_size": 1 } }"#;
        let err = parse_scene_json(raw).expect_err("too many cells");
        assert!(matches!(
            &err,
            SceneLoadError::Invalid { field, .. } if field == "navigation.cell_size"
        ));
        assert!(err.to_string().contains("maximum"), "{err}");

        let raw = r#"{ "world_width": 2000, "world_height": 2000,
            "navigation": { "cell_size": 1 } }"#;
        assert!(parse_scene_json(raw).is_ok());
    }

    #[test]
    fn load_scene_file_reads_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("room.json");
        let mut file = std::fs::File::create(&path).expect("create");
        file.write_all(ROOM_SCENE.as_bytes()).expect("write");
        drop(file);

        let scene = load_scene_file(&path).expect("load");
        assert_eq!(scene.regions.len(), 2);

        let missing = dir.path().join("missing.json");
        assert!(matches!(
            load_scene_file(&missing),
            Err(SceneLoadError::ReadFile { .. })
        ));
    }
}
