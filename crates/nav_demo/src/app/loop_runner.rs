use std::cell::Cell;
use std::collections::VecDeque;
use std::process::ExitCode;
use std::rc::Rc;

use nav_engine::{
    MoveCommandDef, MovementController, MovementEvent, NavWorld, SceneDefinition, Vec2,
};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::bootstrap::{AppWiring, LoopConfig};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct RunSummary {
    pub(crate) scene: String,
    pub(crate) ticks: u64,
    pub(crate) commands_issued: u32,
    pub(crate) commands_completed: u32,
    pub(crate) commands_failed: u32,
    pub(crate) final_position: [f32; 2],
    pub(crate) tick_budget_exhausted: bool,
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let Some(summary) = run_scene(&app.scene, app.config) else {
        error!(scene = app.scene.name.as_str(), "scene_has_no_agent");
        return ExitCode::FAILURE;
    };

    match serde_json::to_string(&summary) {
        Ok(json) => println!("{json}"),
        Err(err) => warn!(error = %err, "summary_encode_failed"),
    }
    if summary.tick_budget_exhausted {
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// Drives the scene agent through every scripted command on a fixed step.
/// Returns `None` when the scene defines no agent.
pub(crate) fn run_scene(scene: &SceneDefinition, config: LoopConfig) -> Option<RunSummary> {
    let mut agent = scene.spawn_agent()?;
    let world = scene.build_world();
    let dt = config.fixed_dt_seconds();
    let completed = Rc::new(Cell::new(0u32));
    let mut pending: VecDeque<&MoveCommandDef> = scene.commands.iter().collect();

    let mut summary = RunSummary {
        scene: scene.name.clone(),
        ticks: 0,
        commands_issued: 0,
        commands_completed: 0,
        commands_failed: 0,
        final_position: [0.0, 0.0],
        tick_budget_exhausted: false,
    };

    info!(
        scene = scene.name.as_str(),
        commands = pending.len(),
        dt_seconds = dt,
        "run_started"
    );

    loop {
        if !agent.is_moving()
            && !issue_next(&mut agent, &world, &mut pending, &completed, &mut summary)
        {
            break;
        }
        if summary.ticks >= config.max_ticks {
            warn!(
                ticks = summary.ticks,
                position = ?agent.position(),
                "tick_budget_exhausted"
            );
            summary.tick_budget_exhausted = true;
            break;
        }

        summary.ticks += 1;
        match agent.update(dt, &world) {
            MovementEvent::WaypointReached(index) => {
                debug!(
                    tick = summary.ticks,
                    index,
                    position = ?agent.position(),
                    "waypoint_reached"
                );
            }
            MovementEvent::Arrived => {
                info!(tick = summary.ticks, position = ?agent.position(), "command_arrived");
            }
            MovementEvent::Blocked => {
                debug!(tick = summary.ticks, position = ?agent.position(), "step_blocked");
            }
            MovementEvent::Aborted => {
                warn!(tick = summary.ticks, position = ?agent.position(), "command_aborted");
                summary.commands_failed += 1;
            }
            MovementEvent::Idle | MovementEvent::Held | MovementEvent::Moved => {}
        }
    }

    summary.commands_completed = completed.get();
    let position = agent.position();
    summary.final_position = [position.x, position.y];
    info!(
        ticks = summary.ticks,
        issued = summary.commands_issued,
        completed = summary.commands_completed,
        failed = summary.commands_failed,
        "run_finished"
    );
    Some(summary)
}

/// Starts the next command that the agent accepts. Returns `false` once the
/// queue is drained.
fn issue_next(
    agent: &mut MovementController,
    world: &NavWorld,
    pending: &mut VecDeque<&MoveCommandDef>,
    completed: &Rc<Cell<u32>>,
    summary: &mut RunSummary,
) -> bool {
    while let Some(command) = pending.pop_front() {
        summary.commands_issued += 1;
        let handle = Rc::clone(completed);
        agent.on_movement_complete(move || handle.set(handle.get() + 1));

        let started = match command {
            MoveCommandDef::MoveTo {
                target,
                pathfinding,
            } => agent.move_to(Vec2::new(target[0], target[1]), *pathfinding, world),
            MoveCommandDef::FollowPath { .. } => agent.move_along_path(command.waypoints()),
        };
        if started {
            debug!(command = summary.commands_issued, "command_started");
            return true;
        }
        warn!(command = summary.commands_issued, ?command, "command_rejected");
        summary.commands_failed += 1;
    }
    false
}
