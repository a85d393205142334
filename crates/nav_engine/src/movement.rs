use std::fmt;

use tracing::{debug, info, warn};

use crate::config::MovementConfig;
use crate::geometry::{step_toward, Vec2};
use crate::world::NavigationQuery;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementState {
    Idle,
    DirectMove,
    PathFollow,
}

/// What a single [`MovementController::update`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementEvent {
    /// Nothing to do.
    Idle,
    /// No time elapsed; position unchanged.
    Held,
    Moved,
    /// Reached an intermediate waypoint; the index is the one just reached.
    WaypointReached(usize),
    /// Reached the final target. The completion callback has run.
    Arrived,
    /// The proposed step was rejected; the path was recomputed and the agent
    /// keeps trying.
    Blocked,
    /// Movement gave up without reaching the target. The completion callback
    /// was dropped without running.
    Aborted,
}

pub type CompletionCallback = Box<dyn FnOnce()>;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct StuckTracker {
    last_rejected: Option<Vec2>,
    rejections: u32,
}

impl StuckTracker {
    fn reset(&mut self) {
        self.last_rejected = None;
        self.rejections = 0;
    }

    /// Records a rejected position and returns how many consecutive rejections
    /// have landed near the first recorded one.
    fn record(&mut self, rejected: Vec2, radius: f32) -> u32 {
        match self.last_rejected {
            Some(anchor) if anchor.distance(rejected) <= radius => {
                self.rejections = self.rejections.saturating_add(1);
            }
            _ => {
                self.last_rejected = Some(rejected);
                self.rejections = 1;
            }
        }
        self.rejections
    }
}

/// Live movement state of a single agent.
///
/// The controller owns the agent position and advances it once per tick.
/// Path search and collision checks go through the [`NavigationQuery`] passed
/// into each call.
pub struct MovementController {
    position: Vec2,
    facing: Vec2,
    config: MovementConfig,
    state: MovementState,
    direct_target: Option<Vec2>,
    path: Vec<Vec2>,
    waypoint_index: usize,
    /// World revision the current path was searched against; `None` for
    /// caller-supplied paths.
    path_revision: Option<u64>,
    stuck: StuckTracker,
    on_complete: Option<CompletionCallback>,
}

impl fmt::Debug for MovementController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MovementController")
            .field("position", &self.position)
            .field("facing", &self.facing)
            .field("state", &self.state)
            .field("direct_target", &self.direct_target)
            .field("path", &self.path)
            .field("waypoint_index", &self.waypoint_index)
            .field("has_completion_callback", &self.on_complete.is_some())
            .finish_non_exhaustive()
    }
}

impl MovementController {
    pub fn new(position: Vec2, config: MovementConfig) -> Self {
        Self {
            position,
            facing: Vec2::new(0.0, -1.0),
            config,
            state: MovementState::Idle,
            direct_target: None,
            path: Vec::new(),
            waypoint_index: 0,
            path_revision: None,
            stuck: StuckTracker::default(),
            on_complete: None,
        }
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Teleports the agent. Any movement in progress is stopped.
    pub fn set_position(&mut self, position: Vec2) {
        self.stop_movement();
        self.position = position;
    }

    /// Unit vector of the last movement step.
    pub fn facing(&self) -> Vec2 {
        self.facing
    }

    pub fn state(&self) -> MovementState {
        self.state
    }

    pub fn config(&self) -> &MovementConfig {
        &self.config
    }

    pub fn is_moving(&self) -> bool {
        self.state != MovementState::Idle
    }

    pub fn is_following_path(&self) -> bool {
        self.state == MovementState::PathFollow
    }

    pub fn current_path(&self) -> &[Vec2] {
        &self.path
    }

    pub fn waypoint_index(&self) -> usize {
        self.waypoint_index
    }

    pub fn speed(&self) -> f32 {
        self.config.speed
    }

    /// A speed of zero holds the agent in place; movement resumes once the
    /// speed is raised again.
    pub fn set_speed(&mut self, speed: f32) {
        self.config.speed = speed.max(0.0);
    }

    /// Speed the agent is travelling at right now; zero while idle.
    pub fn current_speed(&self) -> f32 {
        if self.is_moving() {
            self.config.speed
        } else {
            0.0
        }
    }

    /// Final point of the current movement, if any.
    pub fn destination(&self) -> Option<Vec2> {
        match self.state {
            MovementState::Idle => None,
            MovementState::DirectMove => self.direct_target,
            MovementState::PathFollow => self.path.last().copied(),
        }
    }

    /// Straight-line distance to [`MovementController::destination`].
    pub fn distance_to_target(&self) -> Option<f32> {
        self.destination()
            .map(|destination| self.position.distance(destination))
    }

    /// Sets the one-shot callback run when the next movement completes.
    pub fn on_movement_complete(&mut self, callback: impl FnOnce() + 'static) {
        self.on_complete = Some(Box::new(callback));
    }

    pub fn has_completion_callback(&self) -> bool {
        self.on_complete.is_some()
    }

    /// Starts moving toward `target`. Returns whether a movement began.
    ///
    /// With `use_pathfinding` the path is computed once, here. If no path is
    /// found the agent falls back to a direct move only when the straight
    /// segment is walkable; otherwise the request is dropped.
    pub fn move_to(
        &mut self,
        target: Vec2,
        use_pathfinding: bool,
        world: &dyn NavigationQuery,
    ) -> bool {
        self.reset_transient();
        let target = if world.is_walkable(target) {
            target
        } else {
            world.find_nearest_walkable_point(target)
        };

        if !use_pathfinding {
            self.begin_direct(target);
            return true;
        }

        match world.find_path(self.position, target) {
            Some(path) if !path.is_empty() => {
                self.begin_path(path, Some(world.revision()));
                true
            }
            _ if world.is_segment_walkable(self.position, target) => {
                debug!(?target, "path_failed_direct_fallback");
                self.begin_direct(target);
                true
            }
            _ => {
                info!(from = ?self.position, ?target, "move_no_path");
                self.abort();
                false
            }
        }
    }

    /// Follows caller-supplied waypoints. An empty list is ignored.
    pub fn move_along_path(&mut self, waypoints: Vec<Vec2>) -> bool {
        if waypoints.is_empty() {
            debug!("move_along_path_empty");
            return false;
        }
        self.reset_transient();
        self.begin_path(waypoints, None);
        true
    }

    /// Forces the agent idle. The completion callback is dropped unrun.
    pub fn stop_movement(&mut self) {
        if self.is_moving() {
            debug!(position = ?self.position, "movement_stopped");
        }
        self.state = MovementState::Idle;
        self.reset_transient();
        self.on_complete = None;
    }

    /// Advances the agent by one tick of `dt` seconds.
    pub fn update(&mut self, dt: f32, world: &dyn NavigationQuery) -> MovementEvent {
        if self.state == MovementState::Idle {
            return MovementEvent::Idle;
        }
        if dt.is_nan() || dt <= 0.0 || self.config.speed <= 0.0 {
            return MovementEvent::Held;
        }

        if self.is_following_path() && self.path_is_stale(world) {
            if let Some(event) = self.recompute_stale_path(world) {
                return event;
            }
        }

        let Some(target) = self.immediate_target() else {
            self.state = MovementState::Idle;
            self.reset_transient();
            return MovementEvent::Idle;
        };

        // Distance is measured fresh each tick; never carried over.
        let distance = self.position.distance(target);
        if distance <= self.config.arrival_threshold {
            return self.arrive_at(target);
        }

        let step = (self.config.speed * dt)
            .max(self.config.min_step)
            .min(distance);
        let (proposed, reached) = step_toward(self.position, target, step);
        // An agent standing on blocked ground steps freely until it is back
        // on walkable ground.
        if !world.is_walkable(proposed) && world.is_walkable(self.position) {
            return self.handle_rejection(proposed, world);
        }

        self.stuck.reset();
        let movement = proposed - self.position;
        if movement.length_squared() > 0.0 {
            self.facing = movement.normalize_or_zero();
        }
        self.position = proposed;

        if reached || self.position.distance(target) <= self.config.arrival_threshold {
            return self.arrive_at(target);
        }
        MovementEvent::Moved
    }

    fn immediate_target(&self) -> Option<Vec2> {
        match self.state {
            MovementState::Idle => None,
            MovementState::DirectMove => self.direct_target,
            MovementState::PathFollow => self.path.get(self.waypoint_index).copied(),
        }
    }

    fn reset_transient(&mut self) {
        self.direct_target = None;
        self.path.clear();
        self.waypoint_index = 0;
        self.path_revision = None;
        self.stuck.reset();
    }

    fn begin_direct(&mut self, target: Vec2) {
        self.state = MovementState::DirectMove;
        self.direct_target = Some(target);
        info!(from = ?self.position, ?target, "direct_move_started");
    }

    fn begin_path(&mut self, path: Vec<Vec2>, revision: Option<u64>) {
        self.install_path(path, revision);
        info!(
            from = ?self.position,
            destination = ?self.path.last(),
            waypoint_count = self.path.len(),
            "path_follow_started"
        );
    }

    /// Replaces the path without touching the stuck tracker or callback.
    fn install_path(&mut self, path: Vec<Vec2>, revision: Option<u64>) {
        self.state = MovementState::PathFollow;
        self.direct_target = None;
        self.path = path;
        self.path_revision = revision;
        self.waypoint_index = 0;
        // Leading waypoints the agent already stands on are skipped; the last
        // one is kept so arrival still fires.
        while self.waypoint_index + 1 < self.path.len()
            && self.position.distance(self.path[self.waypoint_index])
                <= self.config.arrival_threshold
        {
            self.waypoint_index += 1;
        }
    }

    fn arrive_at(&mut self, target: Vec2) -> MovementEvent {
        self.position = target;
        match self.state {
            MovementState::Idle => MovementEvent::Idle,
            MovementState::DirectMove => self.complete(),
            MovementState::PathFollow => {
                let reached = self.waypoint_index;
                self.waypoint_index += 1;
                if self.waypoint_index >= self.path.len() {
                    self.complete()
                } else {
                    debug!(index = reached, "waypoint_reached");
                    MovementEvent::WaypointReached(reached)
                }
            }
        }
    }

    fn complete(&mut self) -> MovementEvent {
        info!(position = ?self.position, "movement_arrived");
        self.state = MovementState::Idle;
        self.reset_transient();
        if let Some(callback) = self.on_complete.take() {
            callback();
        }
        MovementEvent::Arrived
    }

    fn abort(&mut self) -> MovementEvent {
        self.state = MovementState::Idle;
        self.reset_transient();
        self.on_complete = None;
        MovementEvent::Aborted
    }

    fn handle_rejection(&mut self, proposed: Vec2, world: &dyn NavigationQuery) -> MovementEvent {
        if self.state == MovementState::DirectMove {
            info!(position = ?self.position, ?proposed, "direct_move_blocked");
            return self.abort();
        }

        let rejections = self.stuck.record(proposed, self.config.stuck_radius);
        if rejections > self.config.stuck_max_rejections {
            warn!(
                position = ?self.position,
                rejections,
                "movement_stuck_aborted"
            );
            return self.abort();
        }

        let Some(destination) = self.path.last().copied() else {
            return self.abort();
        };
        match world.find_path(self.position, destination) {
            Some(path) if !path.is_empty() => {
                debug!(rejections, waypoint_count = path.len(), "path_recalculated");
                self.install_path(path, Some(world.revision()));
                MovementEvent::Blocked
            }
            _ => {
                info!(position = ?self.position, ?destination, "path_recalculation_failed");
                self.abort()
            }
        }
    }

    fn path_is_stale(&self, world: &dyn NavigationQuery) -> bool {
        matches!(self.path_revision, Some(revision) if revision != world.revision())
    }

    /// Returns an event only when the tick should end here.
    fn recompute_stale_path(&mut self, world: &dyn NavigationQuery) -> Option<MovementEvent> {
        let destination = self.path.last().copied()?;
        match world.find_path(self.position, destination) {
            Some(path) if !path.is_empty() => {
                debug!(revision = world.revision(), "stale_path_recomputed");
                self.install_path(path, Some(world.revision()));
                None
            }
            _ if world.is_segment_walkable(self.position, destination) => {
                debug!(?destination, "stale_path_direct_fallback");
                self.path.clear();
                self.waypoint_index = 0;
                self.path_revision = None;
                self.state = MovementState::DirectMove;
                self.direct_target = Some(destination);
                None
            }
            _ => {
                info!(position = ?self.position, ?destination, "stale_path_unreachable");
                Some(self.abort())
            }
        }
    }
}
