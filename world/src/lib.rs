#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for the Tilerunner kernel.
//!
//! The world owns the tile map, the fixed entity roster, and the game
//! outcome. All mutation flows through [`apply`]; every `Command::Step`
//! executes exactly one fixed physics sub-step: integration, axis-separated
//! collision resolution (y before x), contact settlement, and the win/lose
//! check. Systems and adapters observe the world through the read-only
//! functions in [`query`].

mod collision;
mod map;

pub use map::TileMap;

use collision::{resolve_axis, Aabb, Axis};
use tilerunner_core::{
    AiState, Behavior, Command, ContactFlags, EnemyKind, EntityId, EntityKind, EntitySnapshot,
    Event, Facing, GameResult, Side, Vec2,
};

const DEFAULT_MAP_COLUMNS: u32 = 14;
const DEFAULT_MAP_ROWS: u32 = 5;
const DEFAULT_TILE_SIZE: f32 = 0.5;

const GRAVITY: Vec2 = Vec2::new(0.0, -4.905);

const PLAYER_SPEED: f32 = 3.0;
const PLAYER_JUMP_POWER: f32 = 3.0;
const PLAYER_HALF_EXTENTS: Vec2 = Vec2::new(0.45, 0.45);

const ENEMY_SPEED: f32 = 1.0;
const ENEMY_HALF_EXTENTS: Vec2 = Vec2::new(0.5, 0.5);

const BULLET_SPEED: f32 = 4.0;
const BULLET_HALF_EXTENTS: Vec2 = Vec2::new(0.125, 0.125);

/// Axis-aligned rectangle the player must stay inside.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayRegion {
    min: Vec2,
    max: Vec2,
}

impl PlayRegion {
    /// Creates a region from its lower-left and upper-right corners.
    #[must_use]
    pub const fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Lower-left corner of the region.
    #[must_use]
    pub const fn min(&self) -> Vec2 {
        self.min
    }

    /// Upper-right corner of the region.
    #[must_use]
    pub const fn max(&self) -> Vec2 {
        self.max
    }

    /// Reports whether the point lies inside the region.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }
}

#[derive(Clone, Debug)]
struct Entity {
    id: EntityId,
    kind: EntityKind,
    behavior: Option<Behavior>,
    ai_state: AiState,
    position: Vec2,
    velocity: Vec2,
    acceleration: Vec2,
    intent: Vec2,
    speed: f32,
    jump_power: f32,
    half_extents: Vec2,
    facing: Facing,
    contacts: ContactFlags,
    map_contacts: ContactFlags,
    active: bool,
}

impl Entity {
    fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            id: self.id,
            kind: self.kind,
            position: self.position,
            velocity: self.velocity,
            half_extents: self.half_extents,
            facing: self.facing,
            behavior: self.behavior,
            ai_state: self.ai_state,
            active: self.active,
            contacts: self.contacts,
            map_contacts: self.map_contacts,
        }
    }

    fn is_bullet(&self) -> bool {
        matches!(self.behavior, Some(Behavior::Bullet { .. }))
    }
}

#[derive(Clone, Copy, Debug)]
struct ContactRecord {
    mover: usize,
    obstacle: usize,
    /// Side of the mover that made contact.
    side: Side,
}

#[derive(Clone, Copy, Debug)]
struct Obstacle {
    index: usize,
    aabb: Aabb,
}

/// Represents the authoritative Tilerunner world state.
#[derive(Debug)]
pub struct World {
    map: TileMap,
    region: PlayRegion,
    entities: Vec<Entity>,
    player: Option<EntityId>,
    next_id: u32,
    result: GameResult,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Creates a new world with an empty default map and no entities.
    #[must_use]
    pub fn new() -> Self {
        Self {
            map: TileMap::empty(DEFAULT_MAP_COLUMNS, DEFAULT_MAP_ROWS, DEFAULT_TILE_SIZE),
            region: PlayRegion::new(Vec2::new(-100.0, -100.0), Vec2::new(100.0, 100.0)),
            entities: Vec::new(),
            player: None,
            next_id: 0,
            result: GameResult::InProgress,
        }
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    fn entity_index(&self, id: EntityId) -> Option<usize> {
        self.entities.iter().position(|entity| entity.id == id)
    }

    fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|entity| entity.id == id)
    }

    fn player_index(&self) -> Option<usize> {
        self.player.and_then(|id| self.entity_index(id))
    }

    fn spawn_player(&mut self, position: Vec2, out_events: &mut Vec<Event>) {
        if let Some(index) = self.player_index() {
            let _ = self.entities.remove(index);
        }

        let id = self.allocate_id();
        self.entities.push(Entity {
            id,
            kind: EntityKind::Player,
            behavior: None,
            ai_state: AiState::Idle,
            position,
            velocity: Vec2::ZERO,
            acceleration: GRAVITY,
            intent: Vec2::ZERO,
            speed: PLAYER_SPEED,
            jump_power: PLAYER_JUMP_POWER,
            half_extents: PLAYER_HALF_EXTENTS,
            facing: Facing::Right,
            contacts: ContactFlags::default(),
            map_contacts: ContactFlags::default(),
            active: true,
        });
        self.player = Some(id);
        out_events.push(Event::EntitySpawned {
            entity: id,
            kind: EntityKind::Player,
        });
    }

    fn spawn_platform(&mut self, position: Vec2, half_extents: Vec2, out_events: &mut Vec<Event>) {
        let id = self.allocate_id();
        self.entities.push(Entity {
            id,
            kind: EntityKind::Platform,
            behavior: None,
            ai_state: AiState::Idle,
            position,
            velocity: Vec2::ZERO,
            acceleration: Vec2::ZERO,
            intent: Vec2::ZERO,
            speed: 0.0,
            jump_power: 0.0,
            half_extents,
            facing: Facing::Right,
            contacts: ContactFlags::default(),
            map_contacts: ContactFlags::default(),
            active: true,
        });
        out_events.push(Event::EntitySpawned {
            entity: id,
            kind: EntityKind::Platform,
        });
    }

    fn spawn_enemy(&mut self, kind: EnemyKind, position: Vec2, out_events: &mut Vec<Event>) {
        let id = self.allocate_id();

        let (behavior, ai_state, acceleration, speed) = match kind {
            EnemyKind::Walker => (Behavior::Walker, AiState::Walking, GRAVITY, ENEMY_SPEED),
            EnemyKind::Guard => (Behavior::Guard, AiState::Idle, GRAVITY, ENEMY_SPEED),
            EnemyKind::Flyer => (
                Behavior::Flyer { anchor: position },
                AiState::Walking,
                Vec2::ZERO,
                ENEMY_SPEED,
            ),
            EnemyKind::Shooter => {
                // The bullet is allocated together with its shooter so the
                // ownership link is explicit on both ends. `next_id` already
                // points past the shooter, so it names the bullet allocation.
                let bullet = EntityId::new(self.next_id);
                (Behavior::Shooter { bullet }, AiState::Idle, GRAVITY, 0.0)
            }
        };

        self.entities.push(Entity {
            id,
            kind: EntityKind::Enemy,
            behavior: Some(behavior),
            ai_state,
            position,
            velocity: Vec2::ZERO,
            acceleration,
            intent: Vec2::ZERO,
            speed,
            jump_power: 0.0,
            half_extents: ENEMY_HALF_EXTENTS,
            facing: Facing::Left,
            contacts: ContactFlags::default(),
            map_contacts: ContactFlags::default(),
            active: true,
        });
        out_events.push(Event::EntitySpawned {
            entity: id,
            kind: EntityKind::Enemy,
        });

        if kind == EnemyKind::Shooter {
            let bullet_id = self.allocate_id();
            self.entities.push(Entity {
                id: bullet_id,
                kind: EntityKind::Enemy,
                behavior: Some(Behavior::Bullet { owner: id }),
                ai_state: AiState::Idle,
                position,
                velocity: Vec2::ZERO,
                acceleration: Vec2::ZERO,
                intent: Vec2::ZERO,
                speed: 0.0,
                jump_power: 0.0,
                half_extents: BULLET_HALF_EXTENTS,
                facing: Facing::Left,
                contacts: ContactFlags::default(),
                map_contacts: ContactFlags::default(),
                active: false,
            });
            out_events.push(Event::EntitySpawned {
                entity: bullet_id,
                kind: EntityKind::Enemy,
            });
        }
    }

    fn fire(&mut self, shooter: EntityId, out_events: &mut Vec<Event>) {
        let player_x = self
            .player_index()
            .filter(|&index| self.entities[index].active)
            .map(|index| self.entities[index].position.x);

        let Some(shooter_index) = self.entity_index(shooter) else {
            return;
        };
        let shooter_entity = &self.entities[shooter_index];
        if !shooter_entity.active {
            return;
        }
        let Some(Behavior::Shooter { bullet }) = shooter_entity.behavior else {
            return;
        };
        let origin = shooter_entity.position;
        let fallback = shooter_entity.facing;

        let Some(bullet_index) = self.entity_index(bullet) else {
            return;
        };
        let bullet_entity = &mut self.entities[bullet_index];
        if bullet_entity.active {
            // Still in flight; a shooter owns a single bullet at a time.
            return;
        }

        let facing = match player_x {
            Some(x) if x < origin.x => Facing::Left,
            Some(_) => Facing::Right,
            None => fallback,
        };

        bullet_entity.active = true;
        bullet_entity.position = origin;
        bullet_entity.velocity = Vec2::new(BULLET_SPEED * facing.sign(), 0.0);
        bullet_entity.facing = facing;
        bullet_entity.ai_state = AiState::Attacking;
        bullet_entity.contacts.clear();
        bullet_entity.map_contacts.clear();

        out_events.push(Event::BulletFired { shooter, bullet });
    }

    fn request_jump(&mut self, entity: EntityId, out_events: &mut Vec<Event>) {
        if let Some(entity) = self.entity_mut(entity) {
            // Standing on a platform entity supports a jump the same as
            // standing on a map tile.
            let grounded = entity.map_contacts.bottom || entity.contacts.bottom;
            if entity.active && grounded && entity.jump_power > 0.0 {
                entity.velocity.y = entity.jump_power;
                out_events.push(Event::EntityJumped { entity: entity.id });
            }
        }
    }

    fn step(&mut self, dt: std::time::Duration, out_events: &mut Vec<Event>) {
        let dt_secs = dt.as_secs_f32();

        self.expire_orphan_bullets(out_events);

        // Flags from the previous sub-step are cleared for every entity up
        // front, so a flag set on an obstacle by an earlier mover survives
        // the obstacle's own step and both parties of a contact report it.
        for entity in &mut self.entities {
            entity.contacts.clear();
            entity.map_contacts.clear();
        }

        let mut order: Vec<usize> = (0..self.entities.len())
            .filter(|&index| {
                let entity = &self.entities[index];
                entity.active && entity.kind != EntityKind::Platform
            })
            .collect();
        order.sort_by_key(|&index| self.entities[index].id);

        let mut contacts: Vec<ContactRecord> = Vec::new();
        let mut cell_scratch: Vec<Vec2> = Vec::new();
        for index in order {
            self.step_entity(index, dt_secs, &mut contacts, &mut cell_scratch);
        }

        self.settle_contacts(&contacts, out_events);
        self.expire_spent_bullets(out_events);

        out_events.push(Event::Stepped { dt });
        self.check_outcome(out_events);
    }

    fn step_entity(
        &mut self,
        index: usize,
        dt: f32,
        contacts: &mut Vec<ContactRecord>,
        cell_scratch: &mut Vec<Vec2>,
    ) {
        let obstacles = self.obstacles_for(index);
        let mut touched: Vec<(usize, Side)> = Vec::new();

        {
            let Self { entities, map, .. } = self;
            let entity = &mut entities[index];
            let tile_half = Vec2::splat(map.tile_size() * 0.5);
            // Flyers ignore terrain entirely along with gravity.
            let resolves_map = !matches!(entity.behavior, Some(Behavior::Flyer { .. }));

            entity.velocity += entity.acceleration * dt;
            let effective = entity.intent * entity.speed + entity.velocity;

            for axis in [Axis::Y, Axis::X] {
                match axis {
                    Axis::Y => entity.position.y += effective.y * dt,
                    Axis::X => entity.position.x += effective.x * dt,
                }

                for obstacle in &obstacles {
                    if let Some(side) = resolve_axis(
                        &mut entity.position,
                        entity.half_extents,
                        &mut entity.velocity,
                        &obstacle.aabb,
                        axis,
                    ) {
                        entity.contacts.set(side);
                        touched.push((obstacle.index, side));
                    }
                }

                if !resolves_map {
                    continue;
                }

                map.solid_cells_overlapping(entity.position, entity.half_extents, cell_scratch);
                for center in cell_scratch.iter().copied() {
                    let cell = Aabb::new(center, tile_half);
                    if let Some(side) = resolve_axis(
                        &mut entity.position,
                        entity.half_extents,
                        &mut entity.velocity,
                        &cell,
                        axis,
                    ) {
                        entity.map_contacts.set(side);
                    }
                }
            }

            entity.intent = Vec2::ZERO;
        }

        for (obstacle_index, side) in touched {
            self.entities[obstacle_index].contacts.set(side.opposite());
            contacts.push(ContactRecord {
                mover: index,
                obstacle: obstacle_index,
                side,
            });
        }
    }

    fn obstacles_for(&self, index: usize) -> Vec<Obstacle> {
        let mover = &self.entities[index];
        let blocks = |other: &Entity| -> bool {
            match (mover.kind, mover.behavior) {
                (EntityKind::Player, _) => {
                    matches!(other.kind, EntityKind::Platform | EntityKind::Enemy)
                }
                (EntityKind::Enemy, Some(Behavior::Bullet { .. })) => {
                    other.kind == EntityKind::Player
                }
                (EntityKind::Enemy, Some(Behavior::Flyer { .. })) => false,
                (EntityKind::Enemy, _) => other.kind == EntityKind::Platform,
                (EntityKind::Platform, _) => false,
            }
        };

        self.entities
            .iter()
            .enumerate()
            .filter(|(other_index, other)| *other_index != index && other.active && blocks(other))
            .map(|(other_index, other)| Obstacle {
                index: other_index,
                aabb: Aabb::new(other.position, other.half_extents),
            })
            .collect()
    }

    fn settle_contacts(&mut self, contacts: &[ContactRecord], out_events: &mut Vec<Event>) {
        for record in contacts {
            let mover_kind = self.entities[record.mover].kind;
            let mover_is_bullet = self.entities[record.mover].is_bullet();
            let obstacle_kind = self.entities[record.obstacle].kind;

            if mover_kind == EntityKind::Player && obstacle_kind == EntityKind::Enemy {
                // Stomp-vs-hit disambiguation: the player's bottom-side
                // contact against this specific enemy kills the enemy; any
                // other side hurts the player.
                if record.side == Side::Bottom {
                    self.defeat_enemy(record.obstacle, out_events);
                } else {
                    self.hurt_player(out_events);
                }
            } else if mover_is_bullet && obstacle_kind == EntityKind::Player {
                if record.side == Side::Top {
                    self.defeat_enemy(record.mover, out_events);
                } else {
                    self.hurt_player(out_events);
                    self.spend_bullet(record.mover, out_events);
                }
            }
        }
    }

    fn defeat_enemy(&mut self, index: usize, out_events: &mut Vec<Event>) {
        let entity = &mut self.entities[index];
        if entity.active {
            entity.active = false;
            out_events.push(Event::EnemyDefeated { entity: entity.id });
        }
    }

    fn hurt_player(&mut self, out_events: &mut Vec<Event>) {
        if let Some(index) = self.player_index() {
            let entity = &mut self.entities[index];
            if entity.active {
                entity.active = false;
                out_events.push(Event::PlayerDefeated);
            }
        }
    }

    fn spend_bullet(&mut self, index: usize, out_events: &mut Vec<Event>) {
        let entity = &mut self.entities[index];
        if entity.active {
            entity.active = false;
            out_events.push(Event::BulletSpent { bullet: entity.id });
        }
    }

    fn expire_orphan_bullets(&mut self, out_events: &mut Vec<Event>) {
        let orphans: Vec<usize> = self
            .entities
            .iter()
            .enumerate()
            .filter_map(|(index, entity)| match entity.behavior {
                Some(Behavior::Bullet { owner }) if entity.active => Some((index, owner)),
                _ => None,
            })
            .filter(|&(_, owner)| {
                self.entity_index(owner)
                    .map_or(true, |owner_index| !self.entities[owner_index].active)
            })
            .map(|(index, _)| index)
            .collect();

        for index in orphans {
            self.spend_bullet(index, out_events);
        }
    }

    fn expire_spent_bullets(&mut self, out_events: &mut Vec<Event>) {
        let spent: Vec<usize> = self
            .entities
            .iter()
            .enumerate()
            .filter(|(_, entity)| entity.active && entity.is_bullet() && entity.map_contacts.any())
            .map(|(index, _)| index)
            .collect();

        for index in spent {
            self.spend_bullet(index, out_events);
        }
    }

    fn check_outcome(&mut self, out_events: &mut Vec<Event>) {
        if self.result != GameResult::InProgress {
            return;
        }
        let Some(player_index) = self.player_index() else {
            return;
        };

        let player = &self.entities[player_index];
        let lost = !player.active || !self.region.contains(player.position);

        let result = if lost {
            GameResult::Lost
        } else if self.active_enemy_count() == 0 {
            GameResult::Won
        } else {
            return;
        };

        self.result = result;
        out_events.push(Event::GameEnded { result });
    }

    fn active_enemy_count(&self) -> usize {
        self.entities
            .iter()
            .filter(|entity| entity.active && entity.kind == EntityKind::Enemy)
            .count()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureTileMap {
            columns,
            rows,
            tile_size,
            tiles,
        } => match TileMap::build(columns, rows, tile_size, tiles) {
            Ok(map) => {
                world.map = map;
                out_events.push(Event::TileMapConfigured {
                    columns,
                    rows,
                    tile_size,
                });
            }
            Err(reason) => out_events.push(Event::TileMapRejected { reason }),
        },
        Command::SetPlayableRegion { min, max } => {
            world.region = PlayRegion::new(min, max);
        }
        Command::SpawnPlayer { position } => world.spawn_player(position, out_events),
        Command::SpawnPlatform {
            position,
            half_extents,
        } => world.spawn_platform(position, half_extents, out_events),
        Command::SpawnEnemy { kind, position } => world.spawn_enemy(kind, position, out_events),
        Command::SetMovementIntent { entity, intent } => {
            if let Some(entity) = world.entity_mut(entity) {
                if entity.active {
                    entity.intent = intent;
                }
            }
        }
        Command::SetFacing { entity, facing } => {
            if let Some(entity) = world.entity_mut(entity) {
                if entity.active {
                    entity.facing = facing;
                }
            }
        }
        Command::SetAiState { entity, state } => {
            if let Some(entity) = world.entity_mut(entity) {
                if entity.active {
                    entity.ai_state = state;
                }
            }
        }
        Command::RequestJump { entity } => world.request_jump(entity, out_events),
        Command::Fire { shooter } => world.fire(shooter, out_events),
        Command::Step { dt } => {
            if world.result == GameResult::InProgress {
                world.step(dt, out_events);
            }
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use super::{PlayRegion, World};
    use tilerunner_core::{EntityId, EntityView, GameResult, TileMapView};

    /// Captures a read-only view over the tile map.
    #[must_use]
    pub fn tile_map_view(world: &World) -> TileMapView<'_> {
        world.map.view()
    }

    /// Captures a read-only view of all entities, sorted by identifier.
    #[must_use]
    pub fn entity_view(world: &World) -> EntityView {
        EntityView::from_snapshots(world.entities.iter().map(super::Entity::snapshot).collect())
    }

    /// Identifier of the player entity, if one was spawned.
    #[must_use]
    pub fn player_id(world: &World) -> Option<EntityId> {
        world.player
    }

    /// Current outcome of the session.
    #[must_use]
    pub fn game_result(world: &World) -> GameResult {
        world.result
    }

    /// Rectangle the player must stay inside.
    #[must_use]
    pub fn playable_region(world: &World) -> PlayRegion {
        world.region
    }

    /// Number of active entities classified as enemies, bullets included.
    #[must_use]
    pub fn active_enemy_count(world: &World) -> usize {
        world.active_enemy_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tilerunner_core::TileCode;

    const STEP: Duration = Duration::from_micros(16_667);

    fn floor_map() -> Command {
        // 6x4 grid with a solid floor along the bottom row.
        let mut tiles = vec![TileCode::EMPTY; 18];
        tiles.extend(std::iter::repeat(TileCode::new(1)).take(6));
        Command::ConfigureTileMap {
            columns: 6,
            rows: 4,
            tile_size: 1.0,
            tiles,
        }
    }

    fn step_world(world: &mut World, events: &mut Vec<Event>) {
        apply(world, Command::Step { dt: STEP }, events);
    }

    fn settle_on_floor(world: &mut World, events: &mut Vec<Event>) {
        // Enough sub-steps for spawned entities to fall onto the floor row.
        for _ in 0..120 {
            step_world(world, events);
        }
    }

    fn spawn_player_at(world: &mut World, x: f32, y: f32) -> EntityId {
        let mut events = Vec::new();
        apply(
            world,
            Command::SpawnPlayer {
                position: Vec2::new(x, y),
            },
            &mut events,
        );
        query::player_id(world).expect("player id")
    }

    // Keeps the session in progress; a world without active enemies would
    // resolve to a win on the first sub-step and freeze.
    fn spawn_distant_walker(world: &mut World) {
        let mut events = Vec::new();
        apply(
            world,
            Command::SpawnEnemy {
                kind: EnemyKind::Walker,
                position: Vec2::new(100.0, 100.0),
            },
            &mut events,
        );
    }

    #[test]
    fn rejected_map_leaves_previous_map_installed() {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(&mut world, floor_map(), &mut events);
        assert!(matches!(events[0], Event::TileMapConfigured { .. }));

        events.clear();
        apply(
            &mut world,
            Command::ConfigureTileMap {
                columns: 2,
                rows: 2,
                tile_size: 1.0,
                tiles: vec![TileCode::new(999); 4],
            },
            &mut events,
        );

        assert_eq!(
            events,
            vec![Event::TileMapRejected {
                reason: tilerunner_core::MapError::UnknownTileCode { code: 999, index: 0 }
            }]
        );
        assert_eq!(query::tile_map_view(&world).dimensions(), (6, 4));
    }

    #[test]
    fn player_settles_on_floor_without_overlap() {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(&mut world, floor_map(), &mut events);
        spawn_distant_walker(&mut world);
        let player = spawn_player_at(&mut world, 2.0, -1.0);
        settle_on_floor(&mut world, &mut events);

        let view = query::entity_view(&world);
        let snapshot = view.get(player).expect("player snapshot");

        // Floor row spans y in [-4, -3]; resting on it puts the player's
        // bottom edge at exactly y = -3.
        assert!((snapshot.position.y + 3.0 - snapshot.half_extents.y).abs() < 1e-4);
        assert_eq!(snapshot.velocity.y, 0.0);
        assert!(snapshot.map_contacts.bottom);

        let map = query::tile_map_view(&world);
        let bottom = snapshot.position.y - snapshot.half_extents.y;
        assert!(!map.is_solid_at(Vec2::new(snapshot.position.x, bottom + 1e-3)));
    }

    #[test]
    fn jump_requires_ground_contact() {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(&mut world, floor_map(), &mut events);
        spawn_distant_walker(&mut world);
        let player = spawn_player_at(&mut world, 2.0, -1.0);

        // Airborne: the request is ignored.
        events.clear();
        apply(&mut world, Command::RequestJump { entity: player }, &mut events);
        assert!(events.is_empty());

        settle_on_floor(&mut world, &mut events);
        events.clear();
        apply(&mut world, Command::RequestJump { entity: player }, &mut events);
        assert_eq!(events, vec![Event::EntityJumped { entity: player }]);

        let view = query::entity_view(&world);
        let snapshot = view.get(player).expect("player snapshot");
        assert_eq!(snapshot.velocity.y, PLAYER_JUMP_POWER);
    }

    #[test]
    fn corner_approach_settles_as_vertical_contact() {
        // The y pass runs before the x pass, so an entity falling diagonally
        // onto a platform corner lands on top of it instead of being pushed
        // sideways.
        let mut world = World::new();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SpawnPlatform {
                position: Vec2::new(1.0, -2.0),
                half_extents: Vec2::new(0.5, 0.5),
            },
            &mut events,
        );
        spawn_distant_walker(&mut world);
        let player = spawn_player_at(&mut world, 0.1, -0.8);

        // Drift right while falling toward the platform's top-left corner.
        for _ in 0..60 {
            apply(
                &mut world,
                Command::SetMovementIntent {
                    entity: player,
                    intent: Vec2::new(1.0, 0.0),
                },
                &mut events,
            );
            step_world(&mut world, &mut events);

            let view = query::entity_view(&world);
            let snapshot = view.get(player).expect("player snapshot");
            if snapshot.contacts.any() {
                assert!(snapshot.contacts.bottom);
                assert!(!snapshot.contacts.left);
                assert!(!snapshot.contacts.right);
                return;
            }
        }

        panic!("player never touched the platform corner");
    }

    #[test]
    fn stomp_deactivates_enemy_and_keeps_player() {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(&mut world, floor_map(), &mut events);
        apply(
            &mut world,
            Command::SpawnEnemy {
                kind: EnemyKind::Walker,
                position: Vec2::new(2.5, -2.5),
            },
            &mut events,
        );
        let player = spawn_player_at(&mut world, 2.5, -0.6);

        events.clear();
        for _ in 0..240 {
            step_world(&mut world, &mut events);
            if events
                .iter()
                .any(|event| matches!(event, Event::EnemyDefeated { .. }))
            {
                break;
            }
        }

        assert!(events
            .iter()
            .any(|event| matches!(event, Event::EnemyDefeated { .. })));
        assert!(!events.iter().any(|event| *event == Event::PlayerDefeated));

        let view = query::entity_view(&world);
        assert!(view.get(player).expect("player snapshot").active);
        // Only the walker counted as an enemy, so the session is won.
        assert_eq!(query::game_result(&world), GameResult::Won);
    }

    #[test]
    fn side_contact_deactivates_player() {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(&mut world, floor_map(), &mut events);
        apply(
            &mut world,
            Command::SpawnEnemy {
                kind: EnemyKind::Walker,
                position: Vec2::new(3.5, -2.5),
            },
            &mut events,
        );
        let player = spawn_player_at(&mut world, 1.5, -2.5);
        settle_on_floor(&mut world, &mut events);

        events.clear();
        for _ in 0..240 {
            apply(
                &mut world,
                Command::SetMovementIntent {
                    entity: player,
                    intent: Vec2::new(1.0, 0.0),
                },
                &mut events,
            );
            step_world(&mut world, &mut events);
            if query::game_result(&world) != GameResult::InProgress {
                break;
            }
        }

        assert!(events.iter().any(|event| *event == Event::PlayerDefeated));
        assert_eq!(query::game_result(&world), GameResult::Lost);
    }

    #[test]
    fn leaving_playable_region_loses() {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SetPlayableRegion {
                min: Vec2::new(0.0, -3.0),
                max: Vec2::new(7.0, 1.0),
            },
            &mut events,
        );
        spawn_distant_walker(&mut world);
        let _player = spawn_player_at(&mut world, 3.0, -1.0);

        // No floor beneath the player, so gravity carries it below the
        // region's lower edge.
        events.clear();
        for _ in 0..600 {
            step_world(&mut world, &mut events);
            if query::game_result(&world) != GameResult::InProgress {
                break;
            }
        }

        assert_eq!(query::game_result(&world), GameResult::Lost);
        assert!(events
            .iter()
            .any(|event| *event == Event::GameEnded { result: GameResult::Lost }));
    }

    #[test]
    fn fire_activates_owned_bullet_toward_player() {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(&mut world, floor_map(), &mut events);
        apply(
            &mut world,
            Command::SpawnEnemy {
                kind: EnemyKind::Shooter,
                position: Vec2::new(4.5, -2.5),
            },
            &mut events,
        );
        let shooter = match events
            .iter()
            .find(|event| matches!(event, Event::EntitySpawned { .. }))
        {
            Some(Event::EntitySpawned { entity, .. }) => *entity,
            _ => panic!("missing shooter spawn event"),
        };
        let _player = spawn_player_at(&mut world, 1.5, -2.5);

        events.clear();
        apply(&mut world, Command::Fire { shooter }, &mut events);

        let bullet = match events.first() {
            Some(Event::BulletFired { bullet, .. }) => *bullet,
            other => panic!("expected BulletFired, got {other:?}"),
        };

        let view = query::entity_view(&world);
        let snapshot = view.get(bullet).expect("bullet snapshot");
        assert!(snapshot.active);
        assert!(snapshot.velocity.x < 0.0, "bullet flies toward the player");
        assert_eq!(snapshot.facing, Facing::Left);

        // A second fire request while the bullet is in flight is ignored.
        events.clear();
        apply(&mut world, Command::Fire { shooter }, &mut events);
        assert!(events.is_empty());
    }

    #[test]
    fn stomped_shooter_expires_bullet_and_wins_next_step() {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(&mut world, floor_map(), &mut events);
        apply(
            &mut world,
            Command::SpawnEnemy {
                kind: EnemyKind::Shooter,
                position: Vec2::new(4.5, -2.5),
            },
            &mut events,
        );
        let shooter = match events
            .iter()
            .find(|event| matches!(event, Event::EntitySpawned { .. }))
        {
            Some(Event::EntitySpawned { entity, .. }) => *entity,
            other => panic!("expected shooter spawn, got {other:?}"),
        };
        let _player = spawn_player_at(&mut world, 1.5, -2.5);
        apply(&mut world, Command::Fire { shooter }, &mut events);

        // Stomp the shooter directly through settlement by dropping the
        // player onto it from above.
        apply(
            &mut world,
            Command::SpawnPlayer {
                position: Vec2::new(4.5, -1.2),
            },
            &mut events,
        );

        events.clear();
        let mut shooter_down_at: Option<usize> = None;
        for step in 0..240 {
            step_world(&mut world, &mut events);

            if shooter_down_at.is_none()
                && events
                    .iter()
                    .any(|event| *event == Event::EnemyDefeated { entity: shooter })
            {
                shooter_down_at = Some(step);
                events.clear();
                continue;
            }

            if let Some(down_at) = shooter_down_at {
                assert_eq!(step, down_at + 1, "bullet must expire on the next sub-step");
                assert!(events
                    .iter()
                    .any(|event| matches!(event, Event::BulletSpent { .. })));
                assert_eq!(query::game_result(&world), GameResult::Won);
                assert!(events
                    .iter()
                    .any(|event| *event == Event::GameEnded { result: GameResult::Won }));
                return;
            }
        }

        panic!("shooter was never stomped");
    }

    #[test]
    fn steps_are_ignored_after_game_ends() {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(&mut world, floor_map(), &mut events);
        let _player = spawn_player_at(&mut world, 2.5, -2.5);

        // No enemies at all: the first step resolves to a win.
        events.clear();
        step_world(&mut world, &mut events);
        assert_eq!(query::game_result(&world), GameResult::Won);

        events.clear();
        step_world(&mut world, &mut events);
        assert!(events.is_empty());
    }

    #[test]
    fn platforms_never_move() {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SpawnPlatform {
                position: Vec2::new(1.0, -2.0),
                half_extents: Vec2::new(0.5, 0.5),
            },
            &mut events,
        );
        spawn_distant_walker(&mut world);
        let _player = spawn_player_at(&mut world, 1.0, -0.8);

        for _ in 0..60 {
            step_world(&mut world, &mut events);
        }

        let view = query::entity_view(&world);
        let platform = view
            .iter()
            .find(|snapshot| snapshot.kind == EntityKind::Platform)
            .expect("platform snapshot");
        assert_eq!(platform.position, Vec2::new(1.0, -2.0));
        assert_eq!(platform.velocity, Vec2::ZERO);
    }

    #[test]
    fn inactive_entities_do_not_block() {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(&mut world, floor_map(), &mut events);
        apply(
            &mut world,
            Command::SpawnEnemy {
                kind: EnemyKind::Shooter,
                position: Vec2::new(2.5, -2.5),
            },
            &mut events,
        );
        // The shooter's bullet starts inactive at the shooter's position;
        // a player walking through that spot must not collide with it.
        let player = spawn_player_at(&mut world, 2.5, -2.4);
        settle_on_floor(&mut world, &mut events);

        let view = query::entity_view(&world);
        // Landing on the shooter is a stomp, so the player survives; the
        // inactive bullet parked at the same spot never produced a contact
        // record of its own.
        assert!(view.get(player).expect("player snapshot").active);
        let bullet = view
            .iter()
            .find(|candidate| matches!(candidate.behavior, Some(Behavior::Bullet { .. })))
            .expect("bullet snapshot");
        assert!(!bullet.active);
        assert!(!bullet.contacts.any());
    }

    #[test]
    fn shooter_spawn_links_bullet_and_owner_both_ways() {
        let mut world = World::new();
        let mut events = Vec::new();
        for x in [2.5, 4.5] {
            apply(
                &mut world,
                Command::SpawnEnemy {
                    kind: EnemyKind::Shooter,
                    position: Vec2::new(x, -2.5),
                },
                &mut events,
            );
        }

        let view = query::entity_view(&world);
        let mut pairs = 0;
        for snapshot in view.iter() {
            let Some(Behavior::Shooter { bullet }) = snapshot.behavior else {
                continue;
            };
            let owned = view.get(bullet).expect("owned bullet exists");
            assert_eq!(
                owned.behavior,
                Some(Behavior::Bullet { owner: snapshot.id })
            );
            assert!(!owned.active);
            pairs += 1;
        }
        assert_eq!(pairs, 2);
    }

    #[test]
    fn contact_flags_appear_on_both_parties() {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(&mut world, floor_map(), &mut events);
        // The player takes the lower id so the walker steps after it; the
        // walker's flag must survive its own step.
        let player = spawn_player_at(&mut world, 1.5, -2.5);
        apply(
            &mut world,
            Command::SpawnEnemy {
                kind: EnemyKind::Walker,
                position: Vec2::new(3.5, -2.5),
            },
            &mut events,
        );
        settle_on_floor(&mut world, &mut events);

        events.clear();
        for _ in 0..240 {
            apply(
                &mut world,
                Command::SetMovementIntent {
                    entity: player,
                    intent: Vec2::new(1.0, 0.0),
                },
                &mut events,
            );
            step_world(&mut world, &mut events);

            if events.iter().any(|event| *event == Event::PlayerDefeated) {
                let view = query::entity_view(&world);
                let player = view.get(player).expect("player snapshot");
                let walker = view
                    .iter()
                    .find(|snapshot| snapshot.kind == EntityKind::Enemy)
                    .expect("walker snapshot");
                assert!(player.contacts.right);
                assert!(walker.contacts.left);
                return;
            }
        }

        panic!("player never reached the walker");
    }

    #[test]
    fn jump_allowed_while_resting_on_platform() {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SpawnPlatform {
                position: Vec2::new(1.0, -2.0),
                half_extents: Vec2::new(0.5, 0.5),
            },
            &mut events,
        );
        spawn_distant_walker(&mut world);
        let player = spawn_player_at(&mut world, 1.0, -0.9);
        settle_on_floor(&mut world, &mut events);

        let view = query::entity_view(&world);
        let snapshot = view.get(player).expect("player snapshot");
        // The default map has no solid tiles, so only the platform entity
        // supports the player.
        assert!(snapshot.contacts.bottom);
        assert!(!snapshot.map_contacts.bottom);

        events.clear();
        apply(&mut world, Command::RequestJump { entity: player }, &mut events);
        assert_eq!(events, vec![Event::EntityJumped { entity: player }]);

        let view = query::entity_view(&world);
        assert_eq!(
            view.get(player).expect("player snapshot").velocity.y,
            PLAYER_JUMP_POWER
        );
    }
}
