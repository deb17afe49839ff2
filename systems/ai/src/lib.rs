#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure AI dispatch for Tilerunner enemies.
//!
//! The dispatcher reads immutable entity snapshots and the tile-map view
//! once per fixed sub-step and responds exclusively with command batches:
//! movement intents, facing changes, state transitions, and fire requests.
//! It never touches world state directly, so replaying the same snapshots
//! always produces the same commands.

use tilerunner_core::{
    AiState, Behavior, Command, EntityId, EntitySnapshot, EntityView, Facing, TileMapView, Vec2,
};

/// Distance beyond an entity's leading edge probed for walls and floors.
const WALKER_PROBE: f32 = 0.1;
/// Horizontal distance under which a guard notices the player.
const GUARD_SIGHT_RANGE: f32 = 3.0;
/// Radius of the flyer's orbit around its anchor.
const FLYER_ORBIT_RADIUS: f32 = 0.75;
/// Orbit phase advance per sub-step, in radians.
const FLYER_ANGULAR_STEP: f32 = 0.05;
/// Sub-steps between shooter fire attempts.
const SHOOTER_COOLDOWN_STEPS: u32 = 120;

/// Pure system that plans enemy movement and emits command batches.
#[derive(Debug, Default)]
pub struct AiDispatcher {
    ledger: AgentLedger,
}

impl AiDispatcher {
    /// Creates a new dispatcher with an empty agent ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Plans one sub-step worth of enemy behavior.
    ///
    /// Invoked once before every `Command::Step`; movement intents are
    /// consumed by the world's integrator, so they must be re-emitted each
    /// sub-step.
    pub fn plan(&mut self, view: &EntityView, map: TileMapView<'_>, out: &mut Vec<Command>) {
        self.ledger.retain_active(view);

        let player = view.player().filter(|snapshot| snapshot.active).copied();

        for snapshot in view.iter() {
            if !snapshot.active {
                continue;
            }

            match snapshot.behavior {
                Some(Behavior::Walker) => plan_walker(snapshot, map, out),
                Some(Behavior::Guard) => plan_guard(snapshot, player.as_ref(), out),
                Some(Behavior::Flyer { anchor }) => {
                    let phase = self.ledger.advance_phase(snapshot.id, FLYER_ANGULAR_STEP);
                    plan_flyer(snapshot, anchor, phase, player.as_ref(), out);
                }
                Some(Behavior::Shooter { .. }) => {
                    let ready = self
                        .ledger
                        .tick_cooldown(snapshot.id, SHOOTER_COOLDOWN_STEPS);
                    plan_shooter(snapshot, ready, player.as_ref(), out);
                }
                // Bullets fly on world-side velocity alone.
                Some(Behavior::Bullet { .. }) | None => {}
            }
        }
    }
}

fn plan_walker(snapshot: &EntitySnapshot, map: TileMapView<'_>, out: &mut Vec<Command>) {
    let mut facing = snapshot.facing;

    // Probing only makes sense while grounded; an airborne walker keeps its
    // current heading until it lands.
    if snapshot.map_contacts.bottom {
        let leading_x =
            snapshot.position.x + facing.sign() * (snapshot.half_extents.x + WALKER_PROBE);
        let wall_ahead = map.is_solid_at(Vec2::new(leading_x, snapshot.position.y));
        let floor_ahead = map.is_solid_at(Vec2::new(
            leading_x,
            snapshot.position.y - snapshot.half_extents.y - WALKER_PROBE,
        ));

        if wall_ahead || !floor_ahead {
            facing = facing.reversed();
            out.push(Command::SetFacing {
                entity: snapshot.id,
                facing,
            });
        }
    }

    if snapshot.ai_state != AiState::Walking {
        out.push(Command::SetAiState {
            entity: snapshot.id,
            state: AiState::Walking,
        });
    }
    out.push(Command::SetMovementIntent {
        entity: snapshot.id,
        intent: Vec2::new(facing.sign(), 0.0),
    });
}

fn plan_guard(
    snapshot: &EntitySnapshot,
    player: Option<&EntitySnapshot>,
    out: &mut Vec<Command>,
) {
    let in_range = player.and_then(|player| {
        let dx = player.position.x - snapshot.position.x;
        (dx.abs() < GUARD_SIGHT_RANGE).then_some(dx)
    });

    match in_range {
        Some(dx) => {
            if snapshot.ai_state != AiState::Attacking {
                out.push(Command::SetAiState {
                    entity: snapshot.id,
                    state: AiState::Attacking,
                });
            }
            let facing = if dx < 0.0 { Facing::Left } else { Facing::Right };
            if facing != snapshot.facing {
                out.push(Command::SetFacing {
                    entity: snapshot.id,
                    facing,
                });
            }
            out.push(Command::SetMovementIntent {
                entity: snapshot.id,
                intent: Vec2::new(facing.sign(), 0.0),
            });
        }
        None => {
            if snapshot.ai_state != AiState::Idle {
                out.push(Command::SetAiState {
                    entity: snapshot.id,
                    state: AiState::Idle,
                });
            }
        }
    }
}

fn plan_flyer(
    snapshot: &EntitySnapshot,
    anchor: Vec2,
    phase: f32,
    player: Option<&EntitySnapshot>,
    out: &mut Vec<Command>,
) {
    let target = anchor + Vec2::new(phase.cos(), phase.sin()) * FLYER_ORBIT_RADIUS;
    let intent = (target - snapshot.position).normalize_or_zero();

    if let Some(player) = player {
        let facing = if player.position.x < snapshot.position.x {
            Facing::Left
        } else {
            Facing::Right
        };
        if facing != snapshot.facing {
            out.push(Command::SetFacing {
                entity: snapshot.id,
                facing,
            });
        }
    }

    out.push(Command::SetMovementIntent {
        entity: snapshot.id,
        intent,
    });
}

fn plan_shooter(
    snapshot: &EntitySnapshot,
    ready: bool,
    player: Option<&EntitySnapshot>,
    out: &mut Vec<Command>,
) {
    if let Some(player) = player {
        let facing = if player.position.x < snapshot.position.x {
            Facing::Left
        } else {
            Facing::Right
        };
        if facing != snapshot.facing {
            out.push(Command::SetFacing {
                entity: snapshot.id,
                facing,
            });
        }
    }

    if ready {
        out.push(Command::Fire {
            shooter: snapshot.id,
        });
    }
}

/// Per-agent scratch state carried between sub-steps.
#[derive(Clone, Copy, Debug)]
struct AgentSlot {
    id: EntityId,
    phase: f32,
    cooldown: u32,
}

#[derive(Debug, Default)]
struct AgentLedger {
    slots: Vec<AgentSlot>,
}

impl AgentLedger {
    fn retain_active(&mut self, view: &EntityView) {
        self.slots
            .retain(|slot| view.get(slot.id).map_or(false, |snapshot| snapshot.active));
    }

    fn slot_mut(&mut self, id: EntityId, initial_cooldown: u32) -> &mut AgentSlot {
        if let Some(index) = self.slots.iter().position(|slot| slot.id == id) {
            return &mut self.slots[index];
        }
        self.slots.push(AgentSlot {
            id,
            phase: 0.0,
            cooldown: initial_cooldown,
        });
        let last = self.slots.len() - 1;
        &mut self.slots[last]
    }

    fn advance_phase(&mut self, id: EntityId, step: f32) -> f32 {
        let slot = self.slot_mut(id, 0);
        slot.phase += step;
        if slot.phase > std::f32::consts::TAU {
            slot.phase -= std::f32::consts::TAU;
        }
        slot.phase
    }

    /// Counts the cooldown down by one sub-step; returns `true` and reloads
    /// when it elapses.
    fn tick_cooldown(&mut self, id: EntityId, reload: u32) -> bool {
        let slot = self.slot_mut(id, reload);
        slot.cooldown = slot.cooldown.saturating_sub(1);
        if slot.cooldown == 0 {
            slot.cooldown = reload;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AgentLedger, AiDispatcher};
    use tilerunner_core::{
        AiState, Behavior, Command, ContactFlags, EntityId, EntityKind, EntitySnapshot,
        EntityView, Facing, Side, TileCode, TileMapView, Vec2,
    };

    fn enemy_snapshot(id: u32, behavior: Behavior, position: Vec2) -> EntitySnapshot {
        EntitySnapshot {
            id: EntityId::new(id),
            kind: EntityKind::Enemy,
            position,
            velocity: Vec2::ZERO,
            half_extents: Vec2::new(0.5, 0.5),
            facing: Facing::Right,
            behavior: Some(behavior),
            ai_state: AiState::Walking,
            active: true,
            contacts: ContactFlags::default(),
            map_contacts: grounded_contacts(),
        }
    }

    fn grounded_contacts() -> ContactFlags {
        let mut flags = ContactFlags::default();
        flags.set(Side::Bottom);
        flags
    }

    #[test]
    fn walker_reverses_at_missing_floor() {
        // Single solid tile under the walker; the cell ahead has no floor.
        let codes = [
            TileCode::EMPTY,
            TileCode::EMPTY,
            TileCode::new(1),
            TileCode::EMPTY,
        ];
        let map = TileMapView::new(&codes, 2, 2, 1.0);
        let walker = enemy_snapshot(0, Behavior::Walker, Vec2::new(0.5, -0.5));
        let view = EntityView::from_snapshots(vec![walker]);
        let mut dispatcher = AiDispatcher::new();
        let mut out = Vec::new();

        dispatcher.plan(&view, map, &mut out);

        assert!(out.contains(&Command::SetFacing {
            entity: EntityId::new(0),
            facing: Facing::Left,
        }));
        assert!(out.contains(&Command::SetMovementIntent {
            entity: EntityId::new(0),
            intent: Vec2::new(-1.0, 0.0),
        }));
    }

    #[test]
    fn walker_reverses_at_wall() {
        // Solid column one cell ahead of the walker, solid floor throughout.
        let codes = [
            TileCode::EMPTY,
            TileCode::new(1),
            TileCode::EMPTY,
            TileCode::new(1),
            TileCode::new(1),
            TileCode::new(1),
        ];
        let map = TileMapView::new(&codes, 3, 2, 1.0);
        let walker = enemy_snapshot(0, Behavior::Walker, Vec2::new(0.5, -0.5));
        let view = EntityView::from_snapshots(vec![walker]);
        let mut dispatcher = AiDispatcher::new();
        let mut out = Vec::new();

        dispatcher.plan(&view, map, &mut out);

        assert!(out.contains(&Command::SetFacing {
            entity: EntityId::new(0),
            facing: Facing::Left,
        }));
        assert!(out.contains(&Command::SetMovementIntent {
            entity: EntityId::new(0),
            intent: Vec2::new(-1.0, 0.0),
        }));
    }

    #[test]
    fn airborne_walker_keeps_heading() {
        let codes = [TileCode::EMPTY; 4];
        let map = TileMapView::new(&codes, 2, 2, 1.0);
        let mut walker = enemy_snapshot(0, Behavior::Walker, Vec2::new(0.5, -0.5));
        walker.map_contacts = ContactFlags::default();
        let view = EntityView::from_snapshots(vec![walker]);
        let mut dispatcher = AiDispatcher::new();
        let mut out = Vec::new();

        dispatcher.plan(&view, map, &mut out);

        assert!(!out
            .iter()
            .any(|command| matches!(command, Command::SetFacing { .. })));
        assert!(out.contains(&Command::SetMovementIntent {
            entity: EntityId::new(0),
            intent: Vec2::new(1.0, 0.0),
        }));
    }

    #[test]
    fn cooldown_fires_once_per_reload() {
        let mut ledger = AgentLedger::default();
        let id = EntityId::new(7);

        let mut fired = 0;
        for _ in 0..240 {
            if ledger.tick_cooldown(id, 120) {
                fired += 1;
            }
        }

        assert_eq!(fired, 2);
    }

    #[test]
    fn ledger_drops_inactive_agents() {
        let mut ledger = AgentLedger::default();
        let _ = ledger.advance_phase(EntityId::new(3), 0.5);
        assert_eq!(ledger.slots.len(), 1);

        let mut gone = enemy_snapshot(3, Behavior::Walker, Vec2::ZERO);
        gone.active = false;
        let view = EntityView::from_snapshots(vec![gone]);
        ledger.retain_active(&view);

        assert!(ledger.slots.is_empty());
    }
}
