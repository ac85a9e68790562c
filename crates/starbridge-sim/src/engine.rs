//! Tick loop (§4.5): the 14 phases run in fixed order each call, each
//! observing state left behind by earlier phases of the same tick.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use starbridge_protocol::constants::{Faction, OrdnanceType, SystemIndex, TubeState};
use tracing::trace;

use crate::change_set::ChangeSet;
use crate::combat;
use crate::entities::{Mine, Torpedo};
use crate::ids::EntityId;
use crate::tuning;
use crate::vector::{segment_intersects_sphere, turn_toward, Vec3};
use crate::{ai, world::World};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    Win,
    Loss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GameStatus {
    InGame,
    GameOver(Outcome),
}

/// Owns the world and drives it forward one tick at a time. Does not own
/// wall-clock scheduling; callers pass `dt` explicitly (§4.5 "Scheduling").
pub struct Engine {
    world: World,
    change_set: ChangeSet,
    rng: Pcg32,
    status: GameStatus,
    /// Counts down the grace period after the last enemy falls before a
    /// win is finalized (§4.5 phase 14).
    win_grace_remaining: Option<f32>,
    tick_number: u64,
}

impl Engine {
    pub fn new(world: World, rng_seed: u64) -> Self {
        Self {
            world,
            change_set: ChangeSet::new(),
            rng: Pcg32::seed_from_u64(rng_seed),
            status: GameStatus::InGame,
            win_grace_remaining: None,
            tick_number: 0,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self.status {
            GameStatus::GameOver(outcome) => Some(outcome),
            GameStatus::InGame => None,
        }
    }

    /// Runs one logical tick. Returns the change set accumulated during
    /// this call; once the game is over the engine stops mutating state
    /// and returns an empty change set on every subsequent call (§8
    /// "Lifecycle").
    pub fn tick(&mut self, dt: f32) -> ChangeSet {
        if matches!(self.status, GameStatus::GameOver(_)) {
            return ChangeSet::new();
        }

        self.tick_number += 1;
        let span = tracing::info_span!("tick", n = self.tick_number);
        let _enter = span.enter();

        self.change_set.clear();

        trace!(phase = "engineering");
        phase_engineering(&mut self.world, dt);
        trace!(phase = "player_movement");
        phase_player_movement(&mut self.world, dt);
        trace!(phase = "nebula_effects");
        phase_nebula_effects(&mut self.world);
        trace!(phase = "docking");
        phase_docking(&mut self.world, dt);
        trace!(phase = "npc_ai");
        ai::run_npc_ai(&mut self.world, dt, &mut self.rng);
        trace!(phase = "player_beams");
        phase_player_beams(&mut self.world, dt);
        trace!(phase = "npc_attacks");
        phase_npc_attacks(&mut self.world, dt);
        trace!(phase = "tube_loading");
        phase_tube_loading(&mut self.world, dt);
        trace!(phase = "torpedo_flight");
        phase_torpedo_flight(&mut self.world, dt, &mut self.change_set);
        trace!(phase = "mines");
        phase_mines(&mut self.world, &mut self.change_set);
        trace!(phase = "emp_disable");
        phase_emp_disable(&mut self.world, dt);
        trace!(phase = "scans");
        phase_scans(&mut self.world, dt);
        // Phase 13 (shield drain) is folded into phase 1; no separate step.
        trace!(phase = "resolve_destructions");
        resolve_destructions(&mut self.world, &mut self.change_set);
        self.change_set.mark_all_mutated(&self.world);
        trace!(phase = "win_loss");
        phase_win_loss(&self.world, dt, &mut self.status, &mut self.win_grace_remaining);

        self.change_set.clone()
    }

    /// `fireTube` command effect (§4.7): spawns a torpedo (or a mine, for
    /// the Mine ordnance type) from a `Loaded` tube and empties it.
    /// Returns `false` if the precondition isn't met; the caller silently
    /// drops the command in that case.
    pub fn fire_tube(&mut self, ship_id: EntityId, tube_index: usize) -> bool {
        let Some(ship) = self.world.player_ships.get_mut(&ship_id) else {
            return false;
        };
        if tube_index >= ship.tubes.len() {
            return false;
        }
        let tube = ship.tubes[tube_index];
        if tube.state != TubeState::Loaded {
            return false;
        }
        ship.tubes[tube_index] = Default::default();

        let position = ship.position;
        let heading = ship.heading;
        let target_id = ship.target_id;

        if tube.ordnance_type == OrdnanceType::Mine {
            let id = self.world.ids.next();
            let mine = Mine::new(id, position, ship_id, tuning::MINE_ARM_DELAY_SEC);
            self.world.mines.insert(id, mine);
            self.change_set.mines.mark_created(id);
        } else {
            let id = self.world.ids.next();
            let homing_target = if tube.ordnance_type == OrdnanceType::Homing {
                target_id
            } else {
                None
            };
            let torpedo = Torpedo::new(id, position, heading, tube.ordnance_type, ship_id, homing_target);
            self.world.torpedoes.insert(id, torpedo);
            self.change_set.torpedoes.mark_created(id);
        }
        true
    }
}

fn phase_engineering(world: &mut World, dt: f32) {
    for ship in world.player_ships.values_mut() {
        let mut drain = tuning::BASE_ENERGY_DRAIN_PER_SEC * dt;
        for idx in 0..8 {
            let allocation = ship.systems[idx].energy_allocation;
            drain += tuning::SYSTEM_ENERGY_DRAIN_PER_SEC * allocation * dt;
        }
        if ship.shields_active {
            let multiplier = if ship.in_nebula { tuning::NEBULA_SHIELD_DRAIN_MULTIPLIER } else { 1.0 };
            drain += tuning::SHIELD_ACTIVE_DRAIN_PER_SEC * multiplier * dt;
        }
        if ship.warp_factor > 0 {
            drain += tuning::WARP_ENERGY_DRAIN_PER_SEC * dt;
        }
        ship.energy = (ship.energy - drain).clamp(0.0, tuning::ENERGY_MAX);

        for system in &mut ship.systems {
            let heat_delta =
                (tuning::HEAT_RISE_PER_SEC * (system.energy_allocation - 1.0).max(0.0)
                    - tuning::COOLANT_EFFICIENCY * system.coolant as f32)
                    * dt;
            system.heat = (system.heat + heat_delta).max(0.0);
            if system.heat >= tuning::OVERHEAT_THRESHOLD {
                system.damage = (system.damage + tuning::DAMAGE_RATE_PER_SEC * dt).min(tuning::SYSTEM_DAMAGE_MAX);
                system.energy_allocation = 0.0;
                system.heat = tuning::POST_CRITICAL_HEAT;
            }
        }
    }
}

fn phase_player_movement(world: &mut World, dt: f32) {
    for ship in world.player_ships.values_mut() {
        let impulse_alloc = ship.effective_allocation(SystemIndex::Impulse);
        let warp_alloc = ship.effective_allocation(SystemIndex::Warp);
        let maneuver_alloc = ship.effective_allocation(SystemIndex::Maneuvering);

        let mut desired = ship.impulse * tuning::MAX_IMPULSE_SPEED * impulse_alloc
            + ship.warp_factor as f32 * tuning::WARP_SPEED_PER_FACTOR * warp_alloc;
        if ship.reverse {
            desired = -desired * tuning::REVERSE_SPEED_MULTIPLIER;
        }
        if ship.docked {
            desired = 0.0;
        }

        let max_delta = tuning::ACCEL * dt;
        ship.velocity += (desired - ship.velocity).clamp(-max_delta, max_delta);
        if ship.docked {
            ship.velocity = 0.0;
        }

        ship.heading += ship.rudder * tuning::TURN_RATE * maneuver_alloc * dt;

        let heading = ship.heading;
        let forward = Vec3::new(heading.sin(), 0.0, heading.cos()).scale(ship.velocity * dt);
        ship.position = ship.position.add(forward);
        ship.position.y += ship.pitch * tuning::VERTICAL_SPEED * dt;
        ship.position = ship.position.clamp_to_world_bounds();
    }
}

fn phase_nebula_effects(world: &mut World) {
    let nebulae: Vec<(Vec3, f32)> = world.nebulae.values().map(|n| (n.position, n.radius)).collect();
    let inside = |pos: Vec3| nebulae.iter().any(|(center, radius)| center.distance_to(pos) <= *radius);

    for ship in world.player_ships.values_mut() {
        ship.in_nebula = inside(ship.position);
    }
    for npc in world.npc_ships.values_mut() {
        npc.in_nebula = inside(npc.position);
    }
}

fn phase_docking(world: &mut World, dt: f32) {
    let bases: Vec<(EntityId, Vec3)> = world.bases.values().map(|b| (b.id, b.position)).collect();

    for ship in world.player_ships.values_mut() {
        if ship.shields_active || ship.impulse > tuning::DOCK_IMPULSE_THRESHOLD {
            ship.docked = false;
            ship.docked_with = None;
            continue;
        }
        if !ship.docked {
            if let Some((base_id, _)) = bases
                .iter()
                .find(|(_, pos)| pos.distance_to(ship.position) <= tuning::DOCK_RANGE)
            {
                ship.docked = true;
                ship.docked_with = Some(*base_id);
                ship.restock_timer = tuning::RESTOCK_INTERVAL_SEC;
            }
        }
        let Some(base_id) = ship.docked_with else { continue };
        if bases.iter().all(|(id, pos)| *id != base_id || pos.distance_to(ship.position) > tuning::DOCK_RANGE) {
            ship.docked = false;
            ship.docked_with = None;
            continue;
        }

        ship.energy = (ship.energy + tuning::ENERGY_RECHARGE_PER_SEC * dt).min(tuning::ENERGY_MAX);
        ship.shields_fore = (ship.shields_fore + tuning::SHIELD_REPAIR_PER_SEC * dt).min(ship.shields_fore_max);
        ship.shields_aft = (ship.shields_aft + tuning::SHIELD_REPAIR_PER_SEC * dt).min(ship.shields_aft_max);
        for system in &mut ship.systems {
            system.damage = (system.damage - tuning::SYSTEM_REPAIR_PER_SEC * dt).max(0.0);
        }

        ship.restock_timer -= dt;
        if ship.restock_timer <= 0.0 {
            ship.restock_timer = tuning::RESTOCK_INTERVAL_SEC;
            let (lowest_idx, _) = ship
                .ordnance_inventory
                .iter()
                .enumerate()
                .min_by_key(|(_, count)| **count)
                .expect("ordnance_inventory is a fixed non-empty array");
            ship.ordnance_inventory[lowest_idx] = ship.ordnance_inventory[lowest_idx].saturating_add(1);
        }
    }
}

fn phase_player_beams(world: &mut World, dt: f32) {
    for ship_id in world.player_ships.keys().copied().collect::<Vec<_>>() {
        let Some(ship) = world.player_ships.get_mut(&ship_id) else { continue };
        ship.beam_cooldown = (ship.beam_cooldown - dt).max(0.0);
        if ship.beam_cooldown > 0.0 {
            continue;
        }
        let beams_alloc = ship.effective_allocation(SystemIndex::Beams);
        if beams_alloc <= 0.0 {
            continue;
        }
        let Some(target_id) = ship.target_id else { continue };
        let ship_position = ship.position;

        if let Some(target) = world.npc_ships.get_mut(&target_id) {
            let distance = ship_position.distance_to(target.position);
            if distance > tuning::BEAM_RANGE {
                continue;
            }
            let target_position = target.position;
            let blocked = world
                .nebulae
                .values()
                .any(|nebula| segment_intersects_sphere(ship_position, target_position, nebula.position, nebula.radius));
            if blocked {
                continue;
            }
            let ship = world.player_ships.get_mut(&ship_id).expect("looked up above");
            let damage = combat::player_beam_damage(ship, target.shield_frequency);
            let bearing = ship_position.bearing_to(target.position);
            combat::apply_damage_to_npc(target, bearing, damage);
            ship.beam_cooldown = tuning::BEAM_COOLDOWN_SEC / beams_alloc;
        }
    }
}

fn phase_npc_attacks(world: &mut World, dt: f32) {
    let player_targets: Vec<(EntityId, Vec3)> = world.player_ships.values().map(|s| (s.id, s.position)).collect();
    let base_targets: Vec<(EntityId, Vec3)> = world.bases.values().map(|b| (b.id, b.position)).collect();

    let mut hits: Vec<(EntityId, f32, f32)> = Vec::new(); // (target_id, bearing, damage)

    for npc in world.npc_ships.values_mut() {
        if npc.faction != Faction::Enemy || npc.surrendered || npc.is_emp_disabled() {
            continue;
        }
        npc.beam_cooldown = (npc.beam_cooldown - dt).max(0.0);
        if npc.beam_cooldown > 0.0 {
            continue;
        }
        let target = player_targets
            .iter()
            .chain(base_targets.iter())
            .find(|(id, _)| Some(*id) == npc.ai_target)
            .or_else(|| player_targets.first())
            .or_else(|| base_targets.first());
        let Some(&(target_id, target_pos)) = target else { continue };
        if npc.position.distance_to(target_pos) > tuning::ATTACK_RANGE {
            continue;
        }
        npc.beam_cooldown = tuning::NPC_BEAM_COOLDOWN_SEC;
        hits.push((target_id, npc.position.bearing_to(target_pos), tuning::NPC_BEAM_DAMAGE));
    }

    for (target_id, bearing, damage) in hits {
        if let Some(player) = world.player_ships.get_mut(&target_id) {
            combat::apply_damage_to_player(player, bearing, damage);
        } else if let Some(base) = world.bases.get_mut(&target_id) {
            base.shields = (base.shields - damage).max(0.0);
        }
    }
}

fn phase_tube_loading(world: &mut World, dt: f32) {
    for ship in world.player_ships.values_mut() {
        let torpedoes_alloc = ship.effective_allocation(SystemIndex::Torpedoes).max(0.0);
        for tube in &mut ship.tubes {
            match tube.state {
                TubeState::Loading => {
                    tube.load_timer -= dt * torpedoes_alloc.max(0.01);
                    if tube.load_timer <= 0.0 {
                        tube.state = TubeState::Loaded;
                        tube.load_timer = 0.0;
                    }
                }
                TubeState::Unloading => {
                    tube.load_timer -= dt;
                    if tube.load_timer <= 0.0 {
                        let idx = tube.ordnance_type.index();
                        ship.ordnance_inventory[idx] = ship.ordnance_inventory[idx].saturating_add(1);
                        *tube = Default::default();
                    }
                }
                TubeState::Empty | TubeState::Loaded => {}
            }
        }
    }
}

fn phase_torpedo_flight(world: &mut World, dt: f32, change_set: &mut ChangeSet) {
    let player_positions: Vec<(EntityId, Vec3)> = world.player_ships.values().map(|s| (s.id, s.position)).collect();
    let npc_positions: Vec<(EntityId, Vec3)> = world.npc_ships.values().map(|n| (n.id, n.position)).collect();

    let mut to_destroy = Vec::new();
    let mut emp_targets: Vec<EntityId> = Vec::new();
    let mut hull_hits: Vec<(EntityId, f32)> = Vec::new();
    let mut shield_drops: Vec<EntityId> = Vec::new();
    let mut aoe_center: Option<(Vec3, OrdnanceType)> = None;

    for torpedo in world.torpedoes.values_mut() {
        if let Some(target_id) = torpedo.homing_target_id {
            if let Some((_, target_pos)) = player_positions.iter().chain(npc_positions.iter()).find(|(id, _)| *id == target_id) {
                let bearing = torpedo.position.bearing_to(*target_pos);
                torpedo.heading = turn_toward(torpedo.heading, bearing, tuning::HOMING_TURN_RATE * dt);
            } else {
                torpedo.homing_target_id = None;
            }
        }
        let heading = torpedo.heading;
        torpedo.position = torpedo
            .position
            .add(Vec3::new(heading.sin(), 0.0, heading.cos()).scale(torpedo.velocity * dt));
        torpedo.lifetime_remaining -= dt;

        let collision = player_positions
            .iter()
            .chain(npc_positions.iter())
            .find(|(_, pos)| pos.distance_to(torpedo.position) <= tuning::HIT_RADIUS);

        if let Some((hit_id, _)) = collision {
            to_destroy.push(torpedo.id);
            match torpedo.ordnance_type {
                OrdnanceType::Homing => hull_hits.push((*hit_id, tuning::HOMING_DAMAGE)),
                OrdnanceType::Nuke => aoe_center = Some((torpedo.position, OrdnanceType::Nuke)),
                OrdnanceType::Emp => emp_targets.push(torpedo.id),
                OrdnanceType::PShock => {
                    hull_hits.push((*hit_id, tuning::PSHOCK_DAMAGE));
                    shield_drops.push(*hit_id);
                }
                OrdnanceType::Mine | OrdnanceType::Beacon | OrdnanceType::Probe | OrdnanceType::Tag => {}
            }
        } else if torpedo.is_expired() || torpedo.position.is_out_of_bounds() {
            to_destroy.push(torpedo.id);
        }
    }

    // EMP: detonation position is wherever each torpedo was destroyed.
    for &emp_id in &emp_targets {
        if let Some(torpedo) = world.torpedoes.get(&emp_id) {
            let center = torpedo.position;
            let ticks = (tuning::EMP_DURATION_SEC / tuning::TICK_DT) as u32;
            for npc in world.npc_ships.values_mut() {
                if center.distance_to(npc.position) <= tuning::EMP_RADIUS {
                    npc.emp_disable_until = ticks;
                }
            }
        }
    }

    if let Some((center, OrdnanceType::Nuke)) = aoe_center {
        for (id, pos) in npc_positions.iter().chain(player_positions.iter()) {
            let distance = center.distance_to(*pos);
            if distance <= tuning::NUKE_RADIUS {
                let falloff = 1.0 - (distance / tuning::NUKE_RADIUS);
                hull_hits.push((*id, tuning::NUKE_DAMAGE * falloff));
            }
        }
    }

    for (id, damage) in hull_hits {
        if let Some(npc) = world.npc_ships.get_mut(&id) {
            let bearing = npc.heading;
            combat::apply_damage_to_npc(npc, bearing, damage);
        } else if let Some(ship) = world.player_ships.get_mut(&id) {
            let bearing = ship.heading;
            combat::apply_damage_to_player(ship, bearing, damage);
        }
    }

    // PShock drops both shield facings by a flat amount, on top of its
    // direct hull-bypassing damage (§4.5 phase 9 "PShock" effect).
    for id in shield_drops {
        if let Some(npc) = world.npc_ships.get_mut(&id) {
            npc.shields_fore = (npc.shields_fore - tuning::PSHOCK_SHIELD_DROP).max(0.0);
            npc.shields_aft = (npc.shields_aft - tuning::PSHOCK_SHIELD_DROP).max(0.0);
        } else if let Some(ship) = world.player_ships.get_mut(&id) {
            ship.shields_fore = (ship.shields_fore - tuning::PSHOCK_SHIELD_DROP).max(0.0);
            ship.shields_aft = (ship.shields_aft - tuning::PSHOCK_SHIELD_DROP).max(0.0);
        }
    }

    for id in to_destroy {
        world.torpedoes.remove(&id);
        change_set.torpedoes.mark_destroyed(id);
    }
}

/// Removes NPCs and bases whose hull/shields dropped to 0 from combat
/// this tick (§3 "Lifecycle"), recording each in the change set. Enemy
/// NPCs that bled down to the surrender threshold flee combat instead
/// of being destroyed (§4.5 phase 14).
fn resolve_destructions(world: &mut World, change_set: &mut ChangeSet) {
    for npc in world.npc_ships.values_mut() {
        if npc.faction == Faction::Enemy && !npc.surrendered && npc.is_below_surrender_threshold() {
            npc.surrendered = true;
        }
    }

    let dead_npcs: Vec<EntityId> = world
        .npc_ships
        .iter()
        .filter(|(_, npc)| npc.is_destroyed())
        .map(|(id, _)| *id)
        .collect();
    for id in dead_npcs {
        world.npc_ships.remove(&id);
        change_set.npc_ships.mark_destroyed(id);
    }

    let dead_bases: Vec<EntityId> = world
        .bases
        .iter()
        .filter(|(_, base)| base.is_destroyed())
        .map(|(id, _)| *id)
        .collect();
    for id in dead_bases {
        world.bases.remove(&id);
        change_set.bases.mark_destroyed(id);
    }
}

fn phase_mines(world: &mut World, change_set: &mut ChangeSet) {
    let player_positions: Vec<(EntityId, Vec3)> = world.player_ships.values().map(|s| (s.id, s.position)).collect();

    let mut to_detonate = Vec::new();
    for mine in world.mines.values_mut() {
        mine.arm_delay_remaining = (mine.arm_delay_remaining - tuning::TICK_DT).max(0.0);
        if !mine.is_armed() {
            continue;
        }
        if let Some((victim_id, _)) = player_positions
            .iter()
            .filter(|(id, _)| *id != mine.owner_id)
            .find(|(_, pos)| pos.distance_to(mine.position) <= tuning::MINE_TRIGGER_RADIUS)
        {
            to_detonate.push((mine.id, *victim_id));
        }
    }

    for (mine_id, victim_id) in to_detonate {
        world.mines.remove(&mine_id);
        change_set.mines.mark_destroyed(mine_id);
        if let Some(ship) = world.player_ships.get_mut(&victim_id) {
            let bearing = ship.heading;
            combat::apply_damage_to_player(ship, bearing, tuning::MINE_DAMAGE);
        }
    }
}

fn phase_emp_disable(world: &mut World, dt: f32) {
    let ticks_per_tick = (dt / tuning::TICK_DT).max(1.0) as u32;
    for npc in world.npc_ships.values_mut() {
        if npc.emp_disable_until > 0 {
            npc.emp_disable_until = npc.emp_disable_until.saturating_sub(ticks_per_tick);
        }
    }
}

fn phase_scans(world: &mut World, dt: f32) {
    for ship in world.player_ships.values_mut() {
        let Some(progress) = &mut ship.scan_progress else { continue };
        let Some(target) = world.npc_ships.get(&progress.target_id) else {
            ship.scan_progress = None;
            continue;
        };
        if ship.position.distance_to(target.position) > tuning::SENSOR_RANGE {
            ship.scan_progress = None;
            continue;
        }
        progress.elapsed += dt;
        if progress.elapsed >= tuning::SCAN_DURATION_SEC {
            let target_id = progress.target_id;
            ship.scan_progress = None;
            if let Some(target) = world.npc_ships.get_mut(&target_id) {
                target.scan_state = (target.scan_state + 1).min(2);
            }
        }
    }
}

fn phase_win_loss(world: &World, dt: f32, status: &mut GameStatus, win_grace_remaining: &mut Option<f32>) {
    if world.all_bases_destroyed() {
        *status = GameStatus::GameOver(Outcome::Loss);
        return;
    }
    if world.all_enemies_defeated() {
        let remaining = win_grace_remaining.get_or_insert(tuning::GAME_OVER_GRACE_PERIOD_SEC);
        *remaining -= dt;
        if *remaining <= 0.0 {
            *status = GameStatus::GameOver(Outcome::Win);
        }
    } else {
        *win_grace_remaining = None;
    }
}
