use glam::{Quat, Vec3};
use log::debug;
use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_2;

use crate::bullet::Bullet;
use crate::model::Model;
use crate::protocol::PlayerSnapshot;
use crate::{BULLET_SPEED, DAMPING, HIT_RADIUS, MAX_TURN_SPEED, MOVE_SPEED, START_HP};

/// Active movement and turn intents, replaced wholesale by `move` messages.
///
/// Serializes to the protocol's intent map: one PascalCase boolean per flag
/// plus the two turn rates. Every field defaults so partial payloads decode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Moves {
    pub move_forward: bool,
    pub move_backward: bool,
    pub move_left: bool,
    pub move_right: bool,
    pub turn_left: bool,
    pub turn_right: bool,
    pub turn_up: bool,
    pub turn_down: bool,
    pub vertical_angle_speed: f32,
    pub horizontal_angle_speed: f32,
}

#[derive(Debug, Clone)]
pub struct Player {
    id: String,
    pub name: String,
    pub position: Vec3,
    pub direction: Vec3,
    pub up: Vec3,
    pub velocity: Vec3,
    vertical_angle: f32,
    horizontal_angle: f32,
    hp: i32,
    deleted: bool,
    moves: Moves,
}

impl Player {
    pub fn new(id: &str, name: &str, position: Vec3) -> Self {
        Player {
            id: id.to_string(),
            name: name.to_string(),
            position,
            direction: Vec3::NEG_Z,
            up: Vec3::Y,
            velocity: Vec3::ZERO,
            vertical_angle: 0.0,
            horizontal_angle: 0.0,
            hp: START_HP,
            deleted: false,
            moves: Moves::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn hp(&self) -> i32 {
        self.hp
    }

    pub fn moves(&self) -> &Moves {
        &self.moves
    }

    pub fn move_forward(&mut self, enabled: bool) {
        self.moves.move_forward = enabled;
    }

    pub fn move_backward(&mut self, enabled: bool) {
        self.moves.move_backward = enabled;
    }

    pub fn move_left(&mut self, enabled: bool) {
        self.moves.move_left = enabled;
    }

    pub fn move_right(&mut self, enabled: bool) {
        self.moves.move_right = enabled;
    }

    /// Turn intents carry the rate supplied by the controller (mouse delta
    /// scaled, key repeat, ...). A rate of zero or below leaves the intent
    /// untouched; anything above the cap is clamped.
    pub fn turn_left(&mut self, enabled: bool, speed: f32) {
        if speed <= 0.0 {
            return;
        }
        self.moves.turn_left = enabled;
        self.moves.vertical_angle_speed = speed.min(MAX_TURN_SPEED);
    }

    pub fn turn_right(&mut self, enabled: bool, speed: f32) {
        if speed <= 0.0 {
            return;
        }
        self.moves.turn_right = enabled;
        self.moves.vertical_angle_speed = speed.min(MAX_TURN_SPEED);
    }

    pub fn turn_up(&mut self, enabled: bool, speed: f32) {
        if speed <= 0.0 {
            return;
        }
        self.moves.turn_up = enabled;
        self.moves.horizontal_angle_speed = speed.min(MAX_TURN_SPEED);
    }

    pub fn turn_down(&mut self, enabled: bool, speed: f32) {
        if speed <= 0.0 {
            return;
        }
        self.moves.turn_down = enabled;
        self.moves.horizontal_angle_speed = speed.min(MAX_TURN_SPEED);
    }

    /// The strafe axis: facing direction rotated a quarter turn about `up`.
    pub fn left_axis(&self) -> Vec3 {
        Quat::from_axis_angle(self.up, -FRAC_PI_2) * self.direction
    }

    /// Produces the bullet this player would fire right now. The bullet
    /// inherits the player's momentum on top of the muzzle speed.
    pub fn fire(&self) -> Bullet {
        Bullet::new(self, self.direction * BULLET_SPEED + self.velocity)
    }

    pub fn hit_sphere_contains(&self, point: Vec3) -> bool {
        self.position.distance_squared(point) <= HIT_RADIUS * HIT_RADIUS
    }

    /// Applies bullet damage. The deletion flag flips the first time hit
    /// points reach zero or below; the world evicts on its next pass.
    pub fn bullet_hit(&mut self, bullet: &Bullet) {
        self.hp -= bullet.damage();
        debug!("player {} hp {}", self.id, self.hp);
        if self.hp <= 0 {
            self.deleted = true;
        }
    }

    /// Overwrites local state from an authoritative snapshot. The turn
    /// deltas are left alone so an in-flight rotation finishes locally.
    pub fn refresh(&mut self, snapshot: &PlayerSnapshot) {
        self.name = snapshot.name.clone();
        if let Some(position) = snapshot.position {
            self.position = position.into();
        }
        self.direction = snapshot.direction.into();
        self.velocity = snapshot.velocity.into();
        self.up = snapshot.up.into();
    }

    /// Replaces the intent set wholesale with a received one, keeping the
    /// turn rates within the cap.
    pub fn refresh_moves(&mut self, mut moves: Moves) {
        moves.vertical_angle_speed = moves.vertical_angle_speed.clamp(0.0, MAX_TURN_SPEED);
        moves.horizontal_angle_speed = moves.horizontal_angle_speed.clamp(0.0, MAX_TURN_SPEED);
        self.moves = moves;
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            position: Some(self.position.into()),
            direction: self.direction.into(),
            velocity: self.velocity.into(),
            up: self.up.into(),
            vertical_angle: self.vertical_angle,
            horizontal_angle: self.horizontal_angle,
        }
    }

    // Later intents override earlier ones; only one velocity source wins a
    // tick.
    fn resolve_moves(&mut self) {
        if self.moves.move_forward {
            self.velocity = self.direction * MOVE_SPEED;
        }
        if self.moves.move_backward {
            self.velocity = self.direction * -MOVE_SPEED;
        }
        if self.moves.move_left {
            self.velocity = self.left_axis() * -MOVE_SPEED;
        }
        if self.moves.move_right {
            self.velocity = self.left_axis() * MOVE_SPEED;
        }
        if self.moves.turn_left {
            self.vertical_angle = self.moves.vertical_angle_speed;
        }
        if self.moves.turn_right {
            self.vertical_angle = -self.moves.vertical_angle_speed;
        }
        if self.moves.turn_up {
            self.horizontal_angle = self.moves.horizontal_angle_speed;
        }
        if self.moves.turn_down {
            self.horizontal_angle = -self.moves.horizontal_angle_speed;
        }
    }
}

impl Model for Player {
    fn id(&self) -> &str {
        &self.id
    }

    fn advance(&mut self, _dt: f32) {
        self.resolve_moves();

        // One fixed integration step per tick; the elapsed delta does not
        // scale it, so pacing follows the tick rate.
        self.position += self.velocity;

        let left_axis = self.left_axis();
        self.up = Quat::from_axis_angle(left_axis, self.horizontal_angle) * self.up;
        self.direction = Quat::from_axis_angle(self.up, self.vertical_angle) * self.direction;
        self.direction = Quat::from_axis_angle(left_axis, self.horizontal_angle) * self.direction;

        if !(0.9..=1.0).contains(&self.up.length()) {
            self.up = self.up.normalize();
        }
        if !(0.9..=1.0).contains(&self.direction.length()) {
            self.direction = self.direction.normalize();
        }

        self.velocity *= DAMPING;
        self.vertical_angle *= DAMPING;
        self.horizontal_angle *= DAMPING;
    }

    fn is_deleted(&self) -> bool {
        self.deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn player() -> Player {
        Player::new("p-1", "tester", Vec3::ZERO)
    }

    #[test]
    fn forward_intent_moves_along_facing() {
        let mut p = player();
        p.move_forward(true);
        p.advance(0.016);

        assert_approx_eq!(p.position.z, -MOVE_SPEED, 1e-6);
        assert_approx_eq!(p.position.x, 0.0, 1e-6);
        assert_approx_eq!(p.position.y, 0.0, 1e-6);
    }

    #[test]
    fn later_intents_win_over_earlier_ones() {
        let mut p = player();
        p.move_forward(true);
        p.move_right(true);
        p.advance(0.016);

        // Strafe right along +x for a -z facing; forward is overridden.
        assert_approx_eq!(p.position.x, MOVE_SPEED, 1e-5);
        assert_approx_eq!(p.position.z, 0.0, 1e-5);
    }

    #[test]
    fn velocity_damps_once_intent_clears() {
        let mut p = player();
        p.move_forward(true);
        p.advance(0.016);
        p.move_forward(false);
        p.advance(0.016);

        assert_approx_eq!(p.velocity.length(), MOVE_SPEED * DAMPING * DAMPING, 1e-6);
    }

    #[test]
    fn fixed_step_ignores_delta_time() {
        let mut slow = player();
        let mut fast = player();
        slow.move_forward(true);
        fast.move_forward(true);
        slow.advance(1.0);
        fast.advance(0.001);

        assert_eq!(slow.position, fast.position);
    }

    #[test]
    fn turn_speed_is_clamped() {
        let mut p = player();
        p.turn_left(true, 2.0);

        assert!(p.moves().turn_left);
        assert_approx_eq!(p.moves().vertical_angle_speed, MAX_TURN_SPEED, 1e-6);
    }

    #[test]
    fn non_positive_turn_speed_is_ignored() {
        let mut p = player();
        p.turn_up(true, 0.0);
        assert!(!p.moves().turn_up);

        p.turn_down(true, -0.3);
        assert!(!p.moves().turn_down);
    }

    #[test]
    fn turning_rotates_facing() {
        let mut p = player();
        p.turn_left(true, 0.5);
        p.advance(0.016);

        // A positive vertical delta swings the -z facing toward -x.
        assert!(p.direction.x < 0.0);
        assert!(p.direction.z < 0.0);
    }

    #[test]
    fn direction_and_up_stay_near_unit_length() {
        let mut p = player();
        p.turn_left(true, 0.5);
        p.turn_up(true, 0.4);
        p.move_forward(true);

        for _ in 0..500 {
            p.advance(0.016);
            let dir = p.direction.length();
            let up = p.up.length();
            assert!((0.9..=1.0 + 1e-4).contains(&dir), "direction len {}", dir);
            assert!((0.9..=1.0 + 1e-4).contains(&up), "up len {}", up);
        }
    }

    #[test]
    fn hp_is_monotonic_and_deletion_fires_at_zero() {
        let shooter = Player::new("p-2", "", Vec3::ZERO);
        let bullet = shooter.fire();

        let mut p = player();
        let mut last_hp = p.hp();
        for hit in 1..=10 {
            p.bullet_hit(&bullet);
            assert!(p.hp() < last_hp);
            last_hp = p.hp();
            assert_eq!(p.is_deleted(), hit >= 10, "hit {}", hit);
        }
        assert_eq!(p.hp(), 0);
    }

    #[test]
    fn refresh_overwrites_reported_state() {
        let mut p = player();
        let snapshot = PlayerSnapshot {
            id: "p-1".to_string(),
            name: "renamed".to_string(),
            position: Some(Vec3::new(1.0, 2.0, 3.0).into()),
            direction: Vec3::X.into(),
            velocity: Vec3::new(0.0, 0.1, 0.0).into(),
            up: Vec3::Z.into(),
            vertical_angle: 0.0,
            horizontal_angle: 0.0,
        };
        p.refresh(&snapshot);

        assert_eq!(p.name, "renamed");
        assert_eq!(p.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(p.direction, Vec3::X);
        assert_eq!(p.up, Vec3::Z);
    }

    #[test]
    fn refresh_moves_replaces_set_and_clamps_rates() {
        let mut p = player();
        p.move_forward(true);

        p.refresh_moves(Moves {
            move_backward: true,
            turn_left: true,
            vertical_angle_speed: 3.0,
            ..Moves::default()
        });

        assert!(!p.moves().move_forward);
        assert!(p.moves().move_backward);
        assert_approx_eq!(p.moves().vertical_angle_speed, MAX_TURN_SPEED, 1e-6);
    }

    #[test]
    fn snapshot_carries_position() {
        let p = Player::new("p-9", "snap", Vec3::new(4.0, 0.0, -2.0));
        let snapshot = p.snapshot();

        assert_eq!(snapshot.id, "p-9");
        assert_eq!(snapshot.position, Some(Vec3::new(4.0, 0.0, -2.0).into()));
    }
}
