use glam::Vec3;
use uuid::Uuid;

use crate::model::Model;
use crate::player::Player;
use crate::BULLET_DAMAGE;

/// A projectile in flight. Spawned by [`Player::fire`], owned by the world
/// until a hit or the range limit flags it deleted.
#[derive(Debug, Clone)]
pub struct Bullet {
    id: String,
    owner_id: String,
    pub position: Vec3,
    pub velocity: Vec3,
    damage: i32,
    deleted: bool,
}

impl Bullet {
    pub fn new(owner: &Player, velocity: Vec3) -> Self {
        Bullet {
            id: Uuid::new_v4().to_string(),
            owner_id: owner.id().to_string(),
            position: owner.position + owner.velocity,
            velocity,
            damage: BULLET_DAMAGE,
            deleted: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The shooter, excluded from this bullet's collision tests.
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn damage(&self) -> i32 {
        self.damage
    }

    pub fn mark_deleted(&mut self) {
        self.deleted = true;
    }
}

impl Model for Bullet {
    fn id(&self) -> &str {
        &self.id
    }

    // Contact and range checks happen in the world's bullet pass, against
    // post-movement player positions.
    fn advance(&mut self, _dt: f32) {
        self.position += self.velocity;
    }

    fn is_deleted(&self) -> bool {
        self.deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bullet_spawns_ahead_of_moving_shooter() {
        let mut shooter = Player::new("p-1", "", Vec3::new(1.0, 0.0, 0.0));
        shooter.velocity = Vec3::new(0.0, 0.0, -0.1);
        let bullet = shooter.fire();

        assert_eq!(bullet.owner_id(), "p-1");
        assert_eq!(bullet.position, Vec3::new(1.0, 0.0, -0.1));
        // Muzzle speed along the facing plus the shooter's momentum.
        assert_eq!(bullet.velocity, Vec3::new(0.0, 0.0, -0.6));
    }

    #[test]
    fn advance_integrates_velocity() {
        let shooter = Player::new("p-1", "", Vec3::ZERO);
        let mut bullet = shooter.fire();
        bullet.advance(0.016);
        bullet.advance(0.016);

        assert_eq!(bullet.position, Vec3::new(0.0, 0.0, -1.0));
        assert!(!bullet.is_deleted());
    }

    #[test]
    fn bullet_ids_are_unique() {
        let shooter = Player::new("p-1", "", Vec3::ZERO);
        let a = shooter.fire();
        let b = shooter.fire();
        assert_ne!(a.id(), b.id());
    }
}
