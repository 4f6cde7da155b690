use std::collections::HashMap;
use std::sync::Arc;

use glam::Vec3;
use uuid::Uuid;

use crate::bullet::Bullet;
use crate::model::{EventListener, Model};
use crate::player::Player;
use crate::WORLD_RADIUS;

/// The authoritative aggregate: every live player and projectile, plus the
/// optional listener told about lifecycle transitions.
///
/// Entities enter and leave only through the methods here so listener
/// notifications are never bypassed. The first player added becomes the
/// "local" player, which is what a client steers and a server simply treats
/// as the first connection.
#[derive(Default)]
pub struct World {
    local_player_id: Option<String>,
    players: HashMap<String, Player>,
    models: HashMap<String, Bullet>,
    listener: Option<Arc<dyn EventListener>>,
}

impl World {
    pub fn new() -> Self {
        World::default()
    }

    pub fn subscribe(&mut self, listener: Arc<dyn EventListener>) {
        self.listener = Some(listener);
    }

    pub fn add_player(&mut self, player: Player) {
        if self.local_player_id.is_none() {
            self.local_player_id = Some(player.id().to_string());
        }
        if let Some(listener) = &self.listener {
            listener.on_add_player(&player);
        }
        self.players.insert(player.id().to_string(), player);
    }

    pub fn add_bullet(&mut self, bullet: Bullet) {
        if let Some(listener) = &self.listener {
            listener.on_add_bullet(&bullet);
        }
        self.models.insert(bullet.id().to_string(), bullet);
    }

    /// Spawns a bullet from the named player's current state. Unknown ids
    /// are ignored; the shooter may have been evicted a tick earlier.
    pub fn fire(&mut self, player_id: &str) {
        if let Some(player) = self.players.get(player_id) {
            let bullet = player.fire();
            self.add_bullet(bullet);
        }
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn player_mut(&mut self, id: &str) -> Option<&mut Player> {
        self.players.get_mut(id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn bullets(&self) -> impl Iterator<Item = &Bullet> {
        self.models.values()
    }

    pub fn local_player(&self) -> Option<&Player> {
        self.local_player_id
            .as_deref()
            .and_then(|id| self.players.get(id))
    }

    pub fn local_player_id(&self) -> Option<&str> {
        self.local_player_id.as_deref()
    }

    /// Removes a player outside the tick (departure, timeout). Reports the
    /// removal like any other eviction.
    pub fn remove_player(&mut self, id: &str) -> Option<Player> {
        let player = self.players.remove(id)?;
        if let Some(listener) = &self.listener {
            listener.on_remove_model(&player);
        }
        Some(player)
    }

    /// One simulation tick.
    ///
    /// Players advance first and newly deleted ones leave the live set, so
    /// the bullet pass always collides against this tick's post-movement
    /// positions. Iteration order over either map carries no meaning.
    pub fn update(&mut self, dt: f32) {
        for player in self.players.values_mut() {
            player.advance(dt);
        }
        let dead: Vec<String> = self
            .players
            .values()
            .filter(|p| p.is_deleted())
            .map(|p| p.id().to_string())
            .collect();
        for id in dead {
            if let Some(player) = self.players.remove(&id) {
                if let Some(listener) = &self.listener {
                    listener.on_remove_model(&player);
                }
            }
        }

        let mut models = std::mem::take(&mut self.models);
        for bullet in models.values_mut() {
            bullet.advance(dt);
            for player in self.players.values_mut() {
                if player.id() == bullet.owner_id() {
                    continue;
                }
                if player.hit_sphere_contains(bullet.position) {
                    player.bullet_hit(bullet);
                    if let Some(listener) = &self.listener {
                        listener.on_player_hit(player);
                    }
                    bullet.mark_deleted();
                    break;
                }
            }
            if !bullet.is_deleted() && bullet.position.length() > WORLD_RADIUS {
                bullet.mark_deleted();
            }
        }
        models.retain(|_, bullet| {
            if bullet.is_deleted() {
                if let Some(listener) = &self.listener {
                    listener.on_remove_model(bullet);
                }
                false
            } else {
                true
            }
        });
        self.models = models;
    }
}

/// Mints a player with a fresh unique id at the world origin, the state a
/// new connection starts from.
pub fn spawn_player(name: &str) -> Player {
    Player::new(&Uuid::new_v4().to_string(), name, Vec3::ZERO)
}
