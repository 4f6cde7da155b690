//! Presentation glue for a headless client: lifecycle events become log
//! lines where a renderer would update its scene.

use log::info;
use shared::{Bullet, EventListener, Model, Player};

#[derive(Debug, Default)]
pub struct ConsoleListener;

impl EventListener for ConsoleListener {
    fn on_add_player(&self, player: &Player) {
        info!("player {} ({}) entered", player.id(), player.name);
    }

    fn on_player_hit(&self, player: &Player) {
        info!("player {} hit, {} hp left", player.id(), player.hp());
    }

    fn on_add_bullet(&self, bullet: &Bullet) {
        info!("bullet fired by {}", bullet.owner_id());
    }

    fn on_remove_model(&self, model: &dyn Model) {
        info!("{} left the world", model.id());
    }
}
