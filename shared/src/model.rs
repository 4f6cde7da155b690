use crate::bullet::Bullet;
use crate::player::Player;

/// Capability shared by everything the world simulates: a stable id, a
/// per-tick advance and a deletion flag checked when the tick ends.
pub trait Model {
    fn id(&self) -> &str;
    fn advance(&mut self, dt: f32);
    fn is_deleted(&self) -> bool;
}

/// Observer for entity lifecycle transitions. The presentation layer
/// implements whichever hooks it cares about; the world never knows what
/// sits behind the trait.
pub trait EventListener: Send + Sync {
    fn on_add_player(&self, _player: &Player) {}
    fn on_player_hit(&self, _player: &Player) {}
    fn on_add_bullet(&self, _bullet: &Bullet) {}
    fn on_remove_model(&self, _model: &dyn Model) {}
}
