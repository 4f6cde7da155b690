pub mod bullet;
pub mod model;
pub mod player;
pub mod protocol;
pub mod world;

pub use bullet::Bullet;
pub use model::{EventListener, Model};
pub use player::{Moves, Player};
pub use protocol::{Message, PlayerSnapshot, ProtocolError, Vector3};
pub use world::World;

/// Distance covered per tick while a movement intent is held.
pub const MOVE_SPEED: f32 = 0.1;
/// Muzzle speed added along the shooter's facing direction.
pub const BULLET_SPEED: f32 = 0.5;
/// Upper bound for the per-tick turn rate supplied with a turn intent.
pub const MAX_TURN_SPEED: f32 = 0.5;
/// Exponential decay applied to velocity and turn deltas every tick.
pub const DAMPING: f32 = 0.8;
pub const START_HP: i32 = 100;
pub const BULLET_DAMAGE: i32 = 10;
/// Radius of the sphere used for bullet-player contact tests.
pub const HIT_RADIUS: f32 = 1.0;
/// Bullets farther than this from the origin are discarded.
pub const WORLD_RADIUS: f32 = 10.0;
