use std::cell::RefCell;
use std::rc::Rc;

use nebula_common::{IdAllocator, ObjectId};
use nebula_engine::{EngineError, World};
use serde::Serialize;

use crate::config::GameConfig;
use crate::enemy::EnemySpawner;
use crate::player::{PLAYER_ID, Player};

/// Scoreboard shared between the actors and the host UI.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionStats {
    pub score: u64,
    pub kills: u32,
    pub health: f32,
    pub lives: u32,
    pub shots_fired: u32,
}

pub(crate) type SharedStats = Rc<RefCell<SessionStats>>;
pub(crate) type SharedIds = Rc<RefCell<IdAllocator>>;

/// Id of the object that runs the enemy spawner.
pub const SPAWNER_ID: &str = "spawner";

/// One round of play: the player ship and the enemy spawner, registered
/// with a world.
///
/// Dropping a session leaves its objects registered; they go away with the
/// engine or through [`end`](Self::end).
#[derive(Debug)]
pub struct Session {
    stats: SharedStats,
}

impl Session {
    pub fn start(world: &mut World, config: &GameConfig) -> Result<Self, EngineError> {
        let stats = Rc::new(RefCell::new(SessionStats {
            health: config.player.health,
            lives: config.player.lives,
            ..SessionStats::default()
        }));
        let ids = Rc::new(RefCell::new(IdAllocator::new()));

        world.add_game_object(Player::spawn(config, stats.clone(), ids.clone()))?;
        world.add_game_object(EnemySpawner::spawn(config, stats.clone(), ids))?;
        tracing::info!(seed = config.seed, "session started");
        Ok(Self { stats })
    }

    pub fn stats(&self) -> SessionStats {
        self.stats.borrow().clone()
    }

    pub fn is_over(&self) -> bool {
        self.stats.borrow().health <= 0.0
    }

    /// Remove every object the session registered.
    pub fn end(self, world: &mut World) {
        let ids: Vec<ObjectId> = world.object_ids().cloned().collect();
        for id in &ids {
            world.remove_game_object(id);
        }
        let stats = self.stats.borrow();
        tracing::info!(score = stats.score, kills = stats.kills, "session ended");
    }
}
