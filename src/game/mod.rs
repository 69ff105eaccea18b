pub mod engine;
pub mod events;
pub mod manager;
pub mod persist;
pub mod player;
pub mod scheduler;
pub mod state;
