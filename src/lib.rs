//! Space Invaders simulation core: entities, the per-tick engine, score
//! events and snapshot/restore. The terminal front-end lives in the binary.

pub mod config;
pub mod engine;
pub mod entities;
pub mod events;
pub mod memento;
pub mod mutation;
pub mod observer;
pub mod strategy;
pub mod vector;
