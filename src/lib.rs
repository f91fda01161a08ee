//! Mindful: a personal productivity app built around a graph of goals.
//!
//! Goals form a directed graph ([`graph::GoalGraph`]) that tasks, journal
//! entries and the meditation timer sit alongside. State is kept in SQLite
//! ([`db::Database`]) and served over HTTP ([`api::create_router`]) or driven
//! from the command line.

pub mod analysis;
pub mod api;
pub mod config;
pub mod db;
pub mod export;
pub mod graph;
pub mod meditation;
pub mod models;
