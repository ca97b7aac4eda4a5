//! Domain types, storage contract and consumption queries for the energy
//! logger.

pub mod db;
pub mod domain;
