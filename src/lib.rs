//! Ciclo de vida de viajes y reconciliación de kilometraje
//!
//! Backend multi-tenant para flotas: inicio, cierre y cancelación de viajes,
//! libro de kilometraje con cota anti-fraude y escalado de daños severos.

pub mod config;
pub mod controllers;
pub mod database;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;
