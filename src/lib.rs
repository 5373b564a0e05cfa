/*
 * Responsibility
 * - Library surface: the binary and the HTTP scenario tests build the same
 *   router from here
 */
pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod pipeline;
pub mod repos;
pub mod services;
pub mod state;
