/*
 * Responsibility
 * - Router-level middleware (re-export)
 * - http::apply (request id / trace / body limit / timeout), cors::apply
 */
pub mod cors;
pub mod http;
