/*
 * Responsibility
 * - Versioned HTTP surface (only v1 today)
 */
pub mod v1;
