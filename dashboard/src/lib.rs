//! Migration dashboard - HTML/htmx front end over a migration provider
//!
//! Renders migration status and dispatches apply/rollback actions to a
//! `MigrationProvider`; `SeaOrmProvider` adapts any SeaORM migrator.

pub mod config;
pub mod provider;
pub mod web;
