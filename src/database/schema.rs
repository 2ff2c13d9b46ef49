// Database schema definitions for the ledger

pub const LEDGER_SCHEMA: &str = include_str!("../../migrations/001_ledger_schema.sql");
