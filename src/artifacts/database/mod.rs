//! Database entry types
//!
//! Database entries are references to stored objects together with their mode.
//! Flattened trees map repository-relative paths to these entries.

pub mod database_entry;
