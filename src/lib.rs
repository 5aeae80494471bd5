//! cypher-pgsql - openCypher to PostgreSQL translation
//!
//! This crate lowers openCypher query ASTs into SQL over a two-table property graph encoding:
//! - `node(id, kind_ids, properties)` and `edge(id, start_id, end_id, kind_id, properties)`
//! - Pattern matches become chains of common table expressions
//! - Variable-length relationships become recursive CTEs
//! - Parsing Cypher text and executing the SQL are left to the caller

pub mod config;
pub mod cypher;
pub mod pgsql;
pub mod translate;
