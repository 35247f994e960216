//! SIPC: estoque, vendas, compras e trocas de uma loja de autopeças.
//!
//! Repositórios (`db`) falam com o Postgres; serviços (`services`) aplicam as
//! regras de negócio em transações e gravam a trilha de auditoria.

pub mod common;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
