//! askdb - ask questions of relational databases in plain language.
//!
//! The heart of the crate is the schema-context engine: it discovers database
//! schemas, caches them on disk, lets users layer column references on top,
//! and shrinks the result into a prompt-sized context for a language model.
//!
//! - [`domain`]: the [`domain::Schema`] model and relationship edges
//! - [`format`]: the compact one-line-per-table notation
//! - [`storage`]: cache backends and portable schema files
//! - [`introspect`]: database drivers
//! - [`relationships`]: reference editing
//! - [`context`]: relevance reduction and size limiting
//! - [`service`]: orchestration of cache and introspection
//! - [`assistant`]: the question-answering flow

#![forbid(unsafe_code)]

pub mod assistant;
pub mod context;
pub mod domain;
pub mod error;
pub mod format;
pub mod introspect;
pub mod llm;
pub mod query;
pub mod relationships;
pub mod service;
pub mod storage;

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod output;
