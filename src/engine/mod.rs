// src/engine/mod.rs

//! Storage-agnostic quiz rules. Every `QuizStore` calls these inside its own
//! unit of work, so Postgres and the in-memory store cannot drift apart.

pub mod lifecycle;
pub mod scoring;
