//! Library API application
//!
//! A CRUD HTTP API for managing book records backed by MongoDB.

pub mod modules;
