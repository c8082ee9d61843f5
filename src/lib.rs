#![doc = "The `todolist` library crate."]
#![doc = ""]
#![doc = "This crate contains the domain models, the storage seams and their Postgres and"]
#![doc = "in-memory implementations, session handling, routing configuration and error"]
#![doc = "handling for the to-do list service. The binary (`main.rs`) wires them together."]

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod response;
pub mod routes;
pub mod services;
pub mod store;
