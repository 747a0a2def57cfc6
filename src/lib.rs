//! OCR Server Library
//!
//! HTTP front end for text recognition. The server binary in main.rs wires
//! these modules together.
//!
//! # Modules
//!
//! - `ocr`: engine trait, engines and the request-handling service
//! - `storage`: request-scoped temp files and filename sanitizing
//! - `routes`: axum router and handlers
//! - `config`: environment-driven configuration

pub mod config;
pub mod error;
pub mod ocr;
pub mod routes;
pub mod state;
pub mod storage;
