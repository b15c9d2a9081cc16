//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate the rubric, record store and AI gateway into use-case APIs.
//! - Keep UI/FFI layers decoupled from storage and provider details.

pub mod capture;
pub mod chat_service;
pub mod report_service;
pub mod scoring;
