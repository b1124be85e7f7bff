//! Penpost - A small multi-author blog
//!
//! This library provides the core functionality for the Penpost blog:
//! posts with tags, comments, sharing by email, a newsletter list and
//! user accounts, served as HTML pages.

pub mod config;
pub mod db;
pub mod forms;
pub mod models;
pub mod services;
pub mod templates;
pub mod web;
