//! Core library for the moodle-tools command line application.
//!
//! The library wraps Moodle's REST web services and the administrative
//! operations built on them. Responsibilities are kept narrow: the parameter
//! encoding lives in [`moodle::tools::flatten`], the HTTP client in
//! [`moodle::tools::client`], the typed view over decoded responses in
//! [`moodle::tools::response`], `.env` loading in [`moodle::tools::env`],
//! roster file loading under [`moodle::tools::io`], and the cohort and course operations in
//! [`moodle::tools::cohorts`] and [`moodle::tools::courses`].

pub mod moodle;

pub use moodle::tools::{
    RemoteApiError, Result, ToolError, client, cohorts, courses, env, error, flatten, io, model,
    response,
};
