//! Site smart charging: turns a site area's topology and live sessions into
//! an optimizer request, and the optimizer's plan into OCPP charging profiles.

pub mod api;
pub mod config;
pub mod controller;
pub mod domain;
pub mod ocpp;
pub mod optimizer;
pub mod repo;
pub mod smart_charging;
pub mod telemetry;
