pub mod controller;
pub mod registry_service;
