//! Application services: the narrow surfaces external collaborators call.

pub mod broadcast_service;

pub use broadcast_service::BroadcastService;
