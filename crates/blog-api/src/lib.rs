pub mod auth;
pub mod cards;
pub mod error;
pub mod media;
pub mod middleware;
pub mod password;
pub mod policy;
pub mod render;
pub mod routes;
pub mod state;
pub mod storage;
pub mod token;
pub mod users;
pub mod views;
