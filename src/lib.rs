pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;

pub mod presentation {
    pub mod views;
}
