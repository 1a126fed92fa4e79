pub mod align;
pub mod app;
pub mod config;
pub mod dataset;
pub mod dispatch;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod git;
pub mod indy;
pub mod mapping;
pub mod output;
pub mod pnc;
pub mod repos;
pub mod store;
