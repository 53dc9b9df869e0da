pub mod answers;
pub mod commit;
pub mod config;
pub mod research;
pub mod sell_side;
pub mod setup;
pub mod status;
