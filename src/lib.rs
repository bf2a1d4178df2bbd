//---------------------------------------
pub mod web_api {
    pub mod routes;
}

pub use web_api::routes::map_routes;
//---------------------------------------

//---------------------------------------
pub mod auth;
pub mod error;
pub mod settings;
pub mod state;
//---------------------------------------

//---------------------------------------
pub mod live;
pub mod persist;
pub mod store;
pub mod views;
pub mod world;
//---------------------------------------
