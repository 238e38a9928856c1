mod helpers;

mod conflict_flow;
mod http_surface;
mod inventory_bounds;
mod offline_sync;
mod trash;
