//! Darkroom studio sync - integration test support.
//!
//! Re-exports the workspace crates so integration tests can use
//! `darkroom_test::` paths.

pub mod component {
    pub use darkroom_core::{actor, config, constants, error, schedule, types, workflow};
    pub use darkroom_service::{
        activity, booking, cloud, conflict, inventory, lifecycle, reminder, sync, task, testing,
    };

    pub mod model {
        pub use darkroom_db::model::*;
    }

    pub mod middleware {
        pub use darkroom_app::middleware::*;
    }
}

pub mod app {
    pub use darkroom_app::*;

    pub mod api {
        pub use darkroom_app::app::api::*;
    }
}

pub use darkroom_service::{ServiceError, Studio};
