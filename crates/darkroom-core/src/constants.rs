/// Route component constants shared across crates
pub const API_ROUTE_COMPONENT: &str = "api";
pub const API_ROUTE_PREFIX: &str = const_str::concat!("/", API_ROUTE_COMPONENT);

pub const SYNC_ROUTE_COMPONENT: &str = "sync";
pub const SYNC_ROUTE_PREFIX: &str = const_str::concat!(API_ROUTE_PREFIX, "/", SYNC_ROUTE_COMPONENT);

pub const CONFLICT_ROUTE_COMPONENT: &str = "conflicts";
pub const CONFLICT_ROUTE_PREFIX: &str =
    const_str::concat!(API_ROUTE_PREFIX, "/", CONFLICT_ROUTE_COMPONENT);

/// Days between the shoot date and the client's selection deadline.
pub const SELECTION_DEADLINE_DAYS: i64 = 60;

/// Days between a confirmed selection and the delivery deadline.
pub const DELIVERY_DEADLINE_DAYS: i64 = 60;
