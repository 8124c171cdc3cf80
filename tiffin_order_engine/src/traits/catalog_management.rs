use crate::{
    api::errors::OrderFlowError,
    db_types::{Address, MenuItem, Restaurant, User},
};

/// Read access to the catalogue the order engine validates against.
///
/// Restaurants, menu items, addresses and users are maintained by other parts of the system; the engine only ever
/// needs point lookups returning immutable snapshots. Absence is `None`, not an error, so the flow APIs can decide
/// which not-found error applies.
#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    async fn fetch_restaurant(&self, restaurant_id: i64) -> Result<Option<Restaurant>, OrderFlowError>;

    async fn fetch_menu_item(&self, menu_item_id: i64) -> Result<Option<MenuItem>, OrderFlowError>;

    async fn fetch_address(&self, address_id: i64) -> Result<Option<Address>, OrderFlowError>;

    async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, OrderFlowError>;
}
