mod money;

pub mod op;
mod secret;

pub use money::{Money, MoneyConversionError, CURRENCY_CODE, MINOR_UNITS_PER_RUPEE};
pub use secret::Secret;
