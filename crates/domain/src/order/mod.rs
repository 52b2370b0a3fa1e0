//! Order aggregate and its supporting types.

mod aggregate;
mod status;
mod value_objects;
mod version;

pub use aggregate::{Convergence, NewOrder, Order};
pub use status::{OrderStatus, PaymentStatus, UnknownStatus};
pub use value_objects::{LineItem, Money};
pub use version::Version;
