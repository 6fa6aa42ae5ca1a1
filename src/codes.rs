// Status codes returned in stats[STATUS].

use crate::internal::Int;

pub const OK: Int = 0;
/// `Order::Symmetric` was requested for a rectangular matrix; A'A was ordered.
pub const OK_BUT_RECTANGULAR: Int = 1;
pub const ERROR_OUT_OF_MEMORY: Int = -10;
