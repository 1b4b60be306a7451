mod ids;
mod state;
mod value;

pub use ids::*;
pub use state::{Record, State};
pub use value::{int_arg, str_arg, CallFn, Callable, Value};
