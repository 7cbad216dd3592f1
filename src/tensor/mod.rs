mod dense;
mod numeric;

pub use dense::*;
pub use numeric::*;
