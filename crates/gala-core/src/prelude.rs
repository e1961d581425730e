//! Common module for library exports

pub use crate::address::Address;
pub use crate::context::{TargetContext, TargetContextGuard, current_target};
pub use crate::error::{ErrorKind, GalaError, GalaResult};
pub use crate::session::{Inferior, lookup_global, lookup_type, parse_and_eval, selected_inferior};
pub use crate::types::helpers::{get_basic_type, has_field, make_enum_dict};
pub use crate::types::{Field, Type, TypeCode};
pub use crate::value::{Encoding, ErrorPolicy, Index, Number, Value};
