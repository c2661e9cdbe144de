//! Primitive cell types that can be viewed in place

use crate::engine::Datatype;

mod sealed {
    pub trait Sealed {}
}

/// A primitive type whose values can be read directly from buffer memory.
///
/// Implemented only for fixed-size integers and floats: every bit pattern
/// is a valid value and the alignment is at most 8 bytes.
pub trait CellType: sealed::Sealed + Copy + Send + Sync + 'static {
    /// Type name for error messages
    const NAME: &'static str;

    /// Whether values stored as `datatype` can be viewed as `Self`
    fn accepts(datatype: Datatype) -> bool;
}

macro_rules! cell_type {
    ($t:ty, $name:literal, $($dt:ident),+) => {
        impl sealed::Sealed for $t {}

        impl CellType for $t {
            const NAME: &'static str = $name;

            fn accepts(datatype: Datatype) -> bool {
                matches!(datatype, $(Datatype::$dt)|+)
            }
        }
    };
}

cell_type!(i8, "i8", Int8, Char);
cell_type!(i16, "i16", Int16);
cell_type!(i32, "i32", Int32);
cell_type!(i64, "i64", Int64);
cell_type!(u8, "u8", UInt8, Char, StringAscii, StringUtf8, Bool, Blob);
cell_type!(u16, "u16", UInt16);
cell_type!(u32, "u32", UInt32);
cell_type!(u64, "u64", UInt64);
cell_type!(f32, "f32", Float32);
cell_type!(f64, "f64", Float64);
