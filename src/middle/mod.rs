pub mod ir;
pub mod ty;
pub mod type_check;
