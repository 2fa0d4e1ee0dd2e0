pub mod int_ids;
pub mod string_ids;
