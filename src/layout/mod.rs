mod point_record;
pub use self::point_record::*;
