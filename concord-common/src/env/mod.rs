pub mod consensus;
pub mod proposal;
pub mod record;
