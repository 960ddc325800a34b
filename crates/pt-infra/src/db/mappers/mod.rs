pub mod pin_mapper;

pub use pin_mapper::PinRowMapper;
